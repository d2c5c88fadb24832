//! # Sale Transaction Coordinator
//!
//! Turns a finalized cart into a persisted sale, all or nothing.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(cart, request, actor)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐   │
//! │   Validating                                                        │   │
//! │     re-read every cart product (current stock, active flag)         │   │
//! │     plan_checkout() + customer exists?                              │   │
//! │       ├── rule broken ──► ROLLBACK ──► Err(Rejected)                │   │
//! │       └── storage error ─► ROLLBACK ──► Err(RolledBack)             │   │
//! │   Persisting                                                        │   │
//! │     sale_number = V{yyyyMMdd}-{HHmmss}[-N]                          │   │
//! │     INSERT sales                                                    │   │
//! │     for each line, in cart order:                                   │   │
//! │        INSERT sale_items                                            │   │
//! │        UPDATE products SET stock = stock - qty                      │   │
//! │        INSERT stock_movements (OUT, qty, "SALE {sale_number}")      │   │
//! │       └── any storage error ──► ROLLBACK ──► Err(RolledBack)        │   │
//! │  COMMIT ◄───────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(CommittedSale)   caller discards the cart                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Retries
//! A rolled-back checkout is reported, never retried here. Cash may
//! already be in the drawer; the operator re-attempts after checking.
//!
//! Validation reads run on the transaction's connection, so the stock that
//! is checked is the stock that gets decremented.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::stock::StockLedger;
use cardpos_core::checkout::{plan_checkout, CheckoutPlan};
use cardpos_core::sale_number::{base_sale_number, with_sequence};
use cardpos_core::{
    Actor, Cart, CheckoutRequest, CheckoutState, CoreError, MovementType, Sale, SaleItem,
    StockMovement,
};

// =============================================================================
// Outcome Types
// =============================================================================

/// Why a checkout did not commit.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule failed during validation. Nothing was written; fix
    /// the cart or payment and try again.
    #[error("checkout rejected: {0}")]
    Rejected(CoreError),

    /// Storage failed. The transaction was rolled back before this was
    /// returned, so no part of the sale is visible.
    #[error("checkout rolled back: {0}")]
    RolledBack(DbError),
}

impl CheckoutError {
    /// Terminal state this error corresponds to.
    pub fn state(&self) -> CheckoutState {
        match self {
            CheckoutError::Rejected(_) => CheckoutState::Rejected,
            CheckoutError::RolledBack(_) => CheckoutState::RolledBack,
        }
    }
}

/// A sale as committed, with everything written alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedSale {
    pub sale: Sale,
    /// In cart order.
    pub items: Vec<SaleItem>,
    /// One OUT movement per item, same order.
    pub movements: Vec<StockMovement>,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Runs checkouts against the shop database.
///
/// ## Usage
/// ```rust,ignore
/// let request = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(5000));
/// match db.checkout().checkout(&session.cart, &request, &session.actor).await {
///     Ok(committed) => { print_receipt(&committed); session.cart.clear(); }
///     Err(CheckoutError::Rejected(reason)) => show(reason),      // cart kept
///     Err(CheckoutError::RolledBack(e)) => alert_operator(e),    // cart kept
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CheckoutCoordinator {
    pool: SqlitePool,
}

impl CheckoutCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutCoordinator { pool }
    }

    /// Checks out `cart` paid as described by `request`, sold by `actor`.
    ///
    /// The cart is not modified; clearing it after a commit is the
    /// caller's job.
    pub async fn checkout(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        actor: &Actor,
    ) -> Result<CommittedSale, CheckoutError> {
        self.checkout_at(cart, request, actor, Utc::now()).await
    }

    /// [`checkout`](Self::checkout) with an explicit creation time.
    pub(crate) async fn checkout_at(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CommittedSale, CheckoutError> {
        let mut trail = StateTrail::new();
        self.run(cart, request, actor, now, &mut trail).await
    }

    /// Drives one attempt through the state machine, recording each step
    /// in `trail`.
    async fn run(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        actor: &Actor,
        now: DateTime<Utc>,
        trail: &mut StateTrail,
    ) -> Result<CommittedSale, CheckoutError> {
        trail.advance(CheckoutState::Validating);

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                let e = DbError::from(e);
                error!(error = %e, seller = %actor.username, "Checkout could not begin");
                trail.advance(CheckoutState::RolledBack);
                return Err(CheckoutError::RolledBack(e));
            }
        };

        let outcome = match validate(&mut *tx, cart, request).await {
            Ok(plan) => {
                trail.advance(CheckoutState::Persisting);
                persist(&mut *tx, &plan, actor, now)
                    .await
                    .map_err(CheckoutError::RolledBack)
            }
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(committed) => match tx.commit().await {
                Ok(()) => Ok(committed),
                Err(e) => Err(CheckoutError::RolledBack(DbError::TransactionFailed(
                    e.to_string(),
                ))),
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        };

        match outcome {
            Ok(committed) => {
                trail.advance(CheckoutState::Committed);
                info!(
                    sale_number = %committed.sale.sale_number,
                    seller = %actor.username,
                    items = committed.items.len(),
                    total = %committed.sale.total(),
                    payment_method = %committed.sale.payment_method,
                    "Sale committed"
                );
                Ok(committed)
            }
            Err(err) => {
                match &err {
                    CheckoutError::Rejected(reason) => {
                        debug!(reason = %reason, "Checkout rejected");
                    }
                    CheckoutError::RolledBack(e) => {
                        error!(error = %e, seller = %actor.username, "Checkout rolled back");
                    }
                }
                trail.advance(err.state());
                Err(err)
            }
        }
    }
}

/// The states one checkout attempt passed through, starting at `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StateTrail(Vec<CheckoutState>);

impl StateTrail {
    fn new() -> Self {
        StateTrail(vec![CheckoutState::Idle])
    }

    fn current(&self) -> CheckoutState {
        self.0.last().copied().unwrap_or(CheckoutState::Idle)
    }

    /// Moves to `next`. Illegal steps are a coordinator bug.
    fn advance(&mut self, next: CheckoutState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal checkout transition {from} -> {next}"
        );
        debug!(from = %from, to = %next, "Checkout state");
        self.0.push(next);
    }
}

/// The Validating phase against the transaction's view of storage.
async fn validate(
    conn: &mut SqliteConnection,
    cart: &Cart,
    request: &CheckoutRequest,
) -> Result<CheckoutPlan, CheckoutError> {
    let mut current = Vec::with_capacity(cart.line_count());
    for line in cart.lines() {
        if let Some(product) = ProductRepository::fetch_on(conn, &line.product_id)
            .await
            .map_err(CheckoutError::RolledBack)?
        {
            current.push(product);
        }
    }

    let plan = plan_checkout(cart, request, &current).map_err(CheckoutError::Rejected)?;

    if let Some(customer_id) = plan.customer_id.as_deref() {
        let exists = CustomerRepository::exists_on(conn, customer_id)
            .await
            .map_err(CheckoutError::RolledBack)?;
        if !exists {
            return Err(CheckoutError::Rejected(CoreError::CustomerNotFound(
                customer_id.to_string(),
            )));
        }
    }

    Ok(plan)
}

/// The Persisting phase. Any error leaves the transaction to be rolled back.
async fn persist(
    conn: &mut SqliteConnection,
    plan: &CheckoutPlan,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<CommittedSale, DbError> {
    let sale_number = next_sale_number(conn, now).await?;

    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        sale_number,
        user_id: actor.user_id.clone(),
        customer_id: plan.customer_id.clone(),
        subtotal_cents: plan.subtotal.cents(),
        discount_cents: plan.discount.cents(),
        total_cents: plan.total.cents(),
        payment_method: plan.payment_method,
        amount_received_cents: plan.tender.amount_received.cents(),
        change_cents: plan.tender.change.cents(),
        note: plan.note.clone(),
        created_at: now,
        updated_at: now,
    };

    debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_number, user_id, customer_id,
            subtotal_cents, discount_cents, total_cents,
            payment_method, amount_received_cents, change_cents,
            note, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.sale_number)
    .bind(&sale.user_id)
    .bind(&sale.customer_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.amount_received_cents)
    .bind(sale.change_cents)
    .bind(&sale.note)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    let reason = format!("SALE {}", sale.sale_number);
    let mut items = Vec::with_capacity(plan.lines.len());
    let mut movements = Vec::with_capacity(plan.lines.len());

    for line in &plan.lines {
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total.cents(),
        };

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity, unit_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

        StockLedger::decrement(conn, &line.product_id, line.quantity, now).await?;
        let movement = StockLedger::record_movement(
            conn,
            &line.product_id,
            MovementType::Out,
            line.quantity,
            &reason,
            now,
        )
        .await?;

        items.push(item);
        movements.push(movement);
    }

    Ok(CommittedSale {
        sale,
        items,
        movements,
    })
}

/// First sale in a second keeps the base number; later ones get `-2`, `-3`, ...
async fn next_sale_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<String, DbError> {
    let base = base_sale_number(now);

    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sales WHERE sale_number = ?1 OR sale_number LIKE ?2",
    )
    .bind(&base)
    .bind(format!("{}-%", base))
    .fetch_one(&mut *conn)
    .await?;

    let sequence = u32::try_from(taken + 1).unwrap_or(u32::MAX);
    Ok(with_sequence(&base, sequence))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::tests::customer_draft;
    use crate::repository::product::tests::draft;
    use cardpos_core::{
        DiscountPolicy, ManualDiscount, Money, PaymentMethod, Product, ResolvedPrice, Role,
    };
    use chrono::TimeZone;

    async fn setup() -> (Database, Actor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create("seller", "Shop Seller", "seller", Role::Seller)
            .await
            .unwrap();
        (db, Actor::from(&user))
    }

    fn cart_of(lines: &[(&Product, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (product, qty) in lines {
            cart.add_product(product, &ResolvedPrice::list(product), *qty)
                .unwrap();
        }
        cart
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_cash_sale_scenario() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 10)).await.unwrap();
        let cart = cart_of(&[(&p, 2)]);
        let request = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(5000));

        let committed = db.checkout().checkout(&cart, &request, &actor).await.unwrap();

        assert_eq!(committed.sale.subtotal_cents, 3000);
        assert_eq!(committed.sale.total_cents, 3000);
        assert_eq!(committed.sale.amount_received_cents, 5000);
        assert_eq!(committed.sale.change_cents, 2000);
        assert_eq!(committed.sale.user_id, actor.user_id);
        assert_eq!(stock_of(&db, &p.id).await, 8);

        let items = db.sales().items_for(&committed.sale.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price_cents, 1500);
        assert_eq!(items[0].line_total_cents, 3000);

        let movements = db.stock().movements_for(&p.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].quantity, 2);
        assert_eq!(movements[0].reason, format!("SALE {}", committed.sale.sale_number));

        let by_reason = db
            .stock()
            .movements_with_reason(&movements[0].reason)
            .await
            .unwrap();
        assert_eq!(by_reason.len(), 1);

        let stored = db
            .sales()
            .get_by_number(&committed.sale.sale_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, committed.sale.id);
        assert_eq!(stored.payment_method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_failure_mid_items_rolls_everything_back() {
        let (db, actor) = setup().await;
        let first = db.products().insert(&draft("A", 1000, 5)).await.unwrap();
        let second = db.products().insert(&draft("B", 2000, 5)).await.unwrap();

        // The header and first line go in; the second item insert aborts.
        sqlx::query(&format!(
            "CREATE TRIGGER fail_second_item BEFORE INSERT ON sale_items \
             WHEN NEW.product_id = '{}' \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
            second.id
        ))
        .execute(db.pool())
        .await
        .unwrap();

        let cart = cart_of(&[(&first, 2), (&second, 1)]);
        let request = CheckoutRequest::new(PaymentMethod::Card);

        let err = db.checkout().checkout(&cart, &request, &actor).await.unwrap_err();
        assert!(matches!(err, CheckoutError::RolledBack(_)));
        assert_eq!(err.state(), CheckoutState::RolledBack);

        assert_eq!(db.sales().count().await.unwrap(), 0);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(stock_of(&db, &first.id).await, 5);
        assert_eq!(stock_of(&db, &second.id).await, 5);
        assert!(db.stock().movements_for(&first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_decreases_by_sum_of_sales() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 500, 20)).await.unwrap();
        let request = CheckoutRequest::new(PaymentMethod::Yape);

        let mut sold = 0;
        for qty in [3, 1, 4, 2] {
            let current = db.products().get_by_id(&p.id).await.unwrap().unwrap();
            let cart = cart_of(&[(&current, qty)]);
            db.checkout().checkout(&cart, &request, &actor).await.unwrap();
            sold += qty;
            assert!(stock_of(&db, &p.id).await >= 0);
        }

        assert_eq!(stock_of(&db, &p.id).await, 20 - sold);
        assert_eq!(db.stock().net_movement(&p.id).await.unwrap(), -sold);
    }

    #[tokio::test]
    async fn test_same_second_sales_get_suffix() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 500, 10)).await.unwrap();
        let cart = cart_of(&[(&p, 1)]);
        let request = CheckoutRequest::new(PaymentMethod::Cash);
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();

        let coordinator = db.checkout();
        let a = coordinator.checkout_at(&cart, &request, &actor, at).await.unwrap();
        let b = coordinator.checkout_at(&cart, &request, &actor, at).await.unwrap();
        let c = coordinator.checkout_at(&cart, &request, &actor, at).await.unwrap();

        assert_eq!(a.sale.sale_number, "V20250301-101500");
        assert_eq!(b.sale.sale_number, "V20250301-101500-2");
        assert_eq!(c.sale.sale_number, "V20250301-101500-3");
    }

    #[tokio::test]
    async fn test_stale_stock_is_rejected_without_writes() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let cart = cart_of(&[(&p, 4)]);

        // Inventory edit between add and checkout.
        let mut edit = draft("PKM-001", 1500, 2);
        edit.name = p.name.clone();
        db.products().update(&p.id, &edit).await.unwrap();

        let request = CheckoutRequest::new(PaymentMethod::Cash);
        let err = db.checkout().checkout(&cart, &request, &actor).await.unwrap_err();
        match err {
            CheckoutError::Rejected(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(stock_of(&db, &p.id).await, 2);
    }

    #[tokio::test]
    async fn test_short_cash_is_rejected() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let cart = cart_of(&[(&p, 2)]);
        let request = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(2000));

        let err = db.checkout().checkout(&cart, &request, &actor).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::InsufficientPayment { .. })
        ));
        assert_eq!(stock_of(&db, &p.id).await, 5);
    }

    #[tokio::test]
    async fn test_non_cash_forces_exact_amount() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let cart = cart_of(&[(&p, 1)]);
        let request = CheckoutRequest::new(PaymentMethod::Card).tendered(Money::from_cents(9000));

        let committed = db.checkout().checkout(&cart, &request, &actor).await.unwrap();
        assert_eq!(committed.sale.amount_received_cents, 1500);
        assert_eq!(committed.sale.change_cents, 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_rejected() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let cart = cart_of(&[(&p, 1)]);
        let request = CheckoutRequest::new(PaymentMethod::Cash).customer("ghost");

        let err = db.checkout().checkout(&cart, &request, &actor).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::CustomerNotFound(_))
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_customer_and_discount_recorded() {
        let (db, actor) = setup().await;
        let customer = db
            .customers()
            .create(&customer_draft("45678912", "Ash Ketchum"))
            .await
            .unwrap();
        let p = db.products().insert(&draft("PKM-001", 5000, 5)).await.unwrap();

        let mut cart = cart_of(&[(&p, 2)]);
        let admin = Actor::new("unused", "boss", Role::Admin);
        cart.apply_manual_discount(
            ManualDiscount::Percentage(2500),
            Some("Loyal customer".to_string()),
            &admin,
            &DiscountPolicy::default(),
        )
        .unwrap();

        let request = CheckoutRequest::new(PaymentMethod::Plin)
            .customer(customer.id.clone())
            .note("Reserved binder");
        let committed = db.checkout().checkout(&cart, &request, &actor).await.unwrap();

        assert_eq!(committed.sale.subtotal_cents, 10_000);
        assert_eq!(committed.sale.discount_cents, 2_500);
        assert_eq!(committed.sale.total_cents, 7_500);
        assert_eq!(committed.sale.customer_id.as_deref(), Some(customer.id.as_str()));
        assert_eq!(committed.sale.note.as_deref(), Some("Reserved binder"));

        let purchases = db.sales().list_for_customer(&customer.id, 10).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].id, committed.sale.id);

        let walk_in = cart_of(&[(&p, 1)]);
        db.checkout()
            .checkout(&walk_in, &CheckoutRequest::new(PaymentMethod::Cash), &actor)
            .await
            .unwrap();
        assert_eq!(db.sales().list_for_customer(&customer.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sale_and_ledger_share_timestamp() {
        let (db, actor) = setup().await;
        let a = db.products().insert(&draft("A", 1000, 5)).await.unwrap();
        let b = db.products().insert(&draft("B", 2000, 5)).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 18, 45, 30).unwrap();

        let committed = db
            .checkout()
            .checkout_at(
                &cart_of(&[(&a, 1), (&b, 2)]),
                &CheckoutRequest::new(PaymentMethod::Card),
                &actor,
                at,
            )
            .await
            .unwrap();

        assert_eq!(committed.sale.created_at, at);
        assert!(committed.movements.iter().all(|m| m.created_at == at));
        for id in [&a.id, &b.id] {
            let stored = db.stock().movements_for(id).await.unwrap();
            assert_eq!(stored[0].created_at, at);
            let product = db.products().get_by_id(id).await.unwrap().unwrap();
            assert_eq!(product.updated_at, at);
        }
    }

    #[tokio::test]
    async fn test_state_sequence_for_each_outcome() {
        use CheckoutState::*;

        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let coordinator = db.checkout();
        let cart = cart_of(&[(&p, 1)]);
        let card = CheckoutRequest::new(PaymentMethod::Card);
        let now = Utc::now();

        let mut trail = StateTrail::new();
        coordinator.run(&cart, &card, &actor, now, &mut trail).await.unwrap();
        assert_eq!(trail.0, vec![Idle, Validating, Persisting, Committed]);

        let mut trail = StateTrail::new();
        let short = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(100));
        let err = coordinator.run(&cart, &short, &actor, now, &mut trail).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(_)));
        assert_eq!(trail.0, vec![Idle, Validating, Rejected]);

        // Storage fails while writing items.
        sqlx::query(
            "CREATE TRIGGER fail_items BEFORE INSERT ON sale_items \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let mut trail = StateTrail::new();
        let err = coordinator.run(&cart, &card, &actor, now, &mut trail).await.unwrap_err();
        assert!(matches!(err, CheckoutError::RolledBack(_)));
        assert_eq!(trail.0, vec![Idle, Validating, Persisting, RolledBack]);

        // Storage fails during the validation reads.
        sqlx::query("DROP TABLE customers")
            .execute(db.pool())
            .await
            .unwrap();
        let mut trail = StateTrail::new();
        let err = coordinator
            .run(&cart, &card.clone().customer("anyone"), &actor, now, &mut trail)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::RolledBack(_)));
        assert_eq!(trail.0, vec![Idle, Validating, RolledBack]);
        assert_eq!(trail.current(), err.state());

        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(stock_of(&db, &p.id).await, 4);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let (db, actor) = setup().await;
        let err = db
            .checkout()
            .checkout(&Cart::new(), &CheckoutRequest::new(PaymentMethod::Cash), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_history_totals() {
        let (db, actor) = setup().await;
        let p = db.products().insert(&draft("PKM-001", 1000, 10)).await.unwrap();
        let request = CheckoutRequest::new(PaymentMethod::Cash);
        let coordinator = db.checkout();

        let day_one = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap();
        coordinator
            .checkout_at(&cart_of(&[(&p, 1)]), &request, &actor, day_one)
            .await
            .unwrap();
        coordinator
            .checkout_at(&cart_of(&[(&p, 2)]), &request, &actor, day_two)
            .await
            .unwrap();

        let from = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(db.sales().list_between(from, to).await.unwrap().len(), 1);
        assert_eq!(db.sales().total_between(from, to).await.unwrap().cents(), 1000);

        let to = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
        assert_eq!(db.sales().total_between(from, to).await.unwrap().cents(), 3000);
    }
}
