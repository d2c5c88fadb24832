//! # Sale Commands
//!
//! Checkout and receipt rendering.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  > pay cash 50 --customer 45678912                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  CheckoutInput ──parse──► CheckoutRequest (method, tendered, customer)  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  CheckoutCoordinator::checkout(cart, request, actor)                    │
//! │         │                                                               │
//! │         ├── Committed  ──► Receipt, cart cleared                        │
//! │         ├── Rejected   ──► ApiError, cart kept for correction           │
//! │         └── RolledBack ──► ApiError, cart kept, nothing persisted       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::customer::find_customer;
use crate::error::ApiError;
use crate::session::RegisterSession;
use cardpos_core::{Cart, CheckoutRequest, Money, PaymentMethod};
use cardpos_db::{CommittedSale, Database};

/// Payment details as entered at the till.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    /// "cash", "card", "yape", "plin", "transfer"
    pub method: String,
    /// Cash handed over, e.g. "50" or "49.90". Empty means exact amount.
    pub tendered: Option<String>,
    /// Document number of a registered customer.
    pub customer_document: Option<String>,
    pub note: Option<String>,
}

impl CheckoutInput {
    pub fn new(method: impl Into<String>) -> Self {
        CheckoutInput {
            method: method.into(),
            ..Default::default()
        }
    }
}

/// Receipt read model for a committed sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub sale_id: String,
    pub sale_number: String,
    pub created_at: DateTime<Utc>,
    pub seller: String,
    pub customer_name: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    /// Saved by campaigns, already reflected in the line prices.
    pub campaign_savings: Money,
    pub discount: Money,
    pub discount_note: Option<String>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub amount_received: Money,
    pub change: Money,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub list_price: Money,
    /// Campaign that set the unit price, if any.
    pub campaign: Option<String>,
    pub line_total: Money,
}

impl Receipt {
    /// Builds the receipt from what was committed. Names and list prices
    /// come from the cart the sale was made from.
    fn new(
        committed: &CommittedSale,
        cart: &Cart,
        seller: &str,
        customer_name: Option<String>,
    ) -> Self {
        let sale = &committed.sale;

        let lines: Vec<ReceiptLine> = committed
            .items
            .iter()
            .map(|item| {
                let cart_line = cart.line(&item.product_id);
                let unit_price = Money::from_cents(item.unit_price_cents);
                ReceiptLine {
                    code: cart_line.map(|l| l.code.clone()).unwrap_or_default(),
                    name: cart_line.map(|l| l.name.clone()).unwrap_or_default(),
                    quantity: item.quantity,
                    unit_price,
                    list_price: cart_line.map(|l| l.list_price).unwrap_or(unit_price),
                    campaign: cart_line.and_then(|l| l.campaign.as_ref().map(|c| c.name.clone())),
                    line_total: item.line_total(),
                }
            })
            .collect();

        let campaign_savings = lines
            .iter()
            .map(|l| (l.list_price - l.unit_price).multiply_quantity(l.quantity))
            .sum();

        Receipt {
            sale_id: sale.id.clone(),
            sale_number: sale.sale_number.clone(),
            created_at: sale.created_at,
            seller: seller.to_string(),
            customer_name,
            lines,
            subtotal: Money::from_cents(sale.subtotal_cents),
            campaign_savings,
            discount: Money::from_cents(sale.discount_cents),
            discount_note: cart.discount().and_then(|d| d.note.clone()),
            total: sale.total(),
            payment_method: sale.payment_method,
            amount_received: Money::from_cents(sale.amount_received_cents),
            change: sale.change(),
            note: sale.note.clone(),
        }
    }
}

/// Checks out the session's cart.
///
/// ## Behavior
/// - Committed: returns the receipt and empties the cart.
/// - Rejected or rolled back: returns the error, the cart is untouched so
///   the operator can fix it and try again.
pub async fn checkout(
    db: &Database,
    session: &mut RegisterSession,
    input: CheckoutInput,
) -> Result<Receipt, ApiError> {
    debug!(
        method = %input.method,
        lines = session.cart.line_count(),
        user = %session.actor.username,
        "checkout command"
    );

    let method: PaymentMethod = input
        .method
        .parse()
        .map_err(|e: cardpos_core::UnknownPaymentMethod| ApiError::validation(e.to_string()))?;

    let mut request = CheckoutRequest::new(method);

    if let Some(tendered) = input.tendered.as_deref().filter(|t| !t.trim().is_empty()) {
        let amount: Money = tendered
            .parse()
            .map_err(|e| ApiError::validation(format!("Invalid amount tendered: {}", e)))?;
        request = request.tendered(amount);
    }

    let mut customer_name = None;
    if let Some(document) = input.customer_document.as_deref().filter(|d| !d.trim().is_empty()) {
        let customer = find_customer(db, document).await?;
        customer_name = Some(customer.name.clone());
        request = request.customer(customer.id);
    }

    if let Some(note) = input.note {
        request = request.note(note);
    }

    let committed = db
        .checkout()
        .checkout(&session.cart, &request, &session.actor)
        .await?;

    let receipt = Receipt::new(&committed, &session.cart, &session.actor.username, customer_name);
    session.cart.clear();

    info!(
        sale_number = %receipt.sale_number,
        total = %receipt.total,
        method = %receipt.payment_method,
        "Sale completed"
    );

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, apply_discount, get_cart};
    use crate::commands::test_support::{login_as, shop};
    use crate::error::ErrorCode;
    use cardpos_core::CustomerDraft;

    fn cash(tendered: &str) -> CheckoutInput {
        CheckoutInput {
            tendered: Some(tendered.to_string()),
            ..CheckoutInput::new("cash")
        }
    }

    #[tokio::test]
    async fn test_cash_sale_clears_cart_and_takes_stock() {
        let db = shop(&[("PKM-001", 1500, 10)]).await;
        let mut session = login_as(&db, "seller").await;
        add_to_cart(&db, &mut session, "PKM-001", Some(2)).await.unwrap();

        let receipt = checkout(&db, &mut session, cash("50")).await.unwrap();

        assert_eq!(receipt.total.cents(), 3000);
        assert_eq!(receipt.amount_received.cents(), 5000);
        assert_eq!(receipt.change.cents(), 2000);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].name, "Card PKM-001");
        assert_eq!(receipt.seller, "seller");
        assert!(receipt.sale_number.starts_with('V'));

        assert!(get_cart(&session).lines.is_empty());
        let product = db.products().get_by_code("PKM-001").await.unwrap().unwrap();
        assert_eq!(product.stock, 8);
    }

    #[tokio::test]
    async fn test_short_cash_keeps_cart() {
        let db = shop(&[("PKM-001", 1500, 10)]).await;
        let mut session = login_as(&db, "seller").await;
        add_to_cart(&db, &mut session, "PKM-001", Some(2)).await.unwrap();

        let err = checkout(&db, &mut session, cash("20")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(get_cart(&session).lines.len(), 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_card_sale_with_discount_and_customer() {
        let db = shop(&[("PKM-001", 10_000, 3)]).await;
        db.customers()
            .create(&CustomerDraft {
                document_type: "DNI".to_string(),
                document_number: "45678912".to_string(),
                name: "Ash Ketchum".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut session = login_as(&db, "seller").await;
        add_to_cart(&db, &mut session, "PKM-001", None).await.unwrap();
        apply_discount(&mut session, "10%", Some("Tournament prize".into())).unwrap();

        let receipt = checkout(
            &db,
            &mut session,
            CheckoutInput {
                customer_document: Some("45678912".to_string()),
                ..CheckoutInput::new("card")
            },
        )
        .await
        .unwrap();

        assert_eq!(receipt.discount.cents(), 1000);
        assert_eq!(receipt.total.cents(), 9000);
        assert_eq!(receipt.amount_received.cents(), 9000);
        assert!(receipt.change.is_zero());
        assert_eq!(receipt.customer_name.as_deref(), Some("Ash Ketchum"));
        assert_eq!(receipt.discount_note.as_deref(), Some("Tournament prize"));

        let sale = db.sales().get_by_number(&receipt.sale_number).await.unwrap().unwrap();
        assert!(sale.customer_id.is_some());
    }

    #[tokio::test]
    async fn test_bad_input_rejected_before_checkout() {
        let db = shop(&[("PKM-001", 1500, 10)]).await;
        let mut session = login_as(&db, "seller").await;
        add_to_cart(&db, &mut session, "PKM-001", None).await.unwrap();

        let err = checkout(&db, &mut session, CheckoutInput::new("bitcoin")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = checkout(&db, &mut session, cash("12.345")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let unknown_customer = CheckoutInput {
            customer_document: Some("00000000".to_string()),
            ..CheckoutInput::new("yape")
        };
        let err = checkout(&db, &mut session, unknown_customer).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(get_cart(&session).lines.len(), 1);
    }

    #[tokio::test]
    async fn test_stock_sold_elsewhere_rejects() {
        let db = shop(&[("PKM-001", 1500, 3)]).await;
        let mut first = login_as(&db, "seller").await;
        let mut second = login_as(&db, "admin").await;

        add_to_cart(&db, &mut first, "PKM-001", Some(2)).await.unwrap();
        add_to_cart(&db, &mut second, "PKM-001", Some(2)).await.unwrap();

        checkout(&db, &mut first, CheckoutInput::new("cash")).await.unwrap();
        let err = checkout(&db, &mut second, CheckoutInput::new("cash")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_cart(&second).lines[0].quantity, 2);
        let product = db.products().get_by_code("PKM-001").await.unwrap().unwrap();
        assert_eq!(product.stock, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_cart() {
        let db = shop(&[("PKM-001", 1500, 3)]).await;
        let mut session = login_as(&db, "seller").await;
        add_to_cart(&db, &mut session, "PKM-001", None).await.unwrap();

        fail_item_inserts(&db).await;

        let err = checkout(&db, &mut session, CheckoutInput::new("card")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(get_cart(&session).lines.len(), 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        let product = db.products().get_by_code("PKM-001").await.unwrap().unwrap();
        assert_eq!(product.stock, 3);
    }

    async fn fail_item_inserts(db: &Database) {
        sqlx::query(
            "CREATE TRIGGER fail_sale_items BEFORE INSERT ON sale_items \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();
    }
}
