//! # Checkout Validation
//!
//! The pure half of the sale transaction: the `Validating` phase and tender
//! settlement. Persistence lives in `cardpos-db::checkout`.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──► Validating ──┬──► Persisting ──┬──► Committed                │
//! │                         │                 │                             │
//! │                         ├──► Rejected     │                             │
//! │                         │  (rule broken,  │                             │
//! │                         │   no writes)    ▼                             │
//! │                         └───────────► RolledBack                        │
//! │                       (storage failed; transaction undone)              │
//! │                                                                         │
//! │   Validating checks:                                                    │
//! │   • cart not empty                                                      │
//! │   • every line qty ≤ CURRENT stock (re-read, not the add-time snapshot) │
//! │   • cash: tendered ≥ total          non-cash: received = total, no change│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};

// =============================================================================
// State
// =============================================================================

/// Phase of a single checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Validating,
    Persisting,
    Committed,
    Rejected,
    RolledBack,
}

impl CheckoutState {
    /// Whether `self → next` is a legal step.
    ///
    /// Validation reads run inside the checkout transaction, so a storage
    /// failure there ends in `RolledBack` just like one while persisting.
    pub fn can_transition_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Persisting)
                | (Validating, Rejected)
                | (Validating, RolledBack)
                | (Persisting, Committed)
                | (Persisting, RolledBack)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckoutState::Committed | CheckoutState::Rejected | CheckoutState::RolledBack
        )
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Validating => "validating",
            CheckoutState::Persisting => "persisting",
            CheckoutState::Committed => "committed",
            CheckoutState::Rejected => "rejected",
            CheckoutState::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Request & Tender
// =============================================================================

/// Payment and metadata supplied by the operator at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    /// Cash handed over. `None` means exact amount.
    /// Ignored for non-cash methods.
    pub amount_tendered: Option<Money>,
    pub customer_id: Option<String>,
    pub note: Option<String>,
}

impl CheckoutRequest {
    pub fn new(payment_method: PaymentMethod) -> Self {
        CheckoutRequest {
            payment_method,
            amount_tendered: None,
            customer_id: None,
            note: None,
        }
    }

    pub fn tendered(mut self, amount: Money) -> Self {
        self.amount_tendered = Some(amount);
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Money received and change due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tender {
    pub amount_received: Money,
    pub change: Money,
}

/// Settles payment of `total` by `method`.
///
/// ## Rules
/// - Cash: tendered must cover the total; change = tendered − total.
/// - Anything else: received is forced to the total, change is zero.
///
/// ```rust
/// use cardpos_core::checkout::settle_tender;
/// use cardpos_core::money::Money;
/// use cardpos_core::types::PaymentMethod;
///
/// let tender = settle_tender(PaymentMethod::Cash, Money::from_cents(3000), Some(Money::from_cents(5000))).unwrap();
/// assert_eq!(tender.change.cents(), 2000);
/// ```
pub fn settle_tender(
    method: PaymentMethod,
    total: Money,
    tendered: Option<Money>,
) -> CoreResult<Tender> {
    if !method.is_cash() {
        return Ok(Tender {
            amount_received: total,
            change: Money::zero(),
        });
    }

    let received = tendered.unwrap_or(total);
    if received < total {
        return Err(CoreError::InsufficientPayment {
            total,
            tendered: received,
        });
    }

    Ok(Tender {
        amount_received: received,
        change: received - total,
    })
}

// =============================================================================
// Plan
// =============================================================================

/// One sale line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlannedLine {
    pub product_id: String,
    pub code: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A validated checkout. Everything the coordinator needs to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutPlan {
    /// In cart order.
    pub lines: Vec<PlannedLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub tender: Tender,
    pub customer_id: Option<String>,
    pub note: Option<String>,
}

/// Runs the `Validating` phase.
///
/// `current` must hold the products of the cart as read *now*. Stock is
/// checked against these, not against the cart's add-time snapshot.
///
/// ## Returns
/// A [`CheckoutPlan`], or the first rule the cart breaks.
pub fn plan_checkout(
    cart: &Cart,
    request: &CheckoutRequest,
    current: &[Product],
) -> CoreResult<CheckoutPlan> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(cart.line_count());
    for line in cart.lines() {
        let product = current
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.code.clone()))?;

        if !product.is_active {
            return Err(CoreError::ProductInactive {
                code: product.code.clone(),
            });
        }
        if product.stock <= 0 {
            return Err(CoreError::OutOfStock {
                code: product.code.clone(),
            });
        }
        if line.quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available: product.stock,
                requested: line.quantity,
            });
        }

        lines.push(PlannedLine {
            product_id: line.product_id.clone(),
            code: line.code.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        });
    }

    let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
    let discount = cart.discount_amount().min(subtotal);
    let total = subtotal - discount;
    let tender = settle_tender(request.payment_method, total, request.amount_tendered)?;

    Ok(CheckoutPlan {
        lines,
        subtotal,
        discount,
        total,
        payment_method: request.payment_method,
        tender,
        customer_id: request
            .customer_id
            .clone()
            .filter(|id| !id.trim().is_empty()),
        note: request.note.clone().filter(|n| !n.trim().is_empty()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{DiscountPolicy, ManualDiscount};
    use crate::pricing::ResolvedPrice;
    use crate::types::{Actor, Role};
    use chrono::Utc;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("CODE-{}", id),
            name: format!("Card {}", id),
            category: None,
            expansion: None,
            language: None,
            rarity: None,
            finish: None,
            price_cents,
            sale_price_cents: None,
            stock,
            min_stock: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart_with(p: &Product, qty: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add_product(p, &ResolvedPrice::list(p), qty).unwrap();
        cart
    }

    #[test]
    fn test_cash_sale_with_change() {
        let p = product("a", 1500, 10);
        let cart = cart_with(&p, 2);
        let request = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(5000));

        let plan = plan_checkout(&cart, &request, &[p]).unwrap();
        assert_eq!(plan.subtotal.cents(), 3000);
        assert_eq!(plan.total.cents(), 3000);
        assert_eq!(plan.tender.amount_received.cents(), 5000);
        assert_eq!(plan.tender.change.cents(), 2000);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].line_total.cents(), 3000);
    }

    #[test]
    fn test_cash_short_is_rejected() {
        let p = product("a", 1500, 10);
        let cart = cart_with(&p, 2);
        let request = CheckoutRequest::new(PaymentMethod::Cash).tendered(Money::from_cents(2999));

        let err = plan_checkout(&cart, &request, &[p]).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientPayment {
                total: Money::from_cents(3000),
                tendered: Money::from_cents(2999),
            }
        );
    }

    #[test]
    fn test_non_cash_forces_exact_amount() {
        let p = product("a", 1500, 10);
        let cart = cart_with(&p, 1);
        for method in [PaymentMethod::Card, PaymentMethod::Yape, PaymentMethod::Plin, PaymentMethod::BankTransfer] {
            let request = CheckoutRequest::new(method).tendered(Money::from_cents(10));
            let plan = plan_checkout(&cart, &request, &[p.clone()]).unwrap();
            assert_eq!(plan.tender.amount_received.cents(), 1500);
            assert!(plan.tender.change.is_zero());
        }
    }

    #[test]
    fn test_cash_without_amount_is_exact() {
        let tender = settle_tender(PaymentMethod::Cash, Money::from_cents(1234), None).unwrap();
        assert_eq!(tender.amount_received.cents(), 1234);
        assert!(tender.change.is_zero());
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = plan_checkout(&Cart::new(), &CheckoutRequest::new(PaymentMethod::Cash), &[])
            .unwrap_err();
        assert_eq!(err, CoreError::EmptyCart);
    }

    #[test]
    fn test_stock_rechecked_against_current_products() {
        let p = product("a", 1500, 5);
        let cart = cart_with(&p, 4);

        let mut edited = p.clone();
        edited.stock = 3;
        let err = plan_checkout(&cart, &CheckoutRequest::new(PaymentMethod::Card), &[edited])
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                code: "CODE-a".to_string(),
                available: 3,
                requested: 4,
            }
        );

        let mut gone = p.clone();
        gone.stock = 0;
        let err = plan_checkout(&cart, &CheckoutRequest::new(PaymentMethod::Card), &[gone])
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));

        let err = plan_checkout(&cart, &CheckoutRequest::new(PaymentMethod::Card), &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(_)));
    }

    #[test]
    fn test_plan_carries_discount_and_metadata() {
        let p = product("a", 10_000, 5);
        let mut cart = cart_with(&p, 1);
        let admin = Actor::new("u1", "admin", Role::Admin);
        cart.apply_manual_discount(
            ManualDiscount::Percentage(2_500),
            None,
            &admin,
            &DiscountPolicy::default(),
        )
        .unwrap();

        let request = CheckoutRequest::new(PaymentMethod::Yape)
            .customer("cust-1")
            .note("  ");
        let plan = plan_checkout(&cart, &request, &[p]).unwrap();
        assert_eq!(plan.discount.cents(), 2_500);
        assert_eq!(plan.total.cents(), 7_500);
        assert_eq!(plan.customer_id.as_deref(), Some("cust-1"));
        assert_eq!(plan.note, None);
    }

    #[test]
    fn test_state_transitions() {
        use CheckoutState::*;
        assert!(Idle.can_transition_to(Validating));
        assert!(Validating.can_transition_to(Rejected));
        assert!(Validating.can_transition_to(Persisting));
        assert!(Persisting.can_transition_to(Committed));
        assert!(Persisting.can_transition_to(RolledBack));
        assert!(Validating.can_transition_to(RolledBack));

        assert!(!Idle.can_transition_to(Persisting));
        assert!(!Validating.can_transition_to(Committed));
        assert!(!Persisting.can_transition_to(Rejected));
        assert!(!Committed.can_transition_to(Persisting));
        assert!(Committed.is_terminal() && Rejected.is_terminal() && RolledBack.is_terminal());
    }
}
