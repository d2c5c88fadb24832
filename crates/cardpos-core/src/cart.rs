//! # Cart Aggregate
//!
//! The in-memory cart owned by one checkout session.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation                 Effect                      May fail with    │
//! │  ─────────                 ──────                      ─────────────    │
//! │  add_product(p, price, n)  new line, or qty += n       OutOfStock       │
//! │                            (price frozen at add)       InsufficientStock│
//! │                                                        LineQuantityLimit│
//! │                                                        CartTooLarge     │
//! │                                                        AmountOverflow   │
//! │  change_quantity(id, ±d)   clamp to [1, stock]         InsufficientStock│
//! │                            below 1 → no-op             LineQuantityLimit│
//! │                                                        LineNotInCart    │
//! │  remove_line(id)           drop line                   LineNotInCart    │
//! │  apply_manual_discount     store authorized amount     DiscountDenial   │
//! │  clear()                   empty lines + discount      -                │
//! │                                                                         │
//! │  After every mutation:                                                  │
//! │    subtotal = Σ unit_price × qty                                        │
//! │    discount = min(discount, subtotal, role ceiling share of subtotal)   │
//! │    total    = subtotal − discount  ≥ 0                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failed operations leave the cart untouched. Nothing here suspends or
//! touches storage: prices come in already resolved and stock comes in on
//! the `Product` the caller just read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::{AppliedDiscount, DiscountDenial, DiscountPolicy, ManualDiscount};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::ResolvedPrice;
use crate::types::{Actor, CampaignInfo, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
///
/// Price fields are frozen when the line is created. Later catalog or
/// campaign edits do not reprice an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub code: String,
    pub name: String,
    /// Price charged per unit, campaign included.
    pub unit_price: Money,
    /// Catalog price at add time, for the receipt.
    pub list_price: Money,
    pub campaign: Option<CampaignInfo>,
    pub quantity: i64,
    /// Stock seen the last time this product was read.
    pub available_stock: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn new(product: &Product, price: &ResolvedPrice, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price: price.unit_price,
            list_price: price.list_price,
            campaign: price.campaign.clone(),
            quantity,
            available_stock: product.stock,
            added_at: Utc::now(),
        }
    }

    /// unit_price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// What the campaign saved on this line.
    pub fn campaign_savings(&self) -> Money {
        (self.list_price - self.unit_price).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Ordered cart lines plus an optional manual discount.
///
/// ## Invariants
/// - One line per product, in insertion order
/// - 1 ≤ quantity ≤ available_stock on every line
/// - discount ≤ subtotal, so total ≥ 0
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
    discount: Option<AppliedDiscount>,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount: None,
            created_at: Utc::now(),
        }
    }

    /// Adds `quantity` units of `product` at the resolved price.
    ///
    /// ## Behavior
    /// - Product already in the cart: quantity grows, price stays as first
    ///   resolved. Exceeding stock fails and nothing changes.
    /// - Otherwise: a new line at the end.
    ///
    /// ## Returns
    /// The line as it is after the add.
    pub fn add_product(
        &mut self,
        product: &Product,
        price: &ResolvedPrice,
        quantity: i64,
    ) -> CoreResult<&CartLine> {
        validate_quantity(quantity)?;

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

        let index = match self.position(&product.id) {
            Some(index) => {
                let unit_price = self.lines[index].unit_price;
                let requested = self.lines[index].quantity + quantity;
                if requested > MAX_LINE_QUANTITY {
                    return Err(CoreError::LineQuantityLimit {
                        code: product.code.clone(),
                        max: MAX_LINE_QUANTITY,
                        requested,
                    });
                }
                if requested > product.stock {
                    return Err(CoreError::InsufficientStock {
                        code: product.code.clone(),
                        available: product.stock,
                        requested,
                    });
                }
                self.ensure_totals_fit(&product.id, &product.code, unit_price, requested)?;

                let line = &mut self.lines[index];
                line.quantity = requested;
                line.available_stock = product.stock;
                index
            }
            None => {
                if self.lines.len() >= MAX_CART_LINES {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_LINES,
                    });
                }
                if quantity > product.stock {
                    return Err(CoreError::InsufficientStock {
                        code: product.code.clone(),
                        available: product.stock,
                        requested: quantity,
                    });
                }
                self.ensure_totals_fit(&product.id, &product.code, price.unit_price, quantity)?;
                self.lines.push(CartLine::new(product, price, quantity));
                self.lines.len() - 1
            }
        };

        self.reconcile_discount();
        Ok(&self.lines[index])
    }

    /// Moves a line's quantity by `delta`.
    ///
    /// ## Behavior
    /// - Increments clamp to the line's available stock and to
    ///   MAX_LINE_QUANTITY. A line already at either limit fails with
    ///   `LineQuantityLimit` or `InsufficientStock`, naming which.
    /// - A decrement that would drop below 1 leaves the line unchanged;
    ///   use [`Cart::remove_line`] to delete it.
    ///
    /// ## Returns
    /// The line's quantity after the call.
    pub fn change_quantity(&mut self, product_id: &str, delta: i64) -> CoreResult<i64> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))?;
        let line = &self.lines[index];
        let mut quantity = line.quantity;

        if delta > 0 {
            let requested = line.quantity.saturating_add(delta);
            if line.quantity >= MAX_LINE_QUANTITY {
                return Err(CoreError::LineQuantityLimit {
                    code: line.code.clone(),
                    max: MAX_LINE_QUANTITY,
                    requested,
                });
            }
            if line.quantity >= line.available_stock {
                return Err(CoreError::InsufficientStock {
                    code: line.code.clone(),
                    available: line.available_stock,
                    requested,
                });
            }
            quantity = requested.min(line.available_stock).min(MAX_LINE_QUANTITY);
            self.ensure_totals_fit(&line.product_id, &line.code, line.unit_price, quantity)?;
        } else if delta < 0 && line.quantity + delta >= 1 {
            quantity = line.quantity + delta;
        }

        self.lines[index].quantity = quantity;
        self.reconcile_discount();
        Ok(quantity)
    }

    /// Refreshes a line's stock snapshot from a fresh product read.
    ///
    /// If stock dropped below the line quantity, the quantity is lowered to
    /// match. A product that is now out of stock keeps its line; checkout
    /// will reject it until the operator removes it.
    pub fn refresh_stock(&mut self, product: &Product) -> CoreResult<()> {
        let index = self
            .position(&product.id)
            .ok_or_else(|| CoreError::LineNotInCart(product.id.clone()))?;
        let line = &mut self.lines[index];

        line.available_stock = product.stock;
        if product.stock >= 1 && line.quantity > product.stock {
            line.quantity = product.stock;
        }

        self.reconcile_discount();
        Ok(())
    }

    /// Removes a line and returns it.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<CartLine> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))?;
        let removed = self.lines.remove(index);
        self.reconcile_discount();
        Ok(removed)
    }

    /// Applies a cart-level discount after checking it with `policy`.
    ///
    /// A zero discount clears any existing one. On denial the cart is left
    /// exactly as it was.
    pub fn apply_manual_discount(
        &mut self,
        discount: ManualDiscount,
        note: Option<String>,
        actor: &Actor,
        policy: &DiscountPolicy,
    ) -> Result<Money, DiscountDenial> {
        let amount = policy.authorize(&discount, self.subtotal(), actor.role)?;

        self.discount = if amount.is_zero() {
            None
        } else {
            Some(AppliedDiscount {
                request: discount,
                amount,
                note: note.filter(|n| !n.trim().is_empty()),
                applied_by: actor.username.clone(),
                role: actor.role,
                ceiling: policy.seller_ceiling(),
            })
        };

        Ok(amount)
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = None;
        self.created_at = Utc::now();
    }

    /// Re-checks the stored discount against the current subtotal under the
    /// policy and role it was authorized with. It can only shrink; it is
    /// never recomputed from the original percentage.
    fn reconcile_discount(&mut self) {
        let subtotal = self.subtotal();
        if let Some(applied) = self.discount.as_mut() {
            applied.amount = applied.policy().cap(applied.amount, subtotal, applied.role);
            if applied.amount.is_zero() {
                self.discount = None;
            }
        }
    }

    /// Fails with `AmountOverflow` if setting `product_id` to `quantity`
    /// units at `unit_price` would overflow the subtotal.
    fn ensure_totals_fit(
        &self,
        product_id: &str,
        code: &str,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<()> {
        let overflow = || CoreError::AmountOverflow {
            code: code.to_string(),
        };
        let line_total = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(overflow)?;
        self.lines
            .iter()
            .filter(|l| l.product_id != product_id)
            .try_fold(line_total, |acc, l| acc.checked_add(l.line_total()))
            .ok_or_else(overflow)?;
        Ok(())
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }

    // -------------------------------------------------------------------------
    // Read side
    // -------------------------------------------------------------------------

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn discount(&self) -> Option<&AppliedDiscount> {
        self.discount.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn discount_amount(&self) -> Money {
        self.discount
            .as_ref()
            .map(|d| d.amount)
            .unwrap_or_else(Money::zero)
    }

    pub fn total(&self) -> Money {
        self.subtotal() - self.discount_amount()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

/// Totals summary for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            discount: cart.discount_amount(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percentage;
    use crate::types::Role;

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

    fn add(cart: &mut Cart, p: &Product, qty: i64) -> CoreResult<i64> {
        cart.add_product(p, &ResolvedPrice::list(p), qty)
            .map(|line| line.quantity)
    }

    fn seller() -> Actor {
        Actor::new("u-seller", "seller", Role::Seller)
    }

    fn admin() -> Actor {
        Actor::new("u-admin", "admin", Role::Admin)
    }

    fn assert_totals_consistent(cart: &Cart) {
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| l.unit_price.cents() * l.quantity)
            .sum();
        assert_eq!(cart.subtotal().cents(), expected);
        assert_eq!(cart.total(), cart.subtotal() - cart.discount_amount());
        assert!(!cart.total().is_negative());
        assert!(cart.discount_amount() <= cart.subtotal());
    }

    #[test]
    fn test_add_new_and_existing_line() {
        let mut cart = Cart::new();
        let p = product("a", 1500, 5);

        assert_eq!(add(&mut cart, &p, 2).unwrap(), 2);
        assert_eq!(add(&mut cart, &p, 1).unwrap(), 3);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.subtotal().cents(), 4500);
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = Cart::new();
        let a = product("a", 100, 5);
        let b = product("b", 200, 5);
        add(&mut cart, &b, 1).unwrap();
        add(&mut cart, &a, 1).unwrap();
        add(&mut cart, &b, 1).unwrap();

        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::new();
        let err = add(&mut cart, &product("a", 1500, 0), 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_beyond_stock_is_rejected_without_partial_increment() {
        let mut cart = Cart::new();
        let p = product("a", 1500, 3);
        add(&mut cart, &p, 2).unwrap();

        let err = add(&mut cart, &p, 2).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                code: "CODE-a".to_string(),
                available: 3,
                requested: 4,
            }
        );
        assert_eq!(cart.line("a").unwrap().quantity, 2);

        let err = add(&mut Cart::new(), &p, 4).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 4, .. }));
    }

    #[test]
    fn test_add_inactive_product() {
        let mut p = product("a", 1500, 3);
        p.is_active = false;
        let err = add(&mut Cart::new(), &p, 1).unwrap_err();
        assert!(matches!(err, CoreError::ProductInactive { .. }));
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            add(&mut cart, &product(&i.to_string(), 100, 1), 1).unwrap();
        }
        let err = add(&mut cart, &product("overflow", 100, 1), 1).unwrap_err();
        assert_eq!(err, CoreError::CartTooLarge { max: MAX_CART_LINES });
    }

    #[test]
    fn test_price_frozen_at_add() {
        let mut cart = Cart::new();
        let p = product("a", 1500, 5);
        let campaign_price = ResolvedPrice {
            unit_price: Money::from_cents(1275),
            list_price: Money::from_cents(1500),
            campaign: Some(CampaignInfo {
                campaign_id: "c".to_string(),
                name: "Spring".to_string(),
                discount_bps: 1500,
            }),
        };
        cart.add_product(&p, &campaign_price, 1).unwrap();
        cart.add_product(&p, &ResolvedPrice::list(&p), 1).unwrap();

        let line = cart.line("a").unwrap();
        assert_eq!(line.unit_price.cents(), 1275);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.campaign_savings().cents(), 450);
    }

    #[test]
    fn test_change_quantity_clamps_and_rejects_at_stock() {
        let mut cart = Cart::new();
        let p = product("a", 1000, 4);
        add(&mut cart, &p, 1).unwrap();

        assert_eq!(cart.change_quantity("a", 10).unwrap(), 4);
        let err = cart.change_quantity("a", 1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 4, requested: 5, .. }));
        assert_eq!(cart.line("a").unwrap().quantity, 4);
    }

    #[test]
    fn test_change_quantity_below_one_is_noop() {
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 1000, 4), 2).unwrap();

        assert_eq!(cart.change_quantity("a", -1).unwrap(), 1);
        assert_eq!(cart.change_quantity("a", -1).unwrap(), 1);
        assert_eq!(cart.change_quantity("a", -5).unwrap(), 1);
        assert_eq!(cart.line_count(), 1);

        assert!(matches!(
            cart.change_quantity("missing", 1),
            Err(CoreError::LineNotInCart(_))
        ));
    }

    #[test]
    fn test_refresh_stock_lowers_quantity() {
        let mut cart = Cart::new();
        let mut p = product("a", 1000, 5);
        add(&mut cart, &p, 4).unwrap();

        p.stock = 2;
        cart.refresh_stock(&p).unwrap();
        let line = cart.line("a").unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.available_stock, 2);
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 1000, 4), 1).unwrap();
        let removed = cart.remove_line("a").unwrap();
        assert_eq!(removed.product_id, "a");
        assert!(cart.is_empty());
        assert!(cart.remove_line("a").is_err());
    }

    #[test]
    fn test_seller_discount_denied_admin_accepted() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 10_000, 1), 1).unwrap();

        let err = cart
            .apply_manual_discount(ManualDiscount::Percentage(2_500), None, &seller(), &policy)
            .unwrap_err();
        assert!(matches!(err, DiscountDenial::RoleCeilingExceeded { .. }));
        assert!(cart.discount().is_none());
        assert_eq!(cart.total().cents(), 10_000);

        let amount = cart
            .apply_manual_discount(
                ManualDiscount::Percentage(2_500),
                Some("loyal customer".to_string()),
                &admin(),
                &policy,
            )
            .unwrap();
        assert_eq!(amount.cents(), 2_500);
        assert_eq!(cart.total().cents(), 7_500);
        let applied = cart.discount().unwrap();
        assert_eq!(applied.applied_by, "admin");
        assert_eq!(applied.note.as_deref(), Some("loyal customer"));
    }

    #[test]
    fn test_zero_discount_clears_existing() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 10_000, 1), 1).unwrap();
        cart.apply_manual_discount(ManualDiscount::Percentage(1_000), None, &seller(), &policy)
            .unwrap();
        assert_eq!(cart.discount_amount().cents(), 1_000);

        cart.apply_manual_discount(ManualDiscount::Percentage(0), None, &seller(), &policy)
            .unwrap();
        assert!(cart.discount().is_none());
    }

    #[test]
    fn test_discount_capped_when_subtotal_shrinks() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 10_000, 1), 1).unwrap();
        add(&mut cart, &product("b", 500, 1), 1).unwrap();

        cart.apply_manual_discount(
            ManualDiscount::FixedAmount(Money::from_cents(2_000)),
            None,
            &admin(),
            &policy,
        )
        .unwrap();

        cart.remove_line("a").unwrap();
        assert_eq!(cart.subtotal().cents(), 500);
        assert_eq!(cart.discount_amount().cents(), 500);
        assert_eq!(cart.total().cents(), 0);
        assert_totals_consistent(&cart);

        // Growing the cart again does not restore the old amount.
        add(&mut cart, &product("a", 10_000, 1), 1).unwrap();
        assert_eq!(cart.discount_amount().cents(), 500);

        cart.remove_line("a").unwrap();
        cart.remove_line("b").unwrap();
        assert!(cart.discount().is_none());
    }

    #[test]
    fn test_seller_discount_stays_within_ceiling_after_remove() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 8_000, 1), 1).unwrap();
        add(&mut cart, &product("b", 2_000, 1), 1).unwrap();

        cart.apply_manual_discount(
            ManualDiscount::FixedAmount(Money::from_cents(2_000)),
            None,
            &seller(),
            &policy,
        )
        .unwrap();
        assert_eq!(cart.discount_amount().cents(), 2_000);

        // 20.00 on the remaining 20.00 would be 100%; the seller keeps 20%.
        cart.remove_line("a").unwrap();
        assert_eq!(cart.subtotal().cents(), 2_000);
        assert_eq!(cart.discount_amount().cents(), 400);
        assert_eq!(cart.total().cents(), 1_600);
        assert_totals_consistent(&cart);

        let applied = cart.discount().unwrap();
        assert_eq!(applied.role, Role::Seller);
        assert!(policy
            .authorize(
                &ManualDiscount::FixedAmount(applied.amount),
                cart.subtotal(),
                applied.role
            )
            .is_ok());
    }

    #[test]
    fn test_seller_ceiling_taken_from_policy_at_apply_time() {
        let strict = DiscountPolicy::new(Percentage::from_whole(10));
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 5_000, 1), 1).unwrap();
        add(&mut cart, &product("b", 5_000, 1), 1).unwrap();

        cart.apply_manual_discount(ManualDiscount::Percentage(1_000), None, &seller(), &strict)
            .unwrap();
        cart.remove_line("b").unwrap();
        assert_eq!(cart.discount_amount().cents(), 500);
    }

    #[test]
    fn test_quantity_limit_is_reported_as_such() {
        let mut cart = Cart::new();
        let p = product("a", 100, 2_000);
        add(&mut cart, &p, MAX_LINE_QUANTITY).unwrap();

        let err = add(&mut cart, &p, 1).unwrap_err();
        assert_eq!(
            err,
            CoreError::LineQuantityLimit {
                code: "CODE-a".to_string(),
                max: MAX_LINE_QUANTITY,
                requested: MAX_LINE_QUANTITY + 1,
            }
        );

        let err = cart.change_quantity("a", 1).unwrap_err();
        assert!(matches!(err, CoreError::LineQuantityLimit { max: MAX_LINE_QUANTITY, .. }));
        assert_eq!(cart.line("a").unwrap().quantity, MAX_LINE_QUANTITY);

        // Increments clamp at the limit, not at stock.
        let mut cart = Cart::new();
        add(&mut cart, &p, 990).unwrap();
        assert_eq!(cart.change_quantity("a", 50).unwrap(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_overflowing_amounts_are_rejected() {
        let mut cart = Cart::new();
        let huge = product("a", i64::MAX / 2 + 1, 5);

        let err = add(&mut cart, &huge, 2).unwrap_err();
        assert_eq!(err, CoreError::AmountOverflow { code: "CODE-a".to_string() });
        assert!(cart.is_empty());

        add(&mut cart, &huge, 1).unwrap();
        assert!(matches!(
            cart.change_quantity("a", 1),
            Err(CoreError::AmountOverflow { .. })
        ));
        assert_eq!(cart.line("a").unwrap().quantity, 1);

        let err = add(&mut cart, &product("b", i64::MAX / 2 + 1, 5), 1).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_clear() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        add(&mut cart, &product("a", 10_000, 3), 2).unwrap();
        cart.apply_manual_discount(ManualDiscount::Percentage(500), None, &seller(), &policy)
            .unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.totals(), CartTotals {
            line_count: 0,
            total_quantity: 0,
            subtotal: Money::zero(),
            discount: Money::zero(),
            total: Money::zero(),
        });
    }

    #[test]
    fn test_totals_hold_across_mixed_mutations() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        let a = product("a", 1_499, 10);
        let b = product("b", 250, 3);

        add(&mut cart, &a, 2).unwrap();
        assert_totals_consistent(&cart);
        add(&mut cart, &b, 3).unwrap();
        assert_totals_consistent(&cart);
        cart.apply_manual_discount(ManualDiscount::Percentage(1_250), None, &seller(), &policy)
            .unwrap();
        assert_totals_consistent(&cart);
        cart.change_quantity("a", 5).unwrap();
        assert_totals_consistent(&cart);
        let _ = cart.change_quantity("b", 1);
        assert_totals_consistent(&cart);
        cart.change_quantity("a", -6).unwrap();
        assert_totals_consistent(&cart);
        cart.remove_line("b").unwrap();
        assert_totals_consistent(&cart);
    }
}
