//! # Discount Authorization Policy
//!
//! Decides whether an operator may apply a cart-level manual discount.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authorize(discount, subtotal, role)                                    │
//! │                                                                         │
//! │  value == 0 ───────────────────────────────► Ok(0)  (clears discount)   │
//! │       │                                                                 │
//! │  value < 0 ────────────────────────────────► NegativeValue              │
//! │       │                                                                 │
//! │  amount > subtotal (or pct > 100) ─────────► ExceedsSubtotal            │
//! │       │                                                                 │
//! │  role != ADMIN and ratio > ceiling ────────► RoleCeilingExceeded        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(amount)                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ceiling applies to the *effective* ratio `amount / subtotal`, so a
//! fixed amount of 25.00 on a 100.00 subtotal is treated exactly like 25%.
//! Fixed amounts are compared with integer cross-multiplication
//! (`amount × 10000 > subtotal × ceiling_bps`), never via a rounded ratio.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

use crate::money::{parse_scaled, Money, ParseAmountError, Percentage, BPS_SCALE};
use crate::types::Role;
use crate::DEFAULT_SELLER_DISCOUNT_CEILING_BPS;

// =============================================================================
// Request
// =============================================================================

/// A manual discount as entered by the operator.
///
/// Values are signed so that a negative entry reaches the policy and is
/// denied with a reason instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ManualDiscount {
    /// Percentage of the subtotal in basis points (1250 = 12.5%).
    Percentage(i64),
    /// Absolute amount off the subtotal.
    FixedAmount(Money),
}

impl ManualDiscount {
    /// Parses operator input: `"10%"` / `"12.5%"` is a percentage,
    /// anything else is a fixed amount (`"5"`, `"7.50"`).
    ///
    /// ```rust
    /// use cardpos_core::discount::ManualDiscount;
    /// use cardpos_core::money::Money;
    ///
    /// assert_eq!(ManualDiscount::parse("12.5%").unwrap(), ManualDiscount::Percentage(1250));
    /// assert_eq!(
    ///     ManualDiscount::parse("7.50").unwrap(),
    ///     ManualDiscount::FixedAmount(Money::from_cents(750))
    /// );
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseAmountError> {
        let trimmed = input.trim();
        match trimmed.strip_suffix('%') {
            Some(pct) => parse_scaled(pct, 2).map(ManualDiscount::Percentage),
            None => trimmed.parse::<Money>().map(ManualDiscount::FixedAmount),
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        match self {
            ManualDiscount::Percentage(bps) => *bps == 0,
            ManualDiscount::FixedAmount(amount) => amount.is_zero(),
        }
    }
}

impl fmt::Display for ManualDiscount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManualDiscount::Percentage(bps) if *bps >= 0 => {
                write!(f, "{}", Percentage::from_bps(*bps as u32))
            }
            ManualDiscount::Percentage(bps) => write!(f, "{}%", Money::from_cents(*bps)),
            ManualDiscount::FixedAmount(amount) => write!(f, "{}", amount),
        }
    }
}

// =============================================================================
// Denial
// =============================================================================

/// Why a manual discount was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountDenial {
    #[error("discount cannot be negative")]
    NegativeValue,

    #[error("discount {amount} exceeds subtotal {subtotal}")]
    ExceedsSubtotal { amount: Money, subtotal: Money },

    /// Effective ratio above the ceiling for a non-admin operator.
    #[error("discount of {requested} exceeds the {ceiling} limit for {role}")]
    RoleCeilingExceeded {
        requested: Percentage,
        ceiling: Percentage,
        role: Role,
    },
}

// =============================================================================
// Policy
// =============================================================================

/// The manual-discount rules for a shop.
///
/// ## Example
/// ```rust
/// use cardpos_core::discount::{DiscountPolicy, ManualDiscount};
/// use cardpos_core::money::Money;
/// use cardpos_core::types::Role;
///
/// let policy = DiscountPolicy::default(); // sellers capped at 20%
/// let subtotal = Money::from_cents(10_000);
///
/// assert!(policy.authorize(&ManualDiscount::Percentage(2500), subtotal, Role::Seller).is_err());
/// assert_eq!(
///     policy.authorize(&ManualDiscount::Percentage(2500), subtotal, Role::Admin).unwrap(),
///     Money::from_cents(2_500)
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    seller_ceiling: Percentage,
}

impl DiscountPolicy {
    pub fn new(seller_ceiling: Percentage) -> Self {
        DiscountPolicy { seller_ceiling }
    }

    /// Highest effective discount a non-admin may grant.
    #[inline]
    pub fn seller_ceiling(&self) -> Percentage {
        self.seller_ceiling
    }

    /// Validates `discount` against `subtotal` for `role`.
    ///
    /// ## Returns
    /// The discount amount in money on success. A zero request always
    /// succeeds with zero.
    pub fn authorize(
        &self,
        discount: &ManualDiscount,
        subtotal: Money,
        role: Role,
    ) -> Result<Money, DiscountDenial> {
        if discount.is_zero() {
            return Ok(Money::zero());
        }

        match *discount {
            ManualDiscount::Percentage(bps) => self.authorize_percentage(bps, subtotal, role),
            ManualDiscount::FixedAmount(amount) => self.authorize_fixed(amount, subtotal, role),
        }
    }

    fn authorize_percentage(
        &self,
        bps: i64,
        subtotal: Money,
        role: Role,
    ) -> Result<Money, DiscountDenial> {
        if bps < 0 {
            return Err(DiscountDenial::NegativeValue);
        }
        if bps > BPS_SCALE as i64 {
            let scaled = subtotal.cents() as i128 * bps as i128;
            let amount = Money::from_cents(((scaled + 5_000) / BPS_SCALE as i128) as i64);
            return Err(DiscountDenial::ExceedsSubtotal { amount, subtotal });
        }

        let requested = Percentage::from_bps(bps as u32);
        if role != Role::Admin && requested > self.seller_ceiling {
            return Err(DiscountDenial::RoleCeilingExceeded {
                requested,
                ceiling: self.seller_ceiling,
                role,
            });
        }

        Ok(subtotal.percentage_of(requested))
    }

    fn authorize_fixed(
        &self,
        amount: Money,
        subtotal: Money,
        role: Role,
    ) -> Result<Money, DiscountDenial> {
        if amount.is_negative() {
            return Err(DiscountDenial::NegativeValue);
        }
        if amount > subtotal {
            return Err(DiscountDenial::ExceedsSubtotal { amount, subtotal });
        }

        let lhs = amount.cents() as i128 * BPS_SCALE as i128;
        let rhs = subtotal.cents() as i128 * self.seller_ceiling.bps() as i128;
        if role != Role::Admin && lhs > rhs {
            return Err(DiscountDenial::RoleCeilingExceeded {
                requested: effective_ratio(amount, subtotal),
                ceiling: self.seller_ceiling,
                role,
            });
        }

        Ok(amount)
    }

    /// Re-checks a stored discount `amount` against a changed `subtotal`.
    ///
    /// The result never exceeds the subtotal, and for non-admins never
    /// exceeds what entering the ceiling as a percentage would give.
    /// An amount already within both is returned unchanged.
    pub fn cap(&self, amount: Money, subtotal: Money, role: Role) -> Money {
        let mut capped = amount.min(subtotal);
        if role != Role::Admin {
            capped = capped.min(subtotal.percentage_of(self.seller_ceiling));
        }
        if capped.is_negative() {
            Money::zero()
        } else {
            capped
        }
    }
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        DiscountPolicy::new(Percentage::from_bps(DEFAULT_SELLER_DISCOUNT_CEILING_BPS))
    }
}

/// `amount / subtotal` in basis points, half-up. Display only.
fn effective_ratio(amount: Money, subtotal: Money) -> Percentage {
    if subtotal.cents() <= 0 {
        return Percentage::from_bps(BPS_SCALE);
    }
    let scaled = amount.cents() as i128 * BPS_SCALE as i128;
    let denominator = subtotal.cents() as i128;
    let bps = (scaled + denominator / 2) / denominator;
    Percentage::from_bps(bps.clamp(0, u32::MAX as i128) as u32)
}

// =============================================================================
// Applied Discount
// =============================================================================

/// A discount that passed authorization and now sits on the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedDiscount {
    /// What the operator entered.
    pub request: ManualDiscount,
    /// Amount taken off the subtotal. Always ≤ subtotal.
    pub amount: Money,
    pub note: Option<String>,
    /// Username of the operator who applied it.
    pub applied_by: String,
    /// Role the discount was authorized for.
    pub role: Role,
    /// Seller ceiling in force when it was applied.
    pub ceiling: Percentage,
}

impl AppliedDiscount {
    /// The policy this discount was authorized under.
    #[inline]
    pub fn policy(&self) -> DiscountPolicy {
        DiscountPolicy::new(self.ceiling)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
