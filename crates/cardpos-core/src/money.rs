//! # Money Module
//!
//! Exact monetary and percentage primitives for CardPOS.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │    15.00 × (1 − 0.15) = 12.749999…  ❌  (campaign price off by a cent) │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + basis points                       │
//! │    1500 cents × (10000 − 1500) bps = 12 750 000 → /10000 = 1275 cents  │
//! │    Rounding happens exactly once, explicitly, half-up.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cardpos_core::money::{Money, Percentage};
//!
//! let price: Money = "15.00".parse().unwrap();
//! let campaign = Percentage::from_whole(15);
//!
//! assert_eq!(price.apply_percentage_discount(campaign).cents(), 1275);
//! assert_eq!(price.percentage_of(campaign).to_string(), "2.25");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: u32 = 10_000;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors produced when parsing operator-entered amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a valid decimal number")]
    InvalidNumber(String),

    #[error("'{0}' has more than {1} decimal places")]
    TooPrecise(String, usize),

    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// Parses a decimal string into an integer scaled by `10^scale`.
///
/// Exact: no floating point is involved at any step.
pub(crate) fn parse_scaled(input: &str, scale: usize) -> Result<i64, ParseAmountError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidNumber(raw.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidNumber(raw.to_string()));
    }
    if fraction.len() > scale {
        return Err(ParseAmountError::TooPrecise(raw.to_string(), scale));
    }

    let out_of_range = || ParseAmountError::OutOfRange(raw.to_string());

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| out_of_range())?
    };
    let padded = format!("{:0<width$}", fraction, width = scale);
    let fraction_value: i64 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| out_of_range())?
    };

    let factor = 10_i64.pow(scale as u32);
    let magnitude = whole_value
        .checked_mul(factor)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(out_of_range)?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Integer division rounding half away from zero.
///
/// For the non-negative amounts the register handles this is round-half-up.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the currency's minor unit (céntimos for PEN).
///
/// ## Where Money Flows
/// ```text
/// Product.price_cents ──► PriceResolver ──► CartLine.unit_price ──► line total
///                                                                      │
///         Cart.subtotal ◄──────────────────────────────────────────────┘
///              │
///              ├──► DiscountPolicy::authorize ──► Cart.discount
///              ▼
///         Cart.total ──► settle_tender ──► Sale.total / amount_received / change
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use cardpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).to_string(), "10.99");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64`
    /// bounds. The cart checks with [`Money::checked_multiply_quantity`]
    /// before a line exists, so saturation is never reached there.
    ///
    /// ```rust
    /// use cardpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1500).multiply_quantity(2).cents(), 3000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `None` when `self × qty` does not fit.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` when `self + other` does not fit.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `pct` of this amount, rounded half-up to the minor unit.
    ///
    /// ```rust
    /// use cardpos_core::money::{Money, Percentage};
    ///
    /// // 25% of 100.00
    /// let amount = Money::from_cents(10_000).percentage_of(Percentage::from_whole(25));
    /// assert_eq!(amount.cents(), 2_500);
    ///
    /// // 12.5% of 0.99 = 0.12375 → 0.12
    /// let amount = Money::from_cents(99).percentage_of(Percentage::from_bps(1_250));
    /// assert_eq!(amount.cents(), 12);
    /// ```
    pub fn percentage_of(&self, pct: Percentage) -> Money {
        let scaled = self.0 as i128 * pct.bps() as i128;
        Money::from_cents(div_round_half_up(scaled, BPS_SCALE as i128) as i64)
    }

    /// Applies a percentage discount and returns the discounted price.
    ///
    /// Computed as `price × (1 − pct)` with a single half-up rounding, so
    /// the result is exactly what a campaign charges per unit.
    ///
    /// ```rust
    /// use cardpos_core::money::{Money, Percentage};
    ///
    /// let price = Money::from_cents(10_000);
    /// assert_eq!(price.apply_percentage_discount(Percentage::from_whole(10)).cents(), 9_000);
    ///
    /// // 0.99 at 50% = 0.495 → 0.50
    /// let price = Money::from_cents(99);
    /// assert_eq!(price.apply_percentage_discount(Percentage::from_whole(50)).cents(), 50);
    /// ```
    pub fn apply_percentage_discount(&self, pct: Percentage) -> Money {
        let remaining_bps = BPS_SCALE.saturating_sub(pct.bps());
        let scaled = self.0 as i128 * remaining_bps as i128;
        Money::from_cents(div_round_half_up(scaled, BPS_SCALE as i128) as i64)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl FromStr for Money {
    type Err = ParseAmountError;

    /// Parses `"15"`, `"15.5"`, `"15.50"`, `"-3.25"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, 2).map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// Used for campaign discounts and the manual-discount ceiling.
/// 1500 bps = 15%, 10000 bps = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole number (15 → 15%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True for 0%..=100%.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= BPS_SCALE
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let fraction = self.0 % 100;
        if fraction == 0 {
            write!(f, "{}%", whole)
        } else if fraction % 10 == 0 {
            write!(f, "{}.{}%", whole, fraction / 10)
        } else {
            write!(f, "{}.{:02}%", whole, fraction)
        }
    }
}

impl FromStr for Percentage {
    type Err = ParseAmountError;

    /// Parses `"15"`, `"12.5"`, `"12.5%"`. Negative values are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        let bps = parse_scaled(trimmed, 2)?;
        u32::try_from(bps)
            .map(Percentage)
            .map_err(|_| ParseAmountError::OutOfRange(s.trim().to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
