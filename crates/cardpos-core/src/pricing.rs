//! # Pricing Resolver
//!
//! Computes the unit price a product is charged at when it enters the cart.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_price(product, linked campaigns, today)                        │
//! │                                                                         │
//! │  campaigns ──► keep: is_active && start ≤ today ≤ end                   │
//! │                    │                                                    │
//! │        ┌───────────┼──────────────────────┐                             │
//! │        ▼           ▼                      ▼                             │
//! │      none        one                 several (misconfiguration)         │
//! │        │           │                      │                             │
//! │   list price   price × (1 − p)       pick highest discount_bps,         │
//! │                half-up to cents      then newest created_at,            │
//! │                                      then greatest id                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is pure. Fetching the campaigns, and falling back to the list
//! price when they cannot be read, is done by `cardpos-db`'s `PriceResolver`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CampaignInfo, DiscountCampaign, Product};

/// The outcome of price resolution for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedPrice {
    /// Price actually charged per unit.
    pub unit_price: Money,
    /// Catalog price, kept for the receipt.
    pub list_price: Money,
    /// The campaign that produced `unit_price`, if any.
    pub campaign: Option<CampaignInfo>,
}

impl ResolvedPrice {
    /// The undiscounted price of `product`.
    pub fn list(product: &Product) -> Self {
        ResolvedPrice {
            unit_price: product.price(),
            list_price: product.price(),
            campaign: None,
        }
    }

    #[inline]
    pub fn is_discounted(&self) -> bool {
        self.campaign.is_some()
    }
}

/// Picks the campaign that applies on `day`, if any.
///
/// Deterministic when several match: highest percentage, then the most
/// recently created, then the greatest id.
pub fn select_campaign(campaigns: &[DiscountCampaign], day: NaiveDate) -> Option<&DiscountCampaign> {
    campaigns
        .iter()
        .filter(|c| c.is_in_effect_on(day))
        .max_by(|a, b| {
            a.discount_bps
                .cmp(&b.discount_bps)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Resolves the effective unit price of `product` on `day`.
///
/// `campaigns` should be the campaigns linked to the product; ones not in
/// effect on `day` are ignored.
///
/// ## Example
/// ```rust
/// use cardpos_core::pricing::resolve_price;
/// # use cardpos_core::types::Product;
/// # use chrono::Utc;
/// # let product = Product {
/// #     id: "p1".into(), code: "PKM-001".into(), name: "Pikachu".into(),
/// #     category: None, expansion: None, language: None, rarity: None, finish: None,
/// #     price_cents: 1500, sale_price_cents: None, stock: 3, min_stock: 0,
/// #     is_active: true, created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let price = resolve_price(&product, &[], today);
/// assert_eq!(price.unit_price.cents(), 1500);
/// assert!(!price.is_discounted());
/// ```
pub fn resolve_price(
    product: &Product,
    campaigns: &[DiscountCampaign],
    day: NaiveDate,
) -> ResolvedPrice {
    match select_campaign(campaigns, day) {
        None => ResolvedPrice::list(product),
        Some(campaign) => ResolvedPrice {
            unit_price: product.price().apply_percentage_discount(campaign.percentage()),
            list_price: product.price(),
            campaign: Some(CampaignInfo::from(campaign)),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
