//! # Storage-Backed Price Resolution
//!
//! Feeds the campaigns in effect for a product into
//! [`cardpos_core::pricing::resolve_price`].
//!
//! ## Failure Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(product, day)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  campaigns.active_for_product(product.id, day)                          │
//! │       │                                                                 │
//! │       ├── Ok(campaigns) ──► resolve_price(product, campaigns, day)      │
//! │       │                                                                 │
//! │       └── Err(e) ──► warn!, list price, no campaign                     │
//! │                      (a missed discount never blocks a sale)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::repository::campaign::CampaignRepository;
use cardpos_core::pricing::resolve_price;
use cardpos_core::{Product, ResolvedPrice};

/// Resolves effective unit prices from stored campaigns.
#[derive(Debug, Clone)]
pub struct PriceResolver {
    campaigns: CampaignRepository,
}

impl PriceResolver {
    pub fn new(campaigns: CampaignRepository) -> Self {
        PriceResolver { campaigns }
    }

    /// Effective price of `product` on `day`. Never fails.
    pub async fn resolve(&self, product: &Product, day: NaiveDate) -> ResolvedPrice {
        match self.campaigns.active_for_product(&product.id, day).await {
            Ok(campaigns) => {
                let resolved = resolve_price(product, &campaigns, day);
                debug!(
                    code = %product.code,
                    candidates = campaigns.len(),
                    unit_price = %resolved.unit_price,
                    campaign = ?resolved.campaign.as_ref().map(|c| c.name.as_str()),
                    "Resolved price"
                );
                resolved
            }
            Err(e) => {
                warn!(
                    code = %product.code,
                    error = %e,
                    "Campaign lookup failed, charging list price"
                );
                ResolvedPrice::list(product)
            }
        }
    }

    /// [`resolve`](Self::resolve) for the shop's local calendar date.
    pub async fn resolve_today(&self, product: &Product) -> ResolvedPrice {
        self.resolve(product, Local::now().date_naive()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
