//! # Product Commands
//!
//! Product lookup for the register, with today's effective price.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  > find charizard                                               │
//! │                                                                 │
//! │  PKM-OBF-125  Charizard ex        Obsidian Flames  x3           │
//! │               S/ 150.00  ──►  S/ 135.00  (Sealed Week)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use cardpos_core::validation::{validate_code, validate_search_query};
use cardpos_core::{CampaignInfo, Money, Product, ResolvedPrice};
use cardpos_db::Database;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// A search hit as shown to the operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub id: String,
    pub code: String,
    pub name: String,
    pub expansion: Option<String>,
    pub rarity: Option<String>,
    pub finish: Option<String>,
    pub stock: i64,
    pub low_stock: bool,
    pub list_price: Money,
    /// What the product would be charged at if added now.
    pub unit_price: Money,
    pub campaign: Option<CampaignInfo>,
}

impl ProductListing {
    fn new(product: Product, price: ResolvedPrice) -> Self {
        ProductListing {
            low_stock: product.is_low_stock(),
            id: product.id,
            code: product.code,
            name: product.name,
            expansion: product.expansion,
            rarity: product.rarity,
            finish: product.finish,
            stock: product.stock,
            list_price: price.list_price,
            unit_price: price.unit_price,
            campaign: price.campaign,
        }
    }
}

/// Searches active products by code, name or expansion.
///
/// ## Arguments
/// * `query` - Substring to look for; empty lists the catalog
/// * `limit` - Maximum results (default: 20, max: 100)
pub async fn search_products(
    db: &Database,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<ProductListing>, ApiError> {
    let query = validate_search_query(query)?;
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    debug!(query = %query, limit = %limit, "search_products command");

    let products = db.products().search(&query, limit).await?;
    let pricing = db.pricing();

    let mut listings = Vec::with_capacity(products.len());
    for product in products {
        let price = pricing.resolve_today(&product).await;
        listings.push(ProductListing::new(product, price));
    }

    info!(count = listings.len(), query = %query, "search_products complete");
    Ok(listings)
}

/// Looks an active or inactive product up by its exact code.
pub(crate) async fn product_by_code(db: &Database, code: &str) -> Result<Product, ApiError> {
    let code = code.trim();
    validate_code(code)?;

    db.products()
        .get_by_code(code)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::shop;
    use crate::error::ErrorCode;
    use cardpos_core::CampaignDraft;
    use chrono::{Days, Local};

    #[tokio::test]
    async fn test_search_shows_campaign_price() {
        let db = shop(&[("PKM-001", 2000, 4), ("PKM-002", 500, 9)]).await;
        let promo = db.products().get_by_code("PKM-001").await.unwrap().unwrap();

        let today = Local::now().date_naive();
        db.campaigns()
            .create(
                &CampaignDraft {
                    name: "Weekend".to_string(),
                    discount_bps: 1500,
                    start_date: today - Days::new(1),
                    end_date: today + Days::new(1),
                    is_active: true,
                },
                &[promo.id.clone()],
                None,
            )
            .await
            .unwrap();

        let hits = search_products(&db, "PKM", None).await.unwrap();
        assert_eq!(hits.len(), 2);

        let discounted = hits.iter().find(|h| h.code == "PKM-001").unwrap();
        assert_eq!(discounted.list_price.cents(), 2000);
        assert_eq!(discounted.unit_price.cents(), 1700);
        assert_eq!(discounted.campaign.as_ref().unwrap().name, "Weekend");

        let plain = hits.iter().find(|h| h.code == "PKM-002").unwrap();
        assert_eq!(plain.unit_price, plain.list_price);
        assert!(plain.campaign.is_none());
    }

    #[tokio::test]
    async fn test_product_by_code() {
        let db = shop(&[("PKM-001", 2000, 4)]).await;

        assert_eq!(product_by_code(&db, " PKM-001 ").await.unwrap().stock, 4);

        let missing = product_by_code(&db, "PKM-404").await.unwrap_err();
        assert_eq!(missing.code, ErrorCode::NotFound);

        let malformed = product_by_code(&db, "two words").await.unwrap_err();
        assert_eq!(malformed.code, ErrorCode::ValidationError);
    }
}
