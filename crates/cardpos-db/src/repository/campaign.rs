//! # Discount Campaign Repository
//!
//! Time-boxed percentage campaigns and their product links.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  discount_campaigns             discount_campaign_products              │
//! │  ┌──────────────────────┐       ┌─────────────────────────┐             │
//! │  │ id                   │◄──────│ campaign_id             │             │
//! │  │ discount_bps 1..10000│       │ product_id ─────────────┼──► products │
//! │  │ start_date..end_date │       └─────────────────────────┘             │
//! │  │ is_active            │                                               │
//! │  └──────────────────────┘                                               │
//! │                                                                         │
//! │  A campaign and its links are always written in one transaction.        │
//! │  Deleting a campaign cascades to its links.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cardpos_core::{CampaignDraft, DiscountCampaign};

const CAMPAIGN_COLUMNS: &str = "c.id, c.name, c.discount_bps, c.start_date, c.end_date, \
     c.is_active, c.created_by, c.created_at, c.updated_at";

#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CampaignRepository { pool }
    }

    /// Creates a campaign linked to `product_ids`.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` if a product id (or `created_by`) is unknown;
    /// nothing is written in that case.
    pub async fn create(
        &self,
        draft: &CampaignDraft,
        product_ids: &[String],
        created_by: Option<&str>,
    ) -> DbResult<DiscountCampaign> {
        let now = Utc::now();
        let campaign = DiscountCampaign {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            discount_bps: draft.discount_bps,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_active: draft.is_active,
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        info!(
            id = %campaign.id,
            name = %campaign.name,
            discount_bps = campaign.discount_bps,
            products = product_ids.len(),
            "Creating discount campaign"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO discount_campaigns (
                id, name, discount_bps, start_date, end_date,
                is_active, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.name)
        .bind(campaign.discount_bps)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.is_active)
        .bind(&campaign.created_by)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await?;

        link_products(&mut *tx, &campaign.id, product_ids).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(campaign)
    }

    /// Replaces a campaign's details and its full product set.
    pub async fn update(
        &self,
        id: &str,
        draft: &CampaignDraft,
        product_ids: &[String],
    ) -> DbResult<DiscountCampaign> {
        debug!(id = %id, "Updating discount campaign");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE discount_campaigns SET
                name = ?2,
                discount_bps = ?3,
                start_date = ?4,
                end_date = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.name.trim())
        .bind(draft.discount_bps)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountCampaign", id));
        }

        sqlx::query("DELETE FROM discount_campaign_products WHERE campaign_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        link_products(&mut *tx, id, product_ids).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("DiscountCampaign", id))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiscountCampaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM discount_campaigns c WHERE c.id = ?1");

        let campaign = sqlx::query_as::<_, DiscountCampaign>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(campaign)
    }

    /// All campaigns, newest window first.
    pub async fn list_all(&self) -> DbResult<Vec<DiscountCampaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM discount_campaigns c ORDER BY c.start_date DESC, c.created_at DESC"
        );

        let campaigns = sqlx::query_as::<_, DiscountCampaign>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(campaigns)
    }

    /// Ids of the products linked to a campaign.
    pub async fn products_for(&self, campaign_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM discount_campaign_products WHERE campaign_id = ?1 ORDER BY rowid",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Toggling discount campaign");

        let result = sqlx::query(
            "UPDATE discount_campaigns SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountCampaign", id));
        }

        Ok(())
    }

    /// Removes a campaign and its links. Past sales keep the prices they
    /// were charged.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        info!(id = %id, "Deleting discount campaign");

        let result = sqlx::query("DELETE FROM discount_campaigns WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountCampaign", id));
        }

        Ok(())
    }

    /// Campaigns linked to a product and in effect on `day`.
    ///
    /// Picking among several is left to the pricing rules.
    pub async fn active_for_product(
        &self,
        product_id: &str,
        day: NaiveDate,
    ) -> DbResult<Vec<DiscountCampaign>> {
        let sql = format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS}
            FROM discount_campaigns c
            INNER JOIN discount_campaign_products cp ON cp.campaign_id = c.id
            WHERE cp.product_id = ?1
              AND c.is_active = 1
              AND c.start_date <= ?2
              AND c.end_date >= ?2
            "#
        );

        let campaigns = sqlx::query_as::<_, DiscountCampaign>(&sql)
            .bind(product_id)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;

        Ok(campaigns)
    }
}

async fn link_products(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    product_ids: &[String],
) -> DbResult<()> {
    for product_id in product_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO discount_campaign_products (campaign_id, product_id) VALUES (?1, ?2)",
        )
        .bind(campaign_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::tests::draft;

    pub(crate) fn campaign_draft(name: &str, bps: u32, start: &str, end: &str) -> CampaignDraft {
        CampaignDraft {
            name: name.to_string(),
            discount_bps: bps,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            is_active: true,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let repo = db.campaigns();

        let c = repo
            .create(&campaign_draft("March", 1000, "2025-03-01", "2025-03-31"), &[p.id.clone()], None)
            .await
            .unwrap();

        assert_eq!(repo.products_for(&c.id).await.unwrap(), vec![p.id.clone()]);

        let found = repo.active_for_product(&p.id, day("2025-03-31")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].discount_bps, 1000);
        assert_eq!(found[0].start_date, day("2025-03-01"));

        assert!(repo.active_for_product(&p.id, day("2025-04-01")).await.unwrap().is_empty());

        repo.set_active(&c.id, false).await.unwrap();
        assert!(repo.active_for_product(&p.id, day("2025-03-15")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_campaign() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.campaigns();

        let err = repo
            .create(
                &campaign_draft("Ghost", 500, "2025-03-01", "2025-03-31"),
                &["missing".to_string()],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().insert(&draft("A", 100, 1)).await.unwrap();
        let b = db.products().insert(&draft("B", 100, 1)).await.unwrap();
        let repo = db.campaigns();

        let c = repo
            .create(&campaign_draft("Promo", 1000, "2025-03-01", "2025-03-31"), &[a.id.clone()], None)
            .await
            .unwrap();

        let updated = repo
            .update(&c.id, &campaign_draft("Promo 2", 1500, "2025-03-01", "2025-04-30"), &[b.id.clone()])
            .await
            .unwrap();

        assert_eq!(updated.name, "Promo 2");
        assert_eq!(updated.discount_bps, 1500);
        assert_eq!(repo.products_for(&c.id).await.unwrap(), vec![b.id.clone()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_links() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&draft("A", 100, 1)).await.unwrap();
        let repo = db.campaigns();

        let c = repo
            .create(&campaign_draft("Promo", 1000, "2025-03-01", "2025-03-31"), &[p.id.clone()], None)
            .await
            .unwrap();
        repo.delete(&c.id).await.unwrap();

        assert!(repo.get_by_id(&c.id).await.unwrap().is_none());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discount_campaign_products")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(links, 0);
        assert!(matches!(repo.delete(&c.id).await, Err(DbError::NotFound { .. })));
    }
}
