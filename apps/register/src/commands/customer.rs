//! # Customer Commands

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use cardpos_core::validation::validate_customer;
use cardpos_core::{Customer, CustomerDraft, Money, Sale};
use cardpos_db::Database;

const RECENT_PURCHASES: u32 = 5;

/// A customer with their most recent purchases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHistory {
    pub customer: Customer,
    /// Newest first.
    pub purchases: Vec<Sale>,
    /// Sum of the listed purchases.
    pub recent_total: Money,
}

/// Registers a customer so later sales can be attached to them.
pub async fn register_customer(db: &Database, draft: CustomerDraft) -> Result<Customer, ApiError> {
    debug!(document = %draft.document_number, "register_customer command");

    validate_customer(&draft)?;
    Ok(db.customers().create(&draft).await?)
}

/// Finds an active customer by document number.
pub async fn find_customer(db: &Database, document: &str) -> Result<Customer, ApiError> {
    debug!(document = %document, "find_customer command");

    db.customers()
        .get_by_document(document)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| ApiError::not_found("Customer", document.trim()))
}

/// Looks a customer up and lists what they bought recently.
pub async fn customer_history(db: &Database, document: &str) -> Result<CustomerHistory, ApiError> {
    let customer = find_customer(db, document).await?;
    let purchases = db
        .sales()
        .list_for_customer(&customer.id, RECENT_PURCHASES)
        .await?;
    let recent_total = purchases.iter().map(Sale::total).sum();

    Ok(CustomerHistory {
        customer,
        purchases,
        recent_total,
    })
}
