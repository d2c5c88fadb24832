//! # Cart Commands
//!
//! Cart manipulation for the logged-in operator.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Discount │────►│ Checkout │       │
//! │  │  Cart    │     │          │     │ (opt.)   │     │ sale.rs  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                  │             │
//! │                   add_to_cart                        committed          │
//! │                   change_quantity                         │             │
//! │                   remove_from_cart                        ▼             │
//! │                        │                            cart cleared        │
//! │                   clear_cart ──────────────────────► (back to empty)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are addressed by product code, the way the operator types them.

use serde::Serialize;
use tracing::debug;

use super::product::product_by_code;
use crate::error::ApiError;
use crate::session::RegisterSession;
use cardpos_core::{AppliedDiscount, Cart, CartLine, CartTotals, CoreError, ManualDiscount};
use cardpos_db::Database;

/// Cart contents plus totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub discount: Option<AppliedDiscount>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            lines: cart.lines().to_vec(),
            discount: cart.discount().cloned(),
            totals: cart.totals(),
        }
    }
}

/// Gets the current cart contents.
pub fn get_cart(session: &RegisterSession) -> CartResponse {
    debug!("get_cart command");
    CartResponse::from(&session.cart)
}

/// Adds a product to the cart at today's effective price.
///
/// ## Behavior
/// - Already in the cart: quantity grows, the first resolved price stays.
/// - Not in the cart: new line with the price frozen now.
///
/// ## Arguments
/// * `code` - Product code
/// * `quantity` - Units to add (default: 1)
pub async fn add_to_cart(
    db: &Database,
    session: &mut RegisterSession,
    code: &str,
    quantity: Option<i64>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(code = %code, quantity = %quantity, "add_to_cart command");

    let product = product_by_code(db, code).await?;
    let price = db.pricing().resolve_today(&product).await;

    session.cart.add_product(&product, &price, quantity)?;

    Ok(CartResponse::from(&session.cart))
}

/// Moves a line's quantity by `delta`.
///
/// Increments re-read the product first, so the clamp uses current stock
/// rather than the stock seen when the line was added.
pub async fn change_quantity(
    db: &Database,
    session: &mut RegisterSession,
    code: &str,
    delta: i64,
) -> Result<CartResponse, ApiError> {
    debug!(code = %code, delta = %delta, "change_quantity command");

    let product_id = line_for(&session.cart, code)?.product_id.clone();

    if delta > 0 {
        if let Some(product) = db.products().get_by_id(&product_id).await? {
            session.cart.refresh_stock(&product)?;
        }
    }

    session.cart.change_quantity(&product_id, delta)?;

    Ok(CartResponse::from(&session.cart))
}

pub fn remove_from_cart(
    session: &mut RegisterSession,
    code: &str,
) -> Result<CartResponse, ApiError> {
    debug!(code = %code, "remove_from_cart command");

    let product_id = line_for(&session.cart, code)?.product_id.clone();
    session.cart.remove_line(&product_id)?;

    Ok(CartResponse::from(&session.cart))
}

/// Applies a manual discount as typed by the operator.
///
/// ## Arguments
/// * `input` - `"10%"` / `"12.5%"` for a percentage, `"5"` / `"7.50"` for
///   a fixed amount; `"0"` removes the discount
/// * `note` - Optional reason kept with the discount
///
/// A denial leaves the cart unchanged.
pub fn apply_discount(
    session: &mut RegisterSession,
    input: &str,
    note: Option<String>,
) -> Result<CartResponse, ApiError> {
    debug!(input = %input, user = %session.actor.username, "apply_discount command");

    let discount = ManualDiscount::parse(input)
        .map_err(|e| ApiError::validation(format!("Invalid discount: {}", e)))?;

    session
        .cart
        .apply_manual_discount(discount, note, &session.actor, &session.policy)?;

    Ok(CartResponse::from(&session.cart))
}

pub fn clear_cart(session: &mut RegisterSession) -> CartResponse {
    debug!("clear_cart command");
    session.cart.clear();
    CartResponse::from(&session.cart)
}

fn line_for<'a>(cart: &'a Cart, code: &str) -> Result<&'a CartLine, CoreError> {
    let code = code.trim();
    cart.lines()
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
        .ok_or_else(|| CoreError::LineNotInCart(code.to_string()))
}
