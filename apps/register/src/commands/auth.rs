//! # Login Command

use tracing::debug;

use crate::error::ApiError;
use crate::session::RegisterSession;
use cardpos_core::DiscountPolicy;
use cardpos_db::Database;

/// Authenticates an operator and opens a session with an empty cart.
///
/// Unknown user, wrong password and inactive account all produce the same
/// error.
pub async fn login(
    db: &Database,
    username: &str,
    password: &str,
    policy: DiscountPolicy,
) -> Result<RegisterSession, ApiError> {
    debug!(username = %username.trim(), "login command");

    if username.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let user = db
        .users()
        .authenticate(username, password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    Ok(RegisterSession::for_user(&user, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::shop;
    use crate::error::ErrorCode;
    use cardpos_core::Role;

    #[tokio::test]
    async fn test_login_opens_empty_session() {
        let db = shop(&[]).await;

        let session = login(&db, "admin", "admin", DiscountPolicy::default()).await.unwrap();
        assert_eq!(session.actor.username, "admin");
        assert_eq!(session.actor.role, Role::Admin);
        assert!(session.cart.is_empty());
    }

    #[tokio::test]
    async fn test_bad_credentials_unauthorized() {
        let db = shop(&[]).await;

        let err = login(&db, "seller", "nope", DiscountPolicy::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err = login(&db, " ", "x", DiscountPolicy::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
