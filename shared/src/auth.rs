//! Request authentication.
//!
//! The API Gateway authorizer validates the session; here we only pull the
//! claims out of the request context. No claims means no session, which every
//! store operation treats as fatal.

use lambda_http::{Request, RequestExt};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

/// The authenticated caller, as asserted by the gateway authorizer.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Extract the authenticated user from authorizer claims.
pub fn user_from_claims(claims: &Value) -> Result<AuthenticatedUser> {
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Auth("Missing sub claim".to_string()))?;

    let user_id =
        Uuid::parse_str(sub).map_err(|_| Error::Auth("Invalid user id in sub claim".to_string()))?;

    let email = claims
        .get("email")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Auth("Missing email claim".to_string()))?
        .to_string();

    Ok(AuthenticatedUser { user_id, email })
}

/// Extract the authenticated user from an incoming request, failing with an
/// authentication error when no session context is present.
pub fn authenticate(event: &Request) -> Result<AuthenticatedUser> {
    let context = event
        .request_context_ref()
        .ok_or_else(|| Error::Auth("Missing request context".to_string()))?;

    let claims = context
        .authorizer()
        .and_then(|a| a.fields.get("claims"))
        .ok_or_else(|| Error::Auth("Missing authorizer claims".to_string()))?;

    user_from_claims(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_claims() {
        let claims = json!({
            "sub": "0b1f8f5e-3bb1-4e6b-9d94-1b2f7d3c9a10",
            "email": "user@example.com"
        });

        let user = user_from_claims(&claims).unwrap();
        assert_eq!(
            user.user_id,
            Uuid::parse_str("0b1f8f5e-3bb1-4e6b-9d94-1b2f7d3c9a10").unwrap()
        );
        assert_eq!(user.email, "user@example.com");
    }

    #[test]
    fn test_missing_or_invalid_claims_fail_auth() {
        assert!(matches!(
            user_from_claims(&json!({})),
            Err(Error::Auth(_))
        ));
        assert!(matches!(
            user_from_claims(&json!({"sub": "not-a-uuid", "email": "x@y.z"})),
            Err(Error::Auth(_))
        ));
        assert!(matches!(
            user_from_claims(&json!({"sub": "0b1f8f5e-3bb1-4e6b-9d94-1b2f7d3c9a10"})),
            Err(Error::Auth(_))
        ));
    }
}
