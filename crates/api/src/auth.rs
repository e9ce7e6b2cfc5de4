//! Bearer token authentication.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use storage::{Store, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The caller identified by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
}

impl AuthUser {
    /// Rejects callers acting on another user's resources.
    pub fn ensure_owner(&self, user_id: UserId) -> Result<(), ApiError> {
        if self.id == user_id {
            Ok(())
        } else {
            tracing::warn!(caller = %self.id, target = %user_id, "access to foreign user denied");
            Err(ApiError::unauthorized())
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token and stores the [`AuthUser`] in the request
/// extensions.
pub async fn require_auth<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or_else(ApiError::unauthorized)?;
    let claims = state
        .users
        .authenticate(token)
        .map_err(|_| ApiError::unauthorized())?;
    let id = claims.user_id().map_err(|_| ApiError::unauthorized())?;

    req.extensions_mut().insert(AuthUser {
        id,
        username: claims.username,
    });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn owner_check() {
        let user = AuthUser {
            id: UserId::new(1),
            username: "ada".to_string(),
        };
        assert!(user.ensure_owner(UserId::new(1)).is_ok());
        assert!(matches!(
            user.ensure_owner(UserId::new(2)),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
