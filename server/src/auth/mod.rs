//! Bearer-token authentication.
//!
//! Tokens are issued by the account service. This server only resolves them
//! to a user id and turns the result into a [`Subject`].

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::state::AppState;
use crate::store::StoreResult;
use crate::utils::error::AppError;

/// Resolves opaque bearer tokens to the user they were issued for.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when the token is unknown or expired.
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Uuid>>;
}

/// The caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Anonymous,
    User(Uuid),
}

impl Subject {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Subject::Anonymous => None,
            Subject::User(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Subject::User(_))
    }

    /// True when the subject is the authenticated user `id`.
    pub fn is(&self, id: Uuid) -> bool {
        self.user_id() == Some(id)
    }

    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.user_id().ok_or_else(|| {
            AppError::AuthError("Authentication credentials were not provided.".to_string())
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid authorization header.".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AppError::AuthError("Invalid authorization header.".to_string())),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Subject {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(Subject::Anonymous);
        };

        match state.identity.resolve_token(token).await? {
            Some(user_id) => {
                tracing::debug!(%user_id, "Resolved bearer token");
                Ok(Subject::User(user_id))
            }
            None => Err(AppError::AuthError(
                "Given token not valid for any user.".to_string(),
            )),
        }
    }
}
