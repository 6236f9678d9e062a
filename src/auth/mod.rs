mod password;
mod token;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{users::find_user, AppError, AppState};

pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use token::TokenSigner;

/// The caller, as proven by a valid `Authorization: Bearer` token for a
/// user that still exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, login again".to_owned()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_owned()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, login again".to_owned()))?;

        let id = state
            .tokens
            .verify(token)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_owned()))?;

        // a well signed token can outlive its user, e.g. after a database reset
        let user = find_user(&state.db_pool, &id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found, login again".to_owned()))?;

        Ok(AuthUser { id: user.id })
    }
}
