use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::UserRole,
    security::{ACCESS_TOKEN, decode_token},
    state::AppState,
};

/// Identity resolved from a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// The one role check every protected route goes through.
pub fn authorize(user: &AuthUser, required: UserRole) -> Result<(), AppError> {
    if !user.role.satisfies(required) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = decode_token(&state.config.jwt, token, ACCESS_TOKEN)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        Ok(AuthUser { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn moderator_routes_admit_moderators_and_admins() {
        assert!(authorize(&principal(UserRole::Moderator), UserRole::Moderator).is_ok());
        assert!(authorize(&principal(UserRole::Admin), UserRole::Moderator).is_ok());
        assert!(matches!(
            authorize(&principal(UserRole::User), UserRole::Moderator),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn admin_routes_reject_moderators() {
        assert!(matches!(
            authorize(&principal(UserRole::Moderator), UserRole::Admin),
            Err(AppError::Forbidden)
        ));
    }
}
