use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    models::UserRole,
};

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: usize,
    pub exp: usize,
    /// Unique per token so two tokens minted in the same second still differ.
    pub jti: String,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// At least 8 characters with an upper, a lower, a digit and a special character.
pub fn validate_password_complexity(password: &str) -> AppResult<()> {
    let rule = if password.chars().count() < 8 {
        Some("Password must be at least 8 characters long.")
    } else if !password.chars().any(char::is_uppercase) {
        Some("Password must contain at least 1 uppercase letter.")
    } else if !password.chars().any(char::is_lowercase) {
        Some("Password must contain at least 1 lowercase letter.")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least 1 digit.")
    } else if password.chars().all(char::is_alphanumeric) {
        Some("Password must contain at least 1 special character.")
    } else {
        None
    };

    match rule {
        Some(msg) => Err(AppError::BadRequest(msg.to_string())),
        None => Ok(()),
    }
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    Ok(())
}

/// 32 random bytes, URL-safe base64; used for activation and reset links.
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn issue_access_token(config: &JwtConfig, user_id: Uuid, role: UserRole) -> AppResult<String> {
    let expires_at = Utc::now() + Duration::minutes(config.access_ttl_minutes);
    sign(config, user_id, role, ACCESS_TOKEN, expires_at)
}

pub fn issue_refresh_token(
    config: &JwtConfig,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<(String, DateTime<Utc>)> {
    let expires_at = Utc::now() + Duration::days(config.refresh_ttl_days);
    let token = sign(config, user_id, role, REFRESH_TOKEN, expires_at)?;
    Ok((token, expires_at))
}

/// Decode and check the signature, expiry and token type.
pub fn decode_token(config: &JwtConfig, token: &str, expected_type: &str) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.token_type != expected_type {
        return Err(AppError::Unauthorized("Invalid token type".into()));
    }
    Ok(decoded.claims)
}

fn sign(
    config: &JwtConfig,
    user_id: Uuid,
    role: UserRole,
    token_type: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        token_type: token_type.to_string(),
        iat: Utc::now().timestamp() as usize,
        exp: expires_at.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 14,
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original_password() {
        let hash = hash_password("StrongPass123!").unwrap();
        assert!(verify_password("StrongPass123!", &hash).unwrap());
        assert!(!verify_password("StrongPass124!", &hash).unwrap());
    }

    #[test]
    fn weak_passwords_are_rejected_with_the_broken_rule() {
        let cases = [
            ("Sh0rt!", "8 characters"),
            ("lowercase123!", "uppercase"),
            ("UPPERCASE123!", "lowercase"),
            ("NoDigitsHere!", "digit"),
            ("NoSpecial123", "special"),
        ];
        for (password, rule) in cases {
            let err = validate_password_complexity(password).unwrap_err();
            assert!(err.to_string().contains(rule), "{password}: {err}");
        }
        assert!(validate_password_complexity("StrongPass123!").is_ok());
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user example@example.com").is_err());
    }

    #[test]
    fn opaque_tokens_are_unique_and_url_safe() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn access_token_is_not_accepted_as_refresh_token() {
        let config = jwt_config();
        let user_id = Uuid::new_v4();
        let access = issue_access_token(&config, user_id, UserRole::User).unwrap();

        let claims = decode_token(&config, &access, ACCESS_TOKEN).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "USER");
        assert!(decode_token(&config, &access, REFRESH_TOKEN).is_err());
    }

    #[test]
    fn refresh_tokens_minted_back_to_back_differ() {
        let config = jwt_config();
        let user_id = Uuid::new_v4();
        let (first, _) = issue_refresh_token(&config, user_id, UserRole::User).unwrap();
        let (second, _) = issue_refresh_token(&config, user_id, UserRole::User).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let config = jwt_config();
        let other = JwtConfig {
            secret: "other".into(),
            ..jwt_config()
        };
        let token = issue_access_token(&other, Uuid::new_v4(), UserRole::Admin).unwrap();
        assert!(matches!(
            decode_token(&config, &token, ACCESS_TOKEN),
            Err(AppError::Unauthorized(_))
        ));
    }
}
