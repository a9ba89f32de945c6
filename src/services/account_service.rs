use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use url::Url;
use uuid::Uuid;

use crate::{
    audit,
    dto::accounts::{
        ActivateRequest, ChangePasswordRequest, EmailRequest, LoginRequest, MeResponse,
        RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair, UpdateProfileRequest,
    },
    entity::{
        ActivationTokens, PasswordResetTokens, RefreshTokens, UserGroups, UserProfiles, Users,
        activation_tokens, password_reset_tokens, refresh_tokens, user_groups, user_profiles,
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{User, UserProfile, UserRole},
    response::{ApiResponse, Meta},
    security::{
        REFRESH_TOKEN, decode_token, generate_opaque_token, hash_password, issue_access_token,
        issue_refresh_token, validate_email, validate_password_complexity, verify_password,
    },
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_RESET: &str = "Invalid email or token";
const RESEND_SENT: &str = "If the account exists and is not active, an activation email has been sent";
const RESET_SENT: &str = "If the account exists, a password reset email has been sent";

pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    validate_password_complexity(&payload.password)?;

    let existing = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let group = group_for(&state.orm, UserRole::User).await?;
    let password_hash = hash_password(&payload.password)?;
    let token = generate_opaque_token();
    let expires_at = Utc::now() + Duration::hours(state.config.tokens.activation_ttl_hours);

    let txn = state.orm.begin().await?;
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        is_active: Set(false),
        group_id: Set(group.id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "User already exists"))?;

    user_profiles::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        first_name: Set(None),
        last_name: Set(None),
        avatar: Set(None),
        gender: Set(None),
        date_of_birth: Set(None),
        info: Set(None),
    }
    .insert(&txn)
    .await?;

    activation_tokens::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token: Set(token.clone()),
        expires_at: Set(expires_at.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    send_activation(state, &email, &token).await;
    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::success(
        "Activation email sent",
        user_from_entity(user, UserRole::User),
        Some(Meta::empty()),
    ))
}

pub async fn activate(
    state: &AppState,
    payload: ActivateRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let record = ActivationTokens::find()
        .filter(activation_tokens::Column::Token.eq(payload.token.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid token".into()))?;

    if record.expires_at.with_timezone(&Utc) <= Utc::now() {
        ActivationTokens::delete_by_id(record.id)
            .exec(&state.orm)
            .await?;
        return Err(AppError::BadRequest("Token expired".into()));
    }

    let txn = state.orm.begin().await?;
    let user = Users::find_by_id(record.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid token".into()))?;
    let mut active: users::ActiveModel = user.into();
    active.is_active = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    ActivationTokens::delete_by_id(record.id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(record.user_id),
        "user_activate",
        "users",
        serde_json::json!({ "user_id": record.user_id }),
    )
    .await;

    Ok(ApiResponse::message("User account activated successfully"))
}

pub async fn resend_activation(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    if let Some(user) = user.filter(|u| !u.is_active) {
        let token = generate_opaque_token();
        let expires_at = Utc::now() + Duration::hours(state.config.tokens.activation_ttl_hours);

        let txn = state.orm.begin().await?;
        ActivationTokens::delete_many()
            .filter(activation_tokens::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        activation_tokens::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            token: Set(token.clone()),
            expires_at: Set(expires_at.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        send_activation(state, &user.email, &token).await;
    }

    Ok(ApiResponse::message(RESEND_SENT))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<TokenPair>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let role = role_of(&state.orm, user.group_id).await?;
    let pair = issue_session(state, &state.orm, user.id, role).await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", pair, Some(Meta::empty())))
}

/// Exchange a stored refresh token for a new pair; the presented token is revoked.
///
/// The stored row is checked before the JWT so that an expired row is swept.
pub async fn refresh(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let stored = RefreshTokens::find()
        .filter(refresh_tokens::Column::Token.eq(payload.refresh_token.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token not found".into()))?;

    if stored.expires_at.with_timezone(&Utc) <= Utc::now() {
        RefreshTokens::delete_by_id(stored.id)
            .exec(&state.orm)
            .await?;
        return Err(AppError::Unauthorized("Refresh token expired".into()));
    }
    decode_token(&state.config.jwt, &payload.refresh_token, REFRESH_TOKEN)?;

    let user = Users::find_by_id(stored.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token not found".into()))?;
    if !user.is_active {
        return Err(AppError::Forbidden);
    }
    let role = role_of(&state.orm, user.group_id).await?;

    let txn = state.orm.begin().await?;
    let revoked = RefreshTokens::delete_by_id(stored.id).exec(&txn).await?;
    // A concurrent refresh already rotated this token.
    if revoked.rows_affected == 0 {
        return Err(AppError::Unauthorized("Refresh token not found".into()));
    }
    let pair = issue_session(state, &txn, user.id, role).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Token refreshed", pair, Some(Meta::empty())))
}

pub async fn logout(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    RefreshTokens::delete_many()
        .filter(refresh_tokens::Column::Token.eq(payload.refresh_token.as_str()))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::message("Logged out"))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !verify_password(&payload.old_password, &account.password_hash)? {
        return Err(AppError::BadRequest("Invalid old password".into()));
    }
    validate_password_complexity(&payload.new_password)?;
    let password_hash = hash_password(&payload.new_password)?;

    let txn = state.orm.begin().await?;
    let mut active: users::ActiveModel = account.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    revoke_sessions(&txn, user.user_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::message("Password changed"))
}

/// Same response whether or not the address belongs to an active account.
pub async fn forgot_password(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    if let Some(user) = user.filter(|u| u.is_active) {
        let token = generate_opaque_token();
        let expires_at =
            Utc::now() + Duration::hours(state.config.tokens.password_reset_ttl_hours);

        let txn = state.orm.begin().await?;
        PasswordResetTokens::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        password_reset_tokens::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            token: Set(token.clone()),
            expires_at: Set(expires_at.into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        let link = account_link(
            &state.config.base_url,
            "accounts/reset-password",
            &[("email", user.email.as_str()), ("token", token.as_str())],
        )?;
        if let Err(err) = state.mailer.send_password_reset(&user.email, &link).await {
            tracing::warn!(error = %err, user_id = %user.id, "password reset email failed");
        }
    }

    Ok(ApiResponse::message(RESET_SENT))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password_complexity(&payload.new_password)?;
    let email = normalize_email(&payload.email);

    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_RESET.into()))?;

    let record = PasswordResetTokens::find()
        .filter(password_reset_tokens::Column::UserId.eq(user.id))
        .one(&state.orm)
        .await?
        .filter(|r| r.token == payload.token)
        .ok_or_else(|| AppError::BadRequest(INVALID_RESET.into()))?;

    if record.expires_at.with_timezone(&Utc) <= Utc::now() {
        PasswordResetTokens::delete_by_id(record.id)
            .exec(&state.orm)
            .await?;
        return Err(AppError::BadRequest(INVALID_RESET.into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    let user_id = user.id;

    let txn = state.orm.begin().await?;
    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    PasswordResetTokens::delete_by_id(record.id).exec(&txn).await?;
    revoke_sessions(&txn, user_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::message("Password reset successfully"))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let role = role_of(&state.orm, account.group_id).await?;
    let profile = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .map(UserProfile::from);

    Ok(ApiResponse::success(
        "OK",
        MeResponse {
            user: user_from_entity(account, role),
            profile,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let existing = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;

    let profile = match existing {
        Some(profile) => {
            let mut active: user_profiles::ActiveModel = profile.into();
            apply_profile_changes(&mut active, payload);
            active.update(&state.orm).await?
        }
        None => {
            let mut active = user_profiles::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                first_name: Set(None),
                last_name: Set(None),
                avatar: Set(None),
                gender: Set(None),
                date_of_birth: Set(None),
                info: Set(None),
            };
            apply_profile_changes(&mut active, payload);
            active.insert(&state.orm).await?
        }
    };

    Ok(ApiResponse::success(
        "Profile updated",
        UserProfile::from(profile),
        Some(Meta::empty()),
    ))
}

fn apply_profile_changes(active: &mut user_profiles::ActiveModel, payload: UpdateProfileRequest) {
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(avatar) = payload.avatar {
        active.avatar = Set(Some(avatar));
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(Some(gender.as_str().to_string()));
    }
    if let Some(date_of_birth) = payload.date_of_birth {
        active.date_of_birth = Set(Some(date_of_birth));
    }
    if let Some(info) = payload.info {
        active.info = Set(Some(info));
    }
}

/// Delete expired activation, password-reset and refresh tokens.
pub async fn purge_expired_tokens<C: ConnectionTrait>(conn: &C) -> AppResult<(u64, u64, u64)> {
    let now = Utc::now();
    let activation = ActivationTokens::delete_many()
        .filter(activation_tokens::Column::ExpiresAt.lte(now))
        .exec(conn)
        .await?
        .rows_affected;
    let reset = PasswordResetTokens::delete_many()
        .filter(password_reset_tokens::Column::ExpiresAt.lte(now))
        .exec(conn)
        .await?
        .rows_affected;
    let refresh = RefreshTokens::delete_many()
        .filter(refresh_tokens::Column::ExpiresAt.lte(now))
        .exec(conn)
        .await?
        .rows_affected;
    Ok((activation, reset, refresh))
}

pub async fn role_of<C: ConnectionTrait>(conn: &C, group_id: i32) -> AppResult<UserRole> {
    let group = UserGroups::find_by_id(group_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user group {group_id} missing")))?;
    group
        .name
        .parse::<UserRole>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

async fn group_for<C: ConnectionTrait>(conn: &C, role: UserRole) -> AppResult<user_groups::Model> {
    UserGroups::find()
        .filter(user_groups::Column::Name.eq(role.as_str()))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user group {role} missing")))
}

async fn issue_session<C: ConnectionTrait>(
    state: &AppState,
    conn: &C,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<TokenPair> {
    let access = issue_access_token(&state.config.jwt, user_id, role)?;
    let (refresh, expires_at) = issue_refresh_token(&state.config.jwt, user_id, role)?;

    refresh_tokens::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        token: Set(refresh.clone()),
        expires_at: Set(expires_at.into()),
    }
    .insert(conn)
    .await?;

    Ok(TokenPair::bearer(access, refresh))
}

async fn revoke_sessions<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<u64> {
    let result = RefreshTokens::delete_many()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn send_activation(state: &AppState, email: &str, token: &str) {
    let link = match account_link(&state.config.base_url, "accounts/activate", &[("token", token)]) {
        Ok(link) => link,
        Err(err) => {
            tracing::warn!(error = %err, to = %email, "activation link could not be built");
            return;
        }
    };
    if let Err(err) = state.mailer.send_activation(email, &link).await {
        tracing::warn!(error = %err, to = %email, "activation email failed");
    }
}

/// Link into the front end with percent-encoded query parameters.
pub fn account_link(base_url: &str, path: &str, params: &[(&str, &str)]) -> AppResult<String> {
    let mut link = Url::parse(&format!("{}/{path}", base_url.trim_end_matches('/')))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid APP_BASE_URL: {e}")))?;
    link.query_pairs_mut().extend_pairs(params);
    Ok(link.into())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_from_entity(model: users::Model, role: UserRole) -> User {
    User {
        id: model.id,
        email: model.email,
        is_active: model.is_active,
        role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::{account_link, normalize_email};

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn reset_link_encodes_email_with_reserved_characters() {
        let link = account_link(
            "http://cinema.test/",
            "accounts/reset-password",
            &[("email", "a+b&c=d@example.com"), ("token", "tok_-123")],
        )
        .unwrap();
        assert!(link.starts_with("http://cinema.test/accounts/reset-password?"));

        let parsed = url::Url::parse(&link).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("email".to_string(), "a+b&c=d@example.com".to_string()),
                ("token".to_string(), "tok_-123".to_string()),
            ]
        );
    }
}
