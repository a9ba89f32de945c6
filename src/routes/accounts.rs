use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::{
    dto::accounts::{
        ActivateRequest, ChangePasswordRequest, EmailRequest, LoginRequest, MeResponse,
        RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair, UpdateProfileRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{User, UserProfile},
    response::ApiResponse,
    services::account_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/activate", post(activate))
        .route("/resend-activation", post(resend_activation))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/password-reset/request", post(forgot_password))
        .route("/password-reset/complete", post(reset_password))
        .route("/me", get(me))
        .route("/me/profile", patch(update_profile))
}

#[utoipa::path(
    post,
    path = "/api/accounts/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Inactive account created, activation email sent", body = ApiResponse<User>),
        (status = 400, description = "Invalid email or weak password"),
        (status = 409, description = "User already exists")
    ),
    tag = "Accounts"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = account_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/accounts/activate",
    request_body = ActivateRequest,
    responses(
        (status = 200, description = "Account activated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "Accounts"
)]
pub async fn activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivateRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::activate(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/resend-activation",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Same answer for every address", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Accounts"
)]
pub async fn resend_activation(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::resend_activation(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account not activated")
    ),
    tag = "Accounts"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = account_service::login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Unknown, revoked or expired refresh token")
    ),
    tag = "Accounts"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = account_service::refresh(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/logout",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token revoked", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Accounts"
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::logout(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed, sessions revoked", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Wrong old password or weak new password")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/password-reset/request",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Same answer for every address", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Accounts"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/accounts/password-reset/complete",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid email or token")
    ),
    tag = "Accounts"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/accounts/me",
    responses(
        (status = 200, description = "Current user and profile", body = ApiResponse<MeResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let resp = account_service::me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/accounts/me/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserProfile>)
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = account_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}
