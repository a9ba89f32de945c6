mod common;

use cinema_api::{
    dto::accounts::{
        ActivateRequest, ChangePasswordRequest, EmailRequest, LoginRequest, RefreshRequest,
        RegisterRequest, ResetPasswordRequest, TokenPair,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::UserRole,
    security::{ACCESS_TOKEN, decode_token},
    services::account_service,
};

const PASSWORD: &str = "Str0ng!Pass";

async fn login(
    state: &cinema_api::state::AppState,
    email: &str,
    password: &str,
) -> Result<TokenPair, AppError> {
    let resp = account_service::login(
        state,
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        },
    )
    .await?;
    Ok(resp.data.expect("token pair"))
}

#[tokio::test]
async fn register_activate_and_login() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let email = common::unique_email("viewer");

    let registered = account_service::register(
        state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: PASSWORD.into(),
        },
    )
    .await?;
    assert_eq!(registered.message, "Activation email sent");
    let user = registered.data.expect("user");
    assert_eq!(user.email, email);
    assert!(!user.is_active);
    assert_eq!(user.role, UserRole::User);

    // Inactive accounts cannot log in yet.
    assert!(matches!(
        login(state, &email, PASSWORD).await,
        Err(AppError::Forbidden)
    ));

    let token = app.mailer.last_token_for(&email).expect("activation link");
    account_service::activate(state, ActivateRequest { token: token.clone() }).await?;

    // The token is single use.
    assert!(matches!(
        account_service::activate(state, ActivateRequest { token }).await,
        Err(AppError::BadRequest(_))
    ));

    let pair = login(state, &email, PASSWORD).await?;
    assert_eq!(pair.token_type, "bearer");
    let claims = decode_token(&state.config.jwt, &pair.access_token, ACCESS_TOKEN)?;
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.role, "USER");

    assert!(matches!(
        login(state, &email, "Wr0ng!Pass").await,
        Err(AppError::Unauthorized(_))
    ));

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let email = common::unique_email("dup");

    account_service::register(
        &app.state,
        RegisterRequest {
            email: email.clone(),
            password: PASSWORD.into(),
        },
    )
    .await?;

    let again = account_service::register(
        &app.state,
        RegisterRequest {
            email,
            password: PASSWORD.into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(msg)) if msg == "User already exists"));

    Ok(())
}

#[tokio::test]
async fn logout_revokes_only_that_session() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let email = common::unique_email("sessions");

    account_service::register(
        state,
        RegisterRequest {
            email: email.clone(),
            password: PASSWORD.into(),
        },
    )
    .await?;
    let token = app.mailer.last_token_for(&email).expect("activation link");
    account_service::activate(state, ActivateRequest { token }).await?;

    let first = login(state, &email, PASSWORD).await?;
    let second = login(state, &email, PASSWORD).await?;
    assert_ne!(first.refresh_token, second.refresh_token);

    account_service::logout(
        state,
        RefreshRequest {
            refresh_token: first.refresh_token.clone(),
        },
    )
    .await?;

    let revoked = account_service::refresh(
        state,
        RefreshRequest {
            refresh_token: first.refresh_token,
        },
    )
    .await;
    assert!(matches!(revoked, Err(AppError::Unauthorized(_))));

    let rotated = account_service::refresh(
        state,
        RefreshRequest {
            refresh_token: second.refresh_token.clone(),
        },
    )
    .await?
    .data
    .expect("new pair");
    assert_ne!(rotated.refresh_token, second.refresh_token);

    // Rotation revokes the presented token.
    let reused = account_service::refresh(
        state,
        RefreshRequest {
            refresh_token: second.refresh_token,
        },
    )
    .await;
    assert!(matches!(reused, Err(AppError::Unauthorized(_))));

    Ok(())
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let email = common::unique_email("forgetful");

    account_service::register(
        state,
        RegisterRequest {
            email: email.clone(),
            password: PASSWORD.into(),
        },
    )
    .await?;
    let token = app.mailer.last_token_for(&email).expect("activation link");
    account_service::activate(state, ActivateRequest { token }).await?;
    let session = login(state, &email, PASSWORD).await?;

    let known = account_service::forgot_password(
        state,
        EmailRequest {
            email: email.clone(),
        },
    )
    .await?;
    let unknown = account_service::forgot_password(
        state,
        EmailRequest {
            email: common::unique_email("nobody"),
        },
    )
    .await?;
    assert_eq!(known.message, unknown.message);
    assert_eq!(known.data, unknown.data);

    let reset_token = app.mailer.last_token_for(&email).expect("reset link");
    assert!(matches!(
        account_service::reset_password(
            state,
            ResetPasswordRequest {
                email: email.clone(),
                token: "wrong".into(),
                new_password: "N3w!Password".into(),
            },
        )
        .await,
        Err(AppError::BadRequest(_))
    ));

    account_service::reset_password(
        state,
        ResetPasswordRequest {
            email: email.clone(),
            token: reset_token,
            new_password: "N3w!Password".into(),
        },
    )
    .await?;

    // Resetting the password ends existing sessions.
    let stale = account_service::refresh(
        state,
        RefreshRequest {
            refresh_token: session.refresh_token,
        },
    )
    .await;
    assert!(matches!(stale, Err(AppError::Unauthorized(_))));

    assert!(login(state, &email, PASSWORD).await.is_err());
    login(state, &email, "N3w!Password").await?;

    Ok(())
}

#[tokio::test]
async fn change_password_requires_the_old_one() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let email = common::unique_email("changer");

    let user = account_service::register(
        state,
        RegisterRequest {
            email: email.clone(),
            password: PASSWORD.into(),
        },
    )
    .await?
    .data
    .expect("user");
    let token = app.mailer.last_token_for(&email).expect("activation link");
    account_service::activate(state, ActivateRequest { token }).await?;

    let principal = AuthUser {
        user_id: user.id,
        role: UserRole::User,
    };
    let wrong = account_service::change_password(
        state,
        &principal,
        ChangePasswordRequest {
            old_password: "Wr0ng!Pass".into(),
            new_password: "An0ther!Pass".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::BadRequest(_))));

    account_service::change_password(
        state,
        &principal,
        ChangePasswordRequest {
            old_password: PASSWORD.into(),
            new_password: "An0ther!Pass".into(),
        },
    )
    .await?;
    login(state, &email, "An0ther!Pass").await?;

    Ok(())
}

#[tokio::test]
async fn reset_link_round_trips_addresses_with_reserved_characters() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let email = format!("film+buff&co-{}@example.com", uuid::Uuid::new_v4().simple());

    account_service::register(
        state,
        RegisterRequest {
            email: email.clone(),
            password: PASSWORD.into(),
        },
    )
    .await?;
    let token = app.mailer.last_token_for(&email).expect("activation link");
    account_service::activate(state, ActivateRequest { token }).await?;

    account_service::forgot_password(
        state,
        EmailRequest {
            email: email.clone(),
        },
    )
    .await?;
    let link = app.mailer.last_link_for(&email).expect("reset link");
    let parsed = url::Url::parse(&link)?;
    let param = |key: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    assert_eq!(param("email").as_deref(), Some(email.as_str()));
    let reset_token = param("token").expect("token param");

    account_service::reset_password(
        state,
        ResetPasswordRequest {
            email: param("email").expect("email param"),
            token: reset_token,
            new_password: "N3w!Password".into(),
        },
    )
    .await?;
    login(state, &email, "N3w!Password").await?;

    Ok(())
}
