#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cinema_api::{
    config::{AppConfig, JwtConfig, StripeConfig, TokenTtlConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{UserGroups, certifications, movies, user_groups, users},
    gateway::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway},
    mailer::Mailer,
    middleware::auth::AuthUser,
    models::UserRole,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Returns a fixed hosted-checkout session, or fails every call when `fail` is set.
#[derive(Default)]
pub struct FakeGateway {
    pub fail: bool,
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let order_id = request.order_id;
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if self.fail {
            return Err(GatewayError::Timeout);
        }
        Ok(CheckoutSession {
            id: format!("cs_test_{}", order_id.simple()),
            url: format!("https://checkout.test/pay/{order_id}"),
        })
    }
}

/// Keeps every link it is asked to send.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    /// Token carried by the most recent link sent to `email`.
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .and_then(|(_, link)| link.split("token=").nth(1))
            .map(|rest| rest.split('&').next().unwrap_or(rest).to_string())
    }

    pub fn last_link_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, link)| link.clone())
    }

    pub fn count_for(&self, email: &str) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(to, _)| to == email)
            .count()
    }

    fn push(&self, email: &str, link: &str) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((email.to_string(), link.to_string()));
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_activation(&self, email: &str, link: &str) -> anyhow::Result<()> {
        self.push(email, link);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> anyhow::Result<()> {
        self.push(email, link);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<CapturingMailer>,
}

pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            None
        }
    }
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        base_url: "http://cinema.test".into(),
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 14,
        },
        tokens: TokenTtlConfig {
            activation_ttl_hours: 24,
            password_reset_ttl_hours: 1,
        },
        stripe: StripeConfig {
            secret_key: "sk_test_unused".into(),
            webhook_secret: WEBHOOK_SECRET.into(),
            api_base: "http://127.0.0.1:9".into(),
            currency: "usd".into(),
            success_url: "http://cinema.test/success".into(),
            cancel_url: "http://cinema.test/cancel".into(),
            timeout_secs: 1,
            webhook_tolerance_secs: 300,
        },
        token_cleanup_interval_secs: 3600,
    }
}

pub async fn setup(database_url: &str, gateway_fails: bool) -> anyhow::Result<TestApp> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    let gateway = Arc::new(FakeGateway {
        fail: gateway_fails,
        ..Default::default()
    });
    let mailer = Arc::new(CapturingMailer::default());
    let state = AppState {
        orm: create_orm_conn(&pool),
        pool,
        config: Arc::new(test_config(database_url)),
        gateway: gateway.clone(),
        mailer: mailer.clone(),
    };

    Ok(TestApp {
        state,
        gateway,
        mailer,
    })
}

/// Addresses are unique per call so tests can share one database.
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// An already activated account with the given role.
pub async fn create_user(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let group = UserGroups::find()
        .filter(user_groups::Column::Name.eq(role.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("group {role} missing"))?;

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(unique_email(&role.as_str().to_lowercase())),
        password_hash: Set("not-a-real-hash".into()),
        is_active: Set(true),
        group_id: Set(group.id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_movie(state: &AppState, price: i64) -> anyhow::Result<movies::Model> {
    let certification = certifications::ActiveModel {
        id: NotSet,
        name: Set(format!("cert-{}", Uuid::new_v4().simple())),
    }
    .insert(&state.orm)
    .await?;

    let movie = movies::ActiveModel {
        id: NotSet,
        uuid: Set(Uuid::new_v4()),
        name: Set(format!("Movie {}", Uuid::new_v4().simple())),
        year: Set(1994),
        time: Set(142),
        imdb: Set(9.3),
        votes: Set(1000),
        meta_score: Set(None),
        gross: Set(None),
        description: Set("Test movie".into()),
        price: Set(price),
        certification_id: Set(certification.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(movie)
}
