use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up; database reachability is reported separately", body = ApiResponse<HealthData>),
    ),
    security(()),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::success(
        "Health check",
        probe(&state.pool).await,
        Some(Meta::empty()),
    ))
}

pub async fn probe(pool: &DbPool) -> HealthData {
    let database = match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => "up",
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach the database");
            "down"
        }
    };

    HealthData {
        status: "ok".to_string(),
        database: database.to_string(),
    }
}
