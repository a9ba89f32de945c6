use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{services::account_service::purge_expired_tokens, state::AppState};

/// Periodically delete expired activation, reset and refresh tokens.
pub fn spawn_token_cleanup(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.token_cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match purge_expired_tokens(&state.orm).await {
                Ok((activation, reset, refresh)) => tracing::debug!(
                    activation,
                    reset,
                    refresh,
                    "expired tokens purged"
                ),
                Err(err) => tracing::warn!(error = %err, "expired token cleanup failed"),
            }
        }
    })
}
