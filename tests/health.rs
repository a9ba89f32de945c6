mod common;

use cinema_api::routes::health::probe;

#[tokio::test]
async fn health_probe_reports_database() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;

    let data = probe(&app.state.pool).await;
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");

    Ok(())
}
