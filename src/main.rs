use anyhow::Result;
use dotenvy::dotenv;

use challenge_dashboard::{config::Config, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let addr = config.bind_addr;
    tracing::info!(
        "🔗 Upstream {} | display offset UTC{:+} | numbering {:?}",
        config.upstream_base_url,
        config.display_tz.offset_hours(),
        config.numbering
    );

    let app = routes::app(AppState::new(config));

    tracing::info!("🧠 Dashboard running at {}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
