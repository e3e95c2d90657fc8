use calories_api::app::build_router;
use calories_api::config::Settings;
use calories_api::db;
use calories_api::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    let default_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let missing = settings.startup_check()?;
    if !missing.is_empty() {
        tracing::warn!(
            "missing configuration: {}; continuing in debug mode, affected features fail on use",
            missing.join(", ")
        );
    }

    tracing::debug!(
        local_database = settings.database.is_local(),
        allowed_hosts = ?settings.allowed_hosts,
        "resolved settings"
    );

    let pool = db::connect(&settings.database).await?;
    db::init_db(&pool).await?;

    let bind_addr = settings.bind;
    let debug_mode = settings.debug;
    let state = AppState::new(pool, settings)?;
    let app = build_router(state);

    tracing::info!(debug = debug_mode, "Calories API listening on {}", bind_addr);
    axum::Server::bind(&bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
