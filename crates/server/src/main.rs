use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;

use estate_admin::{
    auth::bootstrap::init_providers,
    config::AppConfig,
    db::{connection, dao::DaoContext},
    logging::init_tracing,
    routes::router,
    services::notification::LogMessageSender,
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_tracing(&cfg.logging);

    let db_cfg = cfg
        .database
        .as_ref()
        .context("database configuration is required (APP_DATABASE__URL)")?;
    let auth_cfg = cfg
        .auth
        .as_ref()
        .context("auth configuration is required (APP_AUTH__JWT_SECRET and friends)")?;

    let db = connection::connect(db_cfg).await?;
    let providers = init_providers(auth_cfg, &DaoContext::new(&db)).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.general.host, cfg.general.port)
        .parse()
        .context("invalid host/port")?;
    let state = AppState::new(cfg, db, providers, Arc::new(LogMessageSender));
    let app = router(state);

    tracing::info!("graphql endpoint on http://{}/graphql", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
