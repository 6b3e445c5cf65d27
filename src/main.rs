use taskmaster::{
    application::task_service::{TaskService, TaskServiceImpl},
    config::Config,
    domain::store::TaskStore,
    http::{routes, routing},
    infrastructure::{
        kv::{prepare_sqlite_file, SqliteKeyValue},
        local_identity::LocalIdentityProvider,
        sqlite_store::SqliteTaskStore,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    prepare_sqlite_file(&config.database_url)?;
    let kv = SqliteKeyValue::connect(&config.database_url).await?;
    let store = SqliteTaskStore::new(kv.clone());
    store.init().await?;
    let service = TaskServiceImpl::new(store, LocalIdentityProvider::new(kv));
    match service.restore().await {
        Ok(Some(user)) => tracing::info!(uid = %user.uid, "restored session"),
        Ok(None) => tracing::info!("no remembered user"),
        Err(e) => tracing::warn!(error = %e, "could not restore session"),
    }

    let router = routing::app(routes::router(routes::AppState { service }));

    let addr = config.bind_addr;
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
