//! Student records server.
//!
//! Run from repo root: `cargo run -p student-records-server`
//! Set `STORAGE=memory` to run without PostgreSQL.

use student_records::{app, apply_migrations, connect, AppState, ServerConfig, StorageKind};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("student_records=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = match config.storage {
        StorageKind::Postgres => {
            let pool = connect(&config).await?;
            apply_migrations(&pool).await?;
            tracing::info!("database connected");
            AppState::postgres(pool, config.environment.is_development())
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage; data is lost at exit");
            AppState::in_memory(config.environment.is_development())
        }
    };
    let pool = state.pool.clone();

    let router = app(state, &config)?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("database connection closed");
    }
    tracing::info!("server stopped");
    Ok(())
}
