use anyhow::{Context, Result};
use axum::Router;
use s3strata::{
    config::AppConfig,
    routes::routes::{AppState, routes},
    services::{
        file_manager::FileManager, memory_backend::MemoryBackend, object_store::ObjectBackend,
        s3_backend::S3Backend, sqlite_metadata::SqliteMetadataStore,
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        database_url = %cfg.database_url,
        in_memory = cfg.in_memory,
        housekeeping_interval = ?cfg.housekeeping_interval,
        "Starting s3strata"
    );

    // --- Initialize SQLite connection ---
    let metadata = SqliteMetadataStore::new(Arc::new(connect_sqlite(&cfg.database_url).await?));

    // --- Handle migration mode ---
    if migrate {
        metadata.migrate().await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize object backends + file manager ---
    let memory = cfg.in_memory.then(MemoryBackend::new);
    let manager = FileManager::new(&cfg.strata, Arc::new(metadata), move |tier| match &memory {
        Some(backend) => Arc::new(backend.clone()) as Arc<dyn ObjectBackend>,
        None => Arc::new(S3Backend::new(tier)),
    })
    .context("resolving tier configuration")?;
    let state = AppState::new(manager);

    // --- Housekeeping loop ---
    let shutdown = CancellationToken::new();
    let housekeeping = cfg.housekeeping_interval.map(|period| {
        tokio::spawn(run_housekeeping(state.clone(), period, shutdown.clone()))
    });

    // --- Build router ---
    let max_body = state
        .manager
        .advanced()
        .max_file_size
        .and_then(|max| usize::try_from(max).ok());
    let app: Router = routes(max_body).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("Could not listen for Ctrl-C: {}", err);
            }
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(task) = housekeeping {
        task.await?;
    }
    tracing::info!("Shut down cleanly");

    Ok(())
}

/// Open the metadata database, creating the file and its directory if needed.
async fn connect_sqlite(db_url: &str) -> Result<sqlx::SqlitePool> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let in_memory = db_url.contains(":memory:");
    if !in_memory {
        let db_path = db_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .trim_start_matches("file:");
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty())
        {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database URL `{db_url}`"))?
        .create_if_missing(true);

    // Every connection to `:memory:` is a separate database.
    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run the archival sweep every `period` until `shutdown` fires.
async fn run_housekeeping(state: AppState, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match state
            .manager
            .archive_expired_hot_files_until(&shutdown)
            .await
        {
            Ok(result) if result.failed > 0 => tracing::warn!(
                archived = result.archived,
                failed = result.failed,
                "Housekeeping sweep finished with failures"
            ),
            Ok(result) => tracing::debug!(archived = result.archived, "Housekeeping sweep done"),
            Err(err) => tracing::error!(error = %err, "Housekeeping sweep failed"),
        }
    }
    tracing::info!("Housekeeping loop stopped");
}
