//! Defines routes for the admin API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **File endpoints**
//!   - `POST   /files` — upload raw body (query: tier, visibility, filename, suffix, hot_duration)
//!   - `GET    /files` — list records
//!   - `GET    /files/{id}` / `DELETE /files/{id}`
//!   - `GET    /files/{id}/url`, `/content`, `/exists`
//!   - `PUT    /files/{id}/visibility`, `/tier`, `/hot-duration`
//!
//! - **Maintenance endpoints**
//!   - `POST   /maintenance/archive` — run the housekeeping sweep
//!   - `GET    /maintenance/objects`, `GET /maintenance/orphans`
//!   - `POST   /maintenance/orphans/delete`, `POST /maintenance/orphans/adopt`

use crate::{
    handlers::{
        file_handlers::{
            delete_file, file_exists, get_file, get_file_content, get_file_url, list_files,
            set_hot_duration, set_tier, set_visibility, upload_file,
        },
        health_handlers::{healthz, readyz},
        maintenance_handlers::{
            adopt_orphans, archive_expired, delete_orphans, list_all_objects, list_orphans,
        },
    },
    services::file_manager::FileManager,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<FileManager>,
}

impl AppState {
    pub fn new(manager: FileManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    /// Fully in-memory state: memory buckets `hot`/`cold` and an in-memory
    /// record arena.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::with_memory_backend().0
    }

    /// Like [`in_memory`](Self::in_memory), also handing back the backend so
    /// tests can seed objects and inject faults.
    #[cfg(test)]
    pub(crate) fn with_memory_backend() -> (Self, crate::services::memory_backend::MemoryBackend) {
        use crate::services::{
            memory_backend::MemoryBackend, metadata::InMemoryMetadataStore,
            object_store::ObjectBackend, tier_config::StrataConfig,
        };

        let backend = MemoryBackend::new();
        let config = StrataConfig::shared("memory.local", "memory", "memory", "hot", "cold");
        let shared = backend.clone();
        let manager = FileManager::new(
            &config,
            Arc::new(InMemoryMetadataStore::new()),
            move |_| Arc::new(shared.clone()) as Arc<dyn ObjectBackend>,
        )
        .expect("shared config resolves both tiers");
        (Self::new(manager), backend)
    }
}

/// Build and return the router for the admin API.
///
/// Upload bodies are capped at `max_body` bytes; `None` lifts axum's default
/// limit so `max_file_size` alone decides.
pub fn routes(max_body: Option<usize>) -> Router<AppState> {
    let body_limit = match max_body {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // File routes
        .route("/files", post(upload_file).get(list_files))
        .route("/files/{id}", get(get_file).delete(delete_file))
        .route("/files/{id}/url", get(get_file_url))
        .route("/files/{id}/content", get(get_file_content))
        .route("/files/{id}/exists", get(file_exists))
        .route("/files/{id}/visibility", put(set_visibility))
        .route("/files/{id}/tier", put(set_tier))
        .route("/files/{id}/hot-duration", put(set_hot_duration))
        // Maintenance routes
        .route("/maintenance/archive", post(archive_expired))
        .route("/maintenance/objects", get(list_all_objects))
        .route("/maintenance/orphans", get(list_orphans))
        .route("/maintenance/orphans/delete", post(delete_orphans))
        .route("/maintenance/orphans/adopt", post(adopt_orphans))
        .layer(body_limit)
}
