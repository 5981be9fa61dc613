//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the metadata store and both buckets

use crate::{
    models::{physical_file::FileId, tier::StorageTier},
    routes::routes::AppState,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// Prefix probed during readiness; nothing is expected to live under it.
const READY_PROBE_PREFIX: &str = ".readyz/";

/// `GET /healthz`
///
/// Very small liveness probe. Always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Looks up a record id that never exists in the metadata store.
/// 2. Lists a tiny prefix in the HOT and COLD buckets.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let manager = &state.manager;

    let metadata = match manager.get_by_id(&FileId::Int(0)).await {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(e),
    };

    let store = manager.object_store();
    let (hot, cold) = tokio::join!(
        store.list_objects(StorageTier::Hot, Some(READY_PROBE_PREFIX)),
        store.list_objects(StorageTier::Cold, Some(READY_PROBE_PREFIX)),
    );
    let hot = hot.map_or_else(CheckStatus::failed, |_| CheckStatus::ok());
    let cold = cold.map_or_else(CheckStatus::failed, |_| CheckStatus::ok());

    let overall_ok = metadata.ok && hot.ok && cold.ok;

    let mut checks = HashMap::new();
    checks.insert("metadata", metadata);
    checks.insert("hot_bucket", hot);
    checks.insert("cold_bucket", cold);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(err: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            error: Some(format!("error: {err}")),
        }
    }
}
