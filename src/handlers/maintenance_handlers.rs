//! Housekeeping and reconciliation endpoints.
//!
//! Batch endpoints always answer 200 with a structured result once the
//! listing succeeded; per-item failures are reported inside the body.

use crate::{
    errors::AppError,
    handlers::file_handlers::parse_opt,
    models::{
        object::{AllBucketObjects, OrphanObject},
        options::{
            AdoptOrphanOptions, AdoptOrphanResult, ArchiveResult, DeleteOrphanOptions,
            DeleteOrphanResult,
        },
    },
    routes::routes::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize)]
pub struct PrefixQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteOrphansReq {
    pub prefix: Option<String>,
    pub tier: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdoptOrphansReq {
    pub prefix: Option<String>,
    pub tier: Option<String>,
    #[serde(default)]
    pub set_hot_until: bool,
    pub hot_duration: Option<u64>,
}

/// `POST /maintenance/archive`: run one housekeeping sweep now.
pub async fn archive_expired(
    State(state): State<AppState>,
) -> Result<Json<ArchiveResult>, AppError> {
    let result = state
        .manager
        .archive_expired_hot_files_until(&CancellationToken::new())
        .await?;
    Ok(Json(result))
}

/// `GET /maintenance/objects?prefix=`
pub async fn list_all_objects(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<AllBucketObjects>, AppError> {
    Ok(Json(
        state
            .manager
            .list_all_objects(query.prefix.as_deref())
            .await?,
    ))
}

/// `GET /maintenance/orphans?prefix=`
pub async fn list_orphans(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<Vec<OrphanObject>>, AppError> {
    Ok(Json(
        state
            .manager
            .list_orphan_objects(query.prefix.as_deref())
            .await?,
    ))
}

/// `POST /maintenance/orphans/delete`
pub async fn delete_orphans(
    State(state): State<AppState>,
    Json(req): Json<DeleteOrphansReq>,
) -> Result<Json<DeleteOrphanResult>, AppError> {
    let options = DeleteOrphanOptions {
        tier: parse_opt(req.tier.as_deref())?,
        prefix: req.prefix,
        dry_run: req.dry_run,
    };
    Ok(Json(state.manager.delete_orphan_objects(options).await?))
}

/// `POST /maintenance/orphans/adopt`: filenames default to the last key
/// segment.
pub async fn adopt_orphans(
    State(state): State<AppState>,
    Json(req): Json<AdoptOrphansReq>,
) -> Result<Json<AdoptOrphanResult>, AppError> {
    let options = AdoptOrphanOptions {
        tier: parse_opt(req.tier.as_deref())?,
        prefix: req.prefix,
        extract_filename: None,
        set_hot_until: req.set_hot_until,
        hot_duration: req.hot_duration,
    };
    Ok(Json(state.manager.adopt_orphan_objects(options).await?))
}
