//! HTTP handlers for single-file operations.
//! Tier and visibility strings are normalized here, once, before anything
//! reaches `FileManager`.

use crate::{
    errors::{AppError, StrataError},
    models::{
        options::{SetTierOptions, SetVisibilityOptions, UploadOptions},
        physical_file::{FileId, PhysicalFile},
    },
    routes::routes::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

/// Query params accepted by `POST /files`.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub tier: Option<String>,
    pub visibility: Option<String>,
    pub filename: Option<String>,
    pub suffix: Option<String>,
    pub hot_duration: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlQuery {
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityReq {
    pub visibility: String,
    pub move_file: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TierReq {
    pub tier: String,
    pub move_file: Option<bool>,
    pub hot_duration: Option<u64>,
}

/// `duration: null` makes the file permanently HOT.
#[derive(Debug, Deserialize)]
pub struct HotDurationReq {
    pub duration: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// Parse an optional case-insensitive enum value from the request.
pub(crate) fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, StrataError>
where
    T: FromStr<Err = StrataError>,
{
    raw.map(str::parse).transpose()
}

/// Fetch the record for a path id or fail with 404.
pub(crate) async fn load_file(state: &AppState, id: &str) -> Result<PhysicalFile, AppError> {
    let id = FileId::parse(id);
    state
        .manager
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("file {id} not found")))
}

/// `POST /files` with the raw object bytes as body.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let options = UploadOptions {
        tier: parse_opt(query.tier.as_deref())?,
        visibility: parse_opt(query.visibility.as_deref())?,
        filename: query.filename,
        path_suffix: query.suffix,
        hot_duration: query.hot_duration,
    };
    let file = state.manager.upload(body, options).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// `GET /files`
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<PhysicalFile>>, AppError> {
    Ok(Json(state.manager.list_files().await?))
}

/// `GET /files/{id}`
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PhysicalFile>, AppError> {
    Ok(Json(load_file(&state, &id).await?))
}

/// `DELETE /files/{id}`
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let file = load_file(&state, &id).await?;
    state.manager.delete(&file).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /files/{id}/url?expires_in=`
pub async fn get_file_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<UrlResponse>, AppError> {
    let file = load_file(&state, &id).await?;
    let url = state
        .manager
        .get_url(&file, query.expires_in.map(Duration::from_secs))
        .await?;
    Ok(Json(UrlResponse { url }))
}

/// `GET /files/{id}/content`
pub async fn get_file_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let file = load_file(&state, &id).await?;
    let bytes = state.manager.download(&file).await?;

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{}\"", file.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `GET /files/{id}/exists`
pub async fn file_exists(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExistsResponse>, AppError> {
    let file = load_file(&state, &id).await?;
    Ok(Json(ExistsResponse {
        exists: state.manager.exists(&file).await,
    }))
}

/// `PUT /files/{id}/visibility`
pub async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VisibilityReq>,
) -> Result<Json<PhysicalFile>, AppError> {
    let file = load_file(&state, &id).await?;
    let options = SetVisibilityOptions {
        visibility: req.visibility.parse()?,
        move_file: req.move_file.unwrap_or(true),
    };
    Ok(Json(state.manager.set_visibility(&file, options).await?))
}

/// `PUT /files/{id}/tier`
pub async fn set_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TierReq>,
) -> Result<Json<PhysicalFile>, AppError> {
    let file = load_file(&state, &id).await?;
    let options = SetTierOptions {
        tier: req.tier.parse()?,
        move_file: req.move_file.unwrap_or(true),
        hot_duration: req.hot_duration,
    };
    Ok(Json(state.manager.set_tier(&file, options).await?))
}

/// `PUT /files/{id}/hot-duration`
pub async fn set_hot_duration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<HotDurationReq>,
) -> Result<Json<PhysicalFile>, AppError> {
    let file = load_file(&state, &id).await?;
    Ok(Json(
        state.manager.set_hot_duration(&file, req.duration).await?,
    ))
}
