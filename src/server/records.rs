//! Record endpoints, shared by every record collection.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use treeform_core::{Emitter, Platform, Record};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::auth::RequestContext;
use crate::models::Role;
use crate::records::{Counts, RecordService, UpdateOptions};

/// Window for the `recent` figure of the counts endpoint.
const RECENT_WINDOW_DAYS: i64 = 30;

/// A record type served over HTTP.
pub trait RecordRoutes: Record {
    fn service(state: &AppState) -> &RecordService<Self>;
}

impl RecordRoutes for Emitter {
    fn service(state: &AppState) -> &RecordService<Self> {
        &state.emitters
    }
}

impl RecordRoutes for Platform {
    fn service(state: &AppState) -> &RecordService<Self> {
        &state.platforms
    }
}

/// Routes for one record collection mounted at `prefix`.
pub fn record_routes<R: RecordRoutes>(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(prefix, get(list_records::<R>).post(create_record::<R>))
        .route(&format!("{}/counts", prefix), get(count_records::<R>))
        .route(
            &format!("{}/{{id}}", prefix),
            get(get_record::<R>)
                .put(update_record::<R>)
                .delete(delete_record::<R>),
        )
        .route(
            &format!("{}/{{id}}/updatedby", prefix),
            patch(set_updated_by::<R>),
        )
        .route(
            &format!("{}/{{id}}/updateddate", prefix),
            patch(set_updated_date::<R>),
        )
}

#[derive(Debug, Deserialize)]
pub struct UpdatedByRequest {
    pub updatedby: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdatedDateRequest {
    pub updateddate: DateTime<Utc>,
}

async fn list_records<R: RecordRoutes>(
    State(state): State<AppState>,
) -> Result<Json<Vec<R>>, ApiError> {
    Ok(Json(R::service(&state).list().await?))
}

async fn count_records<R: RecordRoutes>(
    State(state): State<AppState>,
) -> Result<Json<Counts>, ApiError> {
    let counts = R::service(&state)
        .counts(Duration::days(RECENT_WINDOW_DAYS))
        .await?;
    Ok(Json(counts))
}

async fn get_record<R: RecordRoutes>(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let stored = R::service(&state).get(id).await?;

    let mut response = Json(stored.record).into_response();
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", stored.version)) {
        response.headers_mut().insert(header::ETAG, etag);
    }
    Ok(response)
}

async fn create_record<R: RecordRoutes>(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<R>, JsonRejection>,
) -> Result<(StatusCode, Json<R>), ApiError> {
    ctx.require(Role::Write)?;
    let Json(record) = payload?;

    let created = R::service(&state).create(&ctx, record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_record<R: RecordRoutes>(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<Option<R>>, JsonRejection>,
) -> Result<Json<R>, ApiError> {
    ctx.require(Role::Write)?;
    let Path(id) = id?;
    let options = UpdateOptions {
        expected_version: expected_version(&headers)?,
    };
    let Json(incoming) = payload?;

    let updated = R::service(&state)
        .update(&ctx, id, incoming, options)
        .await?;
    Ok(Json(updated))
}

async fn delete_record<R: RecordRoutes>(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Role::Write)?;
    let Path(id) = id?;

    R::service(&state).delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_updated_by<R: RecordRoutes>(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatedByRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Role::Write)?;
    let Path(id) = id?;
    let Json(request) = payload?;

    R::service(&state)
        .set_updated_by(&ctx, id, request.updatedby)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_updated_date<R: RecordRoutes>(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatedDateRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Role::Write)?;
    let Path(id) = id?;
    let Json(request) = payload?;

    R::service(&state)
        .set_updated_date(&ctx, id, request.updateddate)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parses an `If-Match` header holding a document version, quoted or not.
fn expected_version(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let invalid = || ApiError::BadRequest("If-Match must be a document version".to_string());
    let text = value.to_str().map_err(|_| invalid())?.trim();
    let text = text.strip_prefix("W/").unwrap_or(text).trim_matches('"');
    text.parse().map(Some).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_version_forms() {
        let mut headers = HeaderMap::new();
        assert_eq!(expected_version(&headers).unwrap(), None);

        headers.insert(header::IF_MATCH, HeaderValue::from_static("3"));
        assert_eq!(expected_version(&headers).unwrap(), Some(3));

        headers.insert(header::IF_MATCH, HeaderValue::from_static("\"7\""));
        assert_eq!(expected_version(&headers).unwrap(), Some(7));

        headers.insert(header::IF_MATCH, HeaderValue::from_static("W/\"2\""));
        assert_eq!(expected_version(&headers).unwrap(), Some(2));

        headers.insert(header::IF_MATCH, HeaderValue::from_static("*"));
        assert!(expected_version(&headers).is_err());
    }
}
