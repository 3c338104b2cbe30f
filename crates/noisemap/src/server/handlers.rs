//! Route handlers. Each one maps store results onto the JSON bodies and
//! status codes clients rely on.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::error::{Error, ValidationError};
use crate::geo::BoundingBox;

use super::form::read_submission;
use super::AppState;

fn bad_request(err: &ValidationError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": err.to_string() })),
    )
        .into_response()
}

/// `POST /new-report`
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected non-multipart report submission: {}", rejection);
            return bad_request(&ValidationError::MalformedForm(rejection.body_text()));
        }
    };

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            warn!("Failed to decode report form: {}", e);
            return bad_request(&e);
        }
    };

    match state.ingestor.submit(submission).await {
        Ok(report) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Noise report saved successfully!",
                "report": report,
            })),
        )
            .into_response(),
        Err(Error::Validation(e)) => bad_request(&e),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "message": "Error saving report",
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}

/// `GET /get-report`
pub async fn list_reports(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_all().await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => {
            error!("Failed to list reports: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching reports" })),
            )
                .into_response()
        }
    }
}

/// `GET /get-user-report/{userId}`
pub async fn list_user_reports(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.store.list_by_user(&user_id).await {
        Ok(reports) => Json(json!({
            "message": "User reports fetched.",
            "count": reports.len(),
            "reports": reports,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to list reports for user {}: {}", user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error" })),
            )
                .into_response()
        }
    }
}

/// `GET /map-data`
pub async fn map_data(State(state): State<Arc<AppState>>) -> Response {
    match state.store.aggregate_by_coordinate().await {
        Ok(clusters) => Json(clusters).into_response(),
        Err(e) => {
            error!("Failed to aggregate map data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Server error" })),
            )
                .into_response()
        }
    }
}

/// Query string of `GET /reports-in-area`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaQuery {
    min_lat: Option<f64>,
    min_lon: Option<f64>,
    max_lat: Option<f64>,
    max_lon: Option<f64>,
}

impl AreaQuery {
    fn bounds(&self) -> Result<BoundingBox, ValidationError> {
        match (self.min_lat, self.min_lon, self.max_lat, self.max_lon) {
            (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) => {
                BoundingBox::new(min_lat, min_lon, max_lat, max_lon)
            }
            _ => Err(ValidationError::InvalidBounds(
                "minLat, minLon, maxLat and maxLon are required".to_string(),
            )),
        }
    }
}

/// `GET /reports-in-area?minLat&minLon&maxLat&maxLon`
pub async fn reports_in_area(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AreaQuery>, axum::extract::rejection::QueryRejection>,
) -> Response {
    let bounds = match query
        .map_err(|e| ValidationError::InvalidBounds(e.body_text()))
        .and_then(|Query(q)| q.bounds())
    {
        Ok(bounds) => bounds,
        Err(e) => return bad_request(&e),
    };

    match state.store.list_within(bounds).await {
        Ok(reports) => Json(json!({
            "message": "Area reports fetched.",
            "count": reports.len(),
            "reports": reports,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to list reports in area: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error" })),
            )
                .into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
