//! HTTP API
//!
//! ```text
//! GET  /api/timeseries/{name}?start=<int>&end=<int>   newest-first page of points
//! POST /api/timeseries/{name}                        append a JSON object
//! ```
//!
//! Engine calls are synchronous and run on tokio's blocking pool.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::error::Error;
use crate::timeseries::{Record, TimeSeries};

/// Response header carrying the version assigned by a POST
pub const VERSION_HEADER: &str = "x-geots-timeseries-time";

// ============================================================================
// State
// ============================================================================

/// Shared state of the API handlers
#[derive(Clone)]
pub struct ApiState {
    series: Arc<dyn TimeSeries>,
    page_size: usize,
}

impl ApiState {
    pub fn new(series: Arc<dyn TimeSeries>, page_size: usize) -> Self {
        Self {
            series,
            page_size: page_size.max(1),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the router with CORS, request tracing and the `Server` header
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/timeseries/{name}",
            get(get_data_points).post(put_data_point),
        )
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("geots"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(listener: tokio::net::TcpListener, state: ApiState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HTTP API listening on http://{addr}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
struct DataPointsResponse {
    timeseries: SeriesInfo,
    data: Vec<DataPoint>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct SeriesInfo {
    name: String,
}

#[derive(Serialize)]
struct DataPoint {
    time: i64,
    data: serde_json::Value,
}

#[derive(Serialize)]
struct Pagination {
    cursor: i64,
    has_more: bool,
}

#[derive(Deserialize)]
struct RangeParams {
    start: Option<i64>,
    end: Option<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_data_points(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<DataPointsResponse>, ApiError> {
    let Query(params) = params?;
    let page_size = state.page_size;
    let series = Arc::clone(&state.series);
    let key = name.clone().into_bytes();

    // One extra record tells whether another page exists
    let mut page = run_blocking(move || {
        series.data_points(
            &key,
            params.start.unwrap_or(-1),
            params.end.unwrap_or(0),
            page_size.saturating_add(1),
        )
    })
    .await?;

    let has_more = page.records.len() > page_size;
    if has_more {
        page.records.truncate(page_size);
    }
    let cursor = match page.records.last() {
        Some(last) if has_more => last.version,
        _ => page.cursor,
    };

    let data = page
        .records
        .into_iter()
        .map(to_data_point)
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(Json(DataPointsResponse {
        timeseries: SeriesInfo { name },
        data,
        pagination: Pagination { cursor, has_more },
    }))
}

async fn put_data_point(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Result<Json<serde_json::Map<String, serde_json::Value>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let payload = serde_json::to_vec(&body).map_err(Error::from)?;
    let series = Arc::clone(&state.series);

    let record = run_blocking(move || series.put(name.as_bytes(), &payload, -1)).await?;

    Ok((
        StatusCode::CREATED,
        [(
            HeaderName::from_static(VERSION_HEADER),
            record.version.to_string(),
        )],
    )
        .into_response())
}

fn to_data_point(record: Record) -> crate::Result<DataPoint> {
    Ok(DataPoint {
        time: record.version,
        data: serde_json::from_slice(&record.data)?,
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of a request, rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    Store(Error),
    Task(tokio::task::JoinError),
    /// Query string or body the extractors refused
    Rejected { status: StatusCode, message: String },
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Store(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Task(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(Error::NotFound(name)) => {
                (StatusCode::NOT_FOUND, format!("time series {name} not found"))
            }
            ApiError::Store(e) => {
                tracing::error!(error = %e, "time series request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Task(e) => {
                tracing::error!(error = %e, "blocking task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::Rejected { status, message } => (status, message),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
