pub mod cli;

use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CancellationToken, EngineError, EngineResult, Milestones, MonteCarloConfig, MonteCarloResult,
    PercentileBand, ReportingMode, SimulationConfig, Snapshot, project,
    run_monte_carlo_cancellable, summarize_milestones,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRequest {
    config: serde_json::Value,
    #[serde(default)]
    reporting: ReportingMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonteCarloRequest {
    config: serde_json::Value,
    monte_carlo: MonteCarloConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub snapshots: Vec<Snapshot>,
    pub milestones: Milestones,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResponse {
    pub result: MonteCarloResult,
    pub percentiles: Vec<PercentileBand>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Cancels the wrapped token when the request future is dropped.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Parse a JSON config, filling a missing `startDate` with `today`.
pub fn config_from_value(
    mut value: serde_json::Value,
    today: Date,
) -> Result<SimulationConfig, String> {
    if let Some(object) = value.as_object_mut() {
        object
            .entry("startDate")
            .or_insert_with(|| serde_json::Value::String(today.to_string()));
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid simulation config: {e}"))
}

pub fn today() -> Date {
    jiff::Zoned::now().date()
}

pub fn run_projection(
    config: &SimulationConfig,
    reporting: ReportingMode,
) -> EngineResult<ProjectResponse> {
    let snapshots = project(config, reporting)?;
    let milestones = summarize_milestones(config, &snapshots)?;
    Ok(ProjectResponse {
        snapshots,
        milestones,
    })
}

pub fn run_simulation(
    config: &SimulationConfig,
    monte_carlo: &MonteCarloConfig,
    token: &CancellationToken,
) -> EngineResult<MonteCarloResponse> {
    let (result, percentiles) = run_monte_carlo_cancellable(config, monte_carlo, token)?;
    Ok(MonteCarloResponse {
        result,
        percentiles,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/project", post(project_handler))
        .route("/api/monte-carlo", post(monte_carlo_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FIRE planner HTTP API listening");
    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_handler(Json(request): Json<ProjectRequest>) -> Response {
    let config = match config_from_value(request.config, today()) {
        Ok(config) => config,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let reporting = request.reporting;

    match tokio::task::spawn_blocking(move || run_projection(&config, reporting)).await {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => engine_error_response(&e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn monte_carlo_handler(Json(request): Json<MonteCarloRequest>) -> Response {
    let config = match config_from_value(request.config, today()) {
        Ok(config) => config,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let monte_carlo = request.monte_carlo;

    let guard = CancelOnDrop(CancellationToken::new());
    let token = guard.0.clone();
    let outcome =
        tokio::task::spawn_blocking(move || run_simulation(&config, &monte_carlo, &token)).await;
    drop(guard);

    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => engine_error_response(&e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Configuration(_) => StatusCode::BAD_REQUEST,
        EngineError::Simulation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn engine_error_response(err: &EngineError) -> Response {
    warn!(error = %err, "request rejected");
    error_response(status_for(err), &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
