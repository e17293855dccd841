use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};

use crate::domain::report::CompatibilityReport;
use crate::domain::types::DaemonHealth;
use crate::monitor::ReportReceiver;

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub reports: ReportReceiver,
    pub started_at: DateTime<Utc>,
    pub application_version: String,
    pub source_url: String,
}

impl AppState {
    pub fn health(&self) -> DaemonHealth {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        DaemonHealth {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: self.started_at,
            uptime_secs: uptime.num_seconds().max(0) as u64,
            application_version: self.application_version.clone(),
            source_url: self.source_url.clone(),
            has_report: self.reports.borrow().is_some(),
        }
    }

    pub fn latest_report(&self) -> Option<CompatibilityReport> {
        self.reports.borrow().clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/v1/compatibility", get(compatibility))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<DaemonHealth> {
    Json(state.health())
}

/// 200 with the report while the cluster is compatible, 503 otherwise.
async fn ready(
    State(state): State<AppState>,
) -> Result<Json<CompatibilityReport>, (StatusCode, String)> {
    match state.latest_report() {
        Some(report) if report.is_compatible => Ok(Json(report)),
        Some(report) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            report
                .message
                .unwrap_or_else(|| "cluster is not compatible".to_string()),
        )),
        None => Err(not_yet_polled()),
    }
}

/// Serve the most recently delivered report. Never triggers a poll.
async fn compatibility(
    State(state): State<AppState>,
) -> Result<Json<CompatibilityReport>, (StatusCode, String)> {
    state.latest_report().map(Json).ok_or_else(not_yet_polled)
}

fn not_yet_polled() -> (StatusCode, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "compatibility not yet known (first poll in progress)".to_string(),
    )
}
