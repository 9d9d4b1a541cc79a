use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    exporter, mapper,
    reports::{self, RawReport, ReportKind},
    AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/trivy-webhook", post(process_webhook))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "TrivyHub-RS"}))
}

pub async fn process_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        warn!("empty request body");
        return (StatusCode::BAD_REQUEST, "Empty request body").into_response();
    }

    let envelope: RawReport = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "invalid JSON payload");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    let kind = match ReportKind::from_kind(&envelope.kind) {
        Some(kind) => kind,
        None => {
            warn!(kind = %envelope.kind, "unknown report kind");
            return (
                StatusCode::BAD_REQUEST,
                format!("unknown report kind: {}", envelope.kind),
            )
                .into_response();
        }
    };

    let report = match reports::decode(kind, &body) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, kind = kind.as_str(), "error decoding report");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing report").into_response();
        }
    };

    // A disabled kind is still decoded and logged above; it just maps to
    // nothing and the request succeeds.
    let findings = if state.config.kind_enabled(kind) {
        match mapper::map_report(&report, state.resolver.as_ref()).await {
            Ok(findings) => findings,
            Err(e) => {
                error!(
                    error = %e,
                    report = %report.name(),
                    kind = kind.as_str(),
                    "error mapping report"
                );
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing report")
                    .into_response();
            }
        }
    } else {
        info!(kind = kind.as_str(), report = %report.name(), "report kind disabled, skipping mapping");
        Vec::new()
    };

    if let Err(e) = exporter::export_in_batches(state.sink.as_ref(), &findings).await {
        error!(error = %e, report = %report.name(), kind = kind.as_str(), "error exporting findings");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error importing findings to Security Hub",
        )
            .into_response();
    }

    (
        StatusCode::OK,
        "Vulnerabilities processed and imported to Security Hub",
    )
        .into_response()
}
