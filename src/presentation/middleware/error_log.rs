//! Server Error Persistence
//!
//! Stores every 5xx [`AppError`](crate::shared::error::AppError) response as
//! an `ErrorLog` row. The response itself is never altered.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::domain::NewErrorLog;
use crate::shared::error::ErrorRecord;
use crate::startup::AppState;

pub async fn persist_server_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let route = format!("{} {}", request.method(), request.uri());
    let response = next.run(request).await;

    let Some(record) = response.extensions().get::<ErrorRecord>() else {
        return response;
    };
    if record.status < 500 {
        return response;
    }

    let entry = NewErrorLog {
        status: i32::from(record.status),
        message: record.message.clone(),
        stack: Some(format!("{}: {}", route, record.details)),
    };
    if let Err(e) = state.error_logs.create(entry).await {
        warn!(error = %e, "Failed to persist error log");
    }

    response
}
