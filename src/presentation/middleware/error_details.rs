//! Error Details
//!
//! Outside production, rewrites error bodies to include the underlying error
//! text recorded by [`AppError`](crate::shared::error::AppError).

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::shared::error::ErrorRecord;

pub async fn expose_error_details(response: Response) -> Response {
    let Some(record) = response.extensions().get::<ErrorRecord>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    let (fresh, body) = Json(record.detailed_body()).into_response().into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    parts.headers.extend(fresh.headers);
    Response::from_parts(parts, body)
}
