//! `GET /api/status`: liveness with a server timestamp.

use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize)]
pub struct Status {
    pub status: &'static str,
    /// ISO-8601 (RFC 3339) UTC time.
    pub timestamp: String,
}

pub async fn status() -> Json<Status> {
    Json(current_status())
}

pub(crate) fn current_status() -> Status {
    let now = OffsetDateTime::now_utc();
    // Formatting a UTC `OffsetDateTime` as RFC 3339 only fails for years
    // outside 0..=9999.
    let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string());
    Status { status: "ok", timestamp }
}
