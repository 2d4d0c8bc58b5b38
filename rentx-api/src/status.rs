use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use futures_util::stream::{Stream, StreamExt};
use rentx_core::{Availability, BookingStatus, StatusSnapshot};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;

use crate::{error::AppError, state::AppState};

/// Customers are in Thailand; "busy until" is shown in local time.
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusResponse {
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

pub fn display_time(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format("%H:%M").to_string(),
        None => at.format("%H:%M UTC").to_string(),
    }
}

impl From<&Availability> for StatusResponse {
    fn from(availability: &Availability) -> Self {
        match availability {
            Availability::Available => Self { busy: false, until: None, until_display: None, status: None },
            Availability::Busy { until, status, .. } => Self {
                busy: true,
                until: Some(*until),
                until_display: Some(display_time(*until)),
                status: Some(*status),
            },
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/status/stream", get(stream_status))
}

/// GET /api/status
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let availability = state.bookings.status().await?;
    Ok(Json(StatusResponse::from(&availability)))
}

fn status_event(snapshot: StatusSnapshot) -> Result<Event, axum::Error> {
    Event::default()
        .event("status")
        .json_data(StatusResponse::from(&snapshot.availability))
}

/// GET /api/status/stream
/// Current status first, then one event per booking change until shutdown
async fn stream_status(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.watcher.subscribe())
        .map(status_event)
        .take_until(state.shutdown.clone().cancelled_owned());
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_display_time_is_bangkok_local() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 7, 30, 0).unwrap();
        assert_eq!(display_time(at), "14:30");
    }

    #[test]
    fn test_busy_response() {
        let until = Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap();
        let busy = Availability::Busy { booking_id: Uuid::new_v4(), until, status: BookingStatus::Pending };
        let response = StatusResponse::from(&busy);
        assert!(response.busy);
        assert_eq!(response.until, Some(until));
        assert_eq!(response.until_display.as_deref(), Some("07:05"));

        let free = StatusResponse::from(&Availability::Available);
        assert!(!free.busy);
        assert!(free.until.is_none());
    }
}
