use rentx_core::{BookingChange, ChangeFeed, ChangeKind};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const CHANNEL: &str = "booking_changes";

/// Payload emitted by the `bookings_notify` trigger
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    op: String,
    id: Option<Uuid>,
}

pub fn decode_change(payload: &str) -> Option<BookingChange> {
    let parsed: NotifyPayload = serde_json::from_str(payload).ok()?;
    let kind = match parsed.op.as_str() {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };
    Some(BookingChange { kind, booking_id: parsed.id })
}

/// Forwards Postgres notifications on the bookings table into the change feed.
pub struct ChangeListener {
    listener: PgListener,
    feed: ChangeFeed,
}

impl ChangeListener {
    pub async fn connect(pool: &PgPool, feed: ChangeFeed) -> Result<Self, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANNEL).await?;
        info!("Listening for booking changes on '{}'", CHANNEL);
        Ok(Self { listener, feed })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            // `recv` reconnects on its own after a dropped connection
            match self.listener.recv().await {
                Ok(notification) => match decode_change(notification.payload()) {
                    Some(change) => self.feed.publish(&change),
                    None => warn!("Ignoring undecodable booking notification: {}", notification.payload()),
                },
                Err(e) => {
                    error!("Booking change listener failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trigger_payload() {
        let id = Uuid::new_v4();
        let change = decode_change(&format!(r#"{{"op":"UPDATE","id":"{}"}}"#, id)).unwrap();
        assert_eq!(change, BookingChange::new(ChangeKind::Update, id));

        let delete = decode_change(r#"{"op":"DELETE","id":null}"#).unwrap();
        assert_eq!(delete.kind, ChangeKind::Delete);
        assert!(delete.booking_id.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_change("not json").is_none());
        assert!(decode_change(r#"{"op":"TRUNCATE","id":null}"#).is_none());
    }
}
