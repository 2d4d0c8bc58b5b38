use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, NewBooking};

pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Outcome of a conditional insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The row was inserted
    Reserved(Booking),
    /// Another booking is current; nothing was written
    Occupied(Booking),
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Delete pending holds whose end time has already passed.
    /// Active and force-stopped rows are never removed.
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> RepoResult<u64>;

    /// The booking with the latest end time that is still in the future
    async fn current_booking(&self, now: DateTime<Utc>) -> RepoResult<Option<Booking>>;

    /// Insert `booking` unless a current booking exists. Check and insert are atomic.
    async fn reserve(&self, booking: NewBooking, now: DateTime<Utc>) -> RepoResult<ReserveOutcome>;

    /// Rewrite the end time to `now` and mark the row force-stopped
    async fn force_stop(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<Booking>>;

    async fn find(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    /// Newest first by start time
    async fn recent(&self, limit: i64) -> RepoResult<Vec<Booking>>;
}
