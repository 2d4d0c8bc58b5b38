use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, NewBooking};
use crate::feed::{BookingChange, ChangeFeed, ChangeKind};
use crate::repository::{BookingRepository, RepoResult, ReserveOutcome};

/// Process-local store. Used when no database is configured, and by tests.
pub struct MemoryBookingRepository {
    rows: Mutex<Vec<Booking>>,
    feed: ChangeFeed,
}

impl MemoryBookingRepository {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            feed,
        }
    }

    /// Insert a row as-is, bypassing the current-booking check.
    pub async fn seed(&self, booking: Booking) {
        let id = booking.id;
        self.rows.lock().await.push(booking);
        self.feed.publish(&BookingChange::new(ChangeKind::Insert, id));
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn latest_current(rows: &[Booking], now: DateTime<Utc>) -> Option<&Booking> {
    rows.iter()
        .filter(|b| b.is_current(now))
        .max_by_key(|b| b.end_time)
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let removed: Vec<Uuid> = {
            let mut rows = self.rows.lock().await;
            let mut removed = Vec::new();
            rows.retain(|b| {
                let expired_hold = b.status == BookingStatus::Pending && b.end_time < now;
                if expired_hold {
                    removed.push(b.id);
                }
                !expired_hold
            });
            removed
        };

        for id in &removed {
            self.feed.publish(&BookingChange::new(ChangeKind::Delete, *id));
        }
        Ok(removed.len() as u64)
    }

    async fn current_booking(&self, now: DateTime<Utc>) -> RepoResult<Option<Booking>> {
        let rows = self.rows.lock().await;
        Ok(latest_current(&rows, now).cloned())
    }

    async fn reserve(&self, booking: NewBooking, now: DateTime<Utc>) -> RepoResult<ReserveOutcome> {
        let outcome = {
            let mut rows = self.rows.lock().await;
            if let Some(existing) = latest_current(&rows, now) {
                return Ok(ReserveOutcome::Occupied(existing.clone()));
            }
            let created = booking.into_booking(Uuid::new_v4(), now);
            rows.push(created.clone());
            ReserveOutcome::Reserved(created)
        };

        if let ReserveOutcome::Reserved(created) = &outcome {
            self.feed.publish(&BookingChange::new(ChangeKind::Insert, created.id));
        }
        Ok(outcome)
    }

    async fn force_stop(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<Booking>> {
        let updated = {
            let mut rows = self.rows.lock().await;
            rows.iter_mut().find(|b| b.id == id).map(|b| {
                b.end_time = now;
                b.status = BookingStatus::ForceStop;
                b.clone()
            })
        };

        if updated.is_some() {
            self.feed.publish(&BookingChange::new(ChangeKind::Update, id));
        }
        Ok(updated)
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|b| b.id == id).cloned())
    }

    async fn recent(&self, limit: i64) -> RepoResult<Vec<Booking>> {
        let rows = self.rows.lock().await;
        let mut sorted: Vec<Booking> = rows.clone();
        sorted.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sorted.truncate(limit.max(0) as usize);
        Ok(sorted)
    }
}
