use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::booking::{Availability, Booking, NewBooking};
use crate::repository::{BookingRepository, ReserveOutcome};
use crate::{CoreError, CoreResult};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an instant that tests can move.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(parking_lot::Mutex::new(now)) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HoldPolicy {
    pub hold: Duration,
    pub max_session_hours: u32,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            hold: Duration::minutes(5),
            max_session_hours: 24,
        }
    }
}

/// Hold, status and admin operations over a single shared resource
#[derive(Clone)]
pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    policy: HoldPolicy,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>, policy: HoldPolicy) -> Self {
        Self::with_clock(repo, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Arc<dyn BookingRepository>, policy: HoldPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { repo, policy, clock }
    }

    pub fn policy(&self) -> HoldPolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Place a short pending hold so the customer can pay.
    pub async fn hold(&self) -> CoreResult<Booking> {
        let now = self.clock.now();

        // Cleanup is best-effort; a failure here must not block the hold.
        match self.repo.purge_expired_holds(now).await {
            Ok(0) => {}
            Ok(n) => info!("Purged {} expired hold(s)", n),
            Err(e) => warn!("Expired hold cleanup failed: {}", e),
        }

        match self.repo.reserve(NewBooking::hold(now, self.policy.hold), now).await? {
            ReserveOutcome::Reserved(booking) => {
                info!("Hold {} placed until {}", booking.id, booking.end_time);
                Ok(booking)
            }
            ReserveOutcome::Occupied(existing) => {
                info!("Hold refused, booking {} runs until {}", existing.id, existing.end_time);
                Err(CoreError::Occupied { until: existing.end_time })
            }
        }
    }

    pub async fn status(&self) -> CoreResult<Availability> {
        let current = self.repo.current_booking(self.clock.now()).await?;
        Ok(Availability::from_current(current))
    }

    pub async fn current(&self) -> CoreResult<Option<Booking>> {
        Ok(self.repo.current_booking(self.clock.now()).await?)
    }

    /// Operator lock for `hours`. Refused while another booking is current.
    pub async fn start_session(&self, hours: u32, contact: Option<String>) -> CoreResult<Booking> {
        if hours == 0 || hours > self.policy.max_session_hours {
            return Err(CoreError::Validation(format!(
                "hours must be between 1 and {}",
                self.policy.max_session_hours
            )));
        }

        let now = self.clock.now();
        match self.repo.reserve(NewBooking::session(now, hours, contact), now).await? {
            ReserveOutcome::Reserved(booking) => {
                info!("Session {} started for {}h until {}", booking.id, hours, booking.end_time);
                Ok(booking)
            }
            ReserveOutcome::Occupied(existing) => Err(CoreError::Occupied { until: existing.end_time }),
        }
    }

    /// End whatever booking currently occupies the rig.
    pub async fn force_stop(&self) -> CoreResult<Booking> {
        let current = self
            .current()
            .await?
            .ok_or_else(|| CoreError::NotFound("no current booking".to_string()))?;
        self.force_stop_booking(current.id).await
    }

    pub async fn force_stop_booking(&self, id: Uuid) -> CoreResult<Booking> {
        let now = self.clock.now();
        let stopped = self
            .repo
            .force_stop(id, now)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", id)))?;
        info!("Booking {} force-stopped", stopped.id);
        Ok(stopped)
    }

    pub async fn history(&self, limit: i64) -> CoreResult<Vec<Booking>> {
        Ok(self.repo.recent(limit).await?)
    }
}
