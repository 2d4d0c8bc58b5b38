use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

pub const HOLD_CONTACT: &str = "Pending User";
pub const ADMIN_CONTACT: &str = "Customer (via Admin)";

/// Lifecycle of a booking row. "Expired" is never stored; it is derived from `end_time`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Short hold while the customer pays off-system
    Pending,
    /// Paid session, or a manual lock by the operator
    Active,
    /// Ended early by the operator
    ForceStop,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Active => "active",
            BookingStatus::ForceStop => "force_stop",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "active" => Ok(BookingStatus::Active),
            "force_stop" => Ok(BookingStatus::ForceStop),
            other => Err(CoreError::Validation(format!("unknown booking status: {}", other))),
        }
    }
}

/// A reservation of the rig
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub contact: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// A booking occupies the rig while its end time is in the future.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.end_time > now
    }
}

/// Insert payload. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub contact: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
}

impl NewBooking {
    pub fn hold(now: DateTime<Utc>, hold: Duration) -> Self {
        Self {
            contact: HOLD_CONTACT.to_string(),
            start_time: now,
            end_time: now + hold,
            status: BookingStatus::Pending,
        }
    }

    pub fn session(now: DateTime<Utc>, hours: u32, contact: Option<String>) -> Self {
        Self {
            contact: contact
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| ADMIN_CONTACT.to_string()),
            start_time: now,
            end_time: now + Duration::hours(hours as i64),
            status: BookingStatus::Active,
        }
    }

    pub fn into_booking(self, id: Uuid, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            contact: self.contact,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            created_at,
        }
    }
}

/// Result of the status query
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Busy {
        booking_id: Uuid,
        until: DateTime<Utc>,
        status: BookingStatus,
    },
}

impl Availability {
    pub fn from_current(current: Option<Booking>) -> Self {
        match current {
            Some(b) => Availability::Busy {
                booking_id: b.id,
                until: b.end_time,
                status: b.status,
            },
            None => Availability::Available,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Availability::Busy { .. })
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self {
            Availability::Busy { until, .. } => Some(*until),
            Availability::Available => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in [BookingStatus::Pending, BookingStatus::Active, BookingStatus::ForceStop] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert_eq!(BookingStatus::ForceStop.to_string(), "force_stop");
        assert!("expired".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_hold_ends_after_hold_window() {
        let now = Utc::now();
        let hold = NewBooking::hold(now, Duration::minutes(5));
        assert_eq!(hold.status, BookingStatus::Pending);
        assert_eq!(hold.contact, HOLD_CONTACT);
        assert_eq!(hold.end_time - hold.start_time, Duration::minutes(5));
    }

    #[test]
    fn test_session_contact_falls_back_to_admin() {
        let now = Utc::now();
        let session = NewBooking::session(now, 3, Some("   ".to_string()));
        assert_eq!(session.contact, ADMIN_CONTACT);
        assert_eq!(session.end_time, now + Duration::hours(3));

        let named = NewBooking::session(now, 1, Some("line: somchai".to_string()));
        assert_eq!(named.contact, "line: somchai");
    }

    #[test]
    fn test_booking_is_current_only_before_end() {
        let now = Utc::now();
        let booking = NewBooking::hold(now, Duration::minutes(5)).into_booking(Uuid::new_v4(), now);
        assert!(booking.is_current(now));
        assert!(!booking.is_current(booking.end_time));
        assert!(!booking.is_current(now + Duration::minutes(6)));
    }

    #[test]
    fn test_availability_from_current() {
        assert_eq!(Availability::from_current(None), Availability::Available);

        let now = Utc::now();
        let booking = NewBooking::session(now, 2, None).into_booking(Uuid::new_v4(), now);
        let availability = Availability::from_current(Some(booking.clone()));
        assert!(availability.is_busy());
        assert_eq!(availability.until(), Some(booking.end_time));
    }
}
