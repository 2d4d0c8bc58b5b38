pub mod booking;
pub mod feed;
pub mod memory;
pub mod package;
pub mod repository;
pub mod service;
pub mod watcher;

pub use booking::{Availability, Booking, BookingStatus, NewBooking};
pub use feed::{BookingChange, ChangeFeed, ChangeKind, ListenerId};
pub use memory::MemoryBookingRepository;
pub use package::Package;
pub use repository::{BookingRepository, ReserveOutcome};
pub use service::{BookingService, Clock, FixedClock, HoldPolicy, SystemClock};
pub use watcher::{StatusSnapshot, StatusWatcher};

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Resource is occupied until {until}")]
    Occupied { until: DateTime<Utc> },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Store error: {0}")]
    Store(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Store(err.to_string())
    }
}
