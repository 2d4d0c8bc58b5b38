use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::booking::Availability;
use crate::feed::{ChangeFeed, ListenerId};
use crate::service::BookingService;
use crate::CoreResult;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub availability: Availability,
    pub checked_at: DateTime<Utc>,
}

/// Keeps the public status fresh by re-querying on every booking change.
pub struct StatusWatcher {
    feed: ChangeFeed,
    listener: Mutex<Option<ListenerId>>,
    tx: Arc<watch::Sender<StatusSnapshot>>,
    task: JoinHandle<()>,
    service: BookingService,
}

const RETRY_SECS: i64 = 5;

fn until_from_now(service: &BookingService, until: DateTime<Utc>) -> std::time::Duration {
    (until - service.now()).to_std().unwrap_or_default()
}

impl StatusWatcher {
    pub async fn spawn(service: BookingService, feed: ChangeFeed) -> CoreResult<Self> {
        let initial = StatusSnapshot {
            availability: service.status().await?,
            checked_at: service.now(),
        };
        let mut deadline = initial.availability.until();
        let (tx, _) = watch::channel(initial);
        let tx = Arc::new(tx);

        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel::<()>();
        let listener = feed.register(move |change| {
            debug!("Booking change {:?}, refreshing status", change);
            let _ = ping_tx.send(());
        });

        let publisher = tx.clone();
        let reader = service.clone();
        let task = tokio::spawn(async move {
            loop {
                // A booking that simply runs out emits no change, so also wake at its end time
                let woke = match deadline {
                    Some(until) => tokio::select! {
                        ping = ping_rx.recv() => ping.is_some(),
                        _ = tokio::time::sleep(until_from_now(&service, until)) => {
                            debug!("Booking ended at {}, refreshing status", until);
                            true
                        }
                    },
                    None => ping_rx.recv().await.is_some(),
                };
                if !woke {
                    break;
                }

                // Collapse bursts into a single re-query
                while ping_rx.try_recv().is_ok() {}

                match service.status().await {
                    Ok(availability) => {
                        deadline = availability.until();
                        publisher.send_replace(StatusSnapshot {
                            availability,
                            checked_at: service.now(),
                        });
                    }
                    Err(e) => {
                        warn!("Status refresh failed, keeping last snapshot: {}", e);
                        if deadline.is_some_and(|until| until <= service.now()) {
                            deadline = Some(service.now() + chrono::Duration::seconds(RETRY_SECS));
                        }
                    }
                }
            }
        });

        Ok(Self {
            feed,
            listener: Mutex::new(Some(listener)),
            tx,
            task,
            service: reader,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// Last published snapshot, reported as available once its booking has ended.
    pub fn latest(&self) -> StatusSnapshot {
        let snapshot = self.tx.borrow().clone();
        let now = self.service.now();
        match snapshot.availability.until() {
            Some(until) if until <= now => StatusSnapshot {
                availability: Availability::Available,
                checked_at: now,
            },
            _ => snapshot,
        }
    }

    /// Unregister from the feed and stop refreshing. Safe to call twice.
    pub fn shutdown(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.feed.unregister(id);
            self.task.abort();
            debug!("Status watcher stopped");
        }
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBookingRepository;
    use crate::service::{FixedClock, HoldPolicy};
    use std::time::Duration;

    async fn next_snapshot(rx: &mut watch::Receiver<StatusSnapshot>) -> StatusSnapshot {
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("status not refreshed in time")
            .expect("watcher closed");
        rx.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn test_watcher_follows_hold_and_force_stop() {
        let feed = ChangeFeed::new();
        let repo = Arc::new(MemoryBookingRepository::new(feed.clone()));
        let service = BookingService::new(repo, HoldPolicy::default());

        let watcher = StatusWatcher::spawn(service.clone(), feed.clone()).await.unwrap();
        assert_eq!(watcher.latest().availability, Availability::Available);
        let mut rx = watcher.subscribe();

        let hold = service.hold().await.unwrap();
        let busy = next_snapshot(&mut rx).await;
        assert_eq!(busy.availability.until(), Some(hold.end_time));

        service.force_stop().await.unwrap();
        let free = next_snapshot(&mut rx).await;
        assert_eq!(free.availability, Availability::Available);
    }

    #[tokio::test]
    async fn test_shutdown_unregisters_listener() {
        let feed = ChangeFeed::new();
        let repo = Arc::new(MemoryBookingRepository::new(feed.clone()));
        let service = BookingService::new(repo, HoldPolicy::default());

        let watcher = StatusWatcher::spawn(service, feed.clone()).await.unwrap();
        assert_eq!(feed.listener_count(), 1);

        watcher.shutdown();
        watcher.shutdown();
        assert_eq!(feed.listener_count(), 0);

        drop(watcher);
        assert_eq!(feed.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unregisters_listener() {
        let feed = ChangeFeed::new();
        let repo = Arc::new(MemoryBookingRepository::new(feed.clone()));
        let service = BookingService::new(repo, HoldPolicy::default());

        {
            let _watcher = StatusWatcher::spawn(service, feed.clone()).await.unwrap();
            assert_eq!(feed.listener_count(), 1);
        }
        assert_eq!(feed.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_watcher_refreshes_when_hold_runs_out() {
        let feed = ChangeFeed::new();
        let repo = Arc::new(MemoryBookingRepository::new(feed.clone()));
        let policy = HoldPolicy { hold: chrono::Duration::milliseconds(500), ..HoldPolicy::default() };
        let service = BookingService::new(repo, policy);

        let watcher = StatusWatcher::spawn(service.clone(), feed.clone()).await.unwrap();
        let mut rx = watcher.subscribe();

        service.hold().await.unwrap();
        assert!(next_snapshot(&mut rx).await.availability.is_busy());

        // No write happens here; only the end time passes
        let expired = next_snapshot(&mut rx).await;
        assert_eq!(expired.availability, Availability::Available);
        assert_eq!(rx.borrow().availability, Availability::Available);
    }

    #[tokio::test]
    async fn test_latest_reports_ended_booking_as_available() {
        let feed = ChangeFeed::new();
        let repo = Arc::new(MemoryBookingRepository::new(feed.clone()));
        let clock = FixedClock::new(chrono::Utc::now());
        let service = BookingService::with_clock(repo, HoldPolicy::default(), Arc::new(clock.clone()));

        let watcher = StatusWatcher::spawn(service.clone(), feed.clone()).await.unwrap();
        let mut rx = watcher.subscribe();

        service.hold().await.unwrap();
        next_snapshot(&mut rx).await;
        assert!(watcher.latest().availability.is_busy());

        clock.advance(chrono::Duration::minutes(6));
        assert_eq!(service.status().await.unwrap(), Availability::Available);
        assert_eq!(watcher.latest().availability, Availability::Available);
    }
}
