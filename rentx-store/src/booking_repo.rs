use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use rentx_core::repository::{BookingRepository, RepoResult, ReserveOutcome};
use rentx_core::{Booking, CoreError, NewBooking};

/// Serializes every writer that can create a current booking.
const RESERVE_LOCK_KEY: i64 = 0x7265_6e74_785f_6c6b;

const COLUMNS: &str = "id, contact, start_time, end_time, status, created_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    contact: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            contact: row.contact,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

fn current_sql() -> String {
    format!(
        "SELECT {} FROM bookings WHERE end_time > $1 ORDER BY end_time DESC LIMIT 1",
        COLUMNS
    )
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM bookings WHERE status = 'pending' AND end_time < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn current_booking(&self, now: DateTime<Utc>) -> RepoResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&current_sql())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn reserve(&self, booking: NewBooking, now: DateTime<Utc>) -> RepoResult<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RESERVE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, BookingRow>(&current_sql())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = existing {
            tx.rollback().await?;
            return Ok(ReserveOutcome::Occupied(row.try_into()?));
        }

        let inserted = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (id, contact, start_time, end_time, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&booking.contact)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReserveOutcome::Reserved(inserted.try_into()?))
    }

    async fn force_stop(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET end_time = $1, status = 'force_stop' WHERE id = $2 RETURNING {}",
            COLUMNS
        ))
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {} FROM bookings WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn recent(&self, limit: i64) -> RepoResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings ORDER BY start_time DESC LIMIT $1",
            COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let bookings = rows
            .into_iter()
            .map(Booking::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bookings)
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use chrono::Duration;
    use rentx_core::BookingStatus;
    use std::sync::Arc;

    async fn insert_raw(pool: &PgPool, status: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO bookings (id, contact, start_time, end_time, status) VALUES ($1, 'seed', $2, $3, $4)")
            .bind(id)
            .bind(start)
            .bind(end)
            .bind(status)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    #[sqlx::test(migrator = "crate::database::MIGRATOR")]
    async fn test_purge_keeps_active_and_force_stopped(pool: PgPool) {
        let repo = PgBookingRepository::new(pool.clone());
        let now = Utc::now();
        let past = now - Duration::hours(3);

        let stale = insert_raw(&pool, "pending", past, now - Duration::minutes(1)).await;
        let active = insert_raw(&pool, "active", past, now - Duration::minutes(1)).await;
        let stopped = insert_raw(&pool, "force_stop", past, past).await;

        assert_eq!(repo.purge_expired_holds(now).await.unwrap(), 1);
        assert!(repo.find(stale).await.unwrap().is_none());
        assert!(repo.find(active).await.unwrap().is_some());
        assert!(repo.find(stopped).await.unwrap().is_some());
    }

    #[sqlx::test(migrator = "crate::database::MIGRATOR")]
    async fn test_reserve_and_force_stop(pool: PgPool) {
        let repo = PgBookingRepository::new(pool);
        let now = Utc::now();

        let ReserveOutcome::Reserved(held) = repo.reserve(NewBooking::hold(now, Duration::minutes(5)), now).await.unwrap() else {
            panic!("expected reservation");
        };
        assert_eq!(held.status, BookingStatus::Pending);
        assert_eq!(repo.current_booking(now).await.unwrap().map(|b| b.id), Some(held.id));

        let again = repo.reserve(NewBooking::session(now, 1, None), now).await.unwrap();
        assert!(matches!(again, ReserveOutcome::Occupied(ref b) if b.id == held.id));

        let stopped = repo.force_stop(held.id, now).await.unwrap().unwrap();
        assert_eq!(stopped.status, BookingStatus::ForceStop);
        assert!(repo.current_booking(now).await.unwrap().is_none());
        assert_eq!(repo.recent(10).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrator = "crate::database::MIGRATOR")]
    async fn test_concurrent_reserve_grants_one(pool: PgPool) {
        let repo = Arc::new(PgBookingRepository::new(pool));
        let now = Utc::now();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.reserve(NewBooking::hold(now, Duration::minutes(5)), now).await.unwrap()
                })
            })
            .collect();

        let mut reserved = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), ReserveOutcome::Reserved(_)) {
                reserved += 1;
            }
        }
        assert_eq!(reserved, 1);
    }
}
