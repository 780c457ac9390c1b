//! # Quote Number Sequence
//!
//! Hands out quote numbers from an `AUTOINCREMENT` table.
//!
//! ## Two-Phase Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Builder opens        GET /quotes/next-number                       │
//! │                          └── reserve_next() → { seqId: 42, Q-000042 }  │
//! │                                                                         │
//! │  2. User edits...        (number shown on screen)                      │
//! │                                                                         │
//! │  3. Save                 POST /quotes { quote_seq_id: 42, ... }        │
//! │                          ├── exists_in(tx, 42)?  no → 404, no write    │
//! │                          └── stamp quote with Q-000042                 │
//! │                                                                         │
//! │  No reservation sent?    reserve_in(tx) inside the quote transaction   │
//! │                                                                         │
//! │  Abandoned reservations are never reused: gaps are expected.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uniqueness comes from SQLite assigning the row id under its write lock.
//! There is no counter in this process.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use materi_core::QuoteNumberReservation;

/// Repository for the quote number sequence.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Reserves the next quote number.
    ///
    /// Every call returns an id strictly greater than all previous ones.
    /// If the insert fails nothing is reserved.
    pub async fn reserve_next(&self) -> DbResult<QuoteNumberReservation> {
        let mut conn = self.pool.acquire().await?;
        let reservation = reserve_in(&mut *conn).await?;

        info!(
            seq_id = reservation.sequence_id,
            quote_number = %reservation.quote_number,
            "Reserved quote number"
        );
        Ok(reservation)
    }

    /// Returns whether a reservation with this id exists.
    pub async fn exists(&self, sequence_id: i64) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        exists_in(&mut *conn, sequence_id).await
    }

    /// Returns the highest id reserved so far.
    pub async fn latest(&self) -> DbResult<Option<i64>> {
        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM quote_number_sequences")
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }
}

/// Inserts one sequence row on an open connection or transaction.
pub async fn reserve_in(conn: &mut SqliteConnection) -> DbResult<QuoteNumberReservation> {
    let result = sqlx::query("INSERT INTO quote_number_sequences (created_at) VALUES (?1)")
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    let sequence_id = result.last_insert_rowid();
    debug!(seq_id = sequence_id, "Inserted sequence row");

    Ok(QuoteNumberReservation::new(sequence_id))
}

/// Returns whether a reservation exists, on an open connection or transaction.
pub async fn exists_in(conn: &mut SqliteConnection, sequence_id: i64) -> DbResult<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM quote_number_sequences WHERE id = ?1")
            .bind(sequence_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, NewQuote};
    use std::collections::HashSet;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reservations_strictly_increase() {
        let db = db().await;
        let repo = db.sequences();

        let mut previous = 0;
        for _ in 0..25 {
            let r = repo.reserve_next().await.unwrap();
            assert!(r.sequence_id > previous);
            previous = r.sequence_id;
        }
        assert_eq!(repo.latest().await.unwrap(), Some(previous));
    }

    #[tokio::test]
    async fn test_first_reservation_is_q000001() {
        let db = db().await;
        let r = db.sequences().reserve_next().await.unwrap();
        assert_eq!(r.sequence_id, 1);
        assert_eq!(r.quote_number, "Q-000001");
    }

    #[tokio::test]
    async fn test_exists() {
        let db = db().await;
        let repo = db.sequences();
        let r = repo.reserve_next().await.unwrap();

        assert!(repo.exists(r.sequence_id).await.unwrap());
        assert!(!repo.exists(r.sequence_id + 1).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_are_unique() {
        let path = std::env::temp_dir().join(format!("materi-seq-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = db.sequences();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..10 {
                    ids.push(repo.reserve_next().await.unwrap().sequence_id);
                }
                ids
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            let ids = handle.await.unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(all.insert(id), "duplicate sequence id {id}");
            }
        }
        assert_eq!(all.len(), 80);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_quote_creation_is_serialized() {
        let path = std::env::temp_dir().join(format!("materi-quotes-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for task in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut results = Vec::new();
                for n in 0..20 {
                    let mut new = NewQuote::for_customer(format!("vendor-{task}"), "Acme");
                    // half of the quotes arrive with a reservation taken earlier
                    if n % 2 == 0 {
                        new.quote_seq_id = Some(db.sequences().reserve_next().await.unwrap().sequence_id);
                    }
                    results.push(db.quotes().create(new).await);
                }
                results
            }));
        }

        let mut numbers = HashSet::new();
        let mut errors = Vec::new();
        for handle in handles {
            for result in handle.await.unwrap() {
                match result {
                    Ok(quote) => assert!(numbers.insert(quote.quote_number)),
                    Err(e) => errors.push(e.to_string()),
                }
            }
        }
        assert!(errors.is_empty(), "failed creations: {errors:?}");
        assert_eq!(numbers.len(), 160);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
