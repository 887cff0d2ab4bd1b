// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync batch lifecycle: created in `processing`, completed exactly once.

use gatepass_core::{BatchCompletion, GatepassError, SyncBatch};
use rusqlite::params;

use super::{optional, parse_enum};
use crate::database::{Database, map_tr_err};

const BATCH_COLUMNS: &str = "id, batch_number, trigger, status, total_count, success_count, \
     failed_count, started_at, completed_at, duration_ms";

fn row_to_batch(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncBatch> {
    Ok(SyncBatch {
        id: row.get(0)?,
        batch_number: row.get(1)?,
        trigger: parse_enum(2, row.get(2)?)?,
        status: parse_enum(3, row.get(3)?)?,
        total_count: row.get(4)?,
        success_count: row.get(5)?,
        failed_count: row.get(6)?,
        started_at: row.get(7)?,
        completed_at: row.get(8)?,
        duration_ms: row.get(9)?,
    })
}

/// Insert a new batch row.
pub async fn create_batch(db: &Database, batch: &SyncBatch) -> Result<(), GatepassError> {
    let b = batch.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sync_batches (id, batch_number, trigger, status, total_count,
                     success_count, failed_count, started_at, completed_at, duration_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    b.id,
                    b.batch_number,
                    b.trigger.to_string(),
                    b.status.to_string(),
                    b.total_count,
                    b.success_count,
                    b.failed_count,
                    b.started_at,
                    b.completed_at,
                    b.duration_ms,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Write final aggregates. Only a `processing` batch can be completed.
pub async fn complete_batch(
    db: &Database,
    batch_id: &str,
    completion: &BatchCompletion,
) -> Result<(), GatepassError> {
    let id = batch_id.to_string();
    let c = completion.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sync_batches
                 SET status = ?2, success_count = ?3, failed_count = ?4, completed_at = ?5,
                     duration_ms = ?6
                 WHERE id = ?1 AND status = 'processing'",
                params![
                    id,
                    c.status.to_string(),
                    c.success_count,
                    c.failed_count,
                    c.completed_at,
                    c.duration_ms,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(GatepassError::Validation(format!(
            "batch {batch_id} is not in processing state"
        )));
    }
    Ok(())
}

/// Get a batch by id.
pub async fn get_batch(db: &Database, batch_id: &str) -> Result<Option<SyncBatch>, GatepassError> {
    let id = batch_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {BATCH_COLUMNS} FROM sync_batches WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], row_to_batch))
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent batches, newest first.
pub async fn recent_batches(db: &Database, limit: u32) -> Result<Vec<SyncBatch>, GatepassError> {
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {BATCH_COLUMNS} FROM sync_batches ORDER BY started_at DESC, rowid DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], row_to_batch)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of batches whose `started_at` falls on `day` (`YYYY-MM-DD`).
pub async fn count_on_day(db: &Database, day: &str) -> Result<u32, GatepassError> {
    let prefix = format!("{day}%");
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sync_batches WHERE started_at LIKE ?1",
                params![prefix],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_core::{BatchStatus, BatchTrigger};
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batches.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (dir, db)
    }

    fn batch(id: &str, started_at: &str) -> SyncBatch {
        SyncBatch {
            id: id.into(),
            batch_number: "BATCH-20260101-0001".into(),
            trigger: BatchTrigger::Manual,
            status: BatchStatus::Processing,
            total_count: 3,
            success_count: 0,
            failed_count: 0,
            started_at: started_at.into(),
            completed_at: None,
            duration_ms: None,
        }
    }

    fn completion() -> BatchCompletion {
        BatchCompletion {
            status: BatchStatus::Partial,
            success_count: 2,
            failed_count: 1,
            completed_at: "2026-01-01T00:00:01.000Z".into(),
            duration_ms: 1000,
        }
    }

    #[tokio::test]
    async fn batch_completes_exactly_once() {
        let (_dir, db) = test_db().await;
        create_batch(&db, &batch("b1", "2026-01-01T00:00:00.000Z")).await.unwrap();

        complete_batch(&db, "b1", &completion()).await.unwrap();
        let b = get_batch(&db, "b1").await.unwrap().unwrap();
        assert_eq!(b.status, BatchStatus::Partial);
        assert_eq!((b.success_count, b.failed_count), (2, 1));
        assert_eq!(b.duration_ms, Some(1000));

        let again = complete_batch(&db, "b1", &completion()).await;
        assert!(matches!(again, Err(GatepassError::Validation(_))));
    }

    #[tokio::test]
    async fn recent_and_daily_count() {
        let (_dir, db) = test_db().await;
        create_batch(&db, &batch("b1", "2026-01-01T00:00:00.000Z")).await.unwrap();
        create_batch(&db, &batch("b2", "2026-01-01T09:00:00.000Z")).await.unwrap();
        create_batch(&db, &batch("b3", "2026-01-02T00:00:00.000Z")).await.unwrap();

        let recent = recent_batches(&db, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "b3");
        assert_eq!(count_on_day(&db, "2026-01-01").await.unwrap(), 2);
        assert_eq!(count_on_day(&db, "2026-01-03").await.unwrap(), 0);
    }
}
