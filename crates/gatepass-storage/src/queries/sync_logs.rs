// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only sync log operations.

use gatepass_core::{GatepassError, LogStatus, NewSyncLog, SyncLog};
use rusqlite::params;

use super::{optional, parse_enum, parse_json_opt};
use crate::database::{Database, map_tr_err};

const LOG_COLUMNS: &str = "id, attendee_id, sync_type, status, external_person_id, request_payload, \
     response_payload, http_status, error_code, error_message, batch_id, batch_position, \
     duration_ms, created_at, completed_at";

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncLog> {
    Ok(SyncLog {
        id: row.get(0)?,
        attendee_id: row.get(1)?,
        sync_type: parse_enum(2, row.get(2)?)?,
        status: parse_enum(3, row.get(3)?)?,
        external_person_id: row.get(4)?,
        request_payload: parse_json_opt(5, row.get(5)?)?,
        response_payload: parse_json_opt(6, row.get(6)?)?,
        http_status: row.get(7)?,
        error_code: row.get(8)?,
        error_message: row.get(9)?,
        batch_id: row.get(10)?,
        batch_position: row.get(11)?,
        duration_ms: row.get(12)?,
        created_at: row.get(13)?,
        completed_at: row.get(14)?,
    })
}

/// Append a log row. Returns the new row id.
pub async fn insert_sync_log(db: &Database, log: &NewSyncLog) -> Result<i64, GatepassError> {
    let log = log.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sync_logs (attendee_id, sync_type, status, external_person_id,
                     request_payload, response_payload, http_status, error_code, error_message,
                     batch_id, batch_position, duration_ms, created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    log.attendee_id,
                    log.sync_type.to_string(),
                    log.status.to_string(),
                    log.external_person_id,
                    log.request_payload.as_ref().map(|v| v.to_string()),
                    log.response_payload.as_ref().map(|v| v.to_string()),
                    log.http_status,
                    log.error_code,
                    log.error_message,
                    log.batch_id,
                    log.batch_position,
                    log.duration_ms,
                    log.created_at,
                    log.completed_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent log for one attendee.
pub async fn latest_for_attendee(
    db: &Database,
    attendee_id: &str,
) -> Result<Option<SyncLog>, GatepassError> {
    let attendee_id = attendee_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM sync_logs WHERE attendee_id = ?1 ORDER BY id DESC LIMIT 1"
            );
            optional(conn.query_row(&sql, params![attendee_id], row_to_log))
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent logs for one attendee, newest first.
pub async fn for_attendee(
    db: &Database,
    attendee_id: &str,
    limit: u32,
) -> Result<Vec<SyncLog>, GatepassError> {
    let attendee_id = attendee_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM sync_logs WHERE attendee_id = ?1 ORDER BY id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![attendee_id, limit], row_to_log)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Logs of one batch in submission order.
pub async fn for_batch(db: &Database, batch_id: &str) -> Result<Vec<SyncLog>, GatepassError> {
    let batch_id = batch_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM sync_logs WHERE batch_id = ?1 ORDER BY batch_position, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![batch_id], row_to_log)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent logs across all attendees, newest first.
pub async fn recent(db: &Database, limit: u32) -> Result<Vec<SyncLog>, GatepassError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {LOG_COLUMNS} FROM sync_logs ORDER BY id DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], row_to_log)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent logs with the given outcome, newest first.
pub async fn recent_with_status(
    db: &Database,
    status: LogStatus,
    limit: u32,
) -> Result<Vec<SyncLog>, GatepassError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM sync_logs WHERE status = ?1 ORDER BY id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status, limit], row_to_log)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::attendees::insert_attendee;
    use gatepass_core::{NewAttendee, SyncType};
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        insert_attendee(
            &db,
            &NewAttendee {
                id: "a1".into(),
                name: "Ana".into(),
                national_id: "1".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (dir, db)
    }

    fn log(status: LogStatus, error: Option<&str>) -> NewSyncLog {
        NewSyncLog {
            attendee_id: "a1".into(),
            sync_type: SyncType::Individual,
            status,
            external_person_id: None,
            request_payload: Some(serde_json::json!({"person": {"employeeNo": "a1"}})),
            response_payload: None,
            http_status: Some(400),
            error_code: error.map(|_| "BAD".to_string()),
            error_message: error.map(str::to_string),
            batch_id: None,
            batch_position: None,
            duration_ms: 12,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            completed_at: "2026-01-01T00:00:00.012Z".into(),
        }
    }

    #[tokio::test]
    async fn latest_returns_newest_row_with_payloads() {
        let (_dir, db) = test_db().await;
        insert_sync_log(&db, &log(LogStatus::Failed, Some("first"))).await.unwrap();
        let id = insert_sync_log(&db, &log(LogStatus::Failed, Some("second"))).await.unwrap();

        let latest = latest_for_attendee(&db, "a1").await.unwrap().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.error_message.as_deref(), Some("second"));
        assert_eq!(latest.request_payload.unwrap()["person"]["employeeNo"], "a1");
        assert_eq!(latest.http_status, Some(400));

        assert_eq!(for_attendee(&db, "a1", 1).await.unwrap().len(), 1);
        assert_eq!(recent(&db, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn recent_with_status_filters_outcome() {
        let (_dir, db) = test_db().await;
        insert_sync_log(&db, &log(LogStatus::Failed, Some("old"))).await.unwrap();
        insert_sync_log(&db, &log(LogStatus::Success, None)).await.unwrap();
        insert_sync_log(&db, &log(LogStatus::Failed, Some("new"))).await.unwrap();

        let failed = recent_with_status(&db, LogStatus::Failed, 10).await.unwrap();
        let messages: Vec<_> = failed.iter().map(|l| l.error_message.as_deref()).collect();
        assert_eq!(messages, [Some("new"), Some("old")]);
        assert_eq!(recent_with_status(&db, LogStatus::Failed, 1).await.unwrap().len(), 1);
        assert_eq!(recent_with_status(&db, LogStatus::Success, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rows_are_immutable() {
        let (_dir, db) = test_db().await;
        insert_sync_log(&db, &log(LogStatus::Success, None)).await.unwrap();

        let result = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute("UPDATE sync_logs SET status = 'failed'", [])
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn log_for_unknown_attendee_violates_foreign_key() {
        let (_dir, db) = test_db().await;
        let mut orphan = log(LogStatus::Failed, Some("x"));
        orphan.attendee_id = "ghost".into();
        assert!(insert_sync_log(&db, &orphan).await.is_err());
    }
}
