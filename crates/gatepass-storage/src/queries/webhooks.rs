// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook audit log: inserted on receipt, finished once.

use gatepass_core::{GatepassError, NewWebhookLog, WebhookLog, WebhookStatus};
use rusqlite::params;

use super::{optional, parse_enum, parse_json};
use crate::database::{Database, map_tr_err};

/// Record an inbound event with status `received`. Returns the row id.
pub async fn insert_webhook_log(db: &Database, log: &NewWebhookLog) -> Result<i64, GatepassError> {
    let event_type = log.event_type.clone();
    let payload = log.payload.to_string();
    let headers = serde_json::to_string(&log.headers)
        .map_err(|e| GatepassError::Internal(format!("failed to encode headers: {e}")))?;
    let source_ip = log.source_ip.clone();
    let received_at = log.received_at.clone();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_logs (event_type, payload, headers, source_ip, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![event_type, payload, headers, source_ip, received_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the final processing status.
pub async fn finish_webhook_log(
    db: &Database,
    id: i64,
    status: WebhookStatus,
    error: Option<&str>,
    processed_at: &str,
) -> Result<(), GatepassError> {
    let status = status.to_string();
    let error = error.map(str::to_string);
    let processed_at = processed_at.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_logs SET status = ?2, error = ?3, processed_at = ?4
                 WHERE id = ?1 AND status = 'received'",
                params![id, status, error, processed_at],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(GatepassError::NotFound {
            entity: "received webhook log",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Get a webhook log row by id.
pub async fn get_webhook_log(db: &Database, id: i64) -> Result<Option<WebhookLog>, GatepassError> {
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                "SELECT id, event_type, payload, headers, source_ip, status, error, received_at,
                        processed_at
                 FROM webhook_logs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(WebhookLog {
                        id: row.get(0)?,
                        event_type: row.get(1)?,
                        payload: parse_json(2, row.get(2)?)?,
                        headers: parse_json(3, row.get(3)?)?,
                        source_ip: row.get(4)?,
                        status: parse_enum(5, row.get(5)?)?,
                        error: row.get(6)?,
                        received_at: row.get(7)?,
                        processed_at: row.get(8)?,
                    })
                },
            ))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn received_then_failed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("webhooks.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let mut headers = BTreeMap::new();
        headers.insert("x-real-ip".to_string(), "10.0.0.9".to_string());
        let id = insert_webhook_log(
            &db,
            &NewWebhookLog {
                event_type: "AccessControllerEvent".into(),
                payload: serde_json::json!({"door": 1}),
                headers,
                source_ip: Some("10.0.0.9".into()),
                received_at: "2026-01-01T00:00:00.000Z".into(),
            },
        )
        .await
        .unwrap();

        let row = get_webhook_log(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, WebhookStatus::Received);
        assert_eq!(row.payload["door"], 1);
        assert_eq!(row.headers["x-real-ip"], "10.0.0.9");

        finish_webhook_log(&db, id, WebhookStatus::Failed, Some("bad"), "2026-01-01T00:00:00.100Z")
            .await
            .unwrap();
        let row = get_webhook_log(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, WebhookStatus::Failed);
        assert_eq!(row.error.as_deref(), Some("bad"));

        assert!(
            finish_webhook_log(&db, id, WebhookStatus::Processed, None, "later")
                .await
                .is_err()
        );
    }
}
