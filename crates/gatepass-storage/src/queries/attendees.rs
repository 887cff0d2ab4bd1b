// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attendee reads and sync-field writes.

use gatepass_core::{Attendee, GatepassError, NewAttendee, StatusCount, SyncStatus};
use rusqlite::{params, params_from_iter};

use super::{NOW, optional, parse_enum};
use crate::database::{Database, map_tr_err};

const ATTENDEE_COLUMNS: &str = "id, name, national_id, email, phone, face_image_url, event_code, \
     consent_date, sync_status, external_person_id, last_synced_at, last_error, created_at, updated_at";

fn row_to_attendee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attendee> {
    Ok(Attendee {
        id: row.get(0)?,
        name: row.get(1)?,
        national_id: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        face_image_url: row.get(5)?,
        event_code: row.get(6)?,
        consent_date: row.get(7)?,
        sync_status: parse_enum(8, row.get(8)?)?,
        external_person_id: row.get(9)?,
        last_synced_at: row.get(10)?,
        last_error: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn not_found(id: &str) -> GatepassError {
    GatepassError::NotFound {
        entity: "attendee",
        id: id.to_string(),
    }
}

/// Insert a newly registered attendee with status `unset`.
pub async fn insert_attendee(db: &Database, attendee: &NewAttendee) -> Result<(), GatepassError> {
    let a = attendee.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attendees (id, name, national_id, email, phone, face_image_url,
                                        event_code, consent_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    a.id,
                    a.name,
                    a.national_id,
                    a.email,
                    a.phone,
                    a.face_image_url,
                    a.event_code,
                    a.consent_date,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an attendee by ID.
pub async fn get_attendee(db: &Database, id: &str) -> Result<Option<Attendee>, GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], row_to_attendee))
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of attendees whose status is one of `statuses`, oldest registration first.
pub async fn list_ids_by_status(
    db: &Database,
    statuses: &[SyncStatus],
) -> Result<Vec<String>, GatepassError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let sql = format!(
                "SELECT id FROM attendees WHERE sync_status IN ({placeholders})
                 ORDER BY created_at, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Attendees in one status, most recently updated first.
pub async fn list_by_status(
    db: &Database,
    status: SyncStatus,
    limit: u32,
) -> Result<Vec<Attendee>, GatepassError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE sync_status = ?1
                 ORDER BY updated_at DESC, id LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status, limit], row_to_attendee)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Compare-and-set the sync status. Returns whether a row changed.
pub async fn transition_status(
    db: &Database,
    id: &str,
    from: SyncStatus,
    to: SyncStatus,
) -> Result<bool, GatepassError> {
    let id = id.to_string();
    let (from, to) = (from.to_string(), to.to_string());
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE attendees SET sync_status = ?3, updated_at = {NOW}
                     WHERE id = ?1 AND sync_status = ?2"
                ),
                params![id, from, to],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Persist a successful sync.
pub async fn mark_synced(
    db: &Database,
    id: &str,
    external_person_id: &str,
    synced_at: &str,
) -> Result<(), GatepassError> {
    let (id_owned, ext, at) = (id.to_string(), external_person_id.to_string(), synced_at.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE attendees
                     SET sync_status = 'synced', external_person_id = ?2, last_synced_at = ?3,
                         last_error = NULL, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id_owned, ext, at],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Persist a failed sync.
pub async fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), GatepassError> {
    let (id_owned, error) = (id.to_string(), error.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE attendees SET sync_status = 'failed', last_error = ?2, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id_owned, error],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Reset sync fields after the external record was removed.
pub async fn clear_external(db: &Database, id: &str) -> Result<(), GatepassError> {
    let id_owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE attendees
                     SET sync_status = 'unset', external_person_id = NULL, last_synced_at = NULL,
                         last_error = NULL, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id_owned],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Attendee counts grouped by sync status. States with no attendees are omitted.
pub async fn status_counts(db: &Database) -> Result<Vec<StatusCount>, GatepassError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sync_status, COUNT(*) FROM attendees GROUP BY sync_status ORDER BY sync_status",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(StatusCount {
                    status: parse_enum(0, row.get(0)?)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
