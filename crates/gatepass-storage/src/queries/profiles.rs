// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device profile rows. Credential columns are opaque encrypted blobs here.

use gatepass_core::{GatepassError, StoredProfile};
use rusqlite::params;

use super::{optional, parse_enum, parse_json};
use crate::database::{Database, map_tr_err};

const PROFILE_COLUMNS: &str = "name, base_url, api_version, auth_type, username, password_enc, \
     api_key_enc, api_secret_enc, request_timeout_ms, max_retries, retry_delay_ms, rate_limit, \
     batch_size, library_id, library_type, validity_days, auto_sync, sync_interval_secs, \
     endpoints, is_active, updated_at";

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredProfile> {
    Ok(StoredProfile {
        name: row.get(0)?,
        base_url: row.get(1)?,
        api_version: row.get(2)?,
        auth_type: parse_enum(3, row.get(3)?)?,
        username: row.get(4)?,
        password_enc: row.get(5)?,
        api_key_enc: row.get(6)?,
        api_secret_enc: row.get(7)?,
        request_timeout_ms: row.get::<_, i64>(8)? as u64,
        max_retries: row.get(9)?,
        retry_delay_ms: row.get::<_, i64>(10)? as u64,
        rate_limit: row.get(11)?,
        batch_size: row.get(12)?,
        library_id: row.get(13)?,
        library_type: row.get(14)?,
        validity_days: row.get(15)?,
        auto_sync: row.get(16)?,
        sync_interval_secs: row.get::<_, i64>(17)? as u64,
        endpoints: parse_json(18, row.get(18)?)?,
        is_active: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

/// Insert or replace a profile; activating one deactivates the others.
pub async fn upsert_profile(db: &Database, profile: &StoredProfile) -> Result<(), GatepassError> {
    let p = profile.clone();
    let endpoints = serde_json::to_string(&p.endpoints)
        .map_err(|e| GatepassError::Internal(format!("failed to encode endpoints: {e}")))?;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if p.is_active {
                tx.execute(
                    "UPDATE device_profiles SET is_active = 0 WHERE name <> ?1",
                    params![p.name],
                )?;
            }
            tx.execute(
                "INSERT OR REPLACE INTO device_profiles (name, base_url, api_version, auth_type,
                     username, password_enc, api_key_enc, api_secret_enc, request_timeout_ms,
                     max_retries, retry_delay_ms, rate_limit, batch_size, library_id,
                     library_type, validity_days, auto_sync, sync_interval_secs, endpoints,
                     is_active, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                         ?17, ?18, ?19, ?20, ?21)",
                params![
                    p.name,
                    p.base_url,
                    p.api_version,
                    p.auth_type.to_string(),
                    p.username,
                    p.password_enc,
                    p.api_key_enc,
                    p.api_secret_enc,
                    p.request_timeout_ms as i64,
                    p.max_retries,
                    p.retry_delay_ms as i64,
                    p.rate_limit,
                    p.batch_size,
                    p.library_id,
                    p.library_type,
                    p.validity_days,
                    p.auto_sync,
                    p.sync_interval_secs as i64,
                    endpoints,
                    p.is_active,
                    p.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a profile by name.
pub async fn get_profile(db: &Database, name: &str) -> Result<Option<StoredProfile>, GatepassError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {PROFILE_COLUMNS} FROM device_profiles WHERE name = ?1");
            optional(conn.query_row(&sql, params![name], row_to_profile))
        })
        .await
        .map_err(map_tr_err)
}

/// The single active profile, if any.
pub async fn get_active_profile(db: &Database) -> Result<Option<StoredProfile>, GatepassError> {
    db.connection()
        .call(|conn| {
            let sql = format!("SELECT {PROFILE_COLUMNS} FROM device_profiles WHERE is_active = 1");
            optional(conn.query_row(&sql, [], row_to_profile))
        })
        .await
        .map_err(map_tr_err)
}
