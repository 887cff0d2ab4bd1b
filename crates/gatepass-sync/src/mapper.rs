// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attendee to external person record mapping.
//!
//! Pure: the mapping time is an argument, so a retried sync gets a fresh
//! validity window and tests get deterministic output.

use chrono::{DateTime, SecondsFormat, Utc};
use gatepass_core::Attendee;
use serde::Serialize;
use serde_json::{Map, Value};

/// Longest employee number the external system accepts.
const EMPLOYEE_NO_LEN: usize = 20;

/// Person/face record in the external system's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub employee_no: String,
    pub employee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "faceURL", skip_serializing_if = "Option::is_none")]
    pub face_url: Option<String>,
    pub register_time: String,
    pub valid_start_time: String,
    pub valid_end_time: String,
    pub access_level_ids: Vec<String>,
    /// Opaque pass-through metadata for traceability on the external side.
    pub custom_data: Map<String, Value>,
}

/// Profile values the mapper needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSettings {
    pub library_id: String,
    pub validity_days: u32,
}

/// Candidate external id for an attendee that has never been synced.
pub fn derive_employee_no(attendee_id: &str) -> String {
    attendee_id
        .chars()
        .filter(|c| *c != '-')
        .take(EMPLOYEE_NO_LEN)
        .collect()
}

/// Map an attendee to the record sent to the external system.
pub fn to_person_record(
    attendee: &Attendee,
    settings: &MappingSettings,
    now: DateTime<Utc>,
) -> PersonRecord {
    let employee_no = attendee
        .external_person_id
        .clone()
        .unwrap_or_else(|| derive_employee_no(&attendee.id));

    let card_no: String = attendee
        .national_id
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let valid_end = now + chrono::Duration::days(i64::from(settings.validity_days));
    let now_text = timestamp(now);

    let mut custom_data = Map::new();
    custom_data.insert("participantId".into(), Value::String(attendee.id.clone()));
    if let Some(code) = &attendee.event_code {
        custom_data.insert("eventCode".into(), Value::String(code.clone()));
    }
    if let Some(consent) = &attendee.consent_date {
        custom_data.insert("consentDate".into(), Value::String(consent.clone()));
    }

    PersonRecord {
        employee_no,
        employee_name: attendee.name.clone(),
        card_no: (!card_no.is_empty()).then_some(card_no),
        phone_no: attendee.phone.clone(),
        email: attendee.email.clone(),
        face_url: attendee.face_image_url.clone(),
        register_time: now_text.clone(),
        valid_start_time: now_text,
        valid_end_time: timestamp(valid_end),
        access_level_ids: vec![settings.library_id.clone()],
        custom_data,
    }
}

/// RFC 3339 with millisecond precision, the format used for every stored timestamp.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gatepass_core::SyncStatus;

    use super::*;

    fn attendee(external: Option<&str>) -> Attendee {
        Attendee {
            id: "3f2b8c1e-9d4a-4b7e-8f00-1a2b3c4d5e6f".into(),
            name: "Ana Souza".into(),
            national_id: "123.456.789-09".into(),
            email: Some("ana@example.com".into()),
            phone: Some("+55 11 99999-0000".into()),
            face_image_url: Some("https://cdn.example.com/ana.jpg".into()),
            event_code: Some("EXPO26".into()),
            consent_date: Some("2026-01-10T09:00:00.000Z".into()),
            sync_status: SyncStatus::Unset,
            external_person_id: external.map(String::from),
            last_synced_at: None,
            last_error: None,
            created_at: "2026-01-10T09:00:00.000Z".into(),
            updated_at: "2026-01-10T09:00:00.000Z".into(),
        }
    }

    fn settings() -> MappingSettings {
        MappingSettings {
            library_id: "7".into(),
            validity_days: 90,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn derived_employee_no_is_stable() {
        let a = to_person_record(&attendee(None), &settings(), fixed_now());
        let b = to_person_record(&attendee(None), &settings(), Utc::now());
        assert_eq!(a.employee_no, "3f2b8c1e9d4a4b7e8f00");
        assert_eq!(a.employee_no, b.employee_no);
    }

    #[test]
    fn existing_external_id_is_reused() {
        let record = to_person_record(&attendee(Some("HC-000042")), &settings(), fixed_now());
        assert_eq!(record.employee_no, "HC-000042");
    }

    #[test]
    fn short_ids_are_not_padded() {
        assert_eq!(derive_employee_no("ab-cd"), "abcd");
    }

    #[test]
    fn card_number_keeps_digits_only() {
        let record = to_person_record(&attendee(None), &settings(), fixed_now());
        assert_eq!(record.card_no.as_deref(), Some("12345678909"));

        let mut blank = attendee(None);
        blank.national_id = "--".into();
        let record = to_person_record(&blank, &settings(), fixed_now());
        assert_eq!(record.card_no, None);
    }

    #[test]
    fn validity_window_starts_at_mapping_time() {
        let record = to_person_record(&attendee(None), &settings(), fixed_now());
        assert_eq!(record.register_time, "2026-03-01T12:00:00.000Z");
        assert_eq!(record.valid_start_time, "2026-03-01T12:00:00.000Z");
        assert_eq!(record.valid_end_time, "2026-05-30T12:00:00.000Z");

        let short = MappingSettings {
            validity_days: 1,
            ..settings()
        };
        let record = to_person_record(&attendee(None), &short, fixed_now());
        assert_eq!(record.valid_end_time, "2026-03-02T12:00:00.000Z");
    }

    #[test]
    fn wire_shape_uses_external_field_names() {
        let record = to_person_record(&attendee(None), &settings(), fixed_now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["employeeName"], "Ana Souza");
        assert_eq!(json["faceURL"], "https://cdn.example.com/ana.jpg");
        assert_eq!(json["phoneNo"], "+55 11 99999-0000");
        assert_eq!(json["accessLevelIds"], serde_json::json!(["7"]));
        assert_eq!(json["customData"]["participantId"], "3f2b8c1e-9d4a-4b7e-8f00-1a2b3c4d5e6f");
        assert_eq!(json["customData"]["eventCode"], "EXPO26");
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let mut bare = attendee(None);
        bare.email = None;
        bare.phone = None;
        bare.face_image_url = None;
        bare.event_code = None;
        bare.consent_date = None;
        let json = serde_json::to_value(to_person_record(&bare, &settings(), fixed_now())).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("email"));
        assert!(!object.contains_key("faceURL"));
        assert_eq!(json["customData"].as_object().unwrap().len(), 1);
    }
}
