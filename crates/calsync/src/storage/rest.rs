//! REST document-store backend
//!
//! Implements [`SyncStore`] over the store's plain HTTP document API
//! with a bearer token, for constrained runtimes that cannot link the
//! database SDK. Documents are maps of typed values; [`DocValue`] is
//! the explicit tagged union for that wire format, with hand-written
//! encode/decode instead of reflection.
//!
//! Document layout:
//! - `integrations/{user_id}`: the integration record
//! - `integrations/{user_id}/events/{event_uid}`: one imported event

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::traits::{SyncStore, WRITE_CHUNK};
use crate::error::StorageError;
use crate::models::{
    CalendarListEntry, EventRecord, EventUid, IntegrationPatch, IntegrationRecord, RawEventTime,
    SyncStatus,
};

/// One typed value in a stored document.
///
/// Integers are string-encoded on the wire so 64-bit values survive
/// JSON number precision; timestamps travel as RFC 3339 strings under
/// their own tag.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<DocValue>),
    Map(BTreeMap<String, DocValue>),
}

impl DocValue {
    /// Encode to the wire shape, e.g. `{"stringValue": "x"}`.
    pub fn encode(&self) -> Value {
        match self {
            DocValue::Null => json!({ "nullValue": null }),
            DocValue::Bool(b) => json!({ "booleanValue": b }),
            DocValue::Int(i) => json!({ "integerValue": i.to_string() }),
            DocValue::Double(d) => json!({ "doubleValue": d }),
            DocValue::Str(s) => json!({ "stringValue": s }),
            DocValue::Timestamp(t) => json!({ "timestampValue": t.to_rfc3339() }),
            DocValue::Array(values) => {
                let encoded: Vec<Value> = values.iter().map(DocValue::encode).collect();
                json!({ "arrayValue": { "values": encoded } })
            }
            DocValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
        }
    }

    /// Decode from the wire shape.
    pub fn decode(value: &Value) -> Result<DocValue, StorageError> {
        let obj = value
            .as_object()
            .ok_or_else(|| corrupt("value is not an object"))?;
        let (tag, inner) = obj
            .iter()
            .next()
            .ok_or_else(|| corrupt("value has no type tag"))?;

        match tag.as_str() {
            "nullValue" => Ok(DocValue::Null),
            "booleanValue" => inner
                .as_bool()
                .map(DocValue::Bool)
                .ok_or_else(|| corrupt("booleanValue is not a bool")),
            "integerValue" => inner
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .or_else(|| inner.as_i64())
                .map(DocValue::Int)
                .ok_or_else(|| corrupt("integerValue is not an integer")),
            "doubleValue" => inner
                .as_f64()
                .map(DocValue::Double)
                .ok_or_else(|| corrupt("doubleValue is not a number")),
            "stringValue" => inner
                .as_str()
                .map(|s| DocValue::Str(s.to_string()))
                .ok_or_else(|| corrupt("stringValue is not a string")),
            "timestampValue" => inner
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| DocValue::Timestamp(t.with_timezone(&Utc)))
                .ok_or_else(|| corrupt("timestampValue is not a timestamp")),
            "arrayValue" => {
                let values = inner
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|vs| vs.iter().map(DocValue::decode).collect::<Result<_, _>>())
                    .transpose()?
                    .unwrap_or_default();
                Ok(DocValue::Array(values))
            }
            "mapValue" => {
                let fields = inner
                    .get("fields")
                    .and_then(Value::as_object)
                    .map(decode_fields)
                    .transpose()?
                    .unwrap_or_default();
                Ok(DocValue::Map(fields))
            }
            other => Err(corrupt(&format!("unknown value tag: {}", other))),
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            DocValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            DocValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DocValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(values) => Some(values),
            _ => None,
        }
    }

    fn as_map(&self) -> Option<&BTreeMap<String, DocValue>> {
        match self {
            DocValue::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

fn encode_fields(fields: &BTreeMap<String, DocValue>) -> Value {
    let mut out = serde_json::Map::new();
    for (key, value) in fields {
        out.insert(key.clone(), value.encode());
    }
    Value::Object(out)
}

fn decode_fields(
    obj: &serde_json::Map<String, Value>,
) -> Result<BTreeMap<String, DocValue>, StorageError> {
    let mut out = BTreeMap::new();
    for (key, value) in obj {
        out.insert(key.clone(), DocValue::decode(value)?);
    }
    Ok(out)
}

fn corrupt(message: &str) -> StorageError {
    StorageError::Corrupt(message.to_string())
}

// ============================================================================
// Wire response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    fields: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<DocumentRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    name: String,
}

// ============================================================================
// Store
// ============================================================================

/// [`SyncStore`] over the document API.
pub struct RestSyncStore {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl RestSyncStore {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is the document root, without a trailing slash;
    /// `token` is sent as a bearer token on every request.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Self::DEFAULT_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn integration_path(user_id: &str) -> String {
        format!("integrations/{}", urlencoding::encode(user_id))
    }

    fn event_path(user_id: &str, uid: &str) -> String {
        format!(
            "integrations/{}/events/{}",
            urlencoding::encode(user_id),
            urlencoding::encode(uid)
        )
    }

    fn get_document(
        &self,
        path: &str,
    ) -> Result<Option<BTreeMap<String, DocValue>>, StorageError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header())
            .call();

        let mut response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(e) => return Err(request_error(e)),
        };

        let doc: DocumentResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        match doc.fields {
            Some(fields) => Ok(Some(decode_fields(&fields)?)),
            None => Ok(Some(BTreeMap::new())),
        }
    }

    /// POST a group of writes to the commit endpoint. Each write is
    /// either `{"update": {"name", "fields"}}` or `{"delete": name}`,
    /// optionally guarded by a `currentDocument` precondition.
    fn commit(&self, writes: Vec<Value>) -> Result<(), StorageError> {
        let url = format!("{}:commit", self.base_url);
        match self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header())
            .send_json(json!({ "writes": writes }))
        {
            Ok(_) => Ok(()),
            Err(e) => Err(request_error(e)),
        }
    }
}

fn request_error(err: ureq::Error) -> StorageError {
    match err {
        ureq::Error::StatusCode(status) => StorageError::Api {
            status,
            message: "document api rejected the request".to_string(),
        },
        other => StorageError::Request(other.to_string()),
    }
}

impl SyncStore for RestSyncStore {
    fn load_integration(&self, user_id: &str) -> Result<Option<IntegrationRecord>, StorageError> {
        match self.get_document(&Self::integration_path(user_id))? {
            Some(fields) => Ok(Some(decode_integration(&fields)?)),
            None => Ok(None),
        }
    }

    fn ensure_integration(&self, user_id: &str) -> Result<(), StorageError> {
        let write = json!({
            "update": {
                "name": Self::integration_path(user_id),
                "fields": encode_fields(&encode_integration(&IntegrationRecord::empty())),
            },
            // Create-if-absent: the server rejects the write with 409
            // when the document already exists.
            "currentDocument": { "exists": false },
        });
        match self.commit(vec![write]) {
            Ok(()) => Ok(()),
            Err(StorageError::Api { status: 409, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn update_integration(
        &self,
        user_id: &str,
        patch: IntegrationPatch,
    ) -> Result<(), StorageError> {
        let mut record = match self.get_document(&Self::integration_path(user_id))? {
            Some(fields) => decode_integration(&fields)?,
            None => IntegrationRecord::empty(),
        };
        patch.apply(&mut record);
        record.updated_at = Utc::now();

        let write = json!({
            "update": {
                "name": Self::integration_path(user_id),
                "fields": encode_fields(&encode_integration(&record)),
            },
        });
        self.commit(vec![write])
    }

    fn upsert_events(&self, user_id: &str, events: &[EventRecord]) -> Result<(), StorageError> {
        for chunk in events.chunks(WRITE_CHUNK) {
            let writes = chunk
                .iter()
                .map(|record| {
                    json!({
                        "update": {
                            "name": Self::event_path(user_id, record.uid().as_str()),
                            "fields": encode_fields(&encode_event(record)),
                        },
                    })
                })
                .collect();
            self.commit(writes)?;
        }
        Ok(())
    }

    fn remove_events(&self, user_id: &str, uids: &[EventUid]) -> Result<(), StorageError> {
        for chunk in uids.chunks(WRITE_CHUNK) {
            let writes = chunk
                .iter()
                .map(|uid| json!({ "delete": Self::event_path(user_id, uid.as_str()) }))
                .collect();
            self.commit(writes)?;
        }
        Ok(())
    }

    fn list_event_uids_by_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<EventUid>, StorageError> {
        let mut uids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/integrations/{}/events?calendarId={}",
                self.base_url,
                urlencoding::encode(user_id),
                urlencoding::encode(calendar_id)
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let mut response = self
                .agent
                .get(&url)
                .header("Authorization", &self.auth_header())
                .call()
                .map_err(request_error)?;

            let page: ListDocumentsResponse = response
                .body_mut()
                .read_json()
                .map_err(|e| StorageError::Request(e.to_string()))?;

            for doc in page.documents {
                // The uid is the final path segment of the document name.
                if let Some(uid) = doc.name.rsplit('/').next() {
                    uids.push(EventUid::new(uid));
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(uids)
    }
}

// ============================================================================
// Record encoding
// ============================================================================

fn insert_opt_str(fields: &mut BTreeMap<String, DocValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        fields.insert(key.to_string(), DocValue::Str(v.clone()));
    }
}

fn str_array(values: &[String]) -> DocValue {
    DocValue::Array(values.iter().cloned().map(DocValue::Str).collect())
}

fn encode_integration(record: &IntegrationRecord) -> BTreeMap<String, DocValue> {
    let mut fields = BTreeMap::new();
    insert_opt_str(&mut fields, "accessToken", &record.access_token);
    insert_opt_str(&mut fields, "refreshToken", &record.refresh_token);
    insert_opt_str(&mut fields, "tokenType", &record.token_type);
    insert_opt_str(&mut fields, "scope", &record.scope);
    if let Some(expires_at) = record.expires_at {
        fields.insert("expiresAt".to_string(), DocValue::Int(expires_at));
    }
    fields.insert(
        "syncTokens".to_string(),
        DocValue::Map(
            record
                .sync_tokens
                .iter()
                .map(|(k, v)| (k.clone(), DocValue::Str(v.clone())))
                .collect(),
        ),
    );
    if let Some(at) = record.last_synced_at {
        fields.insert("lastSyncedAt".to_string(), DocValue::Timestamp(at));
    }
    fields.insert(
        "calendarList".to_string(),
        DocValue::Array(
            record
                .calendar_list
                .iter()
                .map(|entry| DocValue::Map(encode_calendar_entry(entry)))
                .collect(),
        ),
    );
    fields.insert(
        "lastSyncStatus".to_string(),
        DocValue::Str(status_str(record.last_sync_status).to_string()),
    );
    match &record.last_sync_error {
        Some(message) => {
            fields.insert("lastSyncError".to_string(), DocValue::Str(message.clone()));
        }
        None => {
            fields.insert("lastSyncError".to_string(), DocValue::Null);
        }
    }
    fields.insert(
        "updatedAt".to_string(),
        DocValue::Timestamp(record.updated_at),
    );
    fields
}

fn encode_calendar_entry(entry: &CalendarListEntry) -> BTreeMap<String, DocValue> {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), DocValue::Str(entry.id.clone()));
    fields.insert("summary".to_string(), DocValue::Str(entry.summary.clone()));
    fields.insert("primary".to_string(), DocValue::Bool(entry.primary));
    fields.insert(
        "accessRole".to_string(),
        DocValue::Str(entry.access_role.clone()),
    );
    insert_opt_str(&mut fields, "backgroundColor", &entry.background_color);
    insert_opt_str(&mut fields, "foregroundColor", &entry.foreground_color);
    fields.insert("selected".to_string(), DocValue::Bool(entry.selected));
    fields
}

fn encode_raw_time(raw: &RawEventTime) -> BTreeMap<String, DocValue> {
    let mut fields = BTreeMap::new();
    insert_opt_str(&mut fields, "date", &raw.date);
    insert_opt_str(&mut fields, "dateTime", &raw.date_time);
    insert_opt_str(&mut fields, "timeZone", &raw.time_zone);
    fields
}

fn encode_event(record: &EventRecord) -> BTreeMap<String, DocValue> {
    let mut fields = BTreeMap::new();
    fields.insert(
        "calendarId".to_string(),
        DocValue::Str(record.calendar_id.clone()),
    );
    fields.insert("eventId".to_string(), DocValue::Str(record.event_id.clone()));
    fields.insert("summary".to_string(), DocValue::Str(record.summary.clone()));
    insert_opt_str(&mut fields, "description", &record.description);
    insert_opt_str(&mut fields, "location", &record.location);
    fields.insert(
        "startDateKey".to_string(),
        DocValue::Str(record.start_date_key.clone()),
    );
    fields.insert(
        "endDateKey".to_string(),
        DocValue::Str(record.end_date_key.clone()),
    );
    fields.insert("startTs".to_string(), DocValue::Int(record.start_ts));
    fields.insert("endTs".to_string(), DocValue::Int(record.end_ts));
    fields.insert("allDay".to_string(), DocValue::Bool(record.all_day));
    fields.insert("dayKeys".to_string(), str_array(&record.day_keys));
    fields.insert("monthKeys".to_string(), str_array(&record.month_keys));
    fields.insert(
        "fiscalYearKeys".to_string(),
        str_array(&record.fiscal_year_keys),
    );
    fields.insert("status".to_string(), DocValue::Str(record.status.clone()));
    fields.insert(
        "startRaw".to_string(),
        DocValue::Map(encode_raw_time(&record.start_raw)),
    );
    fields.insert(
        "endRaw".to_string(),
        DocValue::Map(encode_raw_time(&record.end_raw)),
    );
    insert_opt_str(&mut fields, "organizer", &record.organizer);
    insert_opt_str(&mut fields, "colorId", &record.color_id);
    fields.insert(
        "createdAt".to_string(),
        DocValue::Timestamp(record.created_at),
    );
    fields.insert(
        "updatedAt".to_string(),
        DocValue::Timestamp(record.updated_at),
    );
    fields
}

fn decode_integration(
    fields: &BTreeMap<String, DocValue>,
) -> Result<IntegrationRecord, StorageError> {
    let get_str = |key: &str| {
        fields
            .get(key)
            .and_then(DocValue::as_str)
            .map(String::from)
    };

    let sync_tokens = fields
        .get("syncTokens")
        .and_then(DocValue::as_map)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let calendar_list = fields
        .get("calendarList")
        .and_then(DocValue::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(DocValue::as_map)
                .map(decode_calendar_entry)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let last_sync_status = match get_str("lastSyncStatus").as_deref() {
        None | Some("idle") => SyncStatus::Idle,
        Some("syncing") => SyncStatus::Syncing,
        Some("error") => SyncStatus::Error,
        Some(other) => return Err(corrupt(&format!("unknown sync status: {}", other))),
    };

    Ok(IntegrationRecord {
        access_token: get_str("accessToken"),
        refresh_token: get_str("refreshToken"),
        token_type: get_str("tokenType"),
        scope: get_str("scope"),
        expires_at: fields.get("expiresAt").and_then(DocValue::as_int),
        sync_tokens,
        last_synced_at: fields.get("lastSyncedAt").and_then(DocValue::as_timestamp),
        calendar_list,
        last_sync_status,
        last_sync_error: get_str("lastSyncError"),
        updated_at: fields
            .get("updatedAt")
            .and_then(DocValue::as_timestamp)
            .unwrap_or_else(Utc::now),
    })
}

fn decode_calendar_entry(
    fields: &BTreeMap<String, DocValue>,
) -> Result<CalendarListEntry, StorageError> {
    let get_str = |key: &str| {
        fields
            .get(key)
            .and_then(DocValue::as_str)
            .map(String::from)
    };

    Ok(CalendarListEntry {
        id: get_str("id").ok_or_else(|| corrupt("calendar entry without id"))?,
        summary: get_str("summary").unwrap_or_default(),
        primary: fields
            .get("primary")
            .and_then(DocValue::as_bool)
            .unwrap_or(false),
        access_role: get_str("accessRole").unwrap_or_else(|| "reader".to_string()),
        background_color: get_str("backgroundColor"),
        foreground_color: get_str("foregroundColor"),
        selected: fields
            .get("selected")
            .and_then(DocValue::as_bool)
            .unwrap_or(true),
    })
}

fn status_str(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_doc_value_scalar_roundtrip() {
        let values = vec![
            DocValue::Null,
            DocValue::Bool(true),
            DocValue::Int(9_007_199_254_740_993), // beyond f64 precision
            DocValue::Double(2.5),
            DocValue::Str("hello".to_string()),
            DocValue::Timestamp(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        ];
        for value in values {
            let decoded = DocValue::decode(&value.encode()).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_doc_value_int_is_string_on_wire() {
        let encoded = DocValue::Int(42).encode();
        assert_eq!(encoded["integerValue"], "42");
    }

    #[test]
    fn test_doc_value_nested_roundtrip() {
        let mut inner = BTreeMap::new();
        inner.insert("id".to_string(), DocValue::Str("cal1".to_string()));
        inner.insert("selected".to_string(), DocValue::Bool(false));
        let value = DocValue::Array(vec![DocValue::Map(inner), DocValue::Null]);

        let decoded = DocValue::decode(&value.encode()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_doc_value_rejects_unknown_tag() {
        let bogus = json!({ "blobValue": "x" });
        assert!(DocValue::decode(&bogus).is_err());
    }

    #[test]
    fn test_integration_encode_decode_roundtrip() {
        let mut record = IntegrationRecord::empty();
        record.access_token = Some("at".to_string());
        record.refresh_token = Some("rt".to_string());
        record.expires_at = Some(1_700_000_000_000);
        record
            .sync_tokens
            .insert("cal1".to_string(), "cursor1".to_string());
        record.last_synced_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        record.calendar_list = vec![CalendarListEntry {
            id: "cal1".to_string(),
            summary: "Personal".to_string(),
            primary: true,
            access_role: "owner".to_string(),
            background_color: Some("#16a765".to_string()),
            foreground_color: None,
            selected: false,
        }];
        record.last_sync_status = SyncStatus::Error;
        record.last_sync_error = Some("quota".to_string());
        record.updated_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();

        let decoded = decode_integration(&encode_integration(&record)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_integration_tolerates_missing_fields() {
        let decoded = decode_integration(&BTreeMap::new()).unwrap();
        assert!(decoded.access_token.is_none());
        assert_eq!(decoded.last_sync_status, SyncStatus::Idle);
        assert!(decoded.calendar_list.is_empty());
    }

    #[test]
    fn test_event_encoding_shape() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let record = EventRecord {
            calendar_id: "c1".to_string(),
            event_id: "e1".to_string(),
            summary: "Lecture".to_string(),
            description: None,
            location: None,
            start_date_key: "2024-06-01".to_string(),
            end_date_key: "2024-06-01".to_string(),
            start_ts: at.timestamp_millis(),
            end_ts: at.timestamp_millis() + 3_600_000,
            all_day: false,
            day_keys: vec!["2024-06-01".to_string()],
            month_keys: vec!["2024-06".to_string()],
            fiscal_year_keys: vec!["2024".to_string()],
            status: "confirmed".to_string(),
            start_raw: RawEventTime {
                date: None,
                date_time: Some("2024-06-01T09:00:00+09:00".to_string()),
                time_zone: Some("Asia/Tokyo".to_string()),
            },
            end_raw: Default::default(),
            organizer: None,
            color_id: None,
            created_at: at,
            updated_at: at,
        };

        let fields = encode_event(&record);
        assert_eq!(
            fields.get("calendarId"),
            Some(&DocValue::Str("c1".to_string()))
        );
        assert_eq!(fields.get("allDay"), Some(&DocValue::Bool(false)));
        assert!(matches!(fields.get("dayKeys"), Some(DocValue::Array(v)) if v.len() == 1));
        assert!(matches!(fields.get("startRaw"), Some(DocValue::Map(_))));
        // Absent optionals are omitted entirely.
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn test_document_paths_are_encoded() {
        assert_eq!(
            RestSyncStore::event_path("user@school.edu", "cal1__e1"),
            "integrations/user%40school.edu/events/cal1__e1"
        );
    }
}
