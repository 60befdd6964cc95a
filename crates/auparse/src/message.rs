// message.rs — A parsed audit message and its lazily decoded fields.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use auparse_tables::AuditMessageType;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::enrich::Enrichment;
use crate::error::ParseError;
use crate::extract::extract_key_value_pairs;
use crate::normalize::normalize_message;
use crate::tables::LookupTables;

/// Keys `to_map` reserves for message metadata. Parsed fields with these
/// names never appear in its output.
pub const PROTECTED_KEYS: [&str; 6] = [
    "record_type",
    "@timestamp",
    "sequence",
    "raw_msg",
    "tags",
    "error",
];

/// The outcome of decoding a message payload.
///
/// Decoding never fails as a whole: when a step errors, the fields
/// gathered up to that point are kept and the error is recorded here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedData {
    fields: HashMap<String, String>,
    tags: Vec<String>,
    error: Option<ParseError>,
}

impl DecodedData {
    fn failed(error: ParseError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Tags derived from the audit rule key, if the record carried one.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }
}

/// One audit record: its header plus the raw text it came from.
///
/// The payload is decoded on first access and cached. A message can be
/// shared between threads; concurrent first accesses decode once.
#[derive(Clone)]
pub struct AuditMessage {
    record_type: AuditMessageType,
    timestamp: DateTime<Utc>,
    sequence: u32,
    raw_data: String,
    payload: Option<Range<usize>>,
    tables: Arc<LookupTables>,
    max_msg_depth: usize,
    decoded: OnceLock<DecodedData>,
}

impl AuditMessage {
    pub(crate) fn new(
        record_type: AuditMessageType,
        timestamp: DateTime<Utc>,
        sequence: u32,
        raw_data: String,
        payload: Option<Range<usize>>,
        tables: Arc<LookupTables>,
        max_msg_depth: usize,
    ) -> Self {
        Self {
            record_type,
            timestamp,
            sequence,
            raw_data,
            payload,
            tables,
            max_msg_depth,
            decoded: OnceLock::new(),
        }
    }

    pub fn record_type(&self) -> AuditMessageType {
        self.record_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The input exactly as it was handed to the parser.
    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    /// Decode the payload (once) and return the result.
    pub fn data(&self) -> &DecodedData {
        self.decoded.get_or_init(|| self.decode())
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        self.data().fields()
    }

    pub fn tags(&self) -> &[String] {
        self.data().tags()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.data().error()
    }

    /// Flatten the message into a JSON object: every decoded field plus
    /// `record_type`, `@timestamp`, `sequence`, `raw_msg`, and `tags` /
    /// `error` when present.
    pub fn to_map(&self) -> Map<String, Value> {
        let data = self.data();
        let mut map = Map::new();
        for (key, value) in &data.fields {
            if !PROTECTED_KEYS.contains(&key.as_str()) {
                map.insert(key.clone(), Value::String(value.clone()));
            }
        }

        map.insert("record_type".to_string(), self.record_type.to_string().into());
        map.insert("@timestamp".to_string(), format_timestamp(&self.timestamp).into());
        map.insert("sequence".to_string(), self.sequence.to_string().into());
        map.insert("raw_msg".to_string(), self.raw_data.clone().into());
        if !data.tags.is_empty() {
            map.insert("tags".to_string(), Value::from(data.tags.clone()));
        }
        if let Some(err) = &data.error {
            map.insert("error".to_string(), err.to_string().into());
        }
        map
    }

    fn decode(&self) -> DecodedData {
        let Some(range) = self.payload.clone() else {
            return DecodedData::failed(ParseError::NoContent);
        };
        let payload = match normalize_message(self.record_type, &self.raw_data[range]) {
            Ok(payload) => payload,
            Err(err) => return DecodedData::failed(err),
        };

        let fields = extract_key_value_pairs(&payload, self.max_msg_depth);
        let mut enrichment = Enrichment::new(&self.tables, self.record_type, fields);
        let result = enrichment.run();
        let (fields, tags) = enrichment.finish();

        if let Err(err) = &result {
            tracing::debug!(
                record_type = %self.record_type,
                sequence = self.sequence,
                %err,
                "audit message decoded with error"
            );
        }
        DecodedData {
            fields,
            tags,
            error: result.err(),
        }
    }
}

impl fmt::Debug for AuditMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditMessage")
            .field("record_type", &self.record_type)
            .field("timestamp", &self.timestamp)
            .field("sequence", &self.sequence)
            .field("raw_data", &self.raw_data)
            .finish_non_exhaustive()
    }
}

/// Render a timestamp as `2006-01-02 15:04:05.999999999 -0700 MST`:
/// fractional seconds without trailing zeros, omitted when zero.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    let nanos = timestamp.timestamp_subsec_nanos();
    let fraction = if nanos == 0 {
        String::new()
    } else {
        format!(".{:09}", nanos).trim_end_matches('0').to_string()
    };
    format!(
        "{}{} +0000 UTC",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn message(typ: AuditMessageType, raw: &str) -> AuditMessage {
        let start = raw.find(')').map(|i| i + 1);
        AuditMessage::new(
            typ,
            DateTime::from_timestamp(1_400_000_000, 100_000_000).unwrap(),
            500,
            raw.to_string(),
            start.map(|start| start..raw.len()),
            LookupTables::shared(),
            8,
        )
    }

    #[test]
    fn timestamp_format_trims_fraction() {
        let ts = DateTime::from_timestamp(1_400_000_000, 100_000_000).unwrap();
        assert_eq!(format_timestamp(&ts), "2014-05-13 16:53:20.1 +0000 UTC");
        let ts = DateTime::from_timestamp(1_490_137_971, 11_000_000).unwrap();
        assert_eq!(format_timestamp(&ts), "2017-03-21 23:12:51.011 +0000 UTC");
        let ts = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "1970-01-01 00:00:00 +0000 UTC");
    }

    #[test]
    fn decoding_is_cached() {
        let msg = message(
            AuditMessageType::CWD,
            "audit(1400000000.100:500): cwd=\"/root\"",
        );
        let first = msg.data() as *const DecodedData;
        let second = msg.data() as *const DecodedData;
        assert_eq!(first, second);
        assert_eq!(msg.fields()["cwd"], "/root");
        assert_eq!(msg.to_map(), msg.to_map());
    }

    #[test]
    fn concurrent_first_access_sees_one_result() {
        let msg = Arc::new(message(
            AuditMessageType::SYSCALL,
            "audit(1400000000.100:500): arch=c000003e syscall=2 success=yes exit=3 exe=\"/bin/cat\"",
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let msg = Arc::clone(&msg);
                thread::spawn(move || msg.data() as *const DecodedData as usize)
            })
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(msg.fields()["syscall"], "open");
    }

    #[test]
    fn missing_payload_is_no_content() {
        let msg = message(AuditMessageType::CWD, "audit(1400000000.100:500)");
        let msg = AuditMessage { payload: None, ..msg };
        assert!(msg.fields().is_empty());
        assert_eq!(msg.error(), Some(&ParseError::NoContent));
        assert_eq!(msg.to_map()["error"], "message has no data content");
    }

    #[test]
    fn protected_keys_shadow_parsed_fields() {
        let msg = message(
            AuditMessageType::USER_ACCT,
            "audit(1400000000.100:500): sequence=9 record_type=X raw_msg=y tags=z res=1",
        );
        let map = msg.to_map();
        assert_eq!(map["sequence"], "500");
        assert_eq!(map["record_type"], "USER_ACCT");
        assert_eq!(map["raw_msg"], msg.raw_data());
        assert!(!map.contains_key("tags"));
        assert!(!map.contains_key("error"));
        assert_eq!(map["result"], "success");
        // The fields themselves are still reachable.
        assert_eq!(msg.fields()["sequence"], "9");
    }

    #[test]
    fn error_and_partial_fields_are_both_reported() {
        let msg = message(
            AuditMessageType::SYSCALL,
            "audit(1400000000.100:500): syscall=2 success=yes exit=0 key=\"k\"",
        );
        assert_eq!(msg.error(), Some(&ParseError::missing("arch")));
        let map = msg.to_map();
        assert_eq!(map["error"], "arch key not found");
        assert_eq!(map["tags"], serde_json::json!(["k"]));
        assert_eq!(map["result"], "success");
    }
}
