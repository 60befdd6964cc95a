// extract.rs — Key/value tokenizer.
//
// Audit payloads are `name=value` pairs where a value is either a bare
// run of non-space characters or a single/double quoted string that may
// contain spaces. The payload is scanned for that pattern as a whole
// rather than split on whitespace.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Matches quoted and unquoted key=value pairs.
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-z0-9_-]+)=((?:[^"'\s]+)|'(?:\\'|[^'])*'|"(?:\\"|[^"])*")"#)
        .expect("key=value regex is valid")
});

/// Values that carry no information and are dropped.
const SENTINELS: &[&str] = &["", "?", "?,", "(null)"];

/// One extracted field: the token as it appeared in the message and the
/// value that enrichment steps refine in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    orig: String,
    value: String,
}

impl Field {
    pub fn new(orig: impl Into<String>) -> Self {
        let orig = orig.into();
        Self {
            value: orig.clone(),
            orig,
        }
    }

    /// The original token, including any surrounding quotes.
    pub fn orig(&self) -> &str {
        &self.orig
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

pub(crate) type FieldMap = HashMap<String, Field>;

/// Tokenize `msg` into fields, re-tokenizing embedded `msg=` payloads up
/// to `max_depth` levels deep.
pub(crate) fn extract_key_value_pairs(msg: &str, max_depth: usize) -> FieldMap {
    let mut fields = FieldMap::new();
    extract_into(msg, &mut fields, 0, max_depth);
    fields
}

fn extract_into(msg: &str, fields: &mut FieldMap, depth: usize, max_depth: usize) {
    for caps in KEY_VALUE.captures_iter(msg) {
        let key = &caps[1];
        let token = &caps[2];

        let mut field = Field::new(token);
        field.set(trim_quotes_and_space(token));
        if SENTINELS.contains(&field.value()) {
            continue;
        }

        if key == "msg" {
            if depth < max_depth {
                extract_into(field.value(), fields, depth + 1, max_depth);
                continue;
            }
            tracing::warn!(depth, "embedded msg payload nested too deeply, keeping it verbatim");
        }
        fields.insert(key.to_string(), field);
    }
}

fn trim_quotes_and_space(value: &str) -> &str {
    value.trim_matches(|c: char| c == '\'' || c == '"' || c == ' ')
}
