// error.rs — Error types for audit message decoding.
//
// Uses `thiserror` to derive the standard Rust `Error` trait automatically.
// `ParseError` covers everything that can go wrong while turning one raw
// record into fields; `ConfigError` covers loading decoder options and
// supplemental lookup tables from disk.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while parsing or enriching an audit message.
///
/// `Clone + PartialEq` because a message caches its error and hands out
/// the same value on every access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Some part of the `audit(<sec>.<msec>:<seq>)` header was missing
    /// or not numeric, or the log line lacked its `type=`/`msg=` tokens.
    #[error("invalid audit message header")]
    InvalidHeader,

    /// The `type=` token named a record type that is not in the table.
    #[error("invalid message type '{0}'")]
    UnknownMessageType(String),

    /// Nothing follows the header.
    #[error("message has no data content")]
    NoContent,

    /// A record could not be rewritten into key=value form.
    #[error("failed to parse audit message")]
    NormalizeFailed,

    /// A field required by the record type is absent.
    #[error("{key} key not found")]
    MissingField { key: String },

    /// A field is present but its value could not be interpreted.
    #[error("failed to parse {key}='{value}': {reason}")]
    InvalidField {
        key: String,
        value: String,
        reason: String,
    },

    /// EXECVE declared `argc` arguments but one of `a<i>` is absent.
    #[error("failed to find arg {key}")]
    MissingArgument { key: String },

    /// A SELinux context field could not be split into its components.
    #[error("failed to split SELinux context field {key}")]
    MalformedContext { key: String },
}

impl ParseError {
    pub(crate) fn missing(key: &str) -> Self {
        ParseError::MissingField {
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        ParseError::InvalidField {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur while loading decoder configuration or tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration or tables file.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A table entry has a key that is not a number in the expected base.
    #[error("invalid {table} table entry '{key}': {reason}")]
    InvalidEntry {
        table: String,
        key: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_the_key() {
        assert_eq!(ParseError::missing("arch").to_string(), "arch key not found");
    }

    #[test]
    fn invalid_field_message_includes_value_and_reason() {
        let err = ParseError::invalid("argc", "x", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "failed to parse argc='x': invalid digit found in string"
        );
    }
}
