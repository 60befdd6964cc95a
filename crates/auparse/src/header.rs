// header.rs — Audit header parsing.
//
// Every audit record starts with `audit(<sec>.<msec>:<seq>):`. Kernel
// netlink messages start right there; auditd log lines put
// `type=<NAME> msg=` in front of it. This module only deals with those
// preambles and reports where the key=value payload begins.

use auparse_tables::AuditMessageType;
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ParseError;

const TYPE_TOKEN: &str = "type=";
const MSG_TOKEN: &str = "msg=";

/// The fixed part of an audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub timestamp: DateTime<Utc>,
    pub sequence: u32,
    /// Byte index where the payload begins (the delimiter following the
    /// closing `)`), or `None` if nothing follows the header.
    pub payload_offset: Option<usize>,
}

/// Parse `audit(<sec>.<msec>:<seq>)` out of `text`.
///
/// Delimiters are located in order: the first `(`, then the first `.`
/// after it, the first `:` after that, and the first `)` after that.
pub(crate) fn parse_header(text: &str) -> Result<Header, ParseError> {
    let start = find_from(text, 0, '(')?;
    let dot = find_from(text, start, '.')?;
    let sep = find_from(text, dot, ':')?;
    let end = find_from(text, sep, ')')?;

    let sec: i64 = parse_number(&text[start + 1..dot])?;
    let msec: i64 = parse_number(&text[dot + 1..sep])?;
    let sequence: u32 = parse_number(&text[sep + 1..end])?;

    let timestamp = DateTime::from_timestamp(sec, 0)
        .zip(TimeDelta::try_milliseconds(msec))
        .and_then(|(secs, millis)| secs.checked_add_signed(millis))
        .ok_or(ParseError::InvalidHeader)?;

    Ok(Header {
        timestamp,
        sequence,
        payload_offset: payload_offset(text, end),
    })
}

/// Split an auditd log line into its record type and the text after `msg=`.
///
/// `type=` must appear, complete, before `msg=`. Anything in front of
/// `type=` (such as a syslog prefix) is ignored.
pub(crate) fn split_log_line(line: &str) -> Result<(AuditMessageType, &str), ParseError> {
    let msg_index = line.find(MSG_TOKEN).ok_or(ParseError::InvalidHeader)?;
    let type_index = line[..msg_index]
        .find(TYPE_TOKEN)
        .ok_or(ParseError::InvalidHeader)?;

    let name = line[type_index + TYPE_TOKEN.len()..msg_index].trim();
    if name.is_empty() {
        return Err(ParseError::InvalidHeader);
    }
    let typ = AuditMessageType::from_name(name)
        .ok_or_else(|| ParseError::UnknownMessageType(name.to_string()))?;

    Ok((typ, &line[msg_index + MSG_TOKEN.len()..]))
}

fn find_from(text: &str, from: usize, needle: char) -> Result<usize, ParseError> {
    text[from..]
        .find(needle)
        .map(|i| i + from)
        .ok_or(ParseError::InvalidHeader)
}

fn parse_number<T: std::str::FromStr>(digits: &str) -> Result<T, ParseError> {
    digits.parse().map_err(|_| ParseError::InvalidHeader)
}

fn payload_offset(text: &str, end: usize) -> Option<usize> {
    text[end..]
        .find(|c: char| c == ':' || c.is_ascii_whitespace())
        .map(|i| i + end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamp_and_sequence() {
        let header = parse_header("audit(1490137971.011:50406): pid=1").unwrap();
        assert_eq!(header.timestamp.timestamp(), 1490137971);
        assert_eq!(header.timestamp.timestamp_subsec_millis(), 11);
        assert_eq!(header.sequence, 50406);
    }

    #[test]
    fn payload_starts_at_delimiter_after_header() {
        let text = "audit(1490137971.011:50406): pid=1";
        let header = parse_header(text).unwrap();
        let offset = header.payload_offset.unwrap();
        assert_eq!(&text[offset..], ": pid=1");
    }

    #[test]
    fn header_without_payload_has_no_offset() {
        let header = parse_header("audit(1490137971.011:50406)").unwrap();
        assert_eq!(header.payload_offset, None);
    }

    #[test]
    fn missing_delimiters_are_rejected() {
        for text in [
            "audit1490137971.011:50406): x=1",
            "audit(1490137971011:50406): x=1",
            "audit(1490137971.011 50406) x=1",
            "audit(1490137971.011:50406: x=1",
        ] {
            assert_eq!(parse_header(text), Err(ParseError::InvalidHeader), "{}", text);
        }
    }

    #[test]
    fn non_numeric_components_are_rejected() {
        assert_eq!(
            parse_header("audit(abc.011:50406): x=1"),
            Err(ParseError::InvalidHeader)
        );
        assert_eq!(
            parse_header("audit(1490137971.0x1:50406): x=1"),
            Err(ParseError::InvalidHeader)
        );
        // Sequence must fit in 32 bits.
        assert_eq!(
            parse_header("audit(1490137971.011:4294967296): x=1"),
            Err(ParseError::InvalidHeader)
        );
    }

    #[test]
    fn split_log_line_finds_type_and_message() {
        let (typ, rest) =
            split_log_line("type=SYSCALL msg=audit(1490137971.011:50406): arch=c000003e").unwrap();
        assert_eq!(typ, AuditMessageType::SYSCALL);
        assert_eq!(rest, "audit(1490137971.011:50406): arch=c000003e");
    }

    #[test]
    fn split_log_line_requires_msg_token() {
        assert_eq!(
            split_log_line("type=SYSCALL audit(1490137971.011:50406):"),
            Err(ParseError::InvalidHeader)
        );
    }

    #[test]
    fn split_log_line_requires_type_before_msg() {
        assert_eq!(
            split_log_line("msg=audit(1490137971.011:50406): type=SYSCALL"),
            Err(ParseError::InvalidHeader)
        );
        assert_eq!(
            split_log_line("type= msg=audit(1490137971.011:50406):"),
            Err(ParseError::InvalidHeader)
        );
    }

    #[test]
    fn split_log_line_rejects_unknown_type() {
        assert_eq!(
            split_log_line("type=BOGUS msg=audit(1490137971.011:50406):"),
            Err(ParseError::UnknownMessageType("BOGUS".to_string()))
        );
    }
}
