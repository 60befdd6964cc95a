// parser.rs — Entry points that turn text into `AuditMessage`s.

use std::sync::Arc;

use auparse_tables::AuditMessageType;

use crate::config::DecoderConfig;
use crate::error::{ConfigError, ParseError};
use crate::header::{parse_header, split_log_line};
use crate::message::AuditMessage;
use crate::tables::LookupTables;

/// Parses audit records against a fixed set of lookup tables.
///
/// Parsing only reads the header; the payload is decoded when a
/// message's fields are first requested.
#[derive(Debug, Clone)]
pub struct AuditParser {
    tables: Arc<LookupTables>,
    max_msg_depth: usize,
}

impl Default for AuditParser {
    fn default() -> Self {
        Self::new(LookupTables::shared())
    }
}

impl AuditParser {
    pub fn new(tables: Arc<LookupTables>) -> Self {
        Self {
            tables,
            max_msg_depth: DecoderConfig::default().max_msg_depth,
        }
    }

    /// Build a parser from a config, loading its supplemental tables.
    pub fn from_config(config: &DecoderConfig) -> Result<Self, ConfigError> {
        let tables = match &config.tables {
            Some(path) => {
                let mut tables = LookupTables::builtin();
                tables.load_supplement(path)?;
                Arc::new(tables)
            }
            None => LookupTables::shared(),
        };
        Ok(Self::new(tables).with_max_msg_depth(config.max_msg_depth))
    }

    pub fn with_max_msg_depth(mut self, depth: usize) -> Self {
        self.max_msg_depth = depth;
        self
    }

    pub fn tables(&self) -> &Arc<LookupTables> {
        &self.tables
    }

    /// Parse a record whose type is already known, as received from the
    /// kernel over netlink: `audit(1490137971.011:50406): pid=...`.
    pub fn parse(&self, typ: AuditMessageType, message: &str) -> Result<AuditMessage, ParseError> {
        self.parse_from(typ, message.to_string(), 0)
    }

    /// Parse one line of an auditd log:
    /// `type=SYSCALL msg=audit(1490137971.011:50406): arch=...`.
    pub fn parse_log_line(&self, line: &str) -> Result<AuditMessage, ParseError> {
        let (typ, message) = split_log_line(line)?;
        let start = line.len() - message.len();
        self.parse_from(typ, line.to_string(), start)
    }

    /// Parse the record in `raw[start..]`. Surrounding whitespace is
    /// ignored; `raw` itself is kept unmodified.
    fn parse_from(
        &self,
        typ: AuditMessageType,
        raw: String,
        start: usize,
    ) -> Result<AuditMessage, ParseError> {
        let body = &raw[start..];
        let text_start = start + (body.len() - body.trim_start().len());
        let text = raw[text_start..].trim_end();
        let text_end = text_start + text.len();

        let header = parse_header(text)?;
        let payload = header
            .payload_offset
            .map(|offset| text_start + offset..text_end);

        Ok(AuditMessage::new(
            typ,
            header.timestamp,
            header.sequence,
            raw,
            payload,
            Arc::clone(&self.tables),
            self.max_msg_depth,
        ))
    }
}

/// Parse a record with the built-in lookup tables. See [`AuditParser::parse`].
pub fn parse(typ: AuditMessageType, message: &str) -> Result<AuditMessage, ParseError> {
    AuditParser::default().parse(typ, message)
}

/// Parse an auditd log line with the built-in lookup tables.
/// See [`AuditParser::parse_log_line`].
pub fn parse_log_line(line: &str) -> Result<AuditMessage, ParseError> {
    AuditParser::default().parse_log_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_header_only() {
        let msg = parse(
            AuditMessageType::SYSCALL,
            "  audit(1490137971.011:50406): arch=zz\n",
        )
        .unwrap();
        assert_eq!(msg.sequence(), 50406);
        assert_eq!(msg.timestamp().timestamp_subsec_millis(), 11);
        assert_eq!(msg.raw_data(), "  audit(1490137971.011:50406): arch=zz\n");
        // The bad arch only shows up once the payload is decoded.
        assert!(msg.error().is_some());
    }

    #[test]
    fn bad_header_is_rejected() {
        assert_eq!(
            parse(AuditMessageType::SYSCALL, "audit(abc.011:5): x=1").unwrap_err(),
            ParseError::InvalidHeader
        );
    }

    #[test]
    fn log_line_type_is_resolved() {
        let msg =
            parse_log_line("type=CWD msg=audit(1490137971.011:50406):  cwd=\"/home/user\"").unwrap();
        assert_eq!(msg.record_type(), AuditMessageType::CWD);
        assert_eq!(msg.fields()["cwd"], "/home/user");
        assert!(msg.raw_data().starts_with("type=CWD"));
    }

    #[test]
    fn numeric_log_line_type() {
        let msg = parse_log_line("type=UNKNOWN[1334] msg=audit(1490137971.011:1): x=1").unwrap();
        assert_eq!(msg.record_type(), AuditMessageType(1334));
        assert_eq!(msg.fields()["x"], "1");
    }

    #[test]
    fn unknown_log_line_type_is_rejected() {
        assert_eq!(
            parse_log_line("type=NOPE msg=audit(1490137971.011:1): x=1").unwrap_err(),
            ParseError::UnknownMessageType("NOPE".to_string())
        );
    }

    #[test]
    fn trailing_newline_does_not_reach_payload() {
        let msg = parse_log_line(
            "type=CRED_DISP msg=audit(1490137971.011:1): pid=1 msg='op=PAM:setcred acct=\"root\" exe=\"/usr/sbin/sshd\" (hostname=1.2.3.4, addr=1.2.3.4, terminal=ssh res=success)'\n",
        )
        .unwrap();
        assert_eq!(msg.error(), None);
        assert_eq!(msg.fields()["hostname"], "1.2.3.4,");
        assert_eq!(msg.fields()["result"], "success");
    }

    #[test]
    fn max_msg_depth_is_applied() {
        let parser = AuditParser::default().with_max_msg_depth(0);
        let msg = parser
            .parse(
                AuditMessageType::USER_ACCT,
                "audit(1490137971.011:1): pid=1 msg='op=x res=success'",
            )
            .unwrap();
        assert_eq!(msg.fields()["msg"], "op=x res=success");
        assert!(!msg.fields().contains_key("op"));
    }
}
