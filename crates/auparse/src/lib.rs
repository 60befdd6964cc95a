//! # auparse
//!
//! Decoder and enricher for Linux kernel audit messages.
//!
//! Audit records arrive either from the kernel over netlink
//! (`audit(1490137971.011:50406): arch=c000003e syscall=2 ...`) or as
//! auditd log lines (`type=SYSCALL msg=audit(...): ...`). Parsing reads
//! the header eagerly; the key=value payload is decoded on first access
//! into readable fields: architecture and syscall names, errno names,
//! SELinux context parts, socket addresses, hex-decoded paths and
//! arguments, and rule keys as tags.
//!
//! ## Quick Example
//!
//! ```rust
//! use auparse::parse_log_line;
//!
//! let msg = parse_log_line(
//!     "type=SYSCALL msg=audit(1400000000.100:500): arch=c000003e syscall=2 \
//!      success=yes exit=3 auid=4294967295 exe=\"/bin/cat\" key=\"files\"",
//! )
//! .unwrap();
//! assert_eq!(msg.fields()["syscall"], "open");
//! assert_eq!(msg.fields()["auid"], "unset");
//! assert_eq!(msg.tags(), ["files"]);
//! ```
//!
//! Lookup tables come from the `auparse-tables` crate and can be
//! extended at runtime; see [`LookupTables`] and [`DecoderConfig`].

pub mod config;
mod encoding;
mod enrich;
pub mod error;
mod extract;
mod header;
pub mod message;
mod normalize;
pub mod parser;
mod sockaddr;
pub mod tables;

pub use auparse_tables::AuditMessageType;
pub use config::DecoderConfig;
pub use error::{ConfigError, ParseError};
pub use message::{format_timestamp, AuditMessage, DecodedData};
pub use parser::{parse, parse_log_line, AuditParser};
pub use tables::LookupTables;
