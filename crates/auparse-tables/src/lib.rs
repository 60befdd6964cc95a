//! # auparse-tables
//!
//! Read-only lookup data for decoding Linux audit messages.
//!
//! Nothing in this crate computes anything interesting: it is the
//! kernel's numbering of audit record types, audit architectures,
//! per-architecture syscall numbers and errno values, written down as
//! static slices. The `auparse` crate turns these into hash maps once
//! and injects them into its enrichment pipeline.

pub mod arch;
pub mod errno;
pub mod msg_type;
pub mod syscalls;

pub use arch::ARCHES;
pub use errno::ERRNO;
pub use msg_type::{AuditMessageType, MESSAGE_TYPES};
pub use syscalls::{SyscallTable, SYSCALL_TABLES};
