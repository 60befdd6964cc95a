// enrich.rs — Field enrichment after key/value extraction.
//
// Raw audit values are numbers and hex blobs: `arch=c000003e`,
// `syscall=2`, `exit=-2`, `proctitle=2F62696E...`. Enrichment rewrites
// them into names a person can read. The pipeline is:
//
// 1. auid/ses: 4294967295 and -1 → "unset"
// 2. subj: SELinux context → subj_user, subj_role, ...
// 3. success/res → result ("success" | "fail")
// 4. exit: negative errno → its name
// 5. key: audit rule key → message tags
// 6. cwd: hex decode (best effort)
//
// followed by one record-type specific step (see `dispatch`). The first
// error stops the pipeline; whatever was enriched so far is kept.

use std::collections::HashMap;

use auparse_tables::AuditMessageType;

use crate::encoding::{decode_uppercase_hex, hex_to_string, hex_to_strings};
use crate::error::ParseError;
use crate::extract::{Field, FieldMap};
use crate::sockaddr::parse_sockaddr;
use crate::tables::LookupTables;

/// Suffixes for the components of `user:role:domain:level:category`.
const SELINUX_CONTEXT_PARTS: [&str; 5] = ["_user", "_role", "_domain", "_level", "_category"];

/// Separator between multiple keys in a hex-encoded rule key.
const RULE_KEY_SEPARATOR: u8 = 0x01;

/// Mutable state for enriching the fields of one message.
///
/// Owned by a single decode pass; `finish` turns it into the immutable
/// field map and tag list the message publishes.
pub(crate) struct Enrichment<'t> {
    tables: &'t LookupTables,
    record_type: AuditMessageType,
    fields: FieldMap,
    tags: Vec<String>,
}

impl<'t> Enrichment<'t> {
    pub fn new(tables: &'t LookupTables, record_type: AuditMessageType, fields: FieldMap) -> Self {
        Self {
            tables,
            record_type,
            fields,
            tags: Vec::new(),
        }
    }

    /// Run every enrichment step in order, stopping at the first error.
    pub fn run(&mut self) -> Result<(), ParseError> {
        self.normalize_unset_id("auid");
        self.normalize_unset_id("ses");
        // Many record types carry a subject context, so check them all.
        self.selinux_context("subj")?;
        self.result()?;
        self.exit()?;
        self.audit_rule_key();
        self.try_hex_decode("cwd");
        self.dispatch()
    }

    pub fn finish(self) -> (HashMap<String, String>, Vec<String>) {
        let fields = self
            .fields
            .into_iter()
            .map(|(key, field)| (key, field.into_value()))
            .collect();
        (fields, self.tags)
    }

    fn dispatch(&mut self) -> Result<(), ParseError> {
        match self.record_type {
            AuditMessageType::SYSCALL => {
                self.arch()?;
                self.syscall()?;
                self.hex_decode("exe")
            }
            AuditMessageType::SOCKADDR => self.saddr(),
            AuditMessageType::PROCTITLE => self.hex_decode("proctitle"),
            AuditMessageType::USER_CMD => self.hex_decode("cmd"),
            AuditMessageType::TTY | AuditMessageType::USER_TTY => self.hex_decode("data"),
            AuditMessageType::EXECVE => self.execve_args(),
            AuditMessageType::PATH => {
                self.selinux_context("obj")?;
                self.try_hex_decode("name");
                Ok(())
            }
            AuditMessageType::USER_LOGIN => {
                // acct is only present (and hex encoded) on failed logins.
                self.try_hex_decode("acct");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn normalize_unset_id(&mut self, key: &str) {
        if let Some(field) = self.fields.get_mut(key) {
            if matches!(field.value(), "4294967295" | "-1") {
                field.set("unset");
            }
        }
    }

    /// Split a SELinux context into `<key>_user`, `<key>_role`, ... and
    /// remove `<key>`. A context with more than five parts keeps the rest
    /// in `<key>_category`.
    fn selinux_context(&mut self, key: &str) -> Result<(), ParseError> {
        let Some(field) = self.fields.get(key) else {
            return Ok(());
        };
        if field.value().is_empty() {
            return Err(ParseError::MalformedContext {
                key: key.to_string(),
            });
        }

        let parts: Vec<String> = field
            .value()
            .splitn(SELINUX_CONTEXT_PARTS.len(), ':')
            .map(str::to_string)
            .collect();
        self.fields.remove(key);
        for (suffix, part) in SELINUX_CONTEXT_PARTS.iter().zip(parts) {
            self.fields.insert(format!("{}{}", key, suffix), Field::new(part));
        }
        Ok(())
    }

    /// SYSCALL records report `success=yes|no`, everything else `res=`.
    /// Both become `result=success|fail`.
    fn result(&mut self) -> Result<(), ParseError> {
        let field = match self
            .fields
            .remove("success")
            .or_else(|| self.fields.remove("res"))
        {
            Some(field) => field,
            None if self.record_type == AuditMessageType::SYSCALL => {
                return Err(ParseError::missing("success"))
            }
            None => return Ok(()),
        };

        let value = field.value().to_ascii_lowercase();
        let result = if value == "yes" || value == "1" || value.starts_with("suc") {
            "success"
        } else {
            "fail"
        };
        self.fields.insert("result".to_string(), Field::new(result));
        Ok(())
    }

    /// Replace a negative exit code with its errno name (`-2` → `ENOENT`).
    fn exit(&mut self) -> Result<(), ParseError> {
        let Some(field) = self.fields.get_mut("exit") else {
            if self.record_type == AuditMessageType::SYSCALL {
                return Err(ParseError::missing("exit"));
            }
            return Ok(());
        };

        let code: i64 = field
            .value()
            .parse()
            .map_err(|e| ParseError::invalid("exit", field.value(), e))?;
        if code >= 0 {
            return Ok(());
        }
        let name = u32::try_from(code.unsigned_abs())
            .ok()
            .and_then(|errno| self.tables.errno_name(errno));
        if let Some(name) = name {
            field.set(name);
        }
        Ok(())
    }

    /// Turn the audit rule key into message tags.
    ///
    /// Rules with several keys log them hex encoded and joined by 0x01.
    /// Otherwise the value is either `key` or `key=value`, and only the
    /// part after the `=` is kept. A plain key that happens to be valid
    /// uppercase hex (`key=CAFE`) is decoded as hex; auditd has the same
    /// ambiguity.
    fn audit_rule_key(&mut self) {
        let Some(field) = self.fields.remove("key") else {
            return;
        };

        if let Ok(decoded) = decode_uppercase_hex(field.orig()) {
            self.tags = decoded
                .split(|b| *b == RULE_KEY_SEPARATOR)
                .map(|key| String::from_utf8_lossy(key).into_owned())
                .collect();
            return;
        }

        let tag = match field.value().split_once('=') {
            Some((_, value)) => value,
            None => field.value(),
        };
        self.tags = vec![tag.to_string()];
    }

    fn arch(&mut self) -> Result<(), ParseError> {
        let field = self
            .fields
            .get_mut("arch")
            .ok_or_else(|| ParseError::missing("arch"))?;
        let arch = u64::from_str_radix(field.value(), 16)
            .map_err(|e| ParseError::invalid("arch", field.value(), e))?;

        let name = u32::try_from(arch)
            .ok()
            .and_then(|arch| self.tables.arch_name(arch))
            .map(str::to_string)
            .unwrap_or_else(|| format!("unknown[{:x}]", arch));
        field.set(name);
        Ok(())
    }

    /// Resolve the syscall number using the table of the (already
    /// resolved) architecture. Unknown numbers stay numeric.
    fn syscall(&mut self) -> Result<(), ParseError> {
        let field = self
            .fields
            .get("syscall")
            .ok_or_else(|| ParseError::missing("syscall"))?;
        let nr: i64 = field
            .value()
            .parse()
            .map_err(|e| ParseError::invalid("syscall", field.value(), e))?;

        let arch = self
            .fields
            .get("arch")
            .ok_or_else(|| ParseError::missing("arch"))?;
        let name = u32::try_from(nr)
            .ok()
            .and_then(|nr| self.tables.syscall_name(arch.value(), nr))
            .map(str::to_string);

        if let (Some(name), Some(field)) = (name, self.fields.get_mut("syscall")) {
            field.set(name);
        }
        Ok(())
    }

    /// Replace `saddr` with the decoded socket address fields.
    fn saddr(&mut self) -> Result<(), ParseError> {
        let field = self
            .fields
            .get("saddr")
            .ok_or_else(|| ParseError::missing("saddr"))?;
        let decoded = parse_sockaddr(field.value())
            .map_err(|reason| ParseError::invalid("saddr", field.value(), reason))?;

        self.fields.remove("saddr");
        for (key, value) in decoded {
            self.fields.insert(key.to_string(), Field::new(value));
        }
        Ok(())
    }

    /// Decode the hex-encoded EXECVE arguments `a0..a<argc-1>`.
    fn execve_args(&mut self) -> Result<(), ParseError> {
        let argc = self
            .fields
            .get("argc")
            .ok_or_else(|| ParseError::missing("argc"))?;
        let count: u32 = argc
            .value()
            .parse()
            .map_err(|e| ParseError::invalid("argc", argc.value(), e))?;

        for i in 0..count {
            let key = format!("a{}", i);
            let arg = self
                .fields
                .get_mut(&key)
                .ok_or_else(|| ParseError::MissingArgument { key: key.clone() })?;
            // Arguments without special characters are logged quoted.
            if let Ok(text) = hex_to_string(arg.orig()) {
                arg.set(text);
            }
        }
        Ok(())
    }

    /// Decode a hex-encoded field in place.
    ///
    /// Only a missing field is an error. A value that is not hex (the
    /// kernel quotes plain strings instead) is left unchanged.
    fn hex_decode(&mut self, key: &str) -> Result<(), ParseError> {
        let field = self
            .fields
            .get_mut(key)
            .ok_or_else(|| ParseError::missing(key))?;

        match hex_to_strings(field.orig()) {
            Ok(decoded) if !decoded.is_empty() => field.set(decoded.join(" ")),
            Ok(_) => {}
            Err(err) => tracing::trace!(key, ?err, "field is not hex encoded"),
        }
        Ok(())
    }

    /// `hex_decode` for fields that are optional in their record type.
    fn try_hex_decode(&mut self, key: &str) {
        if let Err(err) = self.hex_decode(key) {
            tracing::trace!(%err, "skipping optional hex field");
        }
    }
}
