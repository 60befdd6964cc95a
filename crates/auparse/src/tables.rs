// tables.rs — Lookup tables injected into the enrichment pipeline.
//
// The static data lives in the `auparse-tables` crate. `LookupTables`
// turns it into hash maps once and can be extended with entries read
// from a TOML file, so newer kernels (new syscalls, new arches) can be
// handled without a rebuild. Tests build their own small tables.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use auparse_tables::{ARCHES, ERRNO, SYSCALL_TABLES};
use serde::Deserialize;

use crate::error::ConfigError;

/// Architecture, syscall and errno names used during enrichment.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    arches: HashMap<u32, String>,
    /// arch name → (syscall number → syscall name)
    syscalls: HashMap<String, HashMap<u32, String>>,
    errno: HashMap<u32, String>,
}

/// On-disk shape of a supplemental tables file.
///
/// TOML keys are always strings, so numbers are parsed after loading:
/// arch keys as hex (as they appear in SYSCALL records), the rest as
/// decimal.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablesFile {
    arches: HashMap<String, String>,
    errno: HashMap<String, String>,
    syscalls: HashMap<String, HashMap<String, String>>,
}

impl LookupTables {
    /// Tables with no entries at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tables populated from the data shipped in `auparse-tables`.
    pub fn builtin() -> Self {
        let mut tables = Self::empty();
        for (arch, name) in ARCHES {
            tables.insert_arch(*arch, *name);
        }
        for table in SYSCALL_TABLES {
            for (nr, name) in table.entries() {
                tables.insert_syscall(table.arch, nr, name);
            }
        }
        for (errno, name) in ERRNO {
            tables.insert_errno(*errno, *name);
        }
        tables
    }

    /// The process-wide built-in tables, created on first use.
    pub fn shared() -> Arc<LookupTables> {
        static SHARED: OnceLock<Arc<LookupTables>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(LookupTables::builtin()))
            .clone()
    }

    pub fn insert_arch(&mut self, arch: u32, name: impl Into<String>) {
        self.arches.insert(arch, name.into());
    }

    pub fn insert_syscall(&mut self, arch: impl Into<String>, nr: u32, name: impl Into<String>) {
        self.syscalls
            .entry(arch.into())
            .or_default()
            .insert(nr, name.into());
    }

    pub fn insert_errno(&mut self, errno: u32, name: impl Into<String>) {
        self.errno.insert(errno, name.into());
    }

    pub fn arch_name(&self, arch: u32) -> Option<&str> {
        self.arches.get(&arch).map(String::as_str)
    }

    pub fn syscall_name(&self, arch: &str, nr: u32) -> Option<&str> {
        self.syscalls
            .get(arch)
            .and_then(|table| table.get(&nr))
            .map(String::as_str)
    }

    pub fn errno_name(&self, errno: u32) -> Option<&str> {
        self.errno.get(&errno).map(String::as_str)
    }

    /// Merge entries from a tables TOML document. Entries override
    /// existing ones with the same number.
    ///
    /// ```toml
    /// [arches]
    /// c00000f3 = "riscv64"
    ///
    /// [errno]
    /// 2 = "ENOENT"
    ///
    /// [syscalls.riscv64]
    /// 56 = "openat"
    /// ```
    pub fn merge_toml_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let file: TablesFile = toml::from_str(text)?;

        for (key, name) in file.arches {
            let digits = key.trim_start_matches("0x");
            let arch = u32::from_str_radix(digits, 16)
                .map_err(|e| invalid_entry("arches", &key, e))?;
            self.insert_arch(arch, name);
        }
        for (key, name) in file.errno {
            let errno = key.parse().map_err(|e| invalid_entry("errno", &key, e))?;
            self.insert_errno(errno, name);
        }
        for (arch, entries) in file.syscalls {
            for (key, name) in entries {
                let nr = key
                    .parse()
                    .map_err(|e| invalid_entry(&format!("syscalls.{}", arch), &key, e))?;
                self.insert_syscall(arch.clone(), nr, name);
            }
        }
        Ok(())
    }

    /// Merge a tables TOML file from disk. See [`merge_toml_str`](Self::merge_toml_str).
    pub fn load_supplement(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_toml_str(&text)?;
        tracing::info!("loaded supplemental audit tables from {}", path.display());
        Ok(())
    }
}

fn invalid_entry(table: &str, key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEntry {
        table: table.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_resolve_common_names() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.arch_name(0xc000_003e), Some("x86_64"));
        assert_eq!(tables.syscall_name("x86_64", 2), Some("open"));
        assert_eq!(tables.syscall_name("aarch64", 56), Some("openat"));
        assert_eq!(tables.errno_name(2), Some("ENOENT"));
    }

    #[test]
    fn empty_tables_resolve_nothing() {
        let tables = LookupTables::empty();
        assert_eq!(tables.arch_name(0xc000_003e), None);
        assert_eq!(tables.syscall_name("x86_64", 2), None);
        assert_eq!(tables.errno_name(2), None);
    }

    #[test]
    fn shared_tables_are_created_once() {
        let a = LookupTables::shared();
        let b = LookupTables::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn merge_adds_and_overrides_entries() {
        let mut tables = LookupTables::builtin();
        tables
            .merge_toml_str(
                r#"
                [arches]
                0xc00000f3 = "riscv64"

                [errno]
                2 = "NO_SUCH_FILE"

                [syscalls.riscv64]
                56 = "openat"
                "#,
            )
            .unwrap();

        assert_eq!(tables.arch_name(0xc000_00f3), Some("riscv64"));
        assert_eq!(tables.errno_name(2), Some("NO_SUCH_FILE"));
        assert_eq!(tables.syscall_name("riscv64", 56), Some("openat"));
        // Untouched entries survive.
        assert_eq!(tables.syscall_name("x86_64", 59), Some("execve"));
    }

    #[test]
    fn merge_rejects_non_numeric_keys() {
        let mut tables = LookupTables::empty();
        let err = tables
            .merge_toml_str("[errno]\nENOENT = \"2\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { ref table, .. } if table == "errno"));
    }

    #[test]
    fn merge_rejects_malformed_toml() {
        let mut tables = LookupTables::empty();
        assert!(matches!(
            tables.merge_toml_str("[arches\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_supplement_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = LookupTables::empty();
        let err = tables
            .load_supplement(dir.path().join("missing.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }
}
