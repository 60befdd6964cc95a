// arch.rs — Audit architecture identifiers.
//
// The `arch` field of a SYSCALL record is the ELF machine number OR'd
// with the __AUDIT_ARCH_64BIT (0x80000000) and __AUDIT_ARCH_LE
// (0x40000000) flags, printed as lowercase hex.

/// Audit architecture value → mnemonic name used to key syscall tables.
pub static ARCHES: &[(u32, &str)] = &[
    (0x0000_0000, "noarch"),
    (0xc000_9026, "alpha"),
    (0x4000_0028, "arm"),
    (0x0000_0028, "armeb"),
    (0xc000_00b7, "aarch64"),
    (0x4000_0026, "cris"),
    (0x0000_002e, "h8300"),
    (0x4000_0003, "i386"),
    (0xc000_0032, "ia64"),
    (0x0000_0058, "m32r"),
    (0x0000_0004, "m68k"),
    (0x0000_00ba, "microblaze"),
    (0x0000_0008, "mips"),
    (0x4000_0008, "mipsel"),
    (0x8000_0008, "mips64"),
    (0xa000_0008, "mips64n32"),
    (0xc000_0008, "mipsel64"),
    (0xe000_0008, "mipsel64n32"),
    (0x4000_0071, "openrisc"),
    (0x0000_000f, "parisc"),
    (0x8000_000f, "parisc64"),
    (0x0000_0014, "ppc"),
    (0x8000_0015, "ppc64"),
    (0xc000_0015, "ppc64le"),
    (0x4000_00f3, "riscv32"),
    (0xc000_00f3, "riscv64"),
    (0x0000_0016, "s390"),
    (0x8000_0016, "s390x"),
    (0x0000_002a, "sh"),
    (0x4000_002a, "shel"),
    (0x8000_002a, "sh64"),
    (0xc000_002a, "shel64"),
    (0x0000_0002, "sparc"),
    (0x8000_002b, "sparc64"),
    (0xc000_003e, "x86_64"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn arch_values_are_unique() {
        let values: HashSet<u32> = ARCHES.iter().map(|(v, _)| *v).collect();
        assert_eq!(values.len(), ARCHES.len());
    }

    #[test]
    fn common_arches_present() {
        let lookup = |v: u32| ARCHES.iter().find(|(a, _)| *a == v).map(|(_, n)| *n);
        assert_eq!(lookup(0xc000_003e), Some("x86_64"));
        assert_eq!(lookup(0x4000_0003), Some("i386"));
        assert_eq!(lookup(0xc000_00b7), Some("aarch64"));
    }
}
