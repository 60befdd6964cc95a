// syscalls.rs — Syscall number → name tables, keyed by audit arch name.
//
// Most of each table is dense (numbers 0..N with no holes), so it is
// stored as a plain name list indexed by number. Syscalls added after
// the architectures were unified (424 and up) are listed sparsely.

/// One architecture's syscall table.
#[derive(Debug, Clone, Copy)]
pub struct SyscallTable {
    /// Arch name as produced by the `ARCHES` table (e.g. "x86_64").
    pub arch: &'static str,
    /// Names for syscall numbers `0..dense.len()`.
    pub dense: &'static [&'static str],
    /// Names for numbers outside the dense range.
    pub sparse: &'static [(u32, &'static str)],
}

impl SyscallTable {
    /// Every (number, name) pair in the table.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &'static str)> + '_ {
        self.dense
            .iter()
            .enumerate()
            .map(|(nr, name)| (nr as u32, *name))
            .chain(self.sparse.iter().copied())
    }
}

/// All shipped syscall tables.
pub static SYSCALL_TABLES: &[SyscallTable] = &[
    SyscallTable {
        arch: "x86_64",
        dense: X86_64,
        sparse: COMMON_424,
    },
    SyscallTable {
        arch: "aarch64",
        dense: AARCH64,
        sparse: AARCH64_SPARSE,
    },
];

// Numbers 424 and above are shared by every architecture.
const COMMON_424: &[(u32, &str)] = &[
    (424, "pidfd_send_signal"),
    (425, "io_uring_setup"),
    (426, "io_uring_enter"),
    (427, "io_uring_register"),
    (428, "open_tree"),
    (429, "move_mount"),
    (430, "fsopen"),
    (431, "fsconfig"),
    (432, "fsmount"),
    (433, "fspick"),
    (434, "pidfd_open"),
    (435, "clone3"),
    (436, "close_range"),
    (437, "openat2"),
    (438, "pidfd_getfd"),
    (439, "faccessat2"),
    (440, "process_madvise"),
    (441, "epoll_pwait2"),
    (442, "mount_setattr"),
    (443, "quotactl_fd"),
    (444, "landlock_create_ruleset"),
    (445, "landlock_add_rule"),
    (446, "landlock_restrict_self"),
    (447, "memfd_secret"),
    (448, "process_mrelease"),
    (449, "futex_waitv"),
    (450, "set_mempolicy_home_node"),
];

const X86_64: &[&str] = &[
    // 0
    "read", "write", "open", "close", "stat", "fstat", "lstat", "poll", "lseek", "mmap",
    // 10
    "mprotect", "munmap", "brk", "rt_sigaction", "rt_sigprocmask", "rt_sigreturn", "ioctl",
    "pread64", "pwrite64", "readv",
    // 20
    "writev", "access", "pipe", "select", "sched_yield", "mremap", "msync", "mincore",
    "madvise", "shmget",
    // 30
    "shmat", "shmctl", "dup", "dup2", "pause", "nanosleep", "getitimer", "alarm", "setitimer",
    "getpid",
    // 40
    "sendfile", "socket", "connect", "accept", "sendto", "recvfrom", "sendmsg", "recvmsg",
    "shutdown", "bind",
    // 50
    "listen", "getsockname", "getpeername", "socketpair", "setsockopt", "getsockopt", "clone",
    "fork", "vfork", "execve",
    // 60
    "exit", "wait4", "kill", "uname", "semget", "semop", "semctl", "shmdt", "msgget", "msgsnd",
    // 70
    "msgrcv", "msgctl", "fcntl", "flock", "fsync", "fdatasync", "truncate", "ftruncate",
    "getdents", "getcwd",
    // 80
    "chdir", "fchdir", "rename", "mkdir", "rmdir", "creat", "link", "unlink", "symlink",
    "readlink",
    // 90
    "chmod", "fchmod", "chown", "fchown", "lchown", "umask", "gettimeofday", "getrlimit",
    "getrusage", "sysinfo",
    // 100
    "times", "ptrace", "getuid", "syslog", "getgid", "setuid", "setgid", "geteuid", "getegid",
    "setpgid",
    // 110
    "getppid", "getpgrp", "setsid", "setreuid", "setregid", "getgroups", "setgroups",
    "setresuid", "getresuid", "setresgid",
    // 120
    "getresgid", "getpgid", "setfsuid", "setfsgid", "getsid", "capget", "capset",
    "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo",
    // 130
    "rt_sigsuspend", "sigaltstack", "utime", "mknod", "uselib", "personality", "ustat",
    "statfs", "fstatfs", "sysfs",
    // 140
    "getpriority", "setpriority", "sched_setparam", "sched_getparam", "sched_setscheduler",
    "sched_getscheduler", "sched_get_priority_max", "sched_get_priority_min",
    "sched_rr_get_interval", "mlock",
    // 150
    "munlock", "mlockall", "munlockall", "vhangup", "modify_ldt", "pivot_root", "_sysctl",
    "prctl", "arch_prctl", "adjtimex",
    // 160
    "setrlimit", "chroot", "sync", "acct", "settimeofday", "mount", "umount2", "swapon",
    "swapoff", "reboot",
    // 170
    "sethostname", "setdomainname", "iopl", "ioperm", "create_module", "init_module",
    "delete_module", "get_kernel_syms", "query_module", "quotactl",
    // 180
    "nfsservctl", "getpmsg", "putpmsg", "afs_syscall", "tuxcall", "security", "gettid",
    "readahead", "setxattr", "lsetxattr",
    // 190
    "fsetxattr", "getxattr", "lgetxattr", "fgetxattr", "listxattr", "llistxattr",
    "flistxattr", "removexattr", "lremovexattr", "fremovexattr",
    // 200
    "tkill", "time", "futex", "sched_setaffinity", "sched_getaffinity", "set_thread_area",
    "io_setup", "io_destroy", "io_getevents", "io_submit",
    // 210
    "io_cancel", "get_thread_area", "lookup_dcookie", "epoll_create", "epoll_ctl_old",
    "epoll_wait_old", "remap_file_pages", "getdents64", "set_tid_address", "restart_syscall",
    // 220
    "semtimedop", "fadvise64", "timer_create", "timer_settime", "timer_gettime",
    "timer_getoverrun", "timer_delete", "clock_settime", "clock_gettime", "clock_getres",
    // 230
    "clock_nanosleep", "exit_group", "epoll_wait", "epoll_ctl", "tgkill", "utimes", "vserver",
    "mbind", "set_mempolicy", "get_mempolicy",
    // 240
    "mq_open", "mq_unlink", "mq_timedsend", "mq_timedreceive", "mq_notify", "mq_getsetattr",
    "kexec_load", "waitid", "add_key", "request_key",
    // 250
    "keyctl", "ioprio_set", "ioprio_get", "inotify_init", "inotify_add_watch",
    "inotify_rm_watch", "migrate_pages", "openat", "mkdirat", "mknodat",
    // 260
    "fchownat", "futimesat", "newfstatat", "unlinkat", "renameat", "linkat", "symlinkat",
    "readlinkat", "fchmodat", "faccessat",
    // 270
    "pselect6", "ppoll", "unshare", "set_robust_list", "get_robust_list", "splice", "tee",
    "sync_file_range", "vmsplice", "move_pages",
    // 280
    "utimensat", "epoll_pwait", "signalfd", "timerfd_create", "eventfd", "fallocate",
    "timerfd_settime", "timerfd_gettime", "accept4", "signalfd4",
    // 290
    "eventfd2", "epoll_create1", "dup3", "pipe2", "inotify_init1", "preadv", "pwritev",
    "rt_tgsigqueueinfo", "perf_event_open", "recvmmsg",
    // 300
    "fanotify_init", "fanotify_mark", "prlimit64", "name_to_handle_at", "open_by_handle_at",
    "clock_adjtime", "syncfs", "sendmmsg", "setns", "getcpu",
    // 310
    "process_vm_readv", "process_vm_writev", "kcmp", "finit_module", "sched_setattr",
    "sched_getattr", "renameat2", "seccomp", "getrandom", "memfd_create",
    // 320
    "kexec_file_load", "bpf", "execveat", "userfaultfd", "membarrier", "mlock2",
    "copy_file_range", "preadv2", "pwritev2", "pkey_mprotect",
    // 330
    "pkey_alloc", "pkey_free", "statx", "io_pgetevents", "rseq",
];

const AARCH64: &[&str] = &[
    // 0
    "io_setup", "io_destroy", "io_submit", "io_cancel", "io_getevents", "setxattr",
    "lsetxattr", "fsetxattr", "getxattr", "lgetxattr",
    // 10
    "fgetxattr", "listxattr", "llistxattr", "flistxattr", "removexattr", "lremovexattr",
    "fremovexattr", "getcwd", "lookup_dcookie", "eventfd2",
    // 20
    "epoll_create1", "epoll_ctl", "epoll_pwait", "dup", "dup3", "fcntl", "inotify_init1",
    "inotify_add_watch", "inotify_rm_watch", "ioctl",
    // 30
    "ioprio_set", "ioprio_get", "flock", "mknodat", "mkdirat", "unlinkat", "symlinkat",
    "linkat", "renameat", "umount2",
    // 40
    "mount", "pivot_root", "nfsservctl", "statfs", "fstatfs", "truncate", "ftruncate",
    "fallocate", "faccessat", "chdir",
    // 50
    "fchdir", "chroot", "fchmod", "fchmodat", "fchownat", "fchown", "openat", "close",
    "vhangup", "pipe2",
    // 60
    "quotactl", "getdents64", "lseek", "read", "write", "readv", "writev", "pread64",
    "pwrite64", "preadv",
    // 70
    "pwritev", "sendfile", "pselect6", "ppoll", "signalfd4", "vmsplice", "splice", "tee",
    "readlinkat", "newfstatat",
    // 80
    "fstat", "sync", "fsync", "fdatasync", "sync_file_range", "timerfd_create",
    "timerfd_settime", "timerfd_gettime", "utimensat", "acct",
    // 90
    "capget", "capset", "personality", "exit", "exit_group", "waitid", "set_tid_address",
    "unshare", "futex", "set_robust_list",
    // 100
    "get_robust_list", "nanosleep", "getitimer", "setitimer", "kexec_load", "init_module",
    "delete_module", "timer_create", "timer_gettime", "timer_getoverrun",
    // 110
    "timer_settime", "timer_delete", "clock_settime", "clock_gettime", "clock_getres",
    "clock_nanosleep", "syslog", "ptrace", "sched_setparam", "sched_setscheduler",
    // 120
    "sched_getscheduler", "sched_getparam", "sched_setaffinity", "sched_getaffinity",
    "sched_yield", "sched_get_priority_max", "sched_get_priority_min",
    "sched_rr_get_interval", "restart_syscall", "kill",
    // 130
    "tkill", "tgkill", "sigaltstack", "rt_sigsuspend", "rt_sigaction", "rt_sigprocmask",
    "rt_sigpending", "rt_sigtimedwait", "rt_sigqueueinfo", "rt_sigreturn",
    // 140
    "setpriority", "getpriority", "reboot", "setregid", "setgid", "setreuid", "setuid",
    "setresuid", "getresuid", "setresgid",
    // 150
    "getresgid", "setfsuid", "setfsgid", "times", "setpgid", "getpgid", "getsid", "setsid",
    "getgroups", "setgroups",
    // 160
    "uname", "sethostname", "setdomainname", "getrlimit", "setrlimit", "getrusage", "umask",
    "prctl", "getcpu", "gettimeofday",
    // 170
    "settimeofday", "adjtimex", "getpid", "getppid", "getuid", "geteuid", "getgid",
    "getegid", "gettid", "sysinfo",
    // 180
    "mq_open", "mq_unlink", "mq_timedsend", "mq_timedreceive", "mq_notify", "mq_getsetattr",
    "msgget", "msgctl", "msgrcv", "msgsnd",
    // 190
    "semget", "semctl", "semtimedop", "semop", "shmget", "shmctl", "shmat", "shmdt",
    "socket", "socketpair",
    // 200
    "bind", "listen", "accept", "connect", "getsockname", "getpeername", "sendto",
    "recvfrom", "setsockopt", "getsockopt",
    // 210
    "shutdown", "sendmsg", "recvmsg", "readahead", "brk", "munmap", "mremap", "add_key",
    "request_key", "keyctl",
    // 220
    "clone", "execve", "mmap", "fadvise64", "swapon", "swapoff", "mprotect", "msync",
    "mlock", "munlock",
    // 230
    "mlockall", "munlockall", "mincore", "madvise", "remap_file_pages", "mbind",
    "get_mempolicy", "set_mempolicy", "migrate_pages", "move_pages",
    // 240
    "rt_tgsigqueueinfo", "perf_event_open", "accept4", "recvmmsg",
];

// 244..259 are reserved for arch-specific calls, which arm64 does not use.
const AARCH64_SPARSE: &[(u32, &str)] = &[
    (260, "wait4"),
    (261, "prlimit64"),
    (262, "fanotify_init"),
    (263, "fanotify_mark"),
    (264, "name_to_handle_at"),
    (265, "open_by_handle_at"),
    (266, "clock_adjtime"),
    (267, "syncfs"),
    (268, "setns"),
    (269, "sendmmsg"),
    (270, "process_vm_readv"),
    (271, "process_vm_writev"),
    (272, "kcmp"),
    (273, "finit_module"),
    (274, "sched_setattr"),
    (275, "sched_getattr"),
    (276, "renameat2"),
    (277, "seccomp"),
    (278, "getrandom"),
    (279, "memfd_create"),
    (280, "bpf"),
    (281, "execveat"),
    (282, "userfaultfd"),
    (283, "membarrier"),
    (284, "mlock2"),
    (285, "copy_file_range"),
    (286, "preadv2"),
    (287, "pwritev2"),
    (288, "pkey_mprotect"),
    (289, "pkey_alloc"),
    (290, "pkey_free"),
    (291, "statx"),
    (292, "io_pgetevents"),
    (293, "rseq"),
    (294, "kexec_file_load"),
    (424, "pidfd_send_signal"),
    (425, "io_uring_setup"),
    (426, "io_uring_enter"),
    (427, "io_uring_register"),
    (428, "open_tree"),
    (429, "move_mount"),
    (430, "fsopen"),
    (431, "fsconfig"),
    (432, "fsmount"),
    (433, "fspick"),
    (434, "pidfd_open"),
    (435, "clone3"),
    (436, "close_range"),
    (437, "openat2"),
    (438, "pidfd_getfd"),
    (439, "faccessat2"),
    (440, "process_madvise"),
    (441, "epoll_pwait2"),
    (442, "mount_setattr"),
    (443, "quotactl_fd"),
    (444, "landlock_create_ruleset"),
    (445, "landlock_add_rule"),
    (446, "landlock_restrict_self"),
    (447, "memfd_secret"),
    (448, "process_mrelease"),
    (449, "futex_waitv"),
    (450, "set_mempolicy_home_node"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn table(arch: &str) -> &'static SyscallTable {
        SYSCALL_TABLES.iter().find(|t| t.arch == arch).unwrap()
    }

    fn name(arch: &str, nr: u32) -> Option<&'static str> {
        table(arch).entries().find(|(n, _)| *n == nr).map(|(_, name)| name)
    }

    #[test]
    fn x86_64_dense_range_ends_at_rseq() {
        assert_eq!(X86_64.len(), 335);
        assert_eq!(name("x86_64", 334), Some("rseq"));
    }

    #[test]
    fn x86_64_well_known_numbers() {
        assert_eq!(name("x86_64", 0), Some("read"));
        assert_eq!(name("x86_64", 2), Some("open"));
        assert_eq!(name("x86_64", 59), Some("execve"));
        assert_eq!(name("x86_64", 257), Some("openat"));
        assert_eq!(name("x86_64", 435), Some("clone3"));
        assert_eq!(name("x86_64", 400), None);
    }

    #[test]
    fn aarch64_well_known_numbers() {
        assert_eq!(AARCH64.len(), 244);
        assert_eq!(name("aarch64", 56), Some("openat"));
        assert_eq!(name("aarch64", 221), Some("execve"));
        assert_eq!(name("aarch64", 260), Some("wait4"));
        assert_eq!(name("aarch64", 250), None);
    }

    #[test]
    fn sparse_entries_do_not_overlap_dense_range() {
        for t in SYSCALL_TABLES {
            assert!(t.sparse.iter().all(|(nr, _)| *nr as usize >= t.dense.len()));
            assert!(t.sparse.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }
}
