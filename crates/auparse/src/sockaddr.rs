// sockaddr.rs — Decoding of SOCKADDR records.
//
// `saddr` is the raw `struct sockaddr` passed to the syscall, hex
// encoded. The family is in host byte order (little-endian on every
// architecture auditd commonly runs on); ports and addresses are in
// network byte order.

use std::net::{Ipv4Addr, Ipv6Addr};

const AF_UNIX: u16 = 1;
const AF_INET: u16 = 2;
const AF_INET6: u16 = 10;
const AF_NETLINK: u16 = 16;

/// Decode a hex `saddr` value into named fields
/// (`family`, plus `addr`/`port`/`flow`, `path` or `pid`).
pub(crate) fn parse_sockaddr(saddr: &str) -> Result<Vec<(&'static str, String)>, String> {
    let bytes = hex::decode(saddr).map_err(|e| e.to_string())?;
    if bytes.len() < 2 {
        return Err("sockaddr shorter than its family field".to_string());
    }
    let family = u16::from_le_bytes([bytes[0], bytes[1]]);
    let body = &bytes[2..];

    let mut out = Vec::new();
    match family {
        AF_UNIX => {
            out.push(("family", "unix".to_string()));
            out.push(("path", unix_path(body)));
        }
        AF_INET => {
            let (port, addr) = (take::<2>(body, 0)?, take::<4>(body, 2)?);
            out.push(("family", "ipv4".to_string()));
            out.push(("addr", Ipv4Addr::from(addr).to_string()));
            out.push(("port", u16::from_be_bytes(port).to_string()));
        }
        AF_INET6 => {
            let port = take::<2>(body, 0)?;
            let flow = take::<4>(body, 2)?;
            let addr = take::<16>(body, 6)?;
            out.push(("family", "ipv6".to_string()));
            out.push(("addr", Ipv6Addr::from(addr).to_string()));
            out.push(("port", u16::from_be_bytes(port).to_string()));
            let flow = u32::from_be_bytes(flow);
            if flow > 0 {
                out.push(("flow", flow.to_string()));
            }
        }
        AF_NETLINK => {
            // struct sockaddr_nl: family, pad(2), pid(4), groups(4).
            let pid = take::<4>(body, 2)?;
            out.push(("family", "netlink".to_string()));
            out.push(("pid", u32::from_le_bytes(pid).to_string()));
        }
        other => out.push(("family", other.to_string())),
    }
    Ok(out)
}

/// Copy `N` bytes starting at `at`, or fail if the address is truncated.
fn take<const N: usize>(body: &[u8], at: usize) -> Result<[u8; N], String> {
    body.get(at..at + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| format!("sockaddr truncated: need {} bytes at offset {}", N, at + 2))
}

/// Unix socket paths are NUL-terminated; abstract sockets start with a
/// NUL and are shown with a leading `@` the way `ss` prints them.
fn unix_path(body: &[u8]) -> String {
    let (prefix, name) = match body.split_first() {
        Some((0, rest)) => ("@", rest),
        _ => ("", body),
    };
    let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
    format!("{}{}", prefix, String::from_utf8_lossy(&name[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(fields: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn decodes_ipv4() {
        // AF_INET, port 53, 8.8.8.8, zero padding.
        let fields = parse_sockaddr("020000350808080800000000000000000000").unwrap();
        assert_eq!(get(&fields, "family"), Some("ipv4"));
        assert_eq!(get(&fields, "addr"), Some("8.8.8.8"));
        assert_eq!(get(&fields, "port"), Some("53"));
    }

    #[test]
    fn decodes_ipv6() {
        // AF_INET6, port 443, flow 0, ::1, scope 0.
        let fields = parse_sockaddr(
            "0A0001BB000000000000000000000000000000000000000100000000",
        )
        .unwrap();
        assert_eq!(get(&fields, "family"), Some("ipv6"));
        assert_eq!(get(&fields, "addr"), Some("::1"));
        assert_eq!(get(&fields, "port"), Some("443"));
        assert_eq!(get(&fields, "flow"), None);
    }

    #[test]
    fn decodes_unix_path() {
        // AF_UNIX, "/dev/log", NUL padding.
        let fields = parse_sockaddr("01002F6465762F6C6F670000").unwrap();
        assert_eq!(get(&fields, "family"), Some("unix"));
        assert_eq!(get(&fields, "path"), Some("/dev/log"));
    }

    #[test]
    fn decodes_abstract_unix_path() {
        let fields = parse_sockaddr("0100006162").unwrap();
        assert_eq!(get(&fields, "path"), Some("@ab"));
    }

    #[test]
    fn decodes_netlink_pid() {
        let fields = parse_sockaddr("10000000D204000000000000").unwrap();
        assert_eq!(get(&fields, "family"), Some("netlink"));
        assert_eq!(get(&fields, "pid"), Some("1234"));
    }

    #[test]
    fn unknown_family_keeps_number() {
        let fields = parse_sockaddr("11000000").unwrap();
        assert_eq!(fields, vec![("family", "17".to_string())]);
    }

    #[test]
    fn truncated_or_non_hex_input_fails() {
        assert!(parse_sockaddr("0200").is_err());
        assert!(parse_sockaddr("02").is_err());
        assert!(parse_sockaddr("zz00").is_err());
    }
}
