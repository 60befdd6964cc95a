// normalize.rs — Rewrites records that are not plain key=value text.
//
// A few record types carry free-form prefixes or reserved words that the
// key=value tokenizer would misread. Each is rewritten into an
// equivalent key=value form; every other record passes through as-is.

use std::borrow::Cow;
use std::sync::LazyLock;

use auparse_tables::AuditMessageType;
use regex::Regex;

use crate::error::ParseError;

/// Matches the start of an SELinux AVC record, e.g. `avc:  denied  { read } for  `.
static SELINUX_AVC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"avc:\s+(\w+)\s+\{\s*(.*)\s*\}\s+for\s+").expect("AVC regex is valid")
});

/// Return `msg` in a form the key=value extractor can tokenize.
pub(crate) fn normalize_message(
    typ: AuditMessageType,
    msg: &str,
) -> Result<Cow<'_, str>, ParseError> {
    match typ {
        AuditMessageType::AVC => normalize_avc(msg),
        AuditMessageType::LOGIN => Ok(Cow::Owned(
            msg.replacen("old ", "old_", 2).replacen("new ", "new_", 2),
        )),
        AuditMessageType::CRED_DISP
        | AuditMessageType::USER_START
        | AuditMessageType::USER_END => Ok(Cow::Owned(
            msg.replacen(" (hostname=", " hostname=", 2)
                .trim_end_matches(|c: char| c == ')' || c == '\'')
                .to_string(),
        )),
        _ => Ok(Cow::Borrowed(msg)),
    }
}

fn normalize_avc(msg: &str) -> Result<Cow<'_, str>, ParseError> {
    // AppArmor and other non-SELinux AVCs are already key=value.
    let Some(caps) = SELINUX_AVC.captures(msg) else {
        return Ok(Cow::Borrowed(msg));
    };
    let (Some(whole), Some(verdict), Some(perms)) = (caps.get(0), caps.get(1), caps.get(2))
    else {
        return Err(ParseError::NormalizeFailed);
    };

    let perms: Vec<&str> = perms.as_str().split_whitespace().collect();
    Ok(Cow::Owned(format!(
        "seresult={} seperms={} {}",
        verdict.as_str(),
        perms.join(","),
        &msg[whole.end()..]
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selinux_avc_gets_result_and_perms() {
        let msg = r#": avc:  denied  { read write } for  pid=1 comm="cat" name="shadow""#;
        let normalized = normalize_message(AuditMessageType::AVC, msg).unwrap();
        assert_eq!(
            normalized,
            r#"seresult=denied seperms=read,write pid=1 comm="cat" name="shadow""#
        );
    }

    #[test]
    fn apparmor_avc_is_unchanged() {
        let msg = r#": apparmor="DENIED" operation="open" name="/etc/shadow""#;
        let normalized = normalize_message(AuditMessageType::AVC, msg).unwrap();
        assert!(matches!(normalized, Cow::Borrowed(_)));
        assert_eq!(normalized, msg);
    }

    #[test]
    fn login_old_new_prefixes_become_field_names() {
        let msg = ": pid=26125 uid=0 old auid=4294967295 new auid=0 old ses=4294967295 new ses=1340 res=1";
        let normalized = normalize_message(AuditMessageType::LOGIN, msg).unwrap();
        assert_eq!(
            normalized,
            ": pid=26125 uid=0 old_auid=4294967295 new_auid=0 old_ses=4294967295 new_ses=1340 res=1"
        );
    }

    #[test]
    fn user_start_hostname_parenthesis_is_removed() {
        let msg = ": pid=1 msg='op=PAM:session_open acct=\"root\" exe=\"/bin/su\" (hostname=?, addr=?, terminal=pts/0 res=success)'";
        let normalized = normalize_message(AuditMessageType::USER_START, msg).unwrap();
        assert_eq!(
            normalized,
            ": pid=1 msg='op=PAM:session_open acct=\"root\" exe=\"/bin/su\" hostname=?, addr=?, terminal=pts/0 res=success"
        );
    }

    #[test]
    fn other_types_pass_through() {
        let msg = ": old pid=1 (hostname=x)";
        let normalized = normalize_message(AuditMessageType::SYSCALL, msg).unwrap();
        assert_eq!(normalized, msg);
    }
}
