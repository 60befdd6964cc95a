// encoding.rs — Hex decoding of audit field values.
//
// The kernel hex-encodes any string that contains spaces, quotes or
// control characters (paths, argv entries, proctitle, rule keys) and
// always uses uppercase digits. Plain values are printed in double
// quotes, so a quoted token is never mistaken for hex.

/// Why a token is not an uppercase hex string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HexError {
    /// Contains `a`-`f`; the kernel never emits lowercase hex.
    Lowercase,
    Invalid(hex::FromHexError),
}

/// Decode a string of uppercase hex digit pairs.
pub(crate) fn decode_uppercase_hex(token: &str) -> Result<Vec<u8>, HexError> {
    if token.bytes().any(|b| (b'a'..=b'f').contains(&b)) {
        return Err(HexError::Lowercase);
    }
    hex::decode(token).map_err(HexError::Invalid)
}

/// Decode hex into a single string, keeping any embedded NULs.
pub(crate) fn hex_to_string(token: &str) -> Result<String, HexError> {
    let bytes = decode_uppercase_hex(token)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode hex into the strings separated by NUL or space bytes.
///
/// Empty pieces are dropped, so `proctitle` values (argv joined by NUL,
/// often with a trailing NUL) come back as one entry per argument.
pub(crate) fn hex_to_strings(token: &str) -> Result<Vec<String>, HexError> {
    let bytes = decode_uppercase_hex(token)?;
    Ok(bytes
        .split(|b| *b == 0 || *b == b' ')
        .filter(|piece| !piece.is_empty())
        .map(|piece| String::from_utf8_lossy(piece).into_owned())
        .collect())
}
