//! Inbound payload literals.
//!
//! The bus carries boolean commands as the bare strings `true` and `false`.
//! Matching is byte-exact: no trimming, no case folding.  Anything else is
//! not a command and must leave outputs untouched.

/// `Some(true)` for `b"true"`, `Some(false)` for `b"false"`, else `None`.
pub fn decode_bool(payload: &[u8]) -> Option<bool> {
    match payload {
        b"true" => Some(true),
        b"false" => Some(false),
        _ => None,
    }
}
