//! Reserved wire markers.
//!
//! These strings are part of the wire format and must stay byte-identical
//! for payloads written by earlier encoders to keep decoding.

/// Key carrying the type tag of an encoded instance.
pub const CONSTRUCTOR_KEY: &str = "#$@__constructor__";

/// Prefix of a back-reference token, followed by the decimal index.
pub const INSTANCE_PREFIX: &str = "#$@__instance__";

/// Reference-index key on mappings, and prefix of the self-tag that opens
/// an encoded sequence.
pub const REFERENCE_PREFIX: &str = "#$@__reference__";

/// Tag the encoder routes NaN and the infinities to.
pub const NUMBER_TAG: &str = "Number";

/// Text `serialize` produces for an undefined root.
pub const UNDEFINED_TEXT: &str = "undefined";

/// Largest integer a double represents exactly (2^53).
pub(crate) const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Parses the decimal index that follows `prefix` in `token`.
///
/// Only plain ASCII digits are accepted; signs, whitespace and empty
/// suffixes are rejected.
pub fn parse_index(token: &str, prefix: &str) -> Option<usize> {
    let digits = token.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
