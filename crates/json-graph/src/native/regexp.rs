//! `RegExp`: pattern source plus flag letters, written as
//! `{"source": ..., "flags": ...}`.

use std::sync::OnceLock;

use json_graph_core::{DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue, TypeRegistry, Value};
use regex::{Regex, RegexBuilder};

use super::{internal_of, native, not_a, take_str};

pub const REGEXP: &str = "RegExp";

fn valid_flags(flags: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let letters = RE.get_or_init(|| Regex::new(r"^[dgimsuvy]*$").expect("valid regex"));
    letters.is_match(flags)
        && flags
            .char_indices()
            .all(|(i, c)| !flags[..i].contains(c))
}

/// A `RegExp` instance, or `None` when `flags` repeats a letter or uses one
/// outside `dgimsuvy`.
pub fn regexp(source: &str, flags: &str) -> Option<Value> {
    valid_flags(flags).then(|| {
        native(
            REGEXP,
            Value::array(vec![Value::from(source), Value::from(flags)]),
        )
    })
}

/// `(source, flags)` of a `RegExp` instance.
pub fn as_regexp(value: &Value) -> Option<(String, String)> {
    let internal = internal_of(value, REGEXP)?;
    let parts = internal.as_array()?.borrow();
    match parts.as_slice() {
        [source, flags] => Some((source.as_str()?.to_string(), flags.as_str()?.to_string())),
        _ => None,
    }
}

/// Compiles a `RegExp` instance with the [`regex`] engine.
///
/// `i`, `m` and `s` map onto the engine's own switches; the remaining flags
/// only affect iteration state and are ignored. Sources using syntax the
/// engine lacks (look-around, back-references) fail to compile.
pub fn to_regex(value: &Value) -> Option<Result<Regex, regex::Error>> {
    let (source, flags) = as_regexp(value)?;
    Some(
        RegexBuilder::new(&source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build(),
    )
}

fn encode(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let (source, flags) = as_regexp(value).ok_or_else(|| not_a(REGEXP))?;
    let mut out = PlainObject::new();
    out.insert("source".into(), PlainValue::String(source));
    out.insert("flags".into(), PlainValue::String(flags));
    Ok(Some(out))
}

fn decode(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let source = take_str(&mut fields, REGEXP, "source")?;
    let flags = take_str(&mut fields, REGEXP, "flags")?;
    regexp(&source, &flags)
        .map(Some)
        .ok_or_else(|| DecodeError::payload(REGEXP, format!("invalid flags {flags:?}")))
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    registry.register_handler(REGEXP, encode, decode);
}
