//! `name=value` pair list parsing
//!
//! Shared by cookie, query string and form body parsing. Values are kept as
//! received: no percent-decoding and no `+` to space translation.

use crate::error::AppError;
use std::collections::HashMap;

/// Separator between cookies in a `Cookie` header
pub const COOKIE_SEPARATOR: &str = "; ";
/// Separator between query/form pairs
pub const PAIR_SEPARATOR: &str = "&";

/// Split `input` on `separator` and every piece once on `=`.
///
/// Each piece must contain exactly one `=`; anything else (including an
/// empty piece) is `MalformedInput`. Later duplicates replace earlier ones.
pub fn parse_pairs(
    input: &str,
    separator: &str,
    source_kind: &'static str,
) -> Result<HashMap<String, String>, AppError> {
    let mut pairs = HashMap::new();
    for piece in input.split(separator) {
        let (name, value) = split_pair(piece, source_kind)?;
        pairs.insert(name.to_string(), value.to_string());
    }
    Ok(pairs)
}

fn split_pair<'a>(piece: &'a str, source_kind: &'static str) -> Result<(&'a str, &'a str), AppError> {
    match piece.split_once('=') {
        Some((name, value)) if !value.contains('=') => Ok((name, value)),
        _ => Err(AppError::malformed(source_kind, format!("'{piece}'"))),
    }
}
