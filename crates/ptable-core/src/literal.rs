//! Integer and keyword literal parsing
//!
//! Every numeric CSV field goes through [`parse_int`]: it understands `0x`,
//! `0o` and `0b` radix prefixes, a trailing `k`/`K` or `m`/`M` magnitude
//! suffix and, for type/subtype columns, a table of keywords.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};

/// A keyword table mapping case-insensitive names to integer codes
pub type Keywords = [(&'static str, u8)];

/// Magnitude suffixes, checked in order
const SUFFIXES: [(char, i64); 2] = [('k', 1024), ('m', 1024 * 1024)];

/// Parse an integer field, falling back to a keyword lookup
///
/// A trailing `k`/`m` suffix is stripped and the remainder parsed
/// recursively, then multiplied by 1024 or 1 MiB. A literal that is not a
/// number is looked up case-insensitively in `keywords` (if any).
pub fn parse_int(text: &str, keywords: &Keywords) -> Result<i64> {
    for (letter, multiplier) in SUFFIXES {
        if let Some(rest) = strip_suffix_ignore_case(text, letter) {
            let value = parse_int(rest, keywords)?;
            return value
                .checked_mul(multiplier)
                .ok_or_else(|| invalid(text, keywords));
        }
    }

    if let Some(value) = parse_radix_literal(text) {
        return Ok(value);
    }

    if keywords.is_empty() {
        return Err(invalid(text, keywords));
    }

    lookup_keyword(text, keywords)
        .map(i64::from)
        .ok_or_else(|| invalid(text, keywords))
}

/// Look up a keyword (case-insensitive)
pub fn lookup_keyword(text: &str, keywords: &Keywords) -> Option<u8> {
    keywords
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(text))
        .map(|&(_, value)| value)
}

/// Reverse lookup: the keyword naming `value`, if there is one
pub fn keyword_for(value: u8, keywords: &Keywords) -> Option<&'static str> {
    keywords
        .iter()
        .find(|&&(_, v)| v == value)
        .map(|&(name, _)| name)
}

fn strip_suffix_ignore_case(text: &str, letter: char) -> Option<&str> {
    let last = text.chars().next_back()?;
    if last.eq_ignore_ascii_case(&letter) {
        Some(&text[..text.len() - last.len_utf8()])
    } else {
        None
    }
}

/// Parse a signed integer with an optional radix prefix
///
/// Decimal literals with leading zeros are rejected, as are empty digits.
/// Underscores may only separate digits (or follow a radix prefix).
fn parse_radix_literal(text: &str) -> Option<i64> {
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = match body.get(..2) {
        Some(p) if p.eq_ignore_ascii_case("0x") => (16, &body[2..]),
        Some(p) if p.eq_ignore_ascii_case("0o") => (8, &body[2..]),
        Some(p) if p.eq_ignore_ascii_case("0b") => (2, &body[2..]),
        _ => (10, body),
    };

    let separated = digits.ends_with('_')
        || digits.contains("__")
        || (radix == 10 && digits.starts_with('_'));
    if separated {
        return None;
    }
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    if radix == 10 && digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        return None;
    }

    let magnitude = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn invalid(text: &str, keywords: &Keywords) -> Error {
    let expected = if keywords.is_empty() {
        String::from("a number")
    } else {
        let names: Vec<&str> = keywords.iter().map(|&(name, _)| name).collect();
        format!("a number or one of: {}", names.join(", "))
    };
    Error::InvalidField {
        value: String::from(text),
        expected,
    }
}

/// Parse a human size string like "4MB", "16 MiB", "4M" or "0x400000"
pub fn parse_size(s: &str) -> Result<u32> {
    let s = s.trim();

    if let Ok(n) = parse_int(s, &[]) {
        return u32::try_from(n).map_err(|_| invalid(s, &[]));
    }

    let s_lower = s.to_ascii_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(invalid(s, &[]));
    };

    let num: u32 = num_str.parse().map_err(|_| invalid(s, &[]))?;
    num.checked_mul(multiplier).ok_or_else(|| invalid(s, &[]))
}

/// Format a byte count with the largest whole unit ("1M", "24K", "0x123")
pub fn format_size(size: u32) -> String {
    if size % (1024 * 1024) == 0 {
        format!("{}M", size / (1024 * 1024))
    } else if size % 1024 == 0 {
        format!("{}K", size / 1024)
    } else {
        format!("0x{:x}", size)
    }
}
