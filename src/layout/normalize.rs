//! Textual cleanup of layout definitions
//!
//! Definitions may arrive with whitespace, `#` comments, `\c` character
//! escapes and `0x` hex literals. [`normalize`] strips all of those down to
//! the canonical spelling the tokenizer accepts, and is idempotent, so a
//! definition can be normalized again without harm.
//!
//! [`expand_case_dash_notation`] rewrites `lo-hi` case ranges as explicit
//! comma-separated tag lists, for consumers that do not accept the dash
//! shorthand.

use crate::errors::LayoutErrorKind;
use std::borrow::Cow;

/// Strip whitespace and comments, and rewrite escapes and hex literals as
/// plain decimal
pub fn normalize(layout: &str) -> Result<Cow<'_, str>, LayoutErrorKind> {
    let already_plain = !layout
        .bytes()
        .any(|b| b <= b' ' || b == b'#' || b == b'\\')
        && !layout.contains("0x");
    if already_plain {
        return Ok(Cow::Borrowed(layout));
    }

    let mut out = String::with_capacity(layout.len());
    let mut chars = layout.chars().peekable();
    while let Some(c) = chars.next() {
        if c <= ' ' {
            continue;
        }
        match c {
            '#' => {
                // comment runs to the end of the line
                while chars.peek().map_or(false, |&n| n != '\n') {
                    chars.next();
                }
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&(escaped as u32).to_string()),
                None => return Err(LayoutErrorKind::DanglingEscape),
            },
            '0' if chars.peek() == Some(&'x') => {
                chars.next();
                let mut value: i64 = 0;
                let mut digits = 0;
                while let Some(d) = chars.peek().and_then(|&n| n.to_digit(16)) {
                    chars.next();
                    digits += 1;
                    value = value * 16 + i64::from(d);
                    if value > i64::from(u32::MAX) {
                        return Err(LayoutErrorKind::NumeralOverflow);
                    }
                }
                if digits == 0 {
                    return Err(LayoutErrorKind::MissingNumeral);
                }
                out.push_str(&(value as u32 as i32).to_string());
            }
            _ => out.push(c),
        }
    }
    Ok(Cow::Owned(out))
}

/// Rewrite every case range `lo-hi` as the explicit tag list it denotes
///
/// A dash only counts as a range when a digit immediately precedes it and a
/// digit or minus sign immediately follows, so negative bounds and ordinary
/// minus signs pass through untouched.
pub fn expand_case_dash_notation(layout: &str) -> Result<Cow<'_, str>, LayoutErrorKind> {
    let bytes = layout.as_bytes();
    let mut dash = match find_case_dash(bytes, 0) {
        Some(d) => d,
        None => return Ok(Cow::Borrowed(layout)),
    };

    let mut result = String::with_capacity(layout.len() * 3);
    let mut sofar = 0;
    loop {
        let (lo, lo_start) = int_before(layout, dash)?;
        let (hi, hi_end) = int_after(layout, dash)?;
        if hi <= lo || i64::from(hi) - i64::from(lo) > 0x10000 {
            return Err(LayoutErrorKind::BadCaseRange { lo, hi });
        }

        result.push_str(&layout[sofar..lo_start]);
        for v in lo..hi {
            result.push_str(&v.to_string());
            result.push(',');
        }
        result.push_str(&hi.to_string());

        sofar = hi_end;
        match find_case_dash(bytes, sofar) {
            Some(d) => dash = d,
            None => break,
        }
    }
    result.push_str(&layout[sofar..]);
    Ok(Cow::Owned(result))
}

/// Position of the next range dash at or after `search_from`
fn find_case_dash(bytes: &[u8], search_from: usize) -> Option<usize> {
    let mut from = search_from.max(1);
    while from < bytes.len() {
        let dash = from + bytes[from..].iter().position(|&b| b == b'-')?;
        if bytes[dash - 1].is_ascii_digit() {
            match bytes.get(dash + 1) {
                Some(&b) if b == b'-' || b.is_ascii_digit() => return Some(dash),
                _ => {}
            }
        }
        from = dash + 1;
    }
    None
}

/// The numeral ending just before `dash`, and the index where it starts
fn int_before(layout: &str, dash: usize) -> Result<(i32, usize), LayoutErrorKind> {
    let bytes = layout.as_bytes();
    let mut beg = dash;
    while beg > 0 && bytes[beg - 1].is_ascii_digit() {
        beg -= 1;
    }
    if beg > 0 && bytes[beg - 1] == b'-' {
        beg -= 1;
    }
    Ok((parse_decimal(&layout[beg..dash])?, beg))
}

/// The numeral starting just after `dash`, and the index just past it
fn int_after(layout: &str, dash: usize) -> Result<(i32, usize), LayoutErrorKind> {
    let bytes = layout.as_bytes();
    let beg = dash + 1;
    let mut end = beg;
    if end < bytes.len() && bytes[end] == b'-' {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    Ok((parse_decimal(&layout[beg..end])?, end))
}

fn parse_decimal(text: &str) -> Result<i32, LayoutErrorKind> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() {
        return Err(LayoutErrorKind::MissingNumeral);
    }
    let mut magnitude: i64 = 0;
    for d in digits.bytes() {
        magnitude = magnitude * 10 + i64::from(d - b'0');
        if magnitude > -i64::from(i32::MIN) {
            return Err(LayoutErrorKind::NumeralOverflow);
        }
    }
    let signed = if negative { -magnitude } else { magnitude };
    i32::try_from(signed).map_err(|_| LayoutErrorKind::NumeralOverflow)
}
