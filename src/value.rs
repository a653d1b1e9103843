//! Shimmer algorithm (spec.md §4.A): lazily derives/caches an internal
//! representation for a value's string bytes, and offers the numeric/boolean
//! coercions and equality/ordering built on top of it.
//!
//! Scratch state used while deriving a representation (a parse cursor, a sign
//! flag) is plain Rust data on the stack of the `try_as_*` call that needs it —
//! it never escapes into anything the host or the rest of the core can see.

use crate::errors::CoreError;
use crate::hostops::{Arena, HostOps, RepKind, ValueHandle};

/// Numeric value coerced from a `Value`'s string rep, per spec.md §4.A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Double(d) => d,
        }
    }
}

/// Parses a Tcl integer literal: optional sign, `0x`/`0X` hex, `0o`/`0O` octal,
/// `0b`/`0B` binary, or plain decimal (a bare leading `0` is decimal, not octal,
/// matching Tcl 8.6's modern integer syntax rather than Tcl 8.4's). Underscores
/// between digits are accepted as digit-group separators.
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    let (neg, rest) = match t.as_bytes()[0] {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    if rest.is_empty() {
        return None;
    }
    let cleaned: String = rest.chars().filter(|&c| c != '_').collect();
    let (radix, digits) = if let Some(d) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        (2, d)
    } else {
        (10, cleaned.as_str())
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    let signed = if neg { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

/// Parses a Tcl floating-point literal, including bare `Inf`/`-Inf`/`NaN`
/// (case-insensitive) and integer literals promoted to `f64`.
#[must_use]
pub fn parse_double(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    match t.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => return Some(f64::INFINITY),
        "-inf" | "-infinity" => return Some(f64::NEG_INFINITY),
        "nan" => return Some(f64::NAN),
        _ => {}
    }
    if let Some(i) = parse_integer(t) {
        return Some(i as f64);
    }
    t.parse::<f64>().ok()
}

/// Parses a Tcl boolean literal (spec.md §4.A): `true`/`false`, `yes`/`no`,
/// `on`/`off`, `1`/`0`, case-insensitively.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn string_of<H: HostOps>(host: &H, v: ValueHandle) -> Result<String, CoreError> {
    let bytes = host
        .value_string_bytes(v)
        .map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Shimmers `v` to an integer, caching the result on the handle if the host
/// didn't already have one.
pub fn try_as_integer<H: HostOps>(host: &mut H, v: ValueHandle) -> Result<i64, CoreError> {
    if let Some(i) = host.value_get_integer(v) {
        return Ok(i);
    }
    let s = string_of(host, v)?;
    match parse_integer(&s) {
        Some(i) => {
            host.value_install_integer(v, i).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
            Ok(i)
        }
        None => Err(CoreError::expected_integer(&s)),
    }
}

/// Shimmers `v` to a double. Integers shimmer to doubles without losing their
/// cached integer rep (Tcl values can hold both simultaneously).
pub fn try_as_double<H: HostOps>(host: &mut H, v: ValueHandle) -> Result<f64, CoreError> {
    if let Some(d) = host.value_get_double(v) {
        return Ok(d);
    }
    if let Some(i) = host.value_get_integer(v) {
        return Ok(i as f64);
    }
    let s = string_of(host, v)?;
    match parse_double(&s) {
        Some(d) => {
            host.value_install_double(v, d).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
            Ok(d)
        }
        None => Err(CoreError::expected_double(&s)),
    }
}

/// Shimmers `v` to whichever of int/double its string rep denotes, preferring
/// integer when the text has no fractional/exponent part (used by `expr`).
pub fn try_as_number<H: HostOps>(host: &mut H, v: ValueHandle) -> Result<Number, CoreError> {
    if let Some(i) = host.value_get_integer(v) {
        return Ok(Number::Int(i));
    }
    if let Some(d) = host.value_get_double(v) {
        return Ok(Number::Double(d));
    }
    let s = string_of(host, v)?;
    if let Some(i) = parse_integer(&s) {
        host.value_install_integer(v, i).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
        return Ok(Number::Int(i));
    }
    if let Some(d) = parse_double(&s) {
        host.value_install_double(v, d).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
        return Ok(Number::Double(d));
    }
    Err(CoreError::expected_double(&s))
}

pub fn try_as_bool<H: HostOps>(host: &H, v: ValueHandle) -> Result<bool, CoreError> {
    let s = string_of(host, v)?;
    parse_bool(&s).ok_or_else(|| CoreError::expected_bool(&s))
}

/// Value-semantic equality: always computed over string bytes, never handle
/// identity (spec.md §3.1 — two handles may share a string rep without being
/// the same handle).
pub fn values_equal<H: HostOps>(host: &H, a: ValueHandle, b: ValueHandle) -> Result<bool, CoreError> {
    let sa = host.value_string_bytes(a).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
    let sb = host.value_string_bytes(b).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
    Ok(sa == sb)
}

pub fn new_string<H: HostOps>(host: &mut H, s: &str, arena: Arena) -> Result<ValueHandle, CoreError> {
    host.value_from_bytes(s.as_bytes(), arena).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))
}

pub fn new_integer<H: HostOps>(host: &mut H, i: i64, arena: Arena) -> Result<ValueHandle, CoreError> {
    let v = new_string(host, &i.to_string(), arena)?;
    host.value_install_integer(v, i).map_err(|e| CoreError::new(crate::errors::ErrorKind::Type, e.message))?;
    Ok(v)
}

pub fn new_bool<H: HostOps>(host: &mut H, b: bool, arena: Arena) -> Result<ValueHandle, CoreError> {
    new_integer(host, i64::from(b), arena)
}

#[must_use]
pub fn is_absent<H: HostOps>(host: &H, v: ValueHandle) -> bool {
    matches!(host.value_rep_kind(v), RepKind::Absent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_octal_binary_integers() {
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("0o17"), Some(15));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("-42"), Some(-42));
        assert_eq!(parse_integer("1_000_000"), Some(1_000_000));
    }

    #[test]
    fn bare_leading_zero_is_decimal() {
        assert_eq!(parse_integer("010"), Some(10));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn parses_inf_and_nan() {
        assert!(parse_double("Inf").unwrap().is_infinite());
        assert!(parse_double("NaN").unwrap().is_nan());
        assert_eq!(parse_double("-inf"), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn parses_boolean_literals_case_insensitively() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
