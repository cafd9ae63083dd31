#![forbid(unsafe_code)]

//! Strict numeric parsing for form input.
//!
//! Unlike `str::parse`, these accept only plain decimal notation: an optional
//! sign, digits, and (for floats) one fractional part. Whitespace, exponents,
//! `inf`/`nan`, leading or trailing dots are rejected.

/// Parse `^[+-]?[0-9]+$`.
#[must_use]
pub fn strict_parse_int(text: &str) -> Option<i64> {
    let digits = strip_sign(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse `^[+-]?[0-9]+(\.[0-9]+)?$`.
#[must_use]
pub fn strict_parse_float(text: &str) -> Option<f64> {
    let body = strip_sign(text);
    let (int, frac) = match body.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (body, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    text.parse().ok()
}

fn strip_sign(text: &str) -> &str {
    text.strip_prefix(['+', '-']).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints() {
        assert_eq!(strict_parse_int("42"), Some(42));
        assert_eq!(strict_parse_int("-7"), Some(-7));
        assert_eq!(strict_parse_int("+3"), Some(3));
        for bad in ["", "-", "1.0", " 1", "1e3", "0x10", "12a"] {
            assert_eq!(strict_parse_int(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn floats() {
        assert_eq!(strict_parse_float("0.3"), Some(0.3));
        assert_eq!(strict_parse_float("-10"), Some(-10.0));
        for bad in ["", ".5", "5.", "1e3", "nan", "inf", "1.2.3", " 2"] {
            assert_eq!(strict_parse_float(bad), None, "{bad:?}");
        }
    }
}
