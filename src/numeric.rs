//! Decimal helpers: strict literal parsing, rounding and plain rendering.

use bigdecimal::{BigDecimal, RoundingMode};
use lazy_static::lazy_static;
use num_bigint::Sign;
use num_traits::{ToPrimitive, Zero};
use regex::Regex;
use std::str::FromStr;

/// Digits kept by the decimal context unless configured otherwise.
pub const DEFAULT_PRECISION: u64 = 28;

/// Widest value a `decimal` column holds: digits before the point.
pub const MAX_INTEGER_DIGITS: i64 = 131_072;
/// Widest value a `decimal` column holds: digits after the point.
pub const MAX_FRACTION_DIGITS: i64 = 16_383;

/// Padding zeros past which values are described in exponent form.
const MAX_PLAIN_PADDING: i64 = 64;

lazy_static! {
    /// A complete decimal literal: optional sign, digits with optional
    /// fraction, optional exponent. "5.", ".5" and "1e3" are accepted.
    static ref DECIMAL_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

pub fn is_decimal_literal(text: &str) -> bool {
    DECIMAL_LITERAL.is_match(text.trim())
}

/// Parse a decimal literal exactly. Returns `None` unless the whole
/// (trimmed) text is a number.
pub fn parse_decimal(text: &str) -> Option<BigDecimal> {
    let trimmed = text.trim();
    if !DECIMAL_LITERAL.is_match(trimmed) {
        return None;
    }

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(pos) => (&unsigned[..pos], &unsigned[pos..]),
        None => (unsigned, ""),
    };

    let mut canonical = String::with_capacity(trimmed.len() + 2);
    if negative {
        canonical.push('-');
    }
    if mantissa.starts_with('.') {
        canonical.push('0');
    }
    canonical.push_str(mantissa.strip_suffix('.').unwrap_or(mantissa));
    canonical.push_str(exponent);

    BigDecimal::from_str(&canonical).ok()
}

/// Promote a float through its shortest string form so binary
/// representation error never shows up as extra digits.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    parse_decimal(&value.to_string())
}

pub fn is_integral(value: &BigDecimal) -> bool {
    scale(value) <= 0 || scale(&value.normalized()) <= 0
}

/// Round to the nearest integer, ties to even. Never rescales a value
/// that is already integral or rounds to zero, so huge exponents stay cheap.
pub fn round_half_even(value: &BigDecimal) -> BigDecimal {
    if scale(value) <= 0 {
        return value.clone();
    }
    if adjusted_exponent(value) < -1 {
        return BigDecimal::zero();
    }
    value.with_scale_round(0, RoundingMode::HalfEven)
}

pub fn to_i64_exact(value: &BigDecimal) -> Option<i64> {
    if is_integral(value) && adjusted_exponent(value) < 19 {
        value.to_i64()
    } else {
        None
    }
}

pub fn scale(value: &BigDecimal) -> i64 {
    value.as_bigint_and_exponent().1
}

/// Power of ten of the leading digit: 2 for 123, -3 for 0.001.
pub fn adjusted_exponent(value: &BigDecimal) -> i64 {
    significant_digits(value) as i64 - 1 - scale(value)
}

/// Number of digits in the coefficient, trailing zeros included.
pub fn significant_digits(value: &BigDecimal) -> u64 {
    value.digits()
}

/// Round to at most `precision` significant digits, ties to even.
/// Values that already fit are returned unchanged.
pub fn round_to_precision(value: &BigDecimal, precision: u64) -> BigDecimal {
    let digits = significant_digits(value);
    if digits <= precision {
        return value.clone();
    }
    let excess = (digits - precision) as i64;
    value.with_scale_round(scale(value) - excess, RoundingMode::HalfEven)
}

/// Drop trailing fractional zeros without ever switching to a negative
/// scale ("100.50" -> "100.5", "1E+3" -> "1000").
pub fn trim(value: &BigDecimal) -> BigDecimal {
    let normalized = value.normalized();
    if scale(&normalized) < 0 {
        normalized.with_scale(0)
    } else {
        normalized
    }
}

/// Render without exponent notation, the form the composite text
/// representation and the JSON dict shape use.
pub fn to_plain_string(value: &BigDecimal) -> String {
    let (coefficient, scale) = value.as_bigint_and_exponent();
    let digits = coefficient.magnitude().to_string();

    let body = if scale <= 0 {
        let mut body = digits;
        if body != "0" {
            body.push_str(&"0".repeat(scale.unsigned_abs() as usize));
        }
        body
    } else {
        let scale = scale as usize;
        if digits.len() > scale {
            let split = digits.len() - scale;
            format!("{}.{}", &digits[..split], &digits[split..])
        } else {
            format!("0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    };

    if coefficient.sign() == Sign::Minus {
        format!("-{}", body)
    } else {
        body
    }
}

/// Render for messages: the plain form, or `<coefficient>E<exponent>`
/// when the plain form would need more than a few dozen padding zeros.
pub fn describe(value: &BigDecimal) -> String {
    let (coefficient, scale) = value.as_bigint_and_exponent();
    let digits = significant_digits(value) as i64;
    if scale < -MAX_PLAIN_PADDING || scale - digits > MAX_PLAIN_PADDING {
        format!("{}E{}", coefficient, -scale)
    } else {
        to_plain_string(value)
    }
}
