//! Boundary coercion for numeric input coming from editing surfaces.
//!
//! Form fields, legacy documents and socket payloads hand the engine text or
//! loosely typed JSON. Everything is coerced here, before it reaches the
//! engine: malformed XP becomes `0`, a malformed rank modifier becomes `1.0`,
//! and a reputation that cannot be read is rejected (`None`) so the caller
//! can skip the write.
//!
//! Parsing follows the host's `parseInt` / `parseFloat` prefix semantics:
//! leading whitespace is skipped and trailing garbage is ignored
//! (`"12 xp"` reads as `12`).

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::aggregate::clamp_reputation;

/// Parse the longest integer prefix of `input`.
///
/// Returns `None` when no digit follows the optional sign. Values beyond
/// the `i64` range saturate.
#[must_use]
pub fn parse_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for b in digits[..end].bytes() {
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(b - b'0'));
    }
    Some(if negative { -value } else { value })
}

/// Parse the longest floating-point prefix of `input`.
///
/// Accepts an optional sign, digits with an optional fractional part, and an
/// optional exponent. Returns `None` when no digit is present.
#[must_use]
pub fn parse_float(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }

    if mantissa_digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    // A lone "." after digits ("5.") is accepted by Rust's parser.
    s[..end].parse::<f64>().ok()
}

/// Coerce free-form XP input. Malformed or negative input becomes `0`.
#[must_use]
pub fn coerce_xp(input: &str) -> u64 {
    parse_int(input).map_or(0, |v| u64::try_from(v).unwrap_or(0))
}

/// Coerce free-form rank modifier input. Malformed or zero input becomes `1.0`.
#[must_use]
pub fn coerce_modifier(input: &str) -> f64 {
    parse_float(input).map_or(1.0, sanitize_modifier)
}

/// Coerce free-form reputation input into the clamped range.
///
/// Returns `None` when the input holds no number at all.
#[must_use]
pub fn coerce_reputation(input: &str) -> Option<i32> {
    parse_int(input).map(clamp_reputation)
}

/// Replace zero or non-finite modifiers with the neutral weight `1.0`.
#[must_use]
pub fn sanitize_modifier(modifier: f64) -> f64 {
    if modifier.is_finite() && modifier != 0.0 {
        modifier
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// JSON value coercion
// ---------------------------------------------------------------------------

fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

fn float_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s),
        _ => None,
    }
}

/// Serde helper: XP-like counters (`u64`), malformed ⇒ `0`.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(int_from_value)
        .map_or(0, |v| u64::try_from(v).unwrap_or(0)))
}

/// Serde helper: rank indexes (`usize`), malformed or negative ⇒ `0`.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(int_from_value)
        .map_or(0, |v| usize::try_from(v).unwrap_or(0)))
}

/// Serde helper: optional XP, `null` or absent ⇒ `None`, malformed ⇒ `Some(0)`.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| {
        int_from_value(&v).map_or(0, |n| u64::try_from(n).unwrap_or(0))
    }))
}

/// Serde helper: optional rank index, `null` or absent ⇒ `None`,
/// malformed or negative ⇒ `Some(0)`.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_opt_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| {
        int_from_value(&v).map_or(0, |n| usize::try_from(n).unwrap_or(0))
    }))
}

/// Serde helper: reputations, malformed ⇒ `0`, always clamped.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_reputation<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value).map_or(0, clamp_reputation))
}

/// Serde helper: rank modifiers, malformed or zero ⇒ `1.0`.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_modifier<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(float_from_value)
        .map_or(1.0, sanitize_modifier))
}

/// Serde helper: signed deltas (`i32`), malformed ⇒ `0`, saturating.
///
/// # Errors
/// Only fails if the deserializer itself fails.
pub fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value).map_or(0, |v| {
        i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
    }))
}

/// Serde default for rank modifiers.
pub fn default_modifier() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_prefix_semantics() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -17abc"), Some(-17));
        assert_eq!(parse_int("+8"), Some(8));
        assert_eq!(parse_int("3.9"), Some(3));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn parse_int_saturates() {
        assert_eq!(parse_int("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn parse_float_prefix_semantics() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float(" 2.25x"), Some(2.25));
        assert_eq!(parse_float(".5"), Some(0.5));
        assert_eq!(parse_float("-0.75"), Some(-0.75));
        assert_eq!(parse_float("1e2"), Some(100.0));
        assert_eq!(parse_float("3e"), Some(3.0));
        assert_eq!(parse_float("5."), Some(5.0));
        assert_eq!(parse_float("x1"), None);
        assert_eq!(parse_float("."), None);
    }

    #[test]
    fn malformed_xp_becomes_zero() {
        assert_eq!(coerce_xp("lots"), 0);
        assert_eq!(coerce_xp("-50"), 0);
        assert_eq!(coerce_xp("120"), 120);
    }

    #[test]
    fn malformed_modifier_becomes_one() {
        assert!((coerce_modifier("oops") - 1.0).abs() < f64::EPSILON);
        assert!((coerce_modifier("0") - 1.0).abs() < f64::EPSILON);
        assert!((coerce_modifier("2.5") - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reputation_input_is_clamped_or_rejected() {
        assert_eq!(coerce_reputation("250"), Some(100));
        assert_eq!(coerce_reputation("-101"), Some(-100));
        assert_eq!(coerce_reputation("15"), Some(15));
        assert_eq!(coerce_reputation("n/a"), None);
    }

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_u64")]
        xp: u64,
        #[serde(default, deserialize_with = "lenient_usize")]
        rank: usize,
        #[serde(default, deserialize_with = "lenient_reputation")]
        reputation: i32,
        #[serde(default = "default_modifier", deserialize_with = "lenient_modifier")]
        modifier: f64,
        #[serde(default, deserialize_with = "lenient_i32")]
        delta: i32,
    }

    #[test]
    fn lenient_fields_accept_strings_and_nulls() {
        let sample: Sample = serde_json::from_str(
            r#"{"xp": "150", "rank": "2", "reputation": 400, "modifier": null, "delta": "-7"}"#,
        )
        .expect("parse");
        assert_eq!(sample.delta, -7);
        assert_eq!(sample.xp, 150);
        assert_eq!(sample.rank, 2);
        assert_eq!(sample.reputation, 100);
        assert!((sample.modifier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lenient_fields_default_when_missing() {
        let sample: Sample = serde_json::from_str("{}").expect("parse");
        assert_eq!(sample.xp, 0);
        assert_eq!(sample.rank, 0);
        assert_eq!(sample.reputation, 0);
        assert!((sample.modifier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lenient_fields_tolerate_garbage() {
        let sample: Sample = serde_json::from_str(
            r#"{"xp": -5, "rank": -1, "reputation": "hostile", "modifier": "heavy", "delta": 1e12}"#,
        )
        .expect("parse");
        assert_eq!(sample.delta, i32::MAX);
        assert_eq!(sample.xp, 0);
        assert_eq!(sample.rank, 0);
        assert_eq!(sample.reputation, 0);
        assert!((sample.modifier - 1.0).abs() < f64::EPSILON);
    }

    #[derive(Deserialize)]
    struct OptionalSample {
        #[serde(default, deserialize_with = "lenient_opt_u64")]
        xp: Option<u64>,
        #[serde(default, deserialize_with = "lenient_opt_usize")]
        rank: Option<usize>,
    }

    #[test]
    fn optional_fields_keep_absence_and_coerce_text() {
        let sample: OptionalSample = serde_json::from_str("{}").expect("parse");
        assert_eq!((sample.xp, sample.rank), (None, None));

        let sample: OptionalSample =
            serde_json::from_str(r#"{"xp": null, "rank": "3"}"#).expect("parse");
        assert_eq!((sample.xp, sample.rank), (None, Some(3)));

        let sample: OptionalSample =
            serde_json::from_str(r#"{"xp": "lots", "rank": -2}"#).expect("parse");
        assert_eq!((sample.xp, sample.rank), (Some(0), Some(0)));
    }
}
