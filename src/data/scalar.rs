//! Loose scalar handling for metadata values.
//!
//! Metadata fields arrive as arbitrary JSON scalars: ids are numbers in one
//! collection and strings in another, `wfreq` may be a number, a numeric
//! string or `null`. These helpers give every scalar one textual form (used
//! for id matching and panel lines) and one numeric form (used by the gauge).

use serde_json::Value;

/// Text for a scalar as a browser would print it in a template string.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                number_text(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Shortest round-trip text. Integral floats print without a fractional part,
/// `-0` prints as `0`, and magnitudes outside `[1e-6, 1e21)` use exponent
/// form with an explicit sign (`1e+21`, `1e-7`).
pub fn number_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    } else {
        format!("{}", n)
    }
}

/// Numeric coercion with `Number(value)` semantics.
///
/// `null`, `false` and blank strings become 0, `true` becomes 1, numeric
/// strings are parsed after trimming. Anything else is NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number_text(s),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn parse_number_text(raw: &str) -> f64 {
    let t = raw.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some((radix, digits)) = radix_literal(t) {
        return parse_radix_digits(digits, radix);
    }
    // Rust accepts "inf" and "nan" spellings that Number() rejects
    let plain = t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plain {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

fn radix_literal(t: &str) -> Option<(u32, &str)> {
    let digits = t.get(2..)?;
    match &t[..2] {
        "0x" | "0X" => Some((16, digits)),
        "0o" | "0O" => Some((8, digits)),
        "0b" | "0B" => Some((2, digits)),
        _ => None,
    }
}

/// Unsigned digits only; a sign or an empty digit run is NaN.
fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
        })
        .unwrap_or(f64::NAN)
}

/// Key used to match subject ids across collections (`940` matches `"940"`).
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(_) => Some(scalar_text(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_text_matches_template_output() {
        assert_eq!(scalar_text(&json!(null)), "null");
        assert_eq!(scalar_text(&json!("Caucasian")), "Caucasian");
        assert_eq!(scalar_text(&json!(940)), "940");
        assert_eq!(scalar_text(&json!(2.0)), "2");
        assert_eq!(scalar_text(&json!(24.5)), "24.5");
        assert_eq!(scalar_text(&json!(true)), "true");
    }

    #[test]
    fn test_number_text_edges() {
        assert_eq!(number_text(-0.0), "0");
        assert_eq!(number_text(f64::NAN), "NaN");
        assert_eq!(number_text(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_text(-3.0), "-3");
    }

    #[test]
    fn test_coerce_number_strings() {
        assert_eq!(coerce_number(&json!("3")), 3.0);
        assert_eq!(coerce_number(&json!(" 4.5 ")), 4.5);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!("0x10")), 16.0);
        assert!(coerce_number(&json!("abc")).is_nan());
        assert!(coerce_number(&json!("inf")).is_nan());
    }

    #[test]
    fn test_number_text_uses_exponent_outside_plain_range() {
        assert_eq!(number_text(1e21), "1e+21");
        assert_eq!(number_text(-1.5e21), "-1.5e+21");
        assert_eq!(number_text(1e-7), "1e-7");
        assert_eq!(number_text(1e20), "100000000000000000000");
        assert_eq!(number_text(0.000001), "0.000001");
        assert_eq!(number_text(0.1), "0.1");
    }

    #[test]
    fn test_coerce_number_radix_prefixes() {
        assert_eq!(coerce_number(&json!("0xff")), 255.0);
        assert_eq!(coerce_number(&json!("0b11")), 3.0);
        assert_eq!(coerce_number(&json!("0o7")), 7.0);
        assert_eq!(coerce_number(&json!(" 0B101 ")), 5.0);
        assert!(coerce_number(&json!("0x+f")).is_nan());
        assert!(coerce_number(&json!("0x")).is_nan());
        assert!(coerce_number(&json!("0b12")).is_nan());
        assert!(coerce_number(&json!("-0x10")).is_nan());
    }

    #[test]
    fn test_coerce_number_non_strings() {
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!(7)), 7.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert!(coerce_number(&json!({"a": 1})).is_nan());
    }

    #[test]
    fn test_id_key_normalizes_numbers_and_strings() {
        assert_eq!(id_key(&json!(940)), Some("940".to_string()));
        assert_eq!(id_key(&json!("940")), Some("940".to_string()));
        assert_eq!(id_key(&json!(null)), None);
    }
}
