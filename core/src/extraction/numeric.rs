use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const DAYS_PER_MONTH: f64 = 30.44;
const WEEKS_PER_MONTH: f64 = 4.345;

fn first_number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("Failed to compile regex"))
}

fn first_integer_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\d+").expect("Failed to compile regex"))
}

/// Returns whether a sheet value stands for "no value"
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s == "NaN",
        Value::Number(n) => n.as_f64().map(f64::is_nan).unwrap_or(true),
        _ => false,
    }
}

/// Parses a measurement that may be written as a range or with a qualifier
///
/// Numbers pass through. Strings are handled as:
/// - "0.30-0.40" → midpoint (a leading `-` is a sign, not a range)
/// - ">0.50", "~60" → the number after the symbol
/// - otherwise the first number found in the text
///
/// `null`, "NaN" and text without digits yield `None`.
pub fn parse_numeric_value(value: &Value) -> Option<f64> {
    if is_missing(value) {
        return None;
    }
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

/// String form of [`parse_numeric_value`]
pub fn parse_numeric_str(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "NaN" {
        return None;
    }

    if s.contains('-') && !s.starts_with('-') {
        let mut parts = s.split('-');
        let low = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
        let high = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
        if let (Some(low), Some(high)) = (low, high) {
            return Some((low + high) / 2.0);
        }
    }

    if let Some(rest) = s.strip_prefix('>').or_else(|| s.strip_prefix('~')) {
        if let Ok(v) = rest.trim().parse::<f64>() {
            return Some(v);
        }
    }

    first_number_regex()
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Converts an age like "6 weeks" or "3 months" to months
///
/// Units are matched by substring in the order day, week, month, year; the
/// first integer in the text is the amount.
pub fn parse_age_to_months(age: &str) -> Option<f64> {
    if age == "NaN" {
        return None;
    }
    let age = age.to_lowercase();
    let amount = || -> Option<f64> {
        first_integer_regex()
            .find(&age)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };

    if age.contains("day") {
        amount().map(|d| d / DAYS_PER_MONTH)
    } else if age.contains("week") {
        amount().map(|w| w / WEEKS_PER_MONTH)
    } else if age.contains("month") {
        amount()
    } else if age.contains("year") {
        amount().map(|y| y * 12.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(42), Some(42.0))]
    #[case(json!(61.5), Some(61.5))]
    #[case(json!("0.30-0.40"), Some(0.35))]
    #[case(json!(">0.50"), Some(0.5))]
    #[case(json!("~60"), Some(60.0))]
    #[case(json!("-5"), Some(5.0))]
    #[case(json!("approx 55 degrees"), Some(55.0))]
    #[case(json!("55-60 degrees"), Some(55.0))]
    #[case(json!("NaN"), None)]
    #[case(json!(null), None)]
    #[case(json!("unknown"), None)]
    fn test_parse_numeric_value(#[case] input: Value, #[case] expected: Option<f64>) {
        let parsed = parse_numeric_value(&input);
        match (parsed, expected) {
            (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9, "{} != {}", a, b),
            (a, b) => assert_eq!(a, b),
        }
    }

    #[rstest]
    #[case("15 days", Some(15.0 / 30.44))]
    #[case("6 weeks", Some(6.0 / 4.345))]
    #[case("3 Months", Some(3.0))]
    #[case("2 years", Some(24.0))]
    #[case("newborn", None)]
    #[case("days", None)]
    #[case("NaN", None)]
    fn test_parse_age_to_months(#[case] input: &str, #[case] expected: Option<f64>) {
        let parsed = parse_age_to_months(input);
        match (parsed, expected) {
            (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
            (a, b) => assert_eq!(a, b),
        }
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(&json!(null)));
        assert!(is_missing(&json!("NaN")));
        assert!(!is_missing(&json!("Y")));
        assert!(!is_missing(&json!(0)));
    }
}
