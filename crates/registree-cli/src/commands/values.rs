//! Command-line text to field values

use chrono::NaiveDate;
use registree_core::{FieldValue, Snapshot};

/// Infer a field value from text
///
/// Integers, `true`/`false` and ISO dates are typed; everything else is
/// text. An empty string stays empty text so it reads as blank.
pub fn parse_value(raw: &str) -> FieldValue {
    if let Ok(n) = raw.parse::<i64>() {
        return FieldValue::Integer(n);
    }
    match raw {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return FieldValue::Date(date);
    }
    FieldValue::Text(raw.to_string())
}

/// Parse `field=value` for clap
pub fn parse_assignment(raw: &str) -> Result<(String, FieldValue), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((field.to_string(), parse_value(value)))
}

pub fn snapshot_of(pairs: Vec<(String, FieldValue)>) -> Snapshot {
    pairs.into_iter().collect()
}

/// Compact single-line rendering of a snapshot
pub fn render(snapshot: &Snapshot) -> String {
    snapshot
        .iter()
        .map(|(field, value)| format!("{}={}", field, render_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Real(r) => r.to_string(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Date(d) => d.to_string(),
        FieldValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_typed() {
        assert_eq!(parse_value("12"), FieldValue::Integer(12));
        assert_eq!(parse_value("true"), FieldValue::Bool(true));
        assert_eq!(
            parse_value("2025-01-06"),
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
        );
        assert_eq!(parse_value("Present"), FieldValue::from("Present"));
        assert!(parse_value("").is_blank());
    }

    #[test]
    fn test_assignment_requires_equals() {
        let (field, value) = parse_assignment("status=No School").unwrap();
        assert_eq!(field, "status");
        assert_eq!(value, FieldValue::from("No School"));
        assert!(parse_assignment("status").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
