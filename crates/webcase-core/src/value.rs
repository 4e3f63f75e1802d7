//! Helpers for the loosely-typed values carried by steps

use serde_yaml::Value;

/// Render a value the way it should appear in a browser or a message.
///
/// Scalars render bare (`abc`, `42`, `true`), null renders empty, and
/// collections fall back to flow-ish YAML.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => value_text(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Null and the empty string both mean "not given"
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Non-empty text form of a value, if it has one
pub fn non_empty_text(value: &Value) -> Option<String> {
    if is_absent(value) {
        None
    } else {
        Some(value_text(value))
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

/// Interpret a value as a millisecond count (`1000`, `1.5`, `"250"`)
pub fn as_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u64),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_text_scalars() {
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&Value::from(42)), "42");
        assert_eq!(value_text(&Value::from(true)), "true");
        assert_eq!(value_text(&Value::from("abc")), "abc");
    }

    #[test]
    fn test_absent_and_truthy() {
        assert!(is_absent(&Value::Null));
        assert!(is_absent(&Value::from("")));
        assert!(!is_absent(&Value::from(0)));
        assert!(!truthy(&Value::from(0)));
        assert!(truthy(&Value::from("x")));
        assert!(!truthy(&Value::Sequence(vec![])));
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(as_millis(&Value::from(1000)), Some(1000));
        assert_eq!(as_millis(&Value::from("250")), Some(250));
        assert_eq!(as_millis(&Value::from(1.5)), Some(2));
        assert_eq!(as_millis(&Value::from("soon")), None);
        assert_eq!(as_millis(&Value::Null), None);
    }
}
