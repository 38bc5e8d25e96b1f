//! Lenient field decoders.
//!
//! Records decoded from SOAP responses carry every leaf as text, lists with a
//! single entry arrive as a bare element and empty lists arrive as nothing at
//! all. These helpers let the typed models accept both that shape and the
//! plain JSON shape used in tests.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

fn value_to_int<E: de::Error>(value: &Value) -> Result<i64, E> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                Ok(f as i64)
            } else {
                Err(E::custom(format!("expected an integer, found {n}")))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            match s.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 => Ok(f as i64),
                _ => Err(E::custom(format!("expected an integer, found {s:?}"))),
            }
        }
        other => Err(E::custom(format!("expected an integer, found {other}"))),
    }
}

pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_int(&value)
}

pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => value_to_int(&value).map(Some),
    }
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!("expected a string, found {other}"))),
    }
}

/// Accepts a list, a single element or nothing.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Debug)]
    struct Sample {
        #[serde(default, deserialize_with = "int")]
        number: i64,
        #[serde(default, deserialize_with = "opt_int")]
        maybe: Option<i64>,
        #[serde(default, deserialize_with = "one_or_many")]
        items: Vec<Value>,
        #[serde(default, deserialize_with = "opt_string")]
        label: Option<String>,
    }

    #[test]
    fn test_numbers_from_text() {
        let sample: Sample =
            serde_json::from_value(json!({"number": "42", "maybe": "0.000000"})).unwrap();
        assert_eq!(sample.number, 42);
        assert_eq!(sample.maybe, Some(0));
    }

    #[test]
    fn test_rejects_fractional_integers() {
        let result: Result<Sample, _> = serde_json::from_value(json!({"number": "1.5"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_single_element_becomes_list() {
        let sample: Sample = serde_json::from_value(json!({"items": {"catid": "3"}})).unwrap();
        assert_eq!(sample.items, vec![json!({"catid": "3"})]);

        let empty: Sample = serde_json::from_value(json!({"items": ""})).unwrap();
        assert!(empty.items.is_empty());

        let blank: Sample = serde_json::from_value(json!({"items": "\n    "})).unwrap();
        assert!(blank.items.is_empty());

        let missing: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(missing.items.is_empty());
        assert_eq!(missing.maybe, None);
        assert_eq!(missing.label, None);
    }

    #[test]
    fn test_null_and_numeric_strings() {
        let sample: Sample = serde_json::from_value(json!({"label": 7, "maybe": null})).unwrap();
        assert_eq!(sample.label.as_deref(), Some("7"));
        assert_eq!(sample.maybe, None);
    }
}
