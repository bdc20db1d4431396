// src/common/fields.rs

// Leitura tolerante de campos de documentos: os dados gravados ao longo do tempo
// não têm formato garantido, então tudo aqui devolve um default em vez de falhar.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

pub type Fields = Map<String, Value>;

/// Truthiness no estilo `Boolean(x)` do JavaScript.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn str_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

pub fn string_or_empty(fields: &Fields, key: &str) -> String {
    str_field(fields, key).unwrap_or_default()
}

pub fn bool_field(fields: &Fields, key: &str) -> bool {
    fields.get(key).map(is_truthy).unwrap_or(false)
}

/// Só aceita números finitos, como `Number.isFinite`.
pub fn finite_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64)
        }
        _ => None,
    }
}

pub fn decimal_field(fields: &Fields, key: &str) -> Option<Decimal> {
    fields.get(key).and_then(finite_number)
}

/// Aceita RFC 3339, datas `YYYY-MM-DD`, timestamps do Firestore
/// (`{seconds, nanoseconds}` / `{_seconds}`) e epoch em milissegundos.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) if !s.is_empty() => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
        _ => None,
    }
}

pub fn timestamp_field(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    fields.get(key).and_then(parse_timestamp)
}

pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("false")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn parses_firestore_and_iso_timestamps() {
        let iso = parse_timestamp(&json!("2025-03-10T12:00:00Z")).unwrap();
        let fire = parse_timestamp(&json!({ "seconds": iso.timestamp(), "nanoseconds": 0 })).unwrap();
        assert_eq!(iso, fire);
        assert!(parse_timestamp(&json!("2025-03-10")).is_some());
        assert!(parse_timestamp(&json!("nope")).is_none());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert_eq!(finite_number(&json!(12)), Some(Decimal::from(12)));
        assert_eq!(finite_number(&json!("12")), None);
    }
}
