//! JSON payloads: a bare array, or an object with a list field.

use serde_json::{Map, Value};

/// Preferred list fields, checked before any other array-valued field.
const LIST_FIELDS: [&str; 2] = ["tickers", "symbols"];

/// Fields read from object elements (`[{"symbol": "AAPL"}, ...]`).
const ITEM_FIELDS: [&str; 2] = ["symbol", "ticker"];

pub(super) fn applies(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(list_of)
        .is_some()
}

pub(super) fn extract(text: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Vec::new();
    };
    list_of(&value)
        .map(|items| items.iter().filter_map(candidate_of).collect())
        .unwrap_or_default()
}

fn list_of(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => list_field(map),
        _ => None,
    }
}

fn list_field(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    LIST_FIELDS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))
        .or_else(|| map.values().find_map(Value::as_array))
}

fn candidate_of(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ITEM_FIELDS.iter().find_map(|k| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(k))
                .and_then(|(_, v)| v.as_str())
                .map(str::to_string)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array() {
        assert_eq!(extract(r#"["AAPL", "msft", 7, null]"#), vec!["AAPL", "msft", "7"]);
    }

    #[test]
    fn tickers_field_preferred() {
        let text = r#"{"aaa": ["X"], "tickers": ["AAPL", "MSFT"]}"#;
        assert!(applies(text));
        assert_eq!(extract(text), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn any_array_field_as_last_resort() {
        let text = r#"{"updated": "2024-01-01", "constituents": ["KO"]}"#;
        assert_eq!(extract(text), vec!["KO"]);
    }

    #[test]
    fn object_elements_use_symbol_field() {
        let text = r#"[{"Symbol": "AAPL", "name": "Apple"}, {"ticker": "KO"}, {"name": "none"}]"#;
        assert_eq!(extract(text), vec!["AAPL", "KO"]);
    }

    #[test]
    fn scalars_and_arrayless_objects_do_not_apply() {
        assert!(!applies(r#""AAPL""#));
        assert!(!applies(r#"{"count": 3}"#));
        assert!(!applies("Symbol\nAAPL"));
    }
}
