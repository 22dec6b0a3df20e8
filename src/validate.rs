use crate::{
    beamline::Beamline,
    element::Element,
    schema::{FieldType, SchemaCatalog},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    static ref PATTERN_CACHE: Mutex<HashMap<String, Option<Regex>>> = Mutex::new(HashMap::new());
}

/// Compile-once pattern check. Schema patterns are fixed at catalog load, so
/// the compiled form is cached per pattern string. A pattern that does not
/// compile is a schema bug: it asserts in debug builds and fails every value
/// in release builds.
fn pattern_matches(pattern: &str, text: &str) -> bool {
    let mut cache = match PATTERN_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let compiled = cache.entry(pattern.to_owned()).or_insert_with(|| {
        let re = Regex::new(pattern);
        debug_assert!(re.is_ok(), "unparseable schema pattern '{pattern}'");
        re.ok()
    });
    compiled.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Generic type-checked-value predicate. Numeric fields accept JSON numbers
/// or numeric strings, since form values arrive as strings.
pub fn is_valid_value(value: &Value, field_type: &FieldType) -> bool {
    match field_type {
        FieldType::Float { min, max } => match as_f64(value) {
            Some(v) => {
                v.is_finite()
                    && min.map(|m| v >= m).unwrap_or(true)
                    && max.map(|m| v <= m).unwrap_or(true)
            }
            None => false,
        },
        FieldType::Int { min, max } => match as_i64(value) {
            Some(v) => min.map(|m| v >= m).unwrap_or(true) && max.map(|m| v <= m).unwrap_or(true),
            None => false,
        },
        FieldType::Bool => match value {
            Value::Bool(_) => true,
            Value::String(s) => s == "0" || s == "1",
            Value::Number(n) => n.as_i64() == Some(0) || n.as_i64() == Some(1),
            _ => false,
        },
        FieldType::String { pattern } => match value {
            Value::String(s) => match pattern {
                Some(p) => pattern_matches(p, s),
                None => true,
            },
            _ => false,
        },
        FieldType::Enum { choices } => match value {
            Value::String(s) => choices.iter().any(|(v, _)| v == s),
            _ => false,
        },
        FieldType::InputFile => match value {
            Value::String(s) => !s.is_empty(),
            _ => false,
        },
    }
}

/// True only when every field the element's schema declares holds a value of
/// its declared type. Fails closed: no element, an unknown type tag, or a
/// missing field all count as invalid. Advisory only; never blocks a
/// mutation, blocks commit by caller convention.
pub fn is_item_valid(item: Option<&Element>, catalog: &SchemaCatalog) -> bool {
    let Some(item) = item else {
        return false;
    };
    let Some(fields) = catalog.fields_for(&item.element_type) else {
        return false;
    };
    let Ok(record) = serde_json::to_value(item) else {
        return false;
    };
    fields.iter().all(|spec| {
        let value = record.get(&spec.name).unwrap_or(&Value::Null);
        is_valid_value(value, &spec.field_type)
    })
}

/// Conjunction over all elements; vacuously true for an empty sequence.
pub fn is_beamline_valid(beamline: &Beamline, catalog: &SchemaCatalog) -> bool {
    beamline.iter().all(|item| is_item_valid(Some(item), catalog))
}
