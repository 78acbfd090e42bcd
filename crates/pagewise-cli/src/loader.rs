//! JSON dataset loading.
//!
//! A dataset file looks like:
//!
//! ```json
//! {
//!   "schemas": [
//!     { "kind": "Post", "references": { "topic": "PostTopic" }, "prefetch": ["parent"] }
//!   ],
//!   "entities": [
//!     { "key": "User:bill/Post:p1", "fields": { "title": "Hello", "topic": { "$key": "PostTopic:t1" } } }
//!   ]
//! }
//! ```
//!
//! Field values map from JSON scalars; `{"$date": "YYYY-MM-DD"}` and
//! `{"$key": "Kind:name/..."}` produce dates and entity references.

use std::collections::BTreeMap;
use std::path::Path;

use pagewise_core::catalog::{EntitySchema, FieldSchema};
use pagewise_core::storage::{Entity, MemoryStore};
use pagewise_proto::{Key, Value};
use serde::Deserialize;
use thiserror::Error;

/// Dataset loading errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse dataset: {0}")]
    Json(#[from] serde_json::Error),

    /// A key or value inside the dataset is malformed.
    #[error("invalid dataset entry: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    schemas: Vec<SchemaEntry>,
    entities: Vec<EntityEntry>,
}

#[derive(Debug, Deserialize)]
struct SchemaEntry {
    kind: String,
    #[serde(default)]
    references: BTreeMap<String, String>,
    #[serde(default)]
    prefetch: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct EntityEntry {
    key: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Load a dataset file into a fresh store.
pub fn load_file(path: &Path) -> Result<MemoryStore, LoadError> {
    let text = std::fs::read_to_string(path)?;
    load_str(&text)
}

/// Load a dataset from JSON text into a fresh store.
pub fn load_str(text: &str) -> Result<MemoryStore, LoadError> {
    let dataset: Dataset = serde_json::from_str(text)?;
    let store = MemoryStore::new();

    for entry in dataset.schemas {
        let mut schema = EntitySchema::new(entry.kind);
        for (field, target) in entry.references {
            schema = schema.with_field(FieldSchema::reference(field, target));
        }
        if let Some(prefetch) = entry.prefetch {
            schema = schema.with_prefetch(prefetch);
        }
        store.register_schema(schema);
    }

    for entry in dataset.entities {
        let key = parse_key(&entry.key)?;
        let mut entity = Entity::new(key);
        for (name, json) in entry.fields {
            entity.set(name, json_to_value(&json)?);
        }
        store.put(&entity);
    }

    store.reset_instantiations();
    Ok(store)
}

/// Parse a `Kind:name/Kind:name` key.
pub fn parse_key(text: &str) -> Result<Key, LoadError> {
    Key::parse(text).map_err(|e| LoadError::Invalid(e.to_string()))
}

/// Parse a command-line literal: JSON when it parses as JSON, a date when
/// it looks like `YYYY-MM-DD`, otherwise a plain string.
pub fn parse_literal(text: &str) -> Result<Value, LoadError> {
    if let Some(date) = parse_date(text) {
        return Ok(date);
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => json_to_value(&json),
        Err(_) => Ok(Value::String(text.to_string())),
    }
}

fn parse_date(text: &str) -> Option<Value> {
    let mut parts = text.splitn(3, '-');
    let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
    if y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return None;
    }
    let (y, m, d) = (y.parse().ok()?, m.parse().ok()?, d.parse().ok()?);
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    Some(Value::date(y, m, d))
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, LoadError> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Object(map) => match (map.get("$date"), map.get("$key")) {
            (Some(Json::String(date)), None) => parse_date(date)
                .ok_or_else(|| LoadError::Invalid(format!("bad date '{date}'")))?,
            (None, Some(Json::String(key))) => Value::Key(parse_key(key)?),
            _ => {
                return Err(LoadError::Invalid(format!(
                    "unsupported object value {json}"
                )))
            }
        },
        Json::Array(_) => {
            return Err(LoadError::Invalid(format!(
                "arrays are not supported as field values: {json}"
            )))
        }
    })
}

/// Render a value for display.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int32(i) => Json::from(*i),
        Value::Int64(i) => Json::from(*i),
        Value::Float64(f) => Json::from(*f),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(b.iter().map(|x| format!("{x:02x}")).collect()),
        Value::Timestamp(t) => Json::from(*t),
        Value::Date(d) => Json::String(format!(
            "{:04}-{:02}-{:02}",
            d / 10_000,
            d / 100 % 100,
            d % 100
        )),
        Value::Key(k) => Json::String(k.to_string()),
    }
}
