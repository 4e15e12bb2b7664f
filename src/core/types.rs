use super::{Result, StoreError, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to value mapping held by a document
pub type Fields = BTreeMap<String, Value>;

/// Convert any serializable struct or JSON object into document fields
pub fn to_fields<T: Serialize + ?Sized>(data: &T) -> Result<Fields> {
    match serde_json::to_value(data)? {
        JsonValue::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect()),
        other => Err(StoreError::Serialization(format!(
            "document data must be an object, got {}",
            Value::from(other).type_name()
        ))),
    }
}

/// Location of a single document: collection path plus identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Parse `collection/id`. Nested collections keep their slashes:
    /// `leagues/ipl/matches/m1` has collection `leagues/ipl/matches`.
    pub fn parse(path: &str) -> Result<Self> {
        match path.trim_matches('/').rsplit_once('/') {
            Some((collection, id)) if !collection.is_empty() && !id.is_empty() => {
                Ok(Self::new(collection, id))
            }
            _ => Err(StoreError::InvalidQuery(format!(
                "'{}' is not a document path",
                path
            ))),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Cached copy of a remote document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a field; dotted names descend into nested maps
    pub fn get(&self, field: &str) -> Option<&Value> {
        let mut parts = field.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            match current {
                Value::Map(map) => current = map.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// JSON object of the fields with the identifier merged in as `id`
    pub fn to_json(&self) -> JsonValue {
        let mut map: serde_json::Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        map.entry("id")
            .or_insert_with(|| JsonValue::String(self.id.clone()));
        JsonValue::Object(map)
    }

    /// Decode into a typed record; the identifier is available as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}
