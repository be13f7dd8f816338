use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::DbError;

/// Field holding the materialized rows of a select.
pub const ROW_FIELD: &str = "row";

/// Ordered mapping from field name to [`Value`].
///
/// Field order is insertion order. Keys may repeat (a select can return two columns with
/// the same name); [`get`](Self::get) returns the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueContainer {
    fields: Vec<(String, Value)>,
}

impl ValueContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set a field, replacing the first existing field with the same name or appending.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    /// Append a field without checking for an existing one.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((key.into(), value.into()));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize the container to its byte representation.
    ///
    /// # Errors
    /// Returns `DbError::Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DbError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Re-hydrate a container from bytes produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// Returns `DbError::Serialization` if the bytes are not a serialized container.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DbError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize this container into an opaque embedded value.
    ///
    /// # Errors
    /// Returns `DbError::Serialization` if encoding fails.
    pub fn embed(&self) -> Result<Value, DbError> {
        Ok(Value::Container(self.to_bytes()?))
    }

    /// Number of entries in the `"row"` sequence, if the field is present.
    #[must_use]
    pub fn row_count(&self) -> Option<usize> {
        self.get(ROW_FIELD)
            .and_then(Value::as_sequence)
            .map(<[Value]>::len)
    }

    /// Re-hydrate every embedded row of the `"row"` field, in order.
    ///
    /// A container without a `"row"` field yields no rows.
    ///
    /// # Errors
    /// Returns `DbError::Execution` if `"row"` holds something other than embedded
    /// containers, or `DbError::Serialization` if a row fails to decode.
    pub fn rows(&self) -> Result<Vec<ValueContainer>, DbError> {
        let Some(value) = self.get(ROW_FIELD) else {
            return Ok(Vec::new());
        };
        let Some(entries) = value.as_sequence() else {
            return Err(DbError::Execution(format!(
                "\"{ROW_FIELD}\" is {:?}, not a sequence",
                value.value_type()
            )));
        };
        entries
            .iter()
            .map(|entry| match entry {
                Value::Container(bytes) => ValueContainer::from_bytes(bytes),
                other => Err(DbError::Execution(format!(
                    "row entry is {:?}, not an embedded container",
                    other.value_type()
                ))),
            })
            .collect()
    }
}

impl std::fmt::Display for ValueContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Value::Text(s) => write!(f, "{key}: {s:?}")?,
                Value::Null => write!(f, "{key}: null")?,
                other => write!(f, "{key}: {other}")?,
            }
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueContainer {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut container = ValueContainer::new();
        for (key, value) in iter {
            container.push(key, value);
        }
        container
    }
}
