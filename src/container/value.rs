use serde::{Deserialize, Serialize};

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Double,
    Text,
    Bytes,
    Container,
    Sequence,
}

/// A single typed value held by a [`ValueContainer`](super::ValueContainer).
///
/// Result rows use the same closed set of variants whatever the backend column type was:
/// ```rust
/// use pg_session_manager::prelude::*;
///
/// let age = Value::Int(10);
/// assert_eq!(age.value_type(), ValueType::Int);
/// assert_eq!(age.to_double(), 10.0);
/// assert_eq!(Value::Text("A".into()).to_string(), "A");
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value; every integer column width is widened to 64 bits
    Int(i64),
    /// Floating point value (64-bit)
    Double(#[serde(with = "finite_or_tagged")] f64),
    /// Text value, verbatim
    Text(String),
    /// Raw binary data
    Bytes(Vec<u8>),
    /// A serialized container embedded as an opaque value
    Container(Vec<u8>),
    /// Ordered sequence of values
    Sequence(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::Text,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Container(_) => ValueType::Container,
            Value::Sequence(_) => ValueType::Sequence,
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        if let Value::Double(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) | Value::Container(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        if let Value::Sequence(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// Lenient integer coercion. NULL and unparseable text give 0; doubles truncate
    /// toward zero (saturating at the `i64` bounds).
    #[must_use]
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Bool(b) => i64::from(*b),
            Value::Double(f) => *f as i64,
            Value::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            Value::Null | Value::Bytes(_) | Value::Container(_) | Value::Sequence(_) => 0,
        }
    }

    /// Lenient floating point coercion. NULL and unparseable text give 0.0.
    #[must_use]
    pub fn to_double(&self) -> f64 {
        match self {
            Value::Double(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Null | Value::Bytes(_) | Value::Container(_) | Value::Sequence(_) => 0.0,
        }
    }

    /// Lenient boolean coercion: non-zero numbers, non-empty collections and the usual
    /// textual spellings (`true`, `t`, `yes`, `y`, `on`, `1`) are true.
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Double(f) => *f != 0.0,
            Value::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "t" | "yes" | "y" | "on" | "1"
            ),
            Value::Bytes(bytes) | Value::Container(bytes) => !bytes.is_empty(),
            Value::Sequence(values) => !values.is_empty(),
            Value::Null => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
            // binary payloads are not guaranteed to be text
            Value::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Value::Container(bytes) => match super::ValueContainer::from_bytes(bytes) {
                Ok(inner) => write!(f, "{inner}"),
                Err(_) => write!(f, "<container: {} bytes>", bytes.len()),
            },
            Value::Sequence(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// JSON has no NaN or infinities; carry them as strings so doubles round-trip.
mod finite_or_tagged {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Special(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else if value.is_infinite() {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(f) => Ok(f),
            Repr::Special(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid double: {other}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_coerces_to_zero_values_but_keeps_its_tag() {
        let v = Value::Null;
        assert_eq!(v.value_type(), ValueType::Null);
        assert_eq!(v.to_int(), 0);
        assert_eq!(v.to_double(), 0.0);
        assert!(!v.to_boolean());
        assert_eq!(v.to_string(), "");
    }

    #[test]
    fn text_coercions() {
        assert_eq!(Value::from(" 42 ").to_int(), 42);
        assert_eq!(Value::from("3.9").to_int(), 3);
        assert_eq!(Value::from("abc").to_int(), 0);
        assert!((Value::from("2.5").to_double() - 2.5).abs() < f64::EPSILON);
        assert!(Value::from("Yes").to_boolean());
        assert!(!Value::from("f").to_boolean());
    }

    #[test]
    fn numeric_coercions() {
        assert_eq!(Value::Double(-7.8).to_int(), -7);
        assert_eq!(Value::Bool(true).to_int(), 1);
        assert!((Value::Int(3).to_double() - 3.0).abs() < f64::EPSILON);
        assert!(Value::Int(-1).to_boolean());
        assert!(!Value::Double(0.0).to_boolean());
    }

    #[test]
    fn bytes_display_is_lossy_but_accessor_is_exact() {
        let raw = vec![0xde, 0xad, b'o', b'k'];
        let v = Value::Bytes(raw.clone());
        assert_eq!(v.as_bytes(), Some(raw.as_slice()));
        assert!(v.to_string().ends_with("ok"));
        assert_eq!(v.as_text(), None);
    }

    #[test]
    fn option_maps_none_to_null() {
        let v: Value = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: Value = Some(5_i64).into();
        assert_eq!(v.as_int(), Some(5));
    }

    #[test]
    fn non_finite_doubles_survive_json() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.25] {
            let json = serde_json::to_string(&Value::Double(f)).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            let got = back.as_double().unwrap();
            if f.is_nan() {
                assert!(got.is_nan());
            } else {
                assert_eq!(got, f);
            }
        }
    }

    #[test]
    fn sequence_display_joins_elements() {
        let v = Value::Sequence(vec![Value::Int(1), Value::from("x"), Value::Null]);
        assert_eq!(v.to_string(), "[1, x, ]");
    }
}
