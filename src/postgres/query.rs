use serde_json::Value as JsonValue;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use super::numeric::NumericAsF64;
use super::temporal::TemporalValue;
use crate::container::{ROW_FIELD, Value, ValueContainer};
use crate::error::DbError;

/// How a backend column is read into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Numeric,
    Text,
    Bytea,
    Timestamp,
    TimestampTz,
    Date,
    Json,
    /// Anything else; the raw binary wire value is kept as bytes
    Other,
}

impl ColumnKind {
    #[must_use]
    pub fn of(ty: &Type) -> Self {
        match *ty {
            Type::BOOL => ColumnKind::Bool,
            Type::INT2 => ColumnKind::Int2,
            Type::INT4 => ColumnKind::Int4,
            Type::INT8 => ColumnKind::Int8,
            Type::OID => ColumnKind::Oid,
            Type::FLOAT4 => ColumnKind::Float4,
            Type::FLOAT8 => ColumnKind::Float8,
            Type::NUMERIC => ColumnKind::Numeric,
            Type::BYTEA => ColumnKind::Bytea,
            Type::TIMESTAMP => ColumnKind::Timestamp,
            Type::TIMESTAMPTZ => ColumnKind::TimestampTz,
            Type::DATE => ColumnKind::Date,
            Type::JSON | Type::JSONB => ColumnKind::Json,
            ref other if <String as FromSql>::accepts(other) => ColumnKind::Text,
            _ => ColumnKind::Other,
        }
    }
}

/// Accepts any column type and keeps the raw binary value.
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Extracts a [`Value`] from a `tokio_postgres` row at the given index.
///
/// NULL becomes [`Value::Null`] for every column type.
///
/// # Errors
/// Returns `DbError` if the column cannot be decoded.
pub fn extract_value(row: &Row, idx: usize) -> Result<Value, DbError> {
    let kind = ColumnKind::of(row.columns()[idx].type_());

    let value = match kind {
        ColumnKind::Bool => row.try_get::<_, Option<bool>>(idx)?.into(),
        ColumnKind::Int2 => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        ColumnKind::Int4 => row.try_get::<_, Option<i32>>(idx)?.map(i64::from).into(),
        ColumnKind::Int8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        ColumnKind::Oid => row.try_get::<_, Option<u32>>(idx)?.map(i64::from).into(),
        ColumnKind::Float4 => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        ColumnKind::Float8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        ColumnKind::Numeric => row
            .try_get::<_, Option<NumericAsF64>>(idx)?
            .map(|n| n.0)
            .into(),
        ColumnKind::Text => row.try_get::<_, Option<String>>(idx)?.into(),
        ColumnKind::Bytea => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        ColumnKind::Timestamp | ColumnKind::TimestampTz | ColumnKind::Date => row
            .try_get::<_, Option<TemporalValue>>(idx)?
            .map_or(Value::Null, |t| t.0),
        ColumnKind::Json => row
            .try_get::<_, Option<JsonValue>>(idx)?
            .map(|json| json.to_string())
            .into(),
        ColumnKind::Other => row.try_get::<_, Option<RawBytes>>(idx)?.map(|raw| raw.0).into(),
    };

    Ok(value)
}

/// Build one row container, keyed by column name in backend column order.
///
/// # Errors
/// Returns `DbError` if any column cannot be decoded.
pub fn build_row_container(row: &Row) -> Result<ValueContainer, DbError> {
    let columns = row.columns();
    let mut container = ValueContainer::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        container.push(column.name(), extract_value(row, idx)?);
    }
    Ok(container)
}

/// Materialize rows into a container whose `"row"` field holds one embedded container
/// per row. An empty input still produces the field, holding an empty sequence.
///
/// # Errors
/// Returns `DbError` if a value cannot be decoded or a row cannot be serialized.
pub fn build_result_container(rows: &[Row]) -> Result<ValueContainer, DbError> {
    let mut embedded = Vec::with_capacity(rows.len());
    for row in rows {
        embedded.push(build_row_container(row)?.embed()?);
    }

    let mut result = ValueContainer::with_capacity(1);
    result.set(ROW_FIELD, Value::Sequence(embedded));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_family_is_distinguished_from_floats() {
        assert_eq!(ColumnKind::of(&Type::INT2), ColumnKind::Int2);
        assert_eq!(ColumnKind::of(&Type::INT4), ColumnKind::Int4);
        assert_eq!(ColumnKind::of(&Type::INT8), ColumnKind::Int8);
        assert_eq!(ColumnKind::of(&Type::FLOAT4), ColumnKind::Float4);
        assert_eq!(ColumnKind::of(&Type::NUMERIC), ColumnKind::Numeric);
    }

    #[test]
    fn text_like_types_read_as_text() {
        for ty in [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN] {
            assert_eq!(ColumnKind::of(&ty), ColumnKind::Text, "{ty}");
        }
    }

    #[test]
    fn binary_json_and_time_types() {
        assert_eq!(ColumnKind::of(&Type::BYTEA), ColumnKind::Bytea);
        assert_eq!(ColumnKind::of(&Type::JSONB), ColumnKind::Json);
        assert_eq!(ColumnKind::of(&Type::TIMESTAMPTZ), ColumnKind::TimestampTz);
        assert_eq!(ColumnKind::of(&Type::DATE), ColumnKind::Date);
    }

    #[test]
    fn unknown_types_fall_back_to_raw_bytes() {
        assert_eq!(ColumnKind::of(&Type::UUID), ColumnKind::Other);
        assert_eq!(ColumnKind::of(&Type::INT4_ARRAY), ColumnKind::Other);
        assert!(<RawBytes as FromSql>::accepts(&Type::UUID));
    }

    #[test]
    fn empty_result_keeps_the_row_field() {
        let result = build_result_container(&[]).unwrap();
        assert_eq!(result.row_count(), Some(0));
        assert!(result.rows().unwrap().is_empty());
    }
}
