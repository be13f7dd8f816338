use std::error::Error;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tokio_postgres::types::{FromSql, Type};

use crate::container::Value;

/// `timestamp`, `timestamptz` and `date` read straight from the wire.
///
/// The server allows `infinity`, `-infinity` and years chrono cannot represent; those
/// never fail to decode. Infinities become the text PostgreSQL itself prints, and a
/// finite value outside chrono's range keeps its raw wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalValue(pub Value);

// 2000-01-01 00:00:00, the PostgreSQL epoch
fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(0, 0, 0)
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N], Box<dyn Error + Sync + Send>> {
    raw.try_into()
        .map_err(|_| format!("expected {N} bytes, got {}", raw.len()).into())
}

fn timestamp_text(micros: i64) -> Option<String> {
    match micros {
        i64::MAX => Some("infinity".to_string()),
        i64::MIN => Some("-infinity".to_string()),
        _ => epoch()?
            .checked_add_signed(TimeDelta::microseconds(micros))
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}

fn date_text(days: i32) -> Option<String> {
    match days {
        i32::MAX => Some("infinity".to_string()),
        i32::MIN => Some("-infinity".to_string()),
        _ => TimeDelta::try_days(i64::from(days))
            .and_then(|delta| epoch()?.date().checked_add_signed(delta))
            .map(|d| d.format("%Y-%m-%d").to_string()),
    }
}

impl<'a> FromSql<'a> for TemporalValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let text = match *ty {
            Type::DATE => date_text(i32::from_be_bytes(fixed(raw)?)),
            Type::TIMESTAMPTZ => {
                let micros = i64::from_be_bytes(fixed(raw)?);
                let text = timestamp_text(micros);
                // infinities carry no offset
                if matches!(micros, i64::MAX | i64::MIN) {
                    text
                } else {
                    text.map(|t| t + "+00:00")
                }
            }
            _ => timestamp_text(i64::from_be_bytes(fixed(raw)?)),
        };
        Ok(TemporalValue(text.map_or_else(|| Value::Bytes(raw.to_vec()), Value::Text)))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(ty: &Type, raw: &[u8]) -> Value {
        TemporalValue::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn infinities_render_as_text() {
        assert_eq!(
            decode(&Type::TIMESTAMP, &i64::MAX.to_be_bytes()),
            Value::Text("infinity".into())
        );
        assert_eq!(
            decode(&Type::TIMESTAMPTZ, &i64::MIN.to_be_bytes()),
            Value::Text("-infinity".into())
        );
        assert_eq!(
            decode(&Type::DATE, &i32::MAX.to_be_bytes()),
            Value::Text("infinity".into())
        );
    }

    #[test]
    fn finite_values_are_formatted() {
        // 2024-01-02 03:04:05 is 8767 days and 11045 seconds after the epoch
        let micros: i64 = (8767 * 86_400 + 11_045) * 1_000_000;
        assert_eq!(
            decode(&Type::TIMESTAMP, &micros.to_be_bytes()),
            Value::Text("2024-01-02 03:04:05".into())
        );
        assert_eq!(
            decode(&Type::TIMESTAMPTZ, &(micros + 500_000).to_be_bytes()),
            Value::Text("2024-01-02 03:04:05.500+00:00".into())
        );
        assert_eq!(
            decode(&Type::DATE, &8767_i32.to_be_bytes()),
            Value::Text("2024-01-02".into())
        );
        assert_eq!(
            decode(&Type::DATE, &(-1_i32).to_be_bytes()),
            Value::Text("1999-12-31".into())
        );
    }

    #[test]
    fn out_of_range_keeps_raw_bytes() {
        let raw = (i64::MAX - 1).to_be_bytes();
        assert_eq!(decode(&Type::TIMESTAMP, &raw), Value::Bytes(raw.to_vec()));
        let raw = (i32::MAX - 1).to_be_bytes();
        assert_eq!(decode(&Type::DATE, &raw), Value::Bytes(raw.to_vec()));
    }

    #[test]
    fn rejects_wrong_width() {
        assert!(TemporalValue::from_sql(&Type::DATE, &[0, 0, 1]).is_err());
        assert!(!<TemporalValue as FromSql>::accepts(&Type::TIME));
    }
}
