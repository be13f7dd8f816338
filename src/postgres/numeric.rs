use std::error::Error;

use tokio_postgres::types::{FromSql, Type};

const SIGN_POS: u16 = 0x0000;
const SIGN_NEG: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_PINF: u16 = 0xD000;
const SIGN_NINF: u16 = 0xF000;

/// `NUMERIC` read as the nearest `f64`.
///
/// Digits beyond double precision are lost; this is the documented coercion for numeric
/// columns, not an attempt at exact decimal arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericAsF64(pub f64);

impl<'a> FromSql<'a> for NumericAsF64 {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        decode_numeric(raw).map(NumericAsF64)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn read_u16(raw: &[u8], at: usize) -> Result<u16, Box<dyn Error + Sync + Send>> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "numeric value truncated".into())
}

/// Decode the binary wire format: `ndigits`, `weight`, `sign`, `dscale`, then `ndigits`
/// base-10000 digits, most significant first.
pub(crate) fn decode_numeric(raw: &[u8]) -> Result<f64, Box<dyn Error + Sync + Send>> {
    let ndigits = usize::from(read_u16(raw, 0)?);
    let weight = i32::from(i16::from_be_bytes(read_u16(raw, 2)?.to_be_bytes()));
    let sign = read_u16(raw, 4)?;

    match sign {
        SIGN_NAN => return Ok(f64::NAN),
        SIGN_PINF => return Ok(f64::INFINITY),
        SIGN_NINF => return Ok(f64::NEG_INFINITY),
        SIGN_POS | SIGN_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    if ndigits == 0 {
        return Ok(0.0);
    }

    // Spell the value as `<digits>e<exp>` and let the float parser do the rounding.
    let mut text = String::with_capacity(4 * ndigits + 8);
    if sign == SIGN_NEG {
        text.push('-');
    }
    for i in 0..ndigits {
        let digit = read_u16(raw, 8 + 2 * i)?;
        if digit >= 10_000 {
            return Err(format!("invalid numeric digit {digit}").into());
        }
        text.push_str(&format!("{digit:04}"));
    }
    let exponent = 4 * (weight + 1 - i32::try_from(ndigits)?);
    text.push_str(&format!("e{exponent}"));

    Ok(text.parse::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&u16::try_from(digits.len()).unwrap().to_be_bytes());
        out.extend_from_slice(&weight.to_be_bytes());
        out.extend_from_slice(&sign.to_be_bytes());
        out.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            out.extend_from_slice(&d.to_be_bytes());
        }
        out
    }

    #[test]
    fn decodes_fractional_values() {
        // 1299.99 = 1299 * 10000^0 + 9900 * 10000^-1
        let v = decode_numeric(&encode(0, SIGN_POS, 2, &[1299, 9900])).unwrap();
        assert!((v - 1299.99).abs() < 1e-9);
    }

    #[test]
    fn decodes_large_and_negative_values() {
        // -123456789 = 1 * 10000^2 + 2345 * 10000 + 6789
        let v = decode_numeric(&encode(2, SIGN_NEG, 0, &[1, 2345, 6789])).unwrap();
        assert!((v + 123_456_789.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_zero_and_small_values() {
        assert_eq!(decode_numeric(&encode(0, SIGN_POS, 0, &[])).unwrap(), 0.0);
        // 0.0005 = 5 * 10000^-1
        let v = decode_numeric(&encode(-1, SIGN_POS, 4, &[5])).unwrap();
        assert!((v - 0.0005).abs() < 1e-15);
    }

    #[test]
    fn decodes_special_values() {
        assert!(decode_numeric(&encode(0, SIGN_NAN, 0, &[])).unwrap().is_nan());
        assert_eq!(
            decode_numeric(&encode(0, SIGN_PINF, 0, &[])).unwrap(),
            f64::INFINITY
        );
        assert_eq!(
            decode_numeric(&encode(0, SIGN_NINF, 0, &[])).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode_numeric(&[0, 1, 0]).is_err());
        let mut raw = encode(0, SIGN_POS, 0, &[12]);
        raw.truncate(raw.len() - 1);
        assert!(decode_numeric(&raw).is_err());
    }

    #[test]
    fn decodes_to_the_nearest_double() {
        // 0.0003 = 3 * 10000^-1
        assert_eq!(decode_numeric(&encode(-1, SIGN_POS, 4, &[3])).unwrap(), 0.0003);
        assert_eq!(decode_numeric(&encode(0, SIGN_POS, 1, &[0, 1000])).unwrap(), 0.1);
        // 3.8666666666666667
        assert_eq!(
            decode_numeric(&encode(0, SIGN_POS, 16, &[3, 8666, 6666, 6666, 6666, 7000])).unwrap(),
            58.0 / 15.0
        );
        assert_eq!(
            decode_numeric(&encode(1, SIGN_NEG, 2, &[12, 3456, 7800])).unwrap(),
            -123_456.78
        );
    }

    #[test]
    fn accepts_only_numeric() {
        assert!(<NumericAsF64 as FromSql>::accepts(&Type::NUMERIC));
        assert!(!<NumericAsF64 as FromSql>::accepts(&Type::FLOAT8));
    }
}
