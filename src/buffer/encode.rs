//! Typed value encoding: ASCII suffix forms (all versions) and binary
//! framing (V2+).

use crate::error::{Error, Result};

/// Binary framing type bytes.
pub mod type_byte {
    pub const DOUBLE: u8 = 16;
    pub const ARRAY: u8 = 17;
    pub const DECIMAL: u8 = 18;
}
pub mod element_type {
    pub const DOUBLE: u8 = 10;
}

/// `<n>i`: long column/field value. `i64::MIN` has no valid representation
/// and is rejected.
pub fn encode_long_ascii(v: i64) -> Result<String> {
    if v == i64::MIN {
        return Err(Error::invalid_api_call(
            "Special case: i64::MIN cannot be represented as a QuestDB long",
        ));
    }
    Ok(format!("{v}i"))
}

/// `t` or `f`: boolean column/field value.
pub fn encode_bool_ascii(v: bool) -> &'static str {
    if v {
        "t"
    } else {
        "f"
    }
}

/// `<epoch_us>t`: V1 column timestamp.
pub fn encode_timestamp_micros_ascii(epoch_us: i64) -> String {
    format!("{epoch_us}t")
}

/// `<epoch_ns>n`: V2/V3 column timestamp.
pub fn encode_timestamp_nanos_ascii(epoch_ns: i64) -> String {
    format!("{epoch_ns}n")
}

/// `<epoch_ns>` with no suffix: the designated timestamp.
pub fn encode_designated_timestamp_ascii(epoch_ns: i64) -> String {
    epoch_ns.to_string()
}

/// Renders an `f64` the way the upstream client renders ASCII doubles:
/// scientific notation, uppercase `E`, an explicit `+` on a non-negative
/// exponent, and at least one fractional digit in the mantissa.
///
/// Used for V1 double columns only. V2+ always uses the binary double
/// encoding.
pub fn format_double_ascii(v: f64) -> String {
    if v == 0.0 {
        return if v.is_sign_negative() {
            "-0.0".to_string()
        } else {
            "0.0".to_string()
        };
    }
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }

    let rendered = format!("{v:E}");
    let (mantissa, exp) = rendered
        .split_once('E')
        .expect("UpperExp always contains 'E'");
    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{mantissa}.0")
    };
    let exp: i32 = exp.parse().expect("exponent is always a valid integer");
    format!("{mantissa}E{exp:+}")
}

/// `=` `DOUBLE` + 8 bytes little-endian IEEE-754: V2/V3 binary double.
pub fn encode_double_binary(v: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.push(b'=');
    out.push(type_byte::DOUBLE);
    out.extend_from_slice(&v.to_le_bytes());
    out
}

pub fn decode_double_binary(bytes: &[u8]) -> Result<f64> {
    if bytes.len() != 10 || bytes[0] != b'=' || bytes[1] != type_byte::DOUBLE {
        return Err(Error::invalid_api_call("malformed binary double framing"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[2..10]);
    Ok(f64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_min_is_rejected() {
        assert!(encode_long_ascii(i64::MIN).is_err());
    }

    #[test]
    fn long_encodes_with_trailing_i() {
        assert_eq!(encode_long_ascii(-9223372036854775807).unwrap(), "-9223372036854775807i");
        assert_eq!(encode_long_ascii(9223372036854775807).unwrap(), "9223372036854775807i");
        assert_eq!(encode_long_ascii(10).unwrap(), "10i");
    }

    #[test]
    fn bool_encodes_as_single_char() {
        assert_eq!(encode_bool_ascii(true), "t");
        assert_eq!(encode_bool_ascii(false), "f");
    }

    #[test]
    fn double_formats_like_s2_scenario() {
        assert_eq!(
            format_double_ascii(-1.7976931348623157E308),
            "-1.7976931348623157E+308"
        );
        assert_eq!(
            format_double_ascii(1.7976931348623157E308),
            "1.7976931348623157E+308"
        );
    }

    #[test]
    fn double_negative_exponent_gets_explicit_sign_too() {
        let rendered = format_double_ascii(1.5e-10);
        assert!(rendered.starts_with("1.5E-10"));
    }

    #[test]
    fn double_binary_round_trips() {
        for v in [0.0_f64, 1.2, -3.4, f64::MAX, f64::MIN_POSITIVE] {
            let encoded = encode_double_binary(v);
            let decoded = decode_double_binary(&encoded).unwrap();
            assert_eq!(decoded.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn double_binary_framing_starts_with_equals_and_type_byte() {
        let encoded = encode_double_binary(1.0);
        assert_eq!(encoded[0], b'=');
        assert_eq!(encoded[1], type_byte::DOUBLE);
        assert_eq!(encoded.len(), 10);
    }
}
