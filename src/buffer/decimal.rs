//! Binary decimal encoding (protocol version 3 only).
//!
//! Wire shape: `=` `DECIMAL` `<scale:u8>` `<len:u8>` `<mantissa bytes>`.
//! The mantissa is a minimal-length two's-complement big-endian integer;
//! `null` is represented as `scale = 0, len = 0` with no mantissa bytes.

use crate::buffer::encode::type_byte;
use crate::error::{Error, Result};

/// Maximum decimal scale accepted by the server.
pub const MAX_SCALE: u8 = 76;

/// A decimal value ready to encode: an arbitrary-precision mantissa plus a
/// base-10 scale (the value equals `mantissa * 10^-scale`), or `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalValue {
    Null,
    Value { mantissa: i128, scale: u8 },
}

impl DecimalValue {
    pub fn new(mantissa: i128, scale: u8) -> Result<Self> {
        if scale > MAX_SCALE {
            return Err(Error::invalid_api_call(format!(
                "decimal scale {scale} exceeds the maximum of {MAX_SCALE}"
            )));
        }
        Ok(Self::Value { mantissa, scale })
    }
}

/// Strips redundant leading sign-extension bytes from a big-endian two's
/// complement representation, keeping the encoding minimal while still
/// unambiguous: a leading byte is redundant only if it's pure sign
/// extension (`0x00` for non-negative, `0xFF` for negative) AND the next
/// byte's sign bit already agrees with the overall sign.
fn minimal_be_bytes(mantissa: i128) -> Vec<u8> {
    if mantissa == 0 {
        return vec![0u8];
    }

    let full = mantissa.to_be_bytes();
    let negative = mantissa < 0;
    let mut start = 0;
    while start < full.len() - 1 {
        let redundant = if negative {
            full[start] == 0xFF
        } else {
            full[start] == 0x00
        };
        if !redundant {
            break;
        }
        let next_sign_bit_set = full[start + 1] & 0x80 != 0;
        if next_sign_bit_set != negative {
            break;
        }
        start += 1;
    }
    full[start..].to_vec()
}

fn mantissa_from_be_bytes(bytes: &[u8]) -> i128 {
    if bytes.is_empty() {
        return 0;
    }
    let negative = bytes[0] & 0x80 != 0;
    let mut buf = [if negative { 0xFFu8 } else { 0x00 }; 16];
    let start = 16 - bytes.len();
    buf[start..].copy_from_slice(bytes);
    i128::from_be_bytes(buf)
}

/// Encodes `value` as `=` `DECIMAL` `<scale>` `<len>` `<mantissa...>`.
pub fn encode_decimal(value: &DecimalValue) -> Vec<u8> {
    let mut out = vec![b'=', type_byte::DECIMAL];
    match value {
        DecimalValue::Null => {
            out.push(0);
            out.push(0);
        }
        DecimalValue::Value { mantissa, scale } => {
            // -0 at any scale carries no information beyond 0; normalize so
            // the wire form is canonical.
            let mantissa = if *mantissa == 0 { 0 } else { *mantissa };
            let bytes = minimal_be_bytes(mantissa);
            out.push(*scale);
            out.push(bytes.len() as u8);
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// Decodes a value previously produced by [`encode_decimal`].
pub fn decode_decimal(bytes: &[u8]) -> Result<DecimalValue> {
    if bytes.len() < 4 || bytes[0] != b'=' || bytes[1] != type_byte::DECIMAL {
        return Err(Error::invalid_api_call("malformed binary decimal framing"));
    }
    let scale = bytes[2];
    let len = bytes[3] as usize;
    if bytes.len() != 4 + len {
        return Err(Error::invalid_api_call(
            "binary decimal mantissa length does not match framing",
        ));
    }
    if scale == 0 && len == 0 {
        return Ok(DecimalValue::Null);
    }
    let mantissa = mantissa_from_be_bytes(&bytes[4..]);
    DecimalValue::new(mantissa, scale)
}
