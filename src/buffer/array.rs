//! Binary double array encoding (protocol version 2+).
//!
//! Wire shape: `=` `ARRAY` `<element_type:u8>` `<rank:u8>` `<dims:u32 LE
//! each>` `<elements:f64 LE each, row-major>`.

use crate::buffer::encode::{element_type, type_byte};
use crate::error::{Error, Result};

/// An n-dimensional array of `f64`, stored flat in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArrayF64 {
    shape: Vec<u32>,
    data: Vec<f64>,
}

impl NdArrayF64 {
    /// Builds an array from `shape` and flat `data`, checking that the
    /// element count implied by `shape` matches `data.len()`.
    pub fn new(shape: Vec<u32>, data: Vec<f64>) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::invalid_array_shape(
                "array must have at least one dimension",
            ));
        }
        if shape.len() > u8::MAX as usize {
            return Err(Error::invalid_array_shape(format!(
                "array rank {} exceeds the maximum of {}",
                shape.len(),
                u8::MAX
            )));
        }
        let expected: u64 = shape.iter().map(|&d| d as u64).product();
        if expected != data.len() as u64 {
            return Err(Error::invalid_array_shape(format!(
                "shape {shape:?} implies {expected} elements but {} were given",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// Encodes `array` as `=` `ARRAY` `DOUBLE` `<rank>` `<dims>` `<elements>`.
pub fn encode_array_f64(array: &NdArrayF64) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + array.shape.len() * 4 + array.data.len() * 8);
    out.push(b'=');
    out.push(type_byte::ARRAY);
    out.push(element_type::DOUBLE);
    out.push(array.shape.len() as u8);
    for &dim in &array.shape {
        out.extend_from_slice(&dim.to_le_bytes());
    }
    for &v in &array.data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decodes a value previously produced by [`encode_array_f64`].
pub fn decode_array_f64(bytes: &[u8]) -> Result<NdArrayF64> {
    if bytes.len() < 4 || bytes[0] != b'=' || bytes[1] != type_byte::ARRAY {
        return Err(Error::invalid_array_shape("malformed binary array framing"));
    }
    if bytes[2] != element_type::DOUBLE {
        return Err(Error::invalid_array_shape(
            "unsupported array element type",
        ));
    }
    let rank = bytes[3] as usize;
    let dims_end = 4 + rank * 4;
    if bytes.len() < dims_end {
        return Err(Error::invalid_array_shape(
            "binary array framing truncated before dimensions",
        ));
    }
    let mut shape = Vec::with_capacity(rank);
    for i in 0..rank {
        let start = 4 + i * 4;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[start..start + 4]);
        shape.push(u32::from_le_bytes(buf));
    }

    let element_count: u64 = shape.iter().map(|&d| d as u64).product();
    let elements_bytes = element_count as usize * 8;
    if bytes.len() != dims_end + elements_bytes {
        return Err(Error::invalid_array_shape(
            "binary array framing length does not match its declared shape",
        ));
    }
    let mut data = Vec::with_capacity(element_count as usize);
    for i in 0..element_count as usize {
        let start = dims_end + i * 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[start..start + 8]);
        data.push(f64::from_le_bytes(buf));
    }
    NdArrayF64::new(shape, data)
}
