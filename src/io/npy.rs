//! Reader and writer for the NumPy `.npy` array dialect served by tile servers.
//!
//! Layout: 6-byte magic `\x93NUMPY`, two version bytes, a little-endian `u16`
//! header length at offset 8, an ASCII dict header such as
//! `{'descr': '<u2', 'fortran_order': False, 'shape': (5, 256, 256), }`,
//! then the raw little-endian samples, band-major.
use thiserror::Error;
use tracing::debug;

use crate::core::tensor::{TensorData, TileTensor};
use crate::types::ElementType;

pub const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_LEN_OFFSET: usize = 8;
const PREAMBLE_LEN: usize = 10;
const HEADER_ALIGN: usize = 64;

/// Malformed or unsupported NPY input. Permanent for a given buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing NPY magic prefix")]
    BadMagic,

    #[error("buffer truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("malformed header: {0}")]
    Header(String),

    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),

    #[error("unsupported shape: {0:?}")]
    UnsupportedShape(Vec<usize>),

    #[error("fortran-ordered arrays are not supported")]
    UnsupportedLayout,

    #[error("data section has {actual} bytes, shape {shape:?} of {element_type} needs {expected}")]
    DataLength {
        shape: [usize; 3],
        element_type: ElementType,
        expected: usize,
        actual: usize,
    },
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    element_type: ElementType,
    shape: Vec<usize>,
    fortran_order: bool,
}

/// True when `buf` starts with the NPY magic.
pub fn is_npy(buf: &[u8]) -> bool {
    buf.starts_with(MAGIC)
}

/// Decode an NPY buffer into a tile tensor.
///
/// A zero-length buffer is a blank tile and yields `Ok(None)`. Two-dimensional
/// arrays are read as a single band.
pub fn decode_npy(buf: &[u8]) -> Result<Option<TileTensor>, FormatError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if !is_npy(buf) {
        return Err(FormatError::BadMagic);
    }
    if buf.len() < PREAMBLE_LEN {
        return Err(FormatError::Truncated {
            needed: PREAMBLE_LEN,
            actual: buf.len(),
        });
    }

    let header_len =
        u16::from_le_bytes([buf[HEADER_LEN_OFFSET], buf[HEADER_LEN_OFFSET + 1]]) as usize;
    let data_offset = PREAMBLE_LEN + header_len;
    if buf.len() < data_offset {
        return Err(FormatError::Truncated {
            needed: data_offset,
            actual: buf.len(),
        });
    }

    let raw_header = &buf[PREAMBLE_LEN..data_offset];
    if !raw_header.is_ascii() {
        return Err(FormatError::Header("header is not ASCII".into()));
    }
    let text = std::str::from_utf8(raw_header)
        .map_err(|_| FormatError::Header("header is not ASCII".into()))?;
    let header = parse_header(text)?;
    if header.fortran_order {
        return Err(FormatError::UnsupportedLayout);
    }

    let shape = match header.shape.as_slice() {
        &[bands, height, width] => [bands, height, width],
        &[height, width] => [1, height, width],
        other => return Err(FormatError::UnsupportedShape(other.to_vec())),
    };

    let body = &buf[data_offset..];
    let expected = shape
        .iter()
        .try_fold(header.element_type.size_bytes(), |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| FormatError::UnsupportedShape(shape.to_vec()))?;
    if body.len() != expected {
        return Err(FormatError::DataLength {
            shape,
            element_type: header.element_type,
            expected,
            actual: body.len(),
        });
    }

    let data = TensorData::from_le_bytes(header.element_type, body);
    debug!(
        "decoded npy: dtype={}, shape={:?}, header_len={}",
        header.element_type, shape, header_len
    );
    TileTensor::new(shape, data)
        .map(Some)
        .map_err(|e| FormatError::Header(e.to_string()))
}

/// Encode a tensor in the same dialect `decode_npy` reads (format version 1.0).
pub fn encode_npy(tensor: &TileTensor) -> Vec<u8> {
    let [bands, height, width] = tensor.shape();
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}, {}), }}",
        tensor.element_type().descr(),
        bands,
        height,
        width
    );

    // Pad with spaces so the data section starts on an aligned offset; the
    // header always ends in a newline.
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    let pad = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header = format!("{}{}\n", dict, " ".repeat(pad));

    let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    tensor.data().extend_le_bytes(&mut out);
    out
}

/// Tolerant reader for the Python-literal dict header. Only the three keys
/// the format defines are looked at; either quote style is accepted.
fn parse_header(text: &str) -> Result<Header, FormatError> {
    let descr = dict_value(text, "descr")
        .and_then(quoted)
        .ok_or_else(|| FormatError::Header(format!("no 'descr' in {:?}", text.trim())))?;
    let element_type = ElementType::from_descr(descr)
        .ok_or_else(|| FormatError::UnsupportedElementType(descr.to_string()))?;

    let shape_src = dict_value(text, "shape")
        .ok_or_else(|| FormatError::Header(format!("no 'shape' in {:?}", text.trim())))?;
    let shape = parse_tuple(shape_src)?;

    let fortran_order = dict_value(text, "fortran_order")
        .and_then(|v| v.get(..4))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    Ok(Header {
        element_type,
        shape,
        fortran_order,
    })
}

/// Text following `'key':` (or `"key":`), leading whitespace trimmed.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    ['\'', '"'].into_iter().find_map(|q| {
        let needle = format!("{q}{key}{q}");
        let start = text.find(&needle)? + needle.len();
        let rest = text[start..].trim_start().strip_prefix(':')?;
        Some(rest.trim_start())
    })
}

fn quoted(src: &str) -> Option<&str> {
    let q = src.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &src[1..];
    body.find(q).map(|end| &body[..end])
}

/// `(5, 256, 256)`, `(256, 256)` or `(7,)`.
fn parse_tuple(src: &str) -> Result<Vec<usize>, FormatError> {
    let inner = src
        .strip_prefix('(')
        .and_then(|rest| rest.find(')').map(|end| &rest[..end]))
        .ok_or_else(|| FormatError::Header(format!("shape is not a tuple: {:?}", src)))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| FormatError::Header(format!("bad shape dimension {:?}", s)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_npy(header: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_empty_buffer_is_blank_tile() {
        assert_eq!(decode_npy(&[]), Ok(None));
    }

    #[test]
    fn test_bad_magic() {
        assert_eq!(decode_npy(b"PNG\x89 not numpy"), Err(FormatError::BadMagic));
        // the leading 0x93 byte is part of the magic
        assert_eq!(decode_npy(b"xNUMPY\x01\x00\x00\x00"), Err(FormatError::BadMagic));
        assert_eq!(decode_npy(b"\x93NUM"), Err(FormatError::BadMagic));
    }

    #[test]
    fn test_truncated_header() {
        let mut buf = raw_npy("{'descr': '|u1', 'shape': (1, 1, 1), }", &[7]);
        buf.truncate(20);
        assert!(matches!(decode_npy(&buf), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn test_decodes_u16_header() {
        let body: Vec<u8> = [1u16, 2, 3, 65535, 0, 9]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let buf = raw_npy(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (3, 1, 2), }\n",
            &body,
        );
        let tensor = decode_npy(&buf).unwrap().unwrap();
        assert_eq!(tensor.shape(), [3, 1, 2]);
        assert_eq!(
            tensor.data(),
            &TensorData::U16(vec![1, 2, 3, 65535, 0, 9])
        );
    }

    #[test]
    fn test_two_dimensional_is_single_band() {
        let header = "{'descr': '|u1', 'fortran_order': False, 'shape': (2, 2)}";
        let buf = raw_npy(header, &[1, 2, 3, 4]);
        let tensor = decode_npy(&buf).unwrap().unwrap();
        assert_eq!(tensor.shape(), [1, 2, 2]);
    }

    #[test]
    fn test_unknown_dtype() {
        let header = "{'descr': '<c8', 'fortran_order': False, 'shape': (1, 1, 1), }";
        let buf = raw_npy(header, &[0; 8]);
        assert_eq!(
            decode_npy(&buf),
            Err(FormatError::UnsupportedElementType("<c8".into()))
        );
    }

    #[test]
    fn test_fortran_order_rejected() {
        let buf = raw_npy("{'descr': '|u1', 'fortran_order': True, 'shape': (1, 1, 1), }", &[0]);
        assert_eq!(decode_npy(&buf), Err(FormatError::UnsupportedLayout));
    }

    #[test]
    fn test_non_ascii_header_is_format_error() {
        let header = "{'descr': '|u1', 'fortran_order': x\u{e9}\u{e9}, 'shape': (1, 1, 1), }";
        let buf = raw_npy(header, &[0]);
        assert!(matches!(decode_npy(&buf), Err(FormatError::Header(_))));

        let header = "{'descr': '|u1', 'fortran_order': False, 'shape': (1, 1, 1), }";
        let mut latin1 = raw_npy(header, &[0]);
        latin1[PREAMBLE_LEN + 2] = 0xe9;
        assert!(matches!(decode_npy(&latin1), Err(FormatError::Header(_))));
    }

    #[test]
    fn test_data_length_mismatch() {
        let header = "{'descr': '<u2', 'fortran_order': False, 'shape': (1, 1, 2), }";
        let buf = raw_npy(header, &[0; 3]);
        assert!(matches!(
            decode_npy(&buf),
            Err(FormatError::DataLength {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_one_dimensional_shape_rejected() {
        let buf = raw_npy("{'descr': '|u1', 'fortran_order': False, 'shape': (3,), }", &[0; 3]);
        assert_eq!(decode_npy(&buf), Err(FormatError::UnsupportedShape(vec![3])));
    }

    #[test]
    fn test_round_trip_every_element_type() {
        let shape = [2, 3, 4];
        let n = 24;
        let samples: Vec<TensorData> = vec![
            TensorData::U8((0..n).map(|i| i as u8 * 10).collect()),
            TensorData::I8((0..n).map(|i| i as i8 - 12).collect()),
            TensorData::U16((0..n).map(|i| i as u16 * 2700).collect()),
            TensorData::I16((0..n).map(|i| i as i16 * -1300).collect()),
            TensorData::U32((0..n).map(|i| i as u32 * 170_000_000).collect()),
            TensorData::I32((0..n).map(|i| i as i32 * -80_000_000).collect()),
            TensorData::F32((0..n).map(|i| i as f32 * 0.25 - 2.0).collect()),
            TensorData::F64((0..n).map(|i| i as f64 * -1.0e10).collect()),
        ];
        for data in samples {
            let tensor = TileTensor::new(shape, data).unwrap();
            let bytes = encode_npy(&tensor);
            let body_len = tensor.data().len() * tensor.element_type().size_bytes();
            assert_eq!((bytes.len() - body_len) % 64, 0);
            let decoded = decode_npy(&bytes).unwrap().unwrap();
            assert_eq!(decoded, tensor);
        }
    }

    #[test]
    fn test_header_tolerates_double_quotes_and_spacing() {
        let header = parse_header(r#"{ "shape" :(1,2,3),"descr":"<f4" }"#).unwrap();
        assert_eq!(header.element_type, ElementType::F32);
        assert_eq!(header.shape, vec![1, 2, 3]);
        assert!(!header.fortran_order);
    }
}
