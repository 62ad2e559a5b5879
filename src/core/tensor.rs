//! Typed, shaped sample storage decoded from an NPY buffer.
//!
//! A `TileTensor` is laid out band-major: the band at position `i` occupies
//! `data[i * pixel_count..(i + 1) * pixel_count]`, row-major within the band.
use ndarray::{ArrayView2, Axis};

use crate::error::{Error, Result};
use crate::types::ElementType;

/// A numeric sample type that a tile can hold.
pub trait Sample: Copy + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;
    /// Value written into a synthesized validity band for valid pixels.
    const VALID: Self;
    const ZERO: Self;
    const SIZE: usize;

    fn to_f64(self) -> f64;
    fn is_zero(self) -> bool;
    fn from_le_chunk(chunk: &[u8]) -> Self;
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_sample {
    ($t:ty, $et:ident, $valid:expr, $zero:expr) => {
        impl Sample for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$et;
            const VALID: Self = $valid;
            const ZERO: Self = $zero;
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn is_zero(self) -> bool {
                self == $zero
            }

            #[inline]
            fn from_le_chunk(chunk: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(chunk);
                <$t>::from_le_bytes(buf)
            }

            #[inline]
            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_sample!(u8, U8, u8::MAX, 0);
impl_sample!(i8, I8, i8::MAX, 0);
impl_sample!(u16, U16, u16::MAX, 0);
impl_sample!(i16, I16, i16::MAX, 0);
impl_sample!(u32, U32, u32::MAX, 0);
impl_sample!(i32, I32, i32::MAX, 0);
// Float tiles have no natural maximum; use the 16-bit full-scale value.
impl_sample!(f32, F32, 65535.0, 0.0);
impl_sample!(f64, F64, 65535.0, 0.0);

/// Flat sample buffer, one variant per supported encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Run `$body` with `$v` bound to the typed `Vec` of any variant.
macro_rules! with_samples {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::U8($v) => $body,
            TensorData::I8($v) => $body,
            TensorData::U16($v) => $body,
            TensorData::I16($v) => $body,
            TensorData::U32($v) => $body,
            TensorData::I32($v) => $body,
            TensorData::F32($v) => $body,
            TensorData::F64($v) => $body,
        }
    };
}

/// Rebuild the same variant as `$data` from the typed value of `$body`.
macro_rules! map_samples {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::U8($v) => TensorData::U8($body),
            TensorData::I8($v) => TensorData::I8($body),
            TensorData::U16($v) => TensorData::U16($body),
            TensorData::I16($v) => TensorData::I16($body),
            TensorData::U32($v) => TensorData::U32($body),
            TensorData::I32($v) => TensorData::I32($body),
            TensorData::F32($v) => TensorData::F32($body),
            TensorData::F64($v) => TensorData::F64($body),
        }
    };
}

impl TensorData {
    pub fn element_type(&self) -> ElementType {
        with_samples!(self, v => element_type_of(v.as_slice()))
    }

    pub fn len(&self) -> usize {
        with_samples!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at flat index `idx` widened to `f64`.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<f64> {
        with_samples!(self, v => v.get(idx).map(|s| s.to_f64()))
    }

    /// Decode little-endian samples of type `element_type` from `bytes`.
    /// `bytes.len()` must be a multiple of the element size.
    pub(crate) fn from_le_bytes(element_type: ElementType, bytes: &[u8]) -> Self {
        match element_type {
            ElementType::U8 => TensorData::U8(decode_samples(bytes)),
            ElementType::I8 => TensorData::I8(decode_samples(bytes)),
            ElementType::U16 => TensorData::U16(decode_samples(bytes)),
            ElementType::I16 => TensorData::I16(decode_samples(bytes)),
            ElementType::U32 => TensorData::U32(decode_samples(bytes)),
            ElementType::I32 => TensorData::I32(decode_samples(bytes)),
            ElementType::F32 => TensorData::F32(decode_samples(bytes)),
            ElementType::F64 => TensorData::F64(decode_samples(bytes)),
        }
    }

    pub(crate) fn extend_le_bytes(&self, out: &mut Vec<u8>) {
        with_samples!(self, v => {
            out.reserve(v.len() * element_type_of(v.as_slice()).size_bytes());
            for s in v.iter() {
                s.extend_le(out);
            }
        })
    }
}

fn element_type_of<T: Sample>(_: &[T]) -> ElementType {
    T::ELEMENT_TYPE
}

fn decode_samples<T: Sample>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::SIZE).map(T::from_le_chunk).collect()
}

/// Immutable `[bands, height, width]` sample tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TileTensor {
    shape: [usize; 3],
    data: TensorData,
}

impl TileTensor {
    /// Build a tensor, checking `data.len() == bands * height * width`.
    pub fn new(shape: [usize; 3], data: TensorData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::Processing(format!(
                "tensor shape {:?} needs {} samples, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn band_count(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn pixel_count(&self) -> usize {
        self.shape[1] * self.shape[2]
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Copy of this tensor with one extra validity band appended.
    ///
    /// A pixel is valid unless every source band is exactly zero; valid pixels
    /// get the element type's full-scale value, invalid ones get zero.
    pub fn with_validity_band(&self) -> Result<TileTensor> {
        let [bands, height, width] = self.shape;
        let pixel_count = height * width;
        let data = map_samples!(&self.data, v => append_validity(v, bands, pixel_count)?);
        TileTensor::new([bands + 1, height, width], data)
    }
}

fn append_validity<T: Sample>(data: &[T], bands: usize, pixel_count: usize) -> Result<Vec<T>> {
    let planes = ArrayView2::from_shape((bands, pixel_count), data)?;
    let valid = planes.map_axis(Axis(0), |lane| lane.iter().any(|s| !s.is_zero()));

    let mut out = Vec::with_capacity(data.len() + pixel_count);
    out.extend_from_slice(data);
    out.extend(valid.iter().map(|&ok| if ok { T::VALID } else { T::ZERO }));
    Ok(out)
}
