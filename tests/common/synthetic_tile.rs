#![allow(dead_code)]

use numpytile::{BandOrder, TensorData, TileTensor, encode_npy};

pub const SIZE: usize = 256;

/// Per-band offsets of the analytic fixture, in `b, g, r, n` order.
pub const OFFSETS: [u16; 4] = [50, 170, 100, 1500];

pub fn analytic_bands() -> BandOrder {
    "bgrna".parse().expect("valid band order")
}

/// A 256x256 5-band `u16` tile: band `k` holds `OFFSETS[k] + (p % 1000)` at
/// pixel `p`, and the validity band is 65535 everywhere.
pub fn analytic_tensor() -> TileTensor {
    shifted_tensor(0)
}

/// Same layout as [`analytic_tensor`] with every data band raised by `shift`.
pub fn shifted_tensor(shift: u16) -> TileTensor {
    let pixels = SIZE * SIZE;
    let mut data = Vec::with_capacity(5 * pixels);
    for offset in OFFSETS {
        data.extend((0..pixels).map(|p| offset + shift + (p % 1000) as u16));
    }
    data.extend(std::iter::repeat(u16::MAX).take(pixels));
    TileTensor::new([5, SIZE, SIZE], TensorData::U16(data)).expect("consistent fixture shape")
}

pub fn analytic_npy() -> Vec<u8> {
    encode_npy(&analytic_tensor())
}
