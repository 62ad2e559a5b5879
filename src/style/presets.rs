//! The built-in pixel styles.
//!
//! Every preset reads the validity band through the band map and writes slot 3
//! from it: opaque (or half opaque for `pending`) when the band is nonzero,
//! transparent otherwise. A band missing from the map reads as zero.
use crate::core::bands::{Band, BandMap};
use crate::style::PixelStyle;
use crate::types::StylePreset;

#[inline]
fn truthy(v: f64) -> bool {
    v != 0.0 && !v.is_nan()
}

#[inline]
fn set_rgb(pixel: &mut [f64], r: f64, g: f64, b: f64) {
    pixel[0] = r;
    pixel[1] = g;
    pixel[2] = b;
}

impl PixelStyle for StylePreset {
    fn apply(&self, pixel: &mut [f64], bandmap: &BandMap) {
        if pixel.len() < 4 {
            return;
        }
        let valid = truthy(bandmap.value(pixel, Band::A));
        let opaque = if valid { 255.0 } else { 0.0 };

        let alpha = match self {
            StylePreset::Rgb => {
                let r = bandmap.value(pixel, Band::R);
                let g = bandmap.value(pixel, Band::G);
                let b = bandmap.value(pixel, Band::B);
                set_rgb(pixel, r, g, b);
                opaque
            }
            // assumes the first three slots are visual
            StylePreset::Gray => {
                let avg = (pixel[0] + pixel[1] + pixel[2]) / 3.0;
                set_rgb(pixel, avg, avg, avg);
                opaque
            }
            StylePreset::Pending => {
                let v = (0.3 * pixel[0] + 0.6 * pixel[1] + 0.1 * pixel[2] + 100.0).min(255.0);
                set_rgb(pixel, v, v, v);
                if valid { 128.0 } else { 0.0 }
            }
            StylePreset::OnlyRed => {
                let r = bandmap.value(pixel, Band::R);
                set_rgb(pixel, r, 0.0, 0.0);
                opaque
            }
            StylePreset::Value => {
                let v = pixel[0];
                set_rgb(pixel, v, v, v);
                opaque
            }
        };
        pixel[3] = alpha;
    }
}
