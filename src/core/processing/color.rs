//! Brightness / contrast / saturation as a single 4x4 affine colour matrix.
//!
//! Pixels are treated as row vectors `[r, g, b, 1]` multiplied on the left of
//! the matrix. Results are not clamped here; the 8-bit output write does that.
use serde::{Deserialize, Serialize};

/// Luma weights used by the saturation blend.
const R_WEIGHT: f64 = 0.3086;
const G_WEIGHT: f64 = 0.6094;
const B_WEIGHT: f64 = 0.082;

type Mat4 = [[f64; 4]; 4];

fn mat_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0; 4]; 4];
    for (y, row) in c.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[y][k] * b[k][x]).sum();
        }
    }
    c
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorMatrix(Mat4);

impl ColorMatrix {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        ColorMatrix(m)
    }

    pub fn as_array(&self) -> &Mat4 {
        &self.0
    }

    /// Transform slots 0..=2 of `pixel`; anything past slot 2 is untouched.
    #[inline]
    pub fn apply(&self, pixel: &mut [f64]) {
        let m = &self.0;
        if let [r, g, b, ..] = pixel {
            let (r0, g0, b0) = (*r, *g, *b);
            *r = r0 * m[0][0] + g0 * m[1][0] + b0 * m[2][0] + m[3][0];
            *g = r0 * m[0][1] + g0 * m[1][1] + b0 * m[2][1] + m[3][1];
            *b = r0 * m[0][2] + g0 * m[1][2] + b0 * m[2][2] + m[3][2];
        }
    }
}

/// Brightness, contrast and saturation settings as carried in style options.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrightnessContrastSaturation {
    /// Multiplier per channel; 1 is identity.
    pub brightness: f64,
    /// Offset added per channel; 0 is identity.
    pub contrast: f64,
    /// 1 is identity, 0 is luminance only, -1 is the complement.
    pub saturation: f64,
}

impl Default for BrightnessContrastSaturation {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 0.0,
            saturation: 1.0,
        }
    }
}

impl BrightnessContrastSaturation {
    pub fn matrix(&self) -> ColorMatrix {
        apply_brightness_contrast_saturation(self.brightness, self.contrast, self.saturation)
    }
}

/// Compose the brightness-scale, contrast-offset and saturation-blend
/// matrices (in that order) into one matrix.
///
/// For a pixel `v` the result is `brightness * (saturate(v) + contrast)`.
pub fn apply_brightness_contrast_saturation(
    brightness: f64,
    contrast: f64,
    saturation: f64,
) -> ColorMatrix {
    let brt: Mat4 = [
        [brightness, 0.0, 0.0, 0.0],
        [0.0, brightness, 0.0, 0.0],
        [0.0, 0.0, brightness, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let con: Mat4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [contrast, contrast, contrast, 1.0],
    ];

    let s = saturation;
    let inv = 1.0 - s;
    let sat: Mat4 = [
        [inv * R_WEIGHT + s, inv * R_WEIGHT, inv * R_WEIGHT, 0.0],
        [inv * G_WEIGHT, inv * G_WEIGHT + s, inv * G_WEIGHT, 0.0],
        [inv * B_WEIGHT, inv * B_WEIGHT, inv * B_WEIGHT + s, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    ColorMatrix(mat_mul(&mat_mul(&sat, &con), &brt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_identity_on_gray() {
        let m = apply_brightness_contrast_saturation(1.0, 0.0, 1.0);
        let mut px = [128.0, 128.0, 128.0];
        m.apply(&mut px);
        assert_eq!(px, [128.0, 128.0, 128.0]);
        assert_eq!(m, ColorMatrix::identity());
    }

    #[test]
    fn test_contrast_then_brightness() {
        let m = apply_brightness_contrast_saturation(2.0, 10.0, 1.0);
        let mut px = [100.0, 50.0, 0.0, 7.0];
        m.apply(&mut px);
        assert!(close(&px, &[220.0, 120.0, 20.0, 7.0]));
    }

    #[test]
    fn test_zero_saturation_gives_luma() {
        let m = apply_brightness_contrast_saturation(1.0, 0.0, 0.0);
        let mut px = [200.0, 100.0, 50.0];
        m.apply(&mut px);
        let luma = 200.0 * R_WEIGHT + 100.0 * G_WEIGHT + 50.0 * B_WEIGHT;
        assert!(close(&px, &[luma, luma, luma]));
    }

    #[test]
    fn test_gray_is_fixed_under_any_saturation() {
        let m = apply_brightness_contrast_saturation(1.0, 0.0, 1.7);
        let mut px = [90.0, 90.0, 90.0];
        m.apply(&mut px);
        assert!(close(&px, &[90.0, 90.0, 90.0]));
    }

    #[test]
    fn test_short_pixels_untouched() {
        let m = apply_brightness_contrast_saturation(3.0, 1.0, 1.0);
        let mut px = [5.0, 6.0];
        m.apply(&mut px);
        assert_eq!(px, [5.0, 6.0]);
    }
}
