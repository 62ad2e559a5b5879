//! Statistics pipeline (histograms, stretch ranges, curves, colour matrix)
//! and the tile renderer.
pub mod color;
pub mod histogram;
pub mod render;
pub mod stretch;

pub use color::{BrightnessContrastSaturation, ColorMatrix, apply_brightness_contrast_saturation};
pub use histogram::{Histogram, compute_histogram};
pub use render::{Surface, draw, draw_array};
pub use stretch::{
    BandRange, Curve, CurveSet, apply_curves, compute_ranges, contrast_stretch_average,
    levels_to_curve,
};
