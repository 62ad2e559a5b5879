//! Pixel styles: the [`PixelStyle`] trait, the configured built-in presets and
//! the compiled style language, plus [`StyleSource`], the serializable
//! description a host hands over to pick one of them.
//!
//! A style mutates a caller-owned pixel vector in place. On entry slots hold
//! the tile's band values in band order (at least four slots, extras zeroed);
//! on exit slots 0..=3 hold unclamped red, green, blue and alpha.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::bands::{BandMap, BandOrder};
use crate::core::processing::color::{BrightnessContrastSaturation, ColorMatrix};
use crate::core::processing::stretch::{BandRange, Curve, CurveSet, apply_curves};
use crate::error::{Error, Result};
use crate::types::StylePreset;

pub mod dsl;
pub mod lut;
pub mod presets;

pub use dsl::{CompileError, StyleProgram, compile_program};
pub use lut::{LookupTable, LookupTableStyle};

/// A per-pixel transform. Implementations are immutable once built and are
/// shared across render threads.
pub trait PixelStyle: Send + Sync {
    fn apply(&self, pixel: &mut [f64], bandmap: &BandMap);
}

impl<F> PixelStyle for F
where
    F: Fn(&mut [f64], &BandMap) + Send + Sync,
{
    fn apply(&self, pixel: &mut [f64], bandmap: &BandMap) {
        self(pixel, bandmap)
    }
}

pub const DEFAULT_PIXEL_DEPTH: usize = 256;

fn default_pixel_depth() -> usize {
    DEFAULT_PIXEL_DEPTH
}

/// Options for a built-in preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOptions {
    /// Number of distinct raw values per band; output is rescaled from
    /// `[0, pixel_depth - 1]` to `[0, 255]`.
    #[serde(default = "default_pixel_depth")]
    pub pixel_depth: usize,
    /// Stretch curves for output channels 0..=2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curves: Option<Vec<Curve>>,
    /// Band order used to resolve band letters instead of the tile's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_bands: Option<BandOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_contrast_saturation: Option<BrightnessContrastSaturation>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            pixel_depth: DEFAULT_PIXEL_DEPTH,
            curves: None,
            read_bands: None,
            brightness_contrast_saturation: None,
        }
    }
}

/// A preset wrapped with its options.
///
/// Per pixel, in order: the preset, the optional curves, the rescale of slots
/// 0..=2 to 8-bit range, and the optional brightness/contrast/saturation
/// matrix. Slot 3 is only ever written by the preset.
#[derive(Debug, Clone)]
pub struct ConfiguredStyle {
    preset: StylePreset,
    read_bands: Option<BandMap>,
    curves: Option<CurveSet>,
    scale: f64,
    color: Option<ColorMatrix>,
}

impl ConfiguredStyle {
    pub fn new(preset: StylePreset, options: &StyleOptions) -> Result<Self> {
        if options.pixel_depth < 2 {
            return Err(Error::InvalidArgument {
                arg: "pixelDepth",
                value: options.pixel_depth.to_string(),
            });
        }
        let max = (options.pixel_depth - 1) as f64;
        Ok(Self {
            preset,
            read_bands: options.read_bands.as_ref().map(BandOrder::band_map),
            curves: options
                .curves
                .clone()
                .map(|c| apply_curves(c, options.pixel_depth)),
            scale: 255.0 / max,
            color: options
                .brightness_contrast_saturation
                .as_ref()
                .map(BrightnessContrastSaturation::matrix),
        })
    }

    pub fn preset(&self) -> StylePreset {
        self.preset
    }
}

impl PixelStyle for ConfiguredStyle {
    fn apply(&self, pixel: &mut [f64], bandmap: &BandMap) {
        let bandmap = self.read_bands.as_ref().unwrap_or(bandmap);
        self.preset.apply(pixel, bandmap);
        if let Some(curves) = &self.curves {
            curves.apply(pixel);
        }
        for v in pixel.iter_mut().take(3) {
            *v *= self.scale;
        }
        if let Some(color) = &self.color {
            color.apply(pixel);
        }
    }
}

/// Look up a preset by name and configure it.
///
/// Unknown names fail with [`Error::UnknownPreset`]; callers holding program
/// text should use [`compile_program`] instead.
pub fn create_style_func(name: &str, options: &StyleOptions) -> Result<ConfiguredStyle> {
    let preset: StylePreset = name.parse()?;
    ConfiguredStyle::new(preset, options)
}

/// Where a tile's style comes from.
///
/// Deserializes from `{"name": "rgb", "options": {...}}`,
/// `{"source": "red := ...", "ranges": [[lo, hi], ...]}` or
/// `{"lookupTable": [[..], [..], [..]], "ranges": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleSource {
    Preset {
        name: StylePreset,
        #[serde(default)]
        options: StyleOptions,
    },
    Program {
        source: String,
        #[serde(default)]
        ranges: Vec<BandRange>,
    },
    LookupTable {
        #[serde(rename = "lookupTable")]
        table: LookupTable,
        #[serde(default)]
        ranges: Vec<BandRange>,
    },
}

impl Default for StyleSource {
    fn default() -> Self {
        StyleSource::Preset {
            name: StylePreset::Rgb,
            options: StyleOptions::default(),
        }
    }
}

impl StyleSource {
    pub fn preset(name: StylePreset, options: StyleOptions) -> Self {
        StyleSource::Preset { name, options }
    }

    pub fn lookup_table(table: LookupTable, ranges: Vec<BandRange>) -> Self {
        StyleSource::LookupTable { table, ranges }
    }

    pub fn program(source: impl Into<String>, ranges: Vec<BandRange>) -> Self {
        StyleSource::Program {
            source: source.into(),
            ranges,
        }
    }

    /// Build the executable style for tiles laid out per `bandmap`.
    ///
    /// Programs are compiled here, so band and range references are checked
    /// against this band map before any pixel is rendered.
    pub fn build(&self, bandmap: &BandMap) -> Result<Box<dyn PixelStyle>> {
        match self {
            StyleSource::Preset { name, options } => {
                debug!("configuring preset {}", name);
                Ok(Box::new(ConfiguredStyle::new(*name, options)?))
            }
            StyleSource::Program { source, ranges } => {
                Ok(Box::new(compile_program(source, ranges, bandmap)?))
            }
            StyleSource::LookupTable { table, ranges } => {
                Ok(Box::new(LookupTableStyle::new(table, ranges, bandmap)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::processing::stretch::levels_to_curve;

    fn rgba() -> BandMap {
        BandOrder::rgba().band_map()
    }

    #[test]
    fn test_default_depth_is_identity_scale() {
        let style = create_style_func("rgb", &StyleOptions::default()).unwrap();
        let mut px = [10.0, 20.0, 30.0, 1.0];
        style.apply(&mut px, &rgba());
        assert_eq!(px, [10.0, 20.0, 30.0, 255.0]);
    }

    #[test]
    fn test_pixel_depth_rescales_rgb_only() {
        let options = StyleOptions {
            pixel_depth: 3000,
            ..Default::default()
        };
        let style = create_style_func("rgb", &options).unwrap();
        let mut px = [2999.0, 0.0, 1499.5, 7.0];
        style.apply(&mut px, &rgba());
        assert!((px[0] - 255.0).abs() < 1e-9);
        assert_eq!(px[1], 0.0);
        assert!((px[2] - 127.5).abs() < 1e-9);
        assert_eq!(px[3], 255.0);
    }

    #[test]
    fn test_read_bands_override_tile_order() {
        let options = StyleOptions {
            read_bands: Some("bgrna".parse().unwrap()),
            ..Default::default()
        };
        let style = create_style_func("rgb", &options).unwrap();
        let mut px = [300.0, 200.0, 100.0, 99.0, 400.0];
        // the tile claims rgba, the override wins
        style.apply(&mut px, &rgba());
        assert_eq!(px[..4], [100.0, 200.0, 300.0, 255.0]);
    }

    #[test]
    fn test_curves_then_scale_then_color() {
        let curve = levels_to_curve(1000, (100, 600), (0, 1000));
        let options = StyleOptions {
            pixel_depth: 1000,
            curves: Some(vec![curve; 3]),
            brightness_contrast_saturation: Some(BrightnessContrastSaturation {
                brightness: 1.0,
                contrast: 10.0,
                saturation: 1.0,
            }),
            ..Default::default()
        };
        let style = create_style_func("rgb", &options).unwrap();
        let mut px = [50.0, 600.0, 350.0, 1.0];
        style.apply(&mut px, &rgba());
        assert!((px[0] - 10.0).abs() < 1e-3);
        assert!((px[1] - 265.0).abs() < 1e-3);
        assert!((px[2] - 137.5).abs() < 1e-3);
        assert_eq!(px[3], 255.0);
    }

    #[test]
    fn test_unknown_preset_and_bad_depth() {
        assert!(matches!(
            create_style_func("cir", &StyleOptions::default()),
            Err(Error::UnknownPreset { .. })
        ));
        let options = StyleOptions {
            pixel_depth: 1,
            ..Default::default()
        };
        assert!(create_style_func("rgb", &options).is_err());
    }

    #[test]
    fn test_style_source_json() {
        let json = r#"{"name": "onlyRed", "options": {"pixelDepth": 3000}}"#;
        let preset: StyleSource = serde_json::from_str(json).unwrap();
        assert_eq!(
            preset,
            StyleSource::preset(
                StylePreset::OnlyRed,
                StyleOptions {
                    pixel_depth: 3000,
                    ..Default::default()
                }
            )
        );

        let program: StyleSource =
            serde_json::from_str(r#"{"source": "red := 1", "ranges": [[0, 10], [null, null]]}"#)
                .unwrap();
        assert_eq!(
            program,
            StyleSource::program("red := 1", vec![BandRange::new(0, 10), BandRange::UNAVAILABLE])
        );

        let bare: StyleSource = serde_json::from_str(r#"{"name": "gray"}"#).unwrap();
        assert_eq!(bare, StyleSource::preset(StylePreset::Gray, StyleOptions::default()));
    }

    #[test]
    fn test_build_program_checks_bands() {
        let ok = StyleSource::program("red := bands[bandmap.r]\ngreen := 0\nblue := 0", vec![]);
        let style = ok.build(&rgba()).unwrap();
        let mut px = [9.0, 1.0, 1.0, 1.0];
        style.apply(&mut px, &rgba());
        assert_eq!(px, [9.0, 0.0, 0.0, 1.0]);

        let bad = StyleSource::program("red := bands[bandmap.n]\ngreen := 0\nblue := 0", vec![]);
        assert!(matches!(
            bad.build(&rgba()),
            Err(Error::Compile(CompileError::UnknownBand { .. }))
        ));
    }

    #[test]
    fn test_lookup_table_from_json() {
        let json = r#"{
            "lookupTable": [[0, 255], [0, 128], [0, 64]],
            "ranges": [[0, 10], [0, 10], [0, 10], [0, 1]]
        }"#;
        let source: StyleSource = serde_json::from_str(json).unwrap();
        assert!(matches!(source, StyleSource::LookupTable { .. }));
        let style = source.build(&rgba()).unwrap();
        let mut px = [9.0, 9.0, 1.0, 1.0];
        style.apply(&mut px, &rgba());
        assert_eq!(px, [255.0, 128.0, 0.0, 1.0]);

        let table = LookupTable([vec![1.0], vec![1.0], vec![1.0]]);
        let unstretched = StyleSource::lookup_table(table, vec![]);
        assert!(matches!(
            unstretched.build(&rgba()),
            Err(Error::RangeUnavailable { band: 'r' })
        ));
    }
}
