use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::bands::BandOrder;
use crate::error::Result;
use crate::style::StyleSource;

/// Auto-stretch settings. The percentages go through the histogram range
/// formula unchanged, so `0.5` clips half of one percent at each end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StretchParams {
    pub low_pct: f64,
    pub high_pct: f64,
    /// Histogram bucket count; falls back to the preset's pixel depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_depth: Option<usize>,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            low_pct: 0.5,
            high_pct: 0.5,
            pixel_depth: None,
        }
    }
}

/// Rendering parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderParams {
    /// Band order of the stored tiles; a validity band is synthesized when
    /// it lacks `a`.
    pub bands: BandOrder,
    pub style: StyleSource,
    /// When set, stretch curves (presets) or ranges (programs) are derived
    /// from the tiles' histogram unless the style already carries them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stretch: Option<StretchParams>,
}

impl RenderParams {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StylePreset;

    #[test]
    fn test_defaults_from_empty_object() {
        let params: RenderParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, RenderParams::default());
        assert_eq!(params.bands, BandOrder::rgba());
        assert!(params.stretch.is_none());
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "bands": ["b", "g", "r", "n", "a"],
            "style": {"name": "rgb", "options": {"pixelDepth": 10000}},
            "stretch": {"lowPct": 0.25, "highPct": 0.25}
        }"#;
        let params: RenderParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.bands.to_string(), "bgrna");
        assert!(matches!(
            params.style,
            StyleSource::Preset {
                name: StylePreset::Rgb,
                ..
            }
        ));
        assert_eq!(
            params.stretch,
            Some(StretchParams {
                low_pct: 0.25,
                high_pct: 0.25,
                pixel_depth: None
            })
        );
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        let json = r#"{"style": {"source": "red := 1\ngreen := 2\nblue := 3"}}"#;
        std::fs::write(&path, json).unwrap();
        let params = RenderParams::from_json_file(&path).unwrap();
        assert!(matches!(params.style, StyleSource::Program { .. }));

        std::fs::write(&path, "{not json").unwrap();
        assert!(RenderParams::from_json_file(&path).is_err());
    }
}
