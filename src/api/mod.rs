//! High-level library API: decode tiles, accumulate viewport statistics,
//! derive auto-stretch settings, and render tiles to RGBA buffers, PNG files
//! or whole directories. Prefer these entry points over the low-level
//! processing modules when embedding the crate.
use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::core::bands::BandOrder;
use crate::core::params::{RenderParams, StretchParams};
use crate::core::processing::histogram::{Histogram, compute_histogram};
use crate::core::processing::render::draw_array;
use crate::core::processing::stretch::{
    Curve, compute_ranges, contrast_stretch_average, levels_to_curve,
};
use crate::core::tile::Tile;
use crate::error::{Error, Result};
use crate::io::npy::decode_npy;
use crate::io::writers::png::write_rgba_png;
use crate::style::{DEFAULT_PIXEL_DEPTH, StyleSource};

/// Decode an NPY buffer into a tile stored in `bands` order.
///
/// A zero-length buffer yields an empty tile. A validity band is synthesized
/// when `bands` has no `a`.
pub fn decode_tile(bytes: &[u8], bands: &BandOrder) -> Result<Tile> {
    match decode_npy(bytes)? {
        Some(tensor) => Tile::with_alpha(tensor, bands.clone()),
        None => Ok(Tile::empty(bands.clone())),
    }
}

/// Read and decode an NPY file.
pub fn load_tile(path: &Path, bands: &BandOrder) -> Result<Tile> {
    let bytes = std::fs::read(path)?;
    decode_tile(&bytes, bands)
}

/// Merged histogram over every non-empty tile, computed per tile in
/// parallel. `None` when there is nothing to count.
///
/// All tiles must share a band count.
pub fn viewport_histogram(tiles: &[Tile], pixel_depth: usize) -> Result<Option<Histogram>> {
    tiles
        .par_iter()
        .filter(|t| !t.is_empty())
        .map(|t| compute_histogram(t, pixel_depth, t.bands(), None))
        .reduce_with(|a, b| a?.merged(&b?))
        .transpose()
}

/// Shared contrast stretch for output channels 0..=2.
///
/// The first three bands' ranges are averaged and mapped onto
/// `[0, pixel_depth]`. `None` when any of those ranges is unavailable, in which
/// case the caller renders unstretched.
pub fn auto_stretch_curves(
    histogram: &Histogram,
    pixel_depth: usize,
    stretch: &StretchParams,
) -> Option<Vec<Curve>> {
    let ranges = compute_ranges(histogram, stretch.low_pct, stretch.high_pct);
    let shared = contrast_stretch_average(&ranges);
    let output = (0, u32::try_from(pixel_depth).ok()?);
    shared
        .iter()
        .map(|r| r.bounds().map(|input| levels_to_curve(pixel_depth, input, output)))
        .collect()
}

/// Bucket count for stretch statistics of `style`.
pub fn histogram_depth(style: &StyleSource, stretch: &StretchParams) -> usize {
    stretch.pixel_depth.unwrap_or(match style {
        StyleSource::Preset { options, .. } => options.pixel_depth,
        StyleSource::Program { .. } | StyleSource::LookupTable { .. } => DEFAULT_PIXEL_DEPTH,
    })
}

/// Fill in stretch settings the style does not already carry: curves for a
/// preset, ranges for a program.
pub fn resolve_style(
    style: &StyleSource,
    histogram: &Histogram,
    stretch: &StretchParams,
) -> StyleSource {
    let mut resolved = style.clone();
    match &mut resolved {
        StyleSource::Preset { options, .. } if options.curves.is_none() => {
            options.curves = auto_stretch_curves(histogram, options.pixel_depth, stretch);
            if options.curves.is_none() {
                warn!("stretch range unavailable; rendering without curves");
            }
        }
        StyleSource::Program { ranges, .. } | StyleSource::LookupTable { ranges, .. }
            if ranges.is_empty() =>
        {
            *ranges = compute_ranges(histogram, stretch.low_pct, stretch.high_pct);
        }
        _ => {}
    }
    resolved
}

/// A rendered tile: row-major RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTile {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl RenderedTile {
    pub fn into_image(self) -> Result<RgbaImage> {
        let (w, h) = (self.width, self.height);
        let to_u32 = |v: usize, arg: &'static str| {
            u32::try_from(v).map_err(|_| Error::InvalidArgument {
                arg,
                value: v.to_string(),
            })
        };
        RgbaImage::from_raw(to_u32(w, "width")?, to_u32(h, "height")?, self.rgba).ok_or_else(|| {
            Error::Processing(format!("RGBA buffer does not match {}x{}", w, h))
        })
    }

    pub fn save_png(&self, output: &Path) -> Result<()> {
        write_rgba_png(output, self.width, self.height, &self.rgba)
    }
}

/// Render one tile with `style`. Programs are compiled against the tile's
/// band order first, so a bad band reference fails here, before any pixel.
pub fn render_tile(tile: &Tile, style: &StyleSource) -> Result<RenderedTile> {
    let pixel_style = style.build(tile.band_map())?;
    let (width, height) = tile.dimensions();
    Ok(RenderedTile {
        width,
        height,
        rgba: draw_array(pixel_style.as_ref(), tile),
    })
}

fn stretched_style(tiles: &[Tile], params: &RenderParams) -> Result<StyleSource> {
    let Some(stretch) = &params.stretch else {
        return Ok(params.style.clone());
    };
    let depth = histogram_depth(&params.style, stretch);
    match viewport_histogram(tiles, depth)? {
        Some(hist) => {
            info!("stretch histogram: {} valid pixels over {} tiles", hist.count(), tiles.len());
            Ok(resolve_style(&params.style, &hist, stretch))
        }
        None => Ok(params.style.clone()),
    }
}

/// Decode an NPY file and render it to a PNG at `output` using `params`.
pub fn render_npy_to_path(input: &Path, output: &Path, params: &RenderParams) -> Result<()> {
    let tile = load_tile(input, &params.bands)?;
    if tile.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "input",
            value: format!("{} holds an empty tile", input.display()),
        });
    }
    let style = stretched_style(std::slice::from_ref(&tile), params)?;
    let rendered = render_tile(&tile, &style)?;
    rendered.save_png(output)?;
    info!(
        "rendered {} ({}x{}) -> {}",
        input.display(),
        rendered.width,
        rendered.height,
        output.display()
    );
    Ok(())
}

/// Batch processing report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// `.npy` files directly inside `input_dir`, sorted by name.
pub fn iterate_npy_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("npy")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Render every `.npy` file in `input_dir` to `<stem>.png` in `output_dir`.
///
/// When `params.stretch` is set the stretch comes from one histogram merged
/// over all tiles, so the whole set shares a consistent exposure. Empty tiles
/// are skipped. If `continue_on_error` is true, failures are counted in the
/// report and processing continues; otherwise the first error is returned.
pub fn render_directory_to_path(
    input_dir: &Path,
    output_dir: &Path,
    params: &RenderParams,
    continue_on_error: bool,
) -> Result<BatchReport> {
    std::fs::create_dir_all(output_dir)?;
    let mut report = BatchReport::default();

    let mut paths = Vec::new();
    let mut tiles = Vec::new();
    for path in iterate_npy_files(input_dir)? {
        match load_tile(&path, &params.bands) {
            Ok(tile) if tile.is_empty() => {
                warn!("skipping empty tile {}", path.display());
                report.skipped += 1;
            }
            Ok(tile) => {
                paths.push(path);
                tiles.push(tile);
            }
            Err(e) => {
                warn!("failed to load {}: {}", path.display(), e);
                report.errors += 1;
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    let style = stretched_style(&tiles, params)?;

    for (path, tile) in paths.iter().zip(&tiles) {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tile".to_string());
        let output = output_dir.join(format!("{}.png", stem));
        match render_tile(tile, &style).and_then(|r| r.save_png(&output)) {
            Ok(()) => report.processed += 1,
            Err(e) => {
                warn!("failed to render {}: {}", path.display(), e);
                report.errors += 1;
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    info!(
        "batch done: processed={} skipped={} errors={}",
        report.processed, report.skipped, report.errors
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::processing::stretch::BandRange;
    use crate::core::tensor::{TensorData, TileTensor};
    use crate::io::npy::encode_npy;
    use crate::style::{LookupTable, StyleOptions};
    use crate::types::StylePreset;

    fn rg_tile(r: Vec<u8>, g: Vec<u8>) -> Tile {
        let width = r.len();
        let mut data = r;
        data.extend(g);
        let tensor = TileTensor::new([2, 1, width], TensorData::U8(data)).unwrap();
        Tile::with_alpha(tensor, "rg".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_decode_tile_empty_and_alpha() {
        let bands: BandOrder = "rg".parse().unwrap();
        assert!(decode_tile(&[], &bands).unwrap().is_empty());

        let tile = rg_tile(vec![0, 3], vec![0, 4]);
        let bytes = encode_npy(tile.tensor().unwrap());
        let decoded = decode_tile(&bytes, &"rga".parse().unwrap()).unwrap();
        assert_eq!(decoded.get_pixel(1), vec![3.0, 4.0, 255.0]);
    }

    #[test]
    fn test_viewport_histogram_merges() {
        let tiles = vec![
            rg_tile(vec![1, 2], vec![5, 5]),
            Tile::empty("rga".parse().unwrap()),
            rg_tile(vec![2, 0], vec![6, 0]),
        ];
        let hist = viewport_histogram(&tiles, 256).unwrap().unwrap();
        // last pixel of the third tile is all zero, so invalid
        assert_eq!(hist.count(), 3);
        assert_eq!(hist.band(0).unwrap()[2], 2);
        assert!(viewport_histogram(&tiles[1..2], 256).unwrap().is_none());
    }

    #[test]
    fn test_viewport_histogram_rejects_mixed_band_counts() {
        let other = TileTensor::new([1, 1, 1], TensorData::U8(vec![1])).unwrap();
        let tiles = vec![
            rg_tile(vec![1], vec![1]),
            Tile::with_alpha(other, "r".parse().unwrap()).unwrap(),
        ];
        assert!(viewport_histogram(&tiles, 16).is_err());
    }

    #[test]
    fn test_resolve_style_fills_curves_or_ranges() {
        let tile = rg_tile((0..200).collect(), (0..200).collect());
        let hist = viewport_histogram(std::slice::from_ref(&tile), 256).unwrap().unwrap();
        let stretch = StretchParams::default();

        // ranges come from the tile's own first three bands (r, g, a)
        let preset = resolve_style(&StyleSource::default(), &hist, &stretch);
        assert!(matches!(&preset, StyleSource::Preset { options, .. }
            if options.curves.as_ref().is_some_and(|c| c.len() == 3)));

        let unstretched = resolve_style(&StyleSource::default(), &Histogram::new(3, 256), &stretch);
        assert_eq!(unstretched, StyleSource::default());

        let program = resolve_style(&StyleSource::program("red := 1", vec![]), &hist, &stretch);
        match program {
            StyleSource::Program { ranges, .. } => {
                assert_eq!(ranges.len(), 3);
                assert!(ranges[0].is_available());
            }
            _ => panic!("expected a program"),
        }

        let table = LookupTable([vec![0.0], vec![0.0], vec![0.0]]);
        let lut = resolve_style(&StyleSource::lookup_table(table, vec![]), &hist, &stretch);
        assert!(matches!(&lut, StyleSource::LookupTable { ranges, .. } if ranges.len() == 3));

        let fixed = StyleSource::program("red := 1", vec![BandRange::new(1, 2)]);
        assert_eq!(resolve_style(&fixed, &hist, &stretch), fixed);
    }

    #[test]
    fn test_auto_stretch_curves_span_output() {
        let order: BandOrder = "rgba".parse().unwrap();
        let n = 100;
        let mut data: Vec<u16> = Vec::new();
        for _ in 0..3 {
            data.extend((0..n as u16).map(|v| v + 10));
        }
        data.extend(std::iter::repeat(1).take(n));
        let tensor = TileTensor::new([4, 1, n], TensorData::U16(data)).unwrap();
        let tile = Tile::new(tensor, order).unwrap();
        let hist = viewport_histogram(std::slice::from_ref(&tile), 1000).unwrap().unwrap();
        let curves = auto_stretch_curves(&hist, 1000, &StretchParams::default()).unwrap();
        assert_eq!(curves.len(), 3);
        assert_eq!(curves[0].len(), 1000);
        assert_eq!(curves[0].lookup(0.0), 0.0);
        assert_eq!(curves[0].lookup(999.0), 1.0);
        assert_eq!(curves[0], curves[2]);
    }

    #[test]
    fn test_render_tile_and_image() {
        let tile = rg_tile(vec![10, 0], vec![20, 0]);
        let style = StyleSource::preset(StylePreset::Rgb, StyleOptions::default());
        let rendered = render_tile(&tile, &style).unwrap();
        assert_eq!((rendered.width, rendered.height), (2, 1));
        assert_eq!(rendered.rgba, vec![10, 20, 0, 255, 0, 0, 0, 0]);
        let img = rendered.into_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 0, 255]);
    }

    #[test]
    fn test_render_tile_rejects_bad_program() {
        let tile = rg_tile(vec![1], vec![1]);
        let style = StyleSource::program("red := bands[bandmap.n]\ngreen := 0\nblue := 0", vec![]);
        assert!(matches!(render_tile(&tile, &style), Err(Error::Compile(_))));
    }
}
