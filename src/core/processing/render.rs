//! Apply a pixel style across a tile into an RGBA8 buffer.
use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use crate::core::tile::Tile;
use crate::error::{Error, Result};
use crate::style::PixelStyle;

/// Clamped-byte write: round half to even, clamp to `[0, 255]`, NaN is 0.
#[inline]
pub fn to_clamped_byte(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.round_ties_even().clamp(0.0, 255.0) as u8
    }
}

/// Render `tile` through `style` into a row-major `width * height * 4` buffer.
///
/// Each pixel's band values are loaded into a scratch vector of
/// `max(band_count, 4)` slots (extra slots start at zero), the style mutates
/// it in place, and slots 0..=3 are written out. Rows are rendered in
/// parallel; an empty tile renders to an empty buffer.
pub fn draw_array<S: PixelStyle + ?Sized>(style: &S, tile: &Tile) -> Vec<u8> {
    let (width, height) = tile.dimensions();
    let mut out = vec![0u8; width * height * 4];
    if out.is_empty() {
        return out;
    }

    let slots = tile.band_count().max(4);
    let bandmap = tile.band_map();
    out.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let mut px = vec![0.0f64; slots];
            for (x, rgba) in row.chunks_exact_mut(4).enumerate() {
                px.fill(0.0);
                tile.read_pixel(y * width + x, &mut px);
                style.apply(&mut px, bandmap);
                for (o, v) in rgba.iter_mut().zip(&px) {
                    *o = to_clamped_byte(*v);
                }
            }
        });
    debug!("rendered {}x{} tile ({} bands)", width, height, tile.band_count());
    out
}

/// Something an RGBA8 tile buffer can be blitted onto.
pub trait Surface {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Replace the surface contents with a row-major RGBA8 buffer of the
    /// surface's own size.
    fn put_rgba(&mut self, rgba: &[u8]) -> Result<()>;
}

impl Surface for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn put_rgba(&mut self, rgba: &[u8]) -> Result<()> {
        if rgba.len() != self.as_raw().len() {
            return Err(Error::Processing(format!(
                "buffer of {} bytes does not fit a {}x{} surface",
                rgba.len(),
                self.width(),
                self.height()
            )));
        }
        let buf: &mut [u8] = self;
        buf.copy_from_slice(rgba);
        Ok(())
    }
}

/// Render `tile` with `style` and blit the result onto `surface`.
///
/// An empty tile leaves the surface untouched.
pub fn draw<S, P>(surface: &mut S, tile: &Tile, style: &P) -> Result<()>
where
    S: Surface + ?Sized,
    P: PixelStyle + ?Sized,
{
    if tile.is_empty() {
        return Ok(());
    }
    let (w, h) = tile.dimensions();
    let (sw, sh) = surface.dimensions();
    if (sw as usize, sh as usize) != (w, h) {
        return Err(Error::Processing(format!(
            "tile is {}x{} but surface is {}x{}",
            w, h, sw, sh
        )));
    }
    let rgba = draw_array(style, tile);
    surface.put_rgba(&rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bands::BandMap;
    use crate::core::tensor::{TensorData, TileTensor};
    use crate::types::StylePreset;

    fn rgba_tile(values: Vec<u16>, width: usize, height: usize) -> Tile {
        let tensor = TileTensor::new([4, height, width], TensorData::U16(values)).unwrap();
        Tile::new(tensor, "rgba".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_clamped_byte_write() {
        assert_eq!(to_clamped_byte(-3.0), 0);
        assert_eq!(to_clamped_byte(300.0), 255);
        assert_eq!(to_clamped_byte(f64::NAN), 0);
        assert_eq!(to_clamped_byte(12.5), 12);
        assert_eq!(to_clamped_byte(13.5), 14);
        assert_eq!(to_clamped_byte(99.7), 100);
    }

    #[test]
    fn test_draw_array_layout() {
        // 2x1 tile: pixel 0 = (1, 2, 3, valid), pixel 1 = (400, 5, 6, invalid)
        let tile = rgba_tile(vec![1, 400, 2, 5, 3, 6, 9, 0], 2, 1);
        let out = draw_array(&StylePreset::Rgb, &tile);
        assert_eq!(out, vec![1, 2, 3, 255, 255, 5, 6, 0]);
    }

    #[test]
    fn test_draw_array_with_closure_style() {
        let tile = rgba_tile(vec![10, 20, 30, 40, 50, 60, 70, 80, 1, 1, 1, 1, 1, 1, 1, 1], 2, 2);
        let invert = |px: &mut [f64], _: &BandMap| {
            for v in px.iter_mut().take(3) {
                *v = 255.0 - *v;
            }
        };
        let out = draw_array(&invert, &tile);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[12..16], &[215, 175, 254, 1]);
    }

    #[test]
    fn test_short_band_order_pads_slots() {
        let tensor = TileTensor::new([1, 1, 2], TensorData::U8(vec![7, 9])).unwrap();
        let tile = Tile::new(tensor, "r".parse().unwrap()).unwrap();
        let identity = |_: &mut [f64], _: &BandMap| {};
        assert_eq!(draw_array(&identity, &tile), vec![7, 0, 0, 0, 9, 0, 0, 0]);
    }

    #[test]
    fn test_empty_tile_renders_nothing() {
        let tile = Tile::empty("rgba".parse().unwrap());
        assert!(draw_array(&StylePreset::Rgb, &tile).is_empty());
        let mut img = RgbaImage::new(2, 2);
        draw(&mut img, &tile, &StylePreset::Rgb).unwrap();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_onto_image() {
        let tile = rgba_tile(vec![1, 400, 2, 5, 3, 6, 9, 0], 2, 1);
        let mut img = RgbaImage::new(2, 1);
        draw(&mut img, &tile, &StylePreset::Rgb).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 5, 6, 0]);

        let mut wrong = RgbaImage::new(1, 1);
        assert!(draw(&mut wrong, &tile, &StylePreset::Rgb).is_err());
    }
}
