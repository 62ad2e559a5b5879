//! A decoded tile: tensor + band order, with per-pixel access.
use crate::core::bands::{Band, BandMap, BandOrder};
use crate::core::tensor::TileTensor;
use crate::error::{Error, Result};

/// Tensor plus the band order it was fetched with.
///
/// A tile may hold no tensor (blank or unavailable upstream); such a tile
/// has zero pixels and every read on it is empty.
#[derive(Debug, Clone)]
pub struct Tile {
    tensor: Option<TileTensor>,
    bands: BandOrder,
    band_map: BandMap,
}

impl Tile {
    pub fn new(tensor: TileTensor, bands: BandOrder) -> Result<Self> {
        if tensor.band_count() != bands.len() {
            return Err(Error::BandCountMismatch {
                expected: bands.len(),
                actual: tensor.band_count(),
            });
        }
        let band_map = bands.band_map();
        Ok(Self {
            tensor: Some(tensor),
            bands,
            band_map,
        })
    }

    pub fn empty(bands: BandOrder) -> Self {
        let band_map = bands.band_map();
        Self {
            tensor: None,
            bands,
            band_map,
        }
    }

    /// Build a tile, appending a synthesized validity band (`a`) when the
    /// band order does not already carry one.
    pub fn with_alpha(tensor: TileTensor, bands: BandOrder) -> Result<Self> {
        if bands.contains(Band::A) {
            return Tile::new(tensor, bands);
        }
        if tensor.band_count() != bands.len() {
            return Err(Error::BandCountMismatch {
                expected: bands.len(),
                actual: tensor.band_count(),
            });
        }
        let tensor = tensor.with_validity_band()?;
        Tile::new(tensor, bands.with(Band::A))
    }

    pub fn tensor(&self) -> Option<&TileTensor> {
        self.tensor.as_ref()
    }

    pub fn bands(&self) -> &BandOrder {
        &self.bands
    }

    pub fn band_map(&self) -> &BandMap {
        &self.band_map
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.tensor.as_ref().map_or(0, TileTensor::pixel_count)
    }

    /// `(width, height)`, zero for an empty tile.
    pub fn dimensions(&self) -> (usize, usize) {
        self.tensor
            .as_ref()
            .map_or((0, 0), |t| (t.width(), t.height()))
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_none()
    }

    /// Fill `out[..band_count]` with the band values of pixel `idx`, in band
    /// order. Returns `false` (leaving `out` untouched) when there is no such pixel.
    #[inline]
    pub fn read_pixel(&self, idx: usize, out: &mut [f64]) -> bool {
        let Some(tensor) = &self.tensor else {
            return false;
        };
        let pixel_count = tensor.pixel_count();
        if idx >= pixel_count {
            return false;
        }
        let data = tensor.data();
        for (band, slot) in out.iter_mut().take(tensor.band_count()).enumerate() {
            *slot = data.get(band * pixel_count + idx).unwrap_or(0.0);
        }
        true
    }

    /// Band-ordered values of a single pixel; empty for an empty tile or an
    /// out-of-range index.
    pub fn get_pixel(&self, idx: usize) -> Vec<f64> {
        let mut pixel = vec![0.0; self.band_count()];
        if self.read_pixel(idx, &mut pixel) {
            pixel
        } else {
            Vec::new()
        }
    }

    /// Call `f(values, idx)` for every pixel in ascending index order.
    pub fn for_each_pixel<F>(&self, mut f: F)
    where
        F: FnMut(&[f64], usize),
    {
        let mut pixel = vec![0.0; self.band_count()];
        for idx in 0..self.pixel_count() {
            self.read_pixel(idx, &mut pixel);
            f(&pixel, idx);
        }
    }
}
