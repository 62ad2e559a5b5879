use tracing::debug;

use crate::core::bands::BandOrder;
use crate::core::tile::Tile;
use crate::error::{Error, Result};

/// Per-band value counts over the valid pixels of one or more tiles.
///
/// Each band has `pixel_depth` buckets indexed by raw value. Values outside
/// `0..pixel_depth` (and non-integral values) are not counted, so a band whose
/// values all overflow ends up with an empty histogram even though `count`
/// includes its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bands: Vec<Vec<u32>>,
    count: u64,
}

impl Histogram {
    pub fn new(band_count: usize, pixel_depth: usize) -> Self {
        Self {
            bands: vec![vec![0; pixel_depth]; band_count],
            count: 0,
        }
    }

    /// Bucket counts for each band, in band order.
    pub fn bands(&self) -> &[Vec<u32>] {
        &self.bands
    }

    pub fn band(&self, idx: usize) -> Option<&[u32]> {
        self.bands.get(idx).map(Vec::as_slice)
    }

    /// Number of valid pixels accumulated.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn pixel_depth(&self) -> usize {
        self.bands.first().map_or(0, Vec::len)
    }

    /// Add `other` into `self` bucket by bucket.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if self.band_count() != other.band_count() || self.pixel_depth() != other.pixel_depth() {
            return Err(Error::Processing(format!(
                "cannot merge histogram of {}x{} into {}x{}",
                other.band_count(),
                other.pixel_depth(),
                self.band_count(),
                self.pixel_depth()
            )));
        }
        for (dst, src) in self.bands.iter_mut().zip(&other.bands) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = d.saturating_add(*s);
            }
        }
        self.count = self.count.saturating_add(other.count);
        Ok(())
    }

    /// Pointwise sum of two histograms.
    pub fn merged(mut self, other: &Histogram) -> Result<Histogram> {
        self.merge(other)?;
        Ok(self)
    }

    #[inline]
    fn record(&mut self, pixel: &[f64]) {
        for (counts, &v) in self.bands.iter_mut().zip(pixel) {
            if let Some(slot) = bucket(v).and_then(|b| counts.get_mut(b)) {
                *slot = slot.saturating_add(1);
            }
        }
        self.count = self.count.saturating_add(1);
    }
}

#[inline]
fn bucket(v: f64) -> Option<usize> {
    (v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64).then_some(v as usize)
}

/// Count band values over the valid pixels of `tile`.
///
/// The last band of `bands` is the validity channel: pixels where it is zero
/// are skipped entirely. Every band of a counted pixel is recorded, the
/// validity band included. When `accum` is given the counts are added to it,
/// which lets a viewport be accumulated tile by tile.
pub fn compute_histogram(
    tile: &Tile,
    pixel_depth: usize,
    bands: &BandOrder,
    accum: Option<Histogram>,
) -> Result<Histogram> {
    if !tile.is_empty() && bands.len() != tile.band_count() {
        return Err(Error::BandCountMismatch {
            expected: bands.len(),
            actual: tile.band_count(),
        });
    }

    let mut hist = match accum {
        Some(h) => {
            if h.band_count() != bands.len() || h.pixel_depth() != pixel_depth {
                return Err(Error::Processing(format!(
                    "accumulator is {}x{}, expected {}x{}",
                    h.band_count(),
                    h.pixel_depth(),
                    bands.len(),
                    pixel_depth
                )));
            }
            h
        }
        None => Histogram::new(bands.len(), pixel_depth),
    };

    let Some(alpha) = bands.len().checked_sub(1) else {
        return Ok(hist);
    };

    let before = hist.count;
    tile.for_each_pixel(|px, _| {
        let validity = px[alpha];
        if validity == 0.0 || validity.is_nan() {
            return;
        }
        hist.record(px);
    });
    debug!(
        "histogram: {} valid of {} pixels (running total {})",
        hist.count - before,
        tile.pixel_count(),
        hist.count
    );
    Ok(hist)
}
