//! Stretch ranges from histograms, and level curves built from those ranges.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::processing::histogram::Histogram;

/// `[low, high]` raw-value window of a band.
///
/// Either bound is `None` when the band's histogram carries too little mass
/// to place it; such a range is unavailable and callers skip stretching.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(from = "[Option<u32>; 2]", into = "[Option<u32>; 2]")]
pub struct BandRange {
    pub low: Option<u32>,
    pub high: Option<u32>,
}

impl BandRange {
    pub const UNAVAILABLE: BandRange = BandRange {
        low: None,
        high: None,
    };

    pub fn new(low: u32, high: u32) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    /// Both bounds, when both are known.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        self.low.zip(self.high)
    }

    pub fn is_available(&self) -> bool {
        self.bounds().is_some()
    }
}

impl From<[Option<u32>; 2]> for BandRange {
    fn from([low, high]: [Option<u32>; 2]) -> Self {
        Self { low, high }
    }
}

impl From<BandRange> for [Option<u32>; 2] {
    fn from(r: BandRange) -> Self {
        [r.low, r.high]
    }
}

/// Per-band stretch ranges from a histogram.
///
/// `low` is the first bucket (scanning up from 0) at which the running count
/// exceeds `floor(lo_pct / 100 * count)`; `high` is found the same way scanning
/// down. The percentages are divided by 100 once more, so `0.25` means a
/// quarter of one percent.
pub fn compute_ranges(histogram: &Histogram, lo_pct: f64, hi_pct: f64) -> Vec<BandRange> {
    let count = histogram.count() as f64;
    let lo_threshold = ((lo_pct / 100.0) * count).floor();
    let hi_threshold = ((hi_pct / 100.0) * count).floor();

    let ranges: Vec<BandRange> = histogram
        .bands()
        .iter()
        .map(|buckets| {
            if histogram.count() == 0 {
                return BandRange::UNAVAILABLE;
            }
            BandRange {
                low: first_crossing(buckets.iter().enumerate(), lo_threshold),
                high: first_crossing(buckets.iter().enumerate().rev(), hi_threshold),
            }
        })
        .collect();
    debug!(
        "ranges lo={}% hi={}% over {} pixels: {:?}",
        lo_pct,
        hi_pct,
        histogram.count(),
        ranges
    );
    ranges
}

fn first_crossing<'a>(
    buckets: impl Iterator<Item = (usize, &'a u32)>,
    threshold: f64,
) -> Option<u32> {
    let mut total = 0u64;
    for (value, &n) in buckets {
        if n == 0 {
            continue;
        }
        total += u64::from(n);
        if total as f64 > threshold {
            return u32::try_from(value).ok();
        }
    }
    None
}

/// Average the first three bands' bounds into one shared window, replicated
/// over three channels. Unavailable if any of those bands is unavailable.
pub fn contrast_stretch_average(ranges: &[BandRange]) -> [BandRange; 3] {
    let bounds: Option<Vec<(u32, u32)>> = ranges.iter().take(3).map(BandRange::bounds).collect();
    match bounds {
        Some(b) if b.len() == 3 => {
            let min = b.iter().map(|&(lo, _)| u64::from(lo)).sum::<u64>() / 3;
            let max = b.iter().map(|&(_, hi)| u64::from(hi)).sum::<u64>() / 3;
            [BandRange::new(min as u32, max as u32); 3]
        }
        _ => [BandRange::UNAVAILABLE; 3],
    }
}

/// Dense lookup from raw value to a normalized output in `[0, 1]`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve(pub Vec<f32>);

impl Curve {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Output for raw `value`, clamped into the curve's domain.
    #[inline]
    pub fn lookup(&self, value: f64) -> f64 {
        let Some(last) = self.0.len().checked_sub(1) else {
            return 0.0;
        };
        let idx = if value.is_nan() || value <= 0.0 {
            0
        } else {
            (value as usize).min(last)
        };
        f64::from(self.0[idx])
    }
}

/// Build a `pixel_depth`-long curve mapping `input` onto `output`.
///
/// Below `input.0` the curve holds `output.0 / pixel_depth`, above `input.1`
/// it holds `output.1 / pixel_depth`, and it is linear in between.
pub fn levels_to_curve(pixel_depth: usize, input: (u32, u32), output: (u32, u32)) -> Curve {
    let depth = pixel_depth as f64;
    let lo = f64::from(output.0) / depth;
    let ho = f64::from(output.1) / depth;
    let (in_lo, in_hi) = (f64::from(input.0), f64::from(input.1));
    let span = in_hi - in_lo;
    let step = if span > 0.0 { (ho - lo) / span } else { 0.0 };

    let curve = (0..pixel_depth)
        .map(|i| {
            let i = i as f64;
            let v = if i < in_lo {
                lo
            } else if i > in_hi {
                ho
            } else {
                lo + step * (i - in_lo)
            };
            v as f32
        })
        .collect();
    Curve(curve)
}

/// Curves for output channels 0..=2, scaled back to raw values on apply.
#[derive(Clone, Debug)]
pub struct CurveSet {
    curves: Vec<Curve>,
    max: f64,
}

impl CurveSet {
    /// Overwrite slots 0..=2 with `curve[i][slot i] * (pixel_depth - 1)`.
    /// Slot 3 is left alone; a channel without a curve is left alone.
    #[inline]
    pub fn apply(&self, pixel: &mut [f64]) {
        for (slot, curve) in pixel.iter_mut().zip(&self.curves).take(3) {
            *slot = curve.lookup(*slot) * self.max;
        }
    }
}

pub fn apply_curves(curves: Vec<Curve>, pixel_depth: usize) -> CurveSet {
    CurveSet {
        curves,
        max: pixel_depth.saturating_sub(1) as f64,
    }
}
