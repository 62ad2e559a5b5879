//! Colour-map style: each of red, green and blue is rescaled against its
//! stretch range and used as an index into that channel's lookup table.
use serde::{Deserialize, Serialize};

use crate::core::bands::{Band, BandMap};
use crate::core::processing::stretch::BandRange;
use crate::error::{Error, Result};
use crate::style::PixelStyle;

/// Per-channel output tables: `[[red0..], [green0..], [blue0..]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable(pub [Vec<f64>; 3]);

#[derive(Debug, Clone)]
struct Channel {
    position: usize,
    low: f64,
    factor: f64,
    table: Vec<f64>,
}

impl Channel {
    fn lookup(&self, pixel: &[f64]) -> f64 {
        let last = self.table.len() - 1;
        let raw = pixel.get(self.position).copied().unwrap_or(0.0);
        let idx = (self.factor * (raw - self.low)).floor();
        let idx = if idx.is_nan() || idx <= 0.0 {
            0
        } else {
            (idx as usize).min(last)
        };
        self.table[idx]
    }
}

/// A [`LookupTable`] bound to a band map and the ranges of its r, g and b bands.
#[derive(Debug, Clone)]
pub struct LookupTableStyle {
    channels: [Channel; 3],
}

impl LookupTableStyle {
    /// Resolve the r, g and b positions through `bandmap` and their ranges.
    ///
    /// Fails when a channel table is empty, a band is missing from the map or
    /// its range is unavailable, so nothing is checked per pixel.
    pub fn new(table: &LookupTable, ranges: &[BandRange], bandmap: &BandMap) -> Result<Self> {
        let channel = |band: Band, table: &[f64]| -> Result<Channel> {
            if table.is_empty() {
                return Err(Error::InvalidArgument {
                    arg: "lookupTable",
                    value: format!("empty table for band '{}'", band.letter()),
                });
            }
            let position = bandmap.get(band).ok_or_else(|| Error::InvalidArgument {
                arg: "bands",
                value: format!("no '{}' band", band.letter()),
            })?;
            let (low, high) = ranges
                .get(position)
                .and_then(BandRange::bounds)
                .ok_or(Error::RangeUnavailable {
                    band: band.letter(),
                })?;
            let (low, high) = (f64::from(low), f64::from(high));
            // a zero-width range sends everything above `low` to the last entry
            let factor = if high > low {
                table.len() as f64 / (high - low)
            } else {
                f64::INFINITY
            };
            Ok(Channel {
                position,
                low,
                factor,
                table: table.to_vec(),
            })
        };

        let [red, green, blue] = &table.0;
        Ok(Self {
            channels: [
                channel(Band::R, red)?,
                channel(Band::G, green)?,
                channel(Band::B, blue)?,
            ],
        })
    }
}

impl PixelStyle for LookupTableStyle {
    fn apply(&self, pixel: &mut [f64], _bandmap: &BandMap) {
        let [r, g, b] = self.channels.each_ref().map(|c| c.lookup(pixel));
        if let [p0, p1, p2, ..] = pixel {
            *p0 = r;
            *p1 = g;
            *p2 = b;
        }
    }
}
