//! Band letters, band orders and the fixed-size letter → position lookup.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One named channel of a tile, identified by a lowercase ASCII letter
/// (`r`, `g`, `b`, `n` for near-infrared, `a` for validity, ...).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Band(u8);

impl Band {
    pub const R: Band = Band(b'r');
    pub const G: Band = Band(b'g');
    pub const B: Band = Band(b'b');
    pub const N: Band = Band(b'n');
    pub const A: Band = Band(b'a');

    pub fn new(letter: char) -> Result<Self> {
        if letter.is_ascii_lowercase() {
            Ok(Band(letter as u8))
        } else {
            Err(Error::InvalidArgument {
                arg: "band",
                value: letter.to_string(),
            })
        }
    }

    pub fn letter(self) -> char {
        self.0 as char
    }

    #[inline]
    fn slot(self) -> usize {
        (self.0 - b'a') as usize
    }
}

impl TryFrom<char> for Band {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        Band::new(c)
    }
}

impl From<Band> for char {
    fn from(b: Band) -> char {
        b.letter()
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Caller-supplied order of the bands stored in a tile.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandOrder(Vec<Band>);

impl BandOrder {
    pub fn new(bands: Vec<Band>) -> Self {
        Self(bands)
    }

    /// `r, g, b, a`
    pub fn rgba() -> Self {
        Self(vec![Band::R, Band::G, Band::B, Band::A])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bands(&self) -> &[Band] {
        &self.0
    }

    pub fn contains(&self, band: Band) -> bool {
        self.0.contains(&band)
    }

    /// Same order with `band` appended.
    pub fn with(&self, band: Band) -> Self {
        let mut bands = self.0.clone();
        bands.push(band);
        Self(bands)
    }

    pub fn band_map(&self) -> BandMap {
        BandMap::from_order(self)
    }
}

impl Default for BandOrder {
    fn default() -> Self {
        Self::rgba()
    }
}

/// Accepts `"bgrna"` or a separated form such as `"b,g,r,n,a"`.
impl std::str::FromStr for BandOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bands = s
            .chars()
            .filter(|c| !(c.is_whitespace() || *c == ',' || *c == '-'))
            .map(Band::new)
            .collect::<Result<Vec<_>>>()?;
        if bands.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "bands",
                value: s.to_string(),
            });
        }
        Ok(Self(bands))
    }
}

impl std::fmt::Display for BandOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

const LETTERS: usize = 26;

/// Position of each band letter within a band order.
///
/// The band set of a tile is small and closed, so this is a fixed array
/// indexed by letter rather than a hash map. When a letter repeats, the
/// first position wins.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BandMap {
    positions: [Option<u8>; LETTERS],
    len: usize,
}

impl BandMap {
    pub fn from_order(order: &BandOrder) -> Self {
        let mut positions = [None; LETTERS];
        for (i, band) in order.bands().iter().enumerate() {
            let slot = &mut positions[band.slot()];
            if slot.is_none() {
                *slot = u8::try_from(i).ok();
            }
        }
        Self {
            positions,
            len: order.len(),
        }
    }

    /// Position of `band` in the order, if present.
    #[inline]
    pub fn get(&self, band: Band) -> Option<usize> {
        self.positions[band.slot()].map(usize::from)
    }

    /// Number of bands in the order this map was built from.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value of `band` in `pixel`; a band that is absent reads as zero.
    #[inline]
    pub fn value(&self, pixel: &[f64], band: Band) -> f64 {
        self.get(band)
            .and_then(|i| pixel.get(i).copied())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band_order() {
        let compact: BandOrder = "bgrna".parse().unwrap();
        let separated: BandOrder = "b, g, r, n, a".parse().unwrap();
        assert_eq!(compact, separated);
        assert_eq!(compact.to_string(), "bgrna");
        assert!("".parse::<BandOrder>().is_err());
        assert!("RGB".parse::<BandOrder>().is_err());
    }

    #[test]
    fn test_band_map_positions() {
        let order: BandOrder = "bgrna".parse().unwrap();
        let map = order.band_map();
        assert_eq!(map.get(Band::R), Some(2));
        assert_eq!(map.get(Band::G), Some(1));
        assert_eq!(map.get(Band::B), Some(0));
        assert_eq!(map.get(Band::N), Some(3));
        assert_eq!(map.get(Band::A), Some(4));
        assert_eq!(map.get(Band::new('x').unwrap()), None);
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_missing_band_reads_zero() {
        let map = BandOrder::new(vec![Band::R, Band::G, Band::B]).band_map();
        let pixel = [1.0, 2.0, 3.0];
        assert_eq!(map.value(&pixel, Band::B), 3.0);
        assert_eq!(map.value(&pixel, Band::A), 0.0);
    }

    #[test]
    fn test_band_order_serde() {
        let order: BandOrder = serde_json::from_str(r#"["r","g","b","a"]"#).unwrap();
        assert_eq!(order, BandOrder::rgba());
        assert_eq!(serde_json::to_string(&order).unwrap(), r#"["r","g","b","a"]"#);
        assert!(serde_json::from_str::<BandOrder>(r#"["R"]"#).is_err());
    }
}
