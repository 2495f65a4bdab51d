//! Pixel selection: how overlapping asset tiles are merged into one tile.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::RasterTile;

/// Strategy used to pick the value of a pixel covered by several assets.
///
/// Every strategy only looks at valid (unmasked) pixels. Band values are
/// merged band by band, so `Highest` may combine bands of different assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelSelection {
    /// The first asset with a valid pixel wins.
    #[default]
    First,
    /// The highest value of every band.
    Highest,
    /// The lowest value of every band.
    Lowest,
    /// The mean of every band.
    Mean,
    /// The median of every band.
    Median,
    /// The standard deviation of every band.
    Stdev,
    /// The last asset with a valid pixel wins.
    Last,
}

impl PixelSelection {
    /// Parse the `pixel_selection` request parameter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "first" => Self::First,
            "highest" => Self::Highest,
            "lowest" => Self::Lowest,
            "mean" => Self::Mean,
            "median" => Self::Median,
            "stdev" => Self::Stdev,
            "last" => Self::Last,
            _ => None?,
        })
    }

    /// Name used in request parameters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Highest => "highest",
            Self::Lowest => "lowest",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Stdev => "stdev",
            Self::Last => "last",
        }
    }

    /// Strategy to apply to `assets` after ordering them.
    ///
    /// `Last` is `First` on the reversed list: the list is reversed in place.
    #[must_use]
    pub fn effective(self, assets: &mut [String]) -> Self {
        if self == Self::Last {
            assets.reverse();
            Self::First
        } else {
            self
        }
    }

    /// Merge `tiles`, given in asset order, into one tile.
    ///
    /// Tiles whose size or band count differ from the first one are ignored.
    /// `None` if no pixel of any tile is valid.
    #[must_use]
    pub fn composite(self, tiles: &[RasterTile]) -> Option<RasterTile> {
        let reference = tiles.first()?;
        let mut inputs: Vec<&RasterTile> = tiles
            .iter()
            .filter(|tile| {
                let compatible = tile.is_compatible(reference);
                if !compatible {
                    debug!(
                        "Ignoring {}x{} tile with {} bands, expected {}x{} with {} bands",
                        tile.width,
                        tile.height,
                        tile.bands,
                        reference.width,
                        reference.height,
                        reference.bands
                    );
                }
                compatible
            })
            .collect();
        if self == Self::Last {
            inputs.reverse();
        }

        let bands = reference.bands;
        let mut output = RasterTile::empty(reference.width, reference.height, bands);
        let mut values = Vec::with_capacity(inputs.len());
        for pixel in 0..output.pixel_count() {
            let valid = inputs.iter().filter(|tile| tile.mask[pixel] != 0);
            let merged = &mut output.data[pixel * bands..(pixel + 1) * bands];
            match self {
                Self::First | Self::Last => {
                    let Some(tile) = valid.clone().next() else {
                        continue;
                    };
                    merged.copy_from_slice(tile.pixel(pixel));
                }
                _ => {
                    if valid.clone().next().is_none() {
                        continue;
                    }
                    for (band, merged) in merged.iter_mut().enumerate() {
                        values.clear();
                        values.extend(valid.clone().map(|tile| tile.pixel(pixel)[band]));
                        *merged = self.reduce(&mut values);
                    }
                }
            }
            output.mask[pixel] = 255;
        }
        (!output.is_empty()).then_some(output)
    }

    /// Combine the valid values of one band. `values` is never empty.
    fn reduce(self, values: &mut [u8]) -> u8 {
        let count = values.len() as f64;
        let mean = || values.iter().map(|v| f64::from(*v)).sum::<f64>() / count;
        match self {
            Self::First | Self::Last => values[0],
            Self::Highest => values.iter().copied().max().unwrap_or_default(),
            Self::Lowest => values.iter().copied().min().unwrap_or_default(),
            Self::Mean => mean() as u8,
            Self::Median => {
                values.sort_unstable();
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    ((u16::from(values[mid - 1]) + u16::from(values[mid])) / 2) as u8
                } else {
                    values[mid]
                }
            }
            Self::Stdev => {
                let mean = mean();
                let variance = values
                    .iter()
                    .map(|v| (f64::from(*v) - mean).powi(2))
                    .sum::<f64>()
                    / count;
                variance.sqrt() as u8
            }
        }
    }
}

impl Display for PixelSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    /// A 1x3 single band tile; `None` marks nodata.
    fn tile(values: [Option<u8>; 3]) -> RasterTile {
        let mut tile = RasterTile::empty(3, 1, 1);
        for (i, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                tile.data[i] = value;
                tile.mask[i] = 255;
            }
        }
        tile
    }

    fn stack() -> Vec<RasterTile> {
        vec![
            tile([Some(10), None, Some(1)]),
            tile([Some(20), Some(5), None]),
            tile([Some(60), Some(7), None]),
        ]
    }

    #[rstest]
    #[case(PixelSelection::First, [10, 5, 1])]
    #[case(PixelSelection::Last, [60, 7, 1])]
    #[case(PixelSelection::Highest, [60, 7, 1])]
    #[case(PixelSelection::Lowest, [10, 5, 1])]
    #[case(PixelSelection::Mean, [30, 6, 1])]
    #[case(PixelSelection::Median, [20, 6, 1])]
    #[case(PixelSelection::Stdev, [21, 1, 0])]
    fn methods(#[case] method: PixelSelection, #[case] expected: [u8; 3]) {
        let merged = method.composite(&stack()).unwrap();
        assert_eq!(merged.data, expected);
        assert_eq!(merged.mask, [255, 255, 255]);
    }

    #[test]
    fn nodata_everywhere() {
        let tiles = vec![tile([None, None, None]), tile([None, None, None])];
        for method in [PixelSelection::First, PixelSelection::Mean] {
            assert_eq!(method.composite(&tiles), None);
        }
        assert_eq!(PixelSelection::First.composite(&[]), None);
    }

    #[test]
    fn partial_coverage_stays_masked() {
        let tiles = vec![tile([None, Some(3), None])];
        let merged = PixelSelection::Highest.composite(&tiles).unwrap();
        assert_eq!(merged.mask, [0, 255, 0]);
        assert_eq!(merged.data, [0, 3, 0]);
    }

    #[test]
    fn incompatible_tiles_are_ignored() {
        let mut tiles = stack();
        tiles.insert(1, RasterTile::empty(2, 2, 1));
        let merged = PixelSelection::Highest.composite(&tiles).unwrap();
        assert_eq!(merged.data, [60, 7, 1]);
    }

    #[test]
    fn last_is_first_reversed() {
        let mut assets = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let effective = PixelSelection::Last.effective(&mut assets);
        assert_eq!(effective, PixelSelection::First);
        assert_eq!(assets, ["c", "b", "a"]);

        let mut reversed = stack();
        reversed.reverse();
        assert_eq!(
            PixelSelection::Last.composite(&stack()),
            PixelSelection::First.composite(&reversed)
        );

        let mut assets = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            PixelSelection::Mean.effective(&mut assets),
            PixelSelection::Mean
        );
        assert_eq!(assets, ["a", "b"]);
    }

    #[rstest]
    #[case("first", PixelSelection::First)]
    #[case("highest", PixelSelection::Highest)]
    #[case("stdev", PixelSelection::Stdev)]
    #[case("last", PixelSelection::Last)]
    fn names(#[case] name: &str, #[case] method: PixelSelection) {
        assert_eq!(PixelSelection::parse(name), Some(method));
        assert_eq!(method.to_string(), name);
    }

    #[test]
    fn unknown_name() {
        assert_eq!(PixelSelection::parse("brightest"), None);
        assert_eq!(PixelSelection::parse("First"), None);
    }
}
