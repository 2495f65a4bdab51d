use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use cogmosaic_tile_utils::TileCoord;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

mod cog;
pub use cog::{CogError, CogReader};

/// A decoded tile of one or more 8-bit bands.
///
/// `data` is pixel interleaved, `bands` values per pixel, row by row.
/// `mask` holds one value per pixel, `255` for valid data and `0` for nodata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterTile {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of values per pixel.
    pub bands: usize,
    /// Pixel interleaved band values.
    pub data: Vec<u8>,
    /// Validity of each pixel.
    pub mask: Vec<u8>,
}

impl RasterTile {
    /// A tile where every pixel is nodata.
    #[must_use]
    pub fn empty(width: u32, height: u32, bands: usize) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            bands,
            data: vec![0; pixels * bands],
            mask: vec![0; pixels],
        }
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.mask.len()
    }

    /// Band values of the pixel at `index`.
    #[must_use]
    pub fn pixel(&self, index: usize) -> &[u8] {
        &self.data[index * self.bands..(index + 1) * self.bands]
    }

    /// True if no pixel holds valid data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask.iter().all(|m| *m == 0)
    }

    /// True if every pixel holds valid data.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.mask.iter().all(|m| *m != 0)
    }

    /// Same size and band layout as `other`.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.bands == other.bands
    }
}

/// What the reader knows about an asset without reading any tile of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// `[west, south, east, north]` in degrees.
    pub bounds: [f64; 4],
    /// Zoom of the coarsest overview.
    pub minzoom: u8,
    /// Zoom of the full resolution image.
    pub maxzoom: u8,
    /// Names of the bands, `b1`, `b2`, ...
    pub band_names: Vec<String>,
    /// Data type of the band values.
    pub dtype: String,
}

/// How asset pixels are resampled to the requested tile size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Nearest neighbour.
    #[default]
    Nearest,
    /// Linear interpolation of the 2x2 neighbourhood.
    Bilinear,
    /// Cubic interpolation of the 4x4 neighbourhood.
    Cubic,
    /// Lanczos windowed sinc.
    Lanczos,
}

impl Resampling {
    /// Parse the `resampling_method` request parameter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "nearest" => Self::Nearest,
            "bilinear" => Self::Bilinear,
            "cubic" => Self::Cubic,
            "lanczos" => Self::Lanczos,
            _ => None?,
        })
    }

    /// Filter used when the source window has to be resized.
    #[must_use]
    pub fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Cubic => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Errors of a [`TileReader`].
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    /// The asset has no data for the requested tile.
    #[error("Asset {0} does not intersect tile {1:#}")]
    OutsideBounds(String, TileCoord),

    /// The asset could not be read as a web mercator COG.
    #[error(transparent)]
    Cog(#[from] Arc<CogError>),
}

impl From<CogError> for ReaderError {
    fn from(value: CogError) -> Self {
        Self::Cog(Arc::new(value))
    }
}

/// A convenience [`Result`] for tile readers.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Reads web mercator tiles out of individual raster assets.
#[async_trait]
pub trait TileReader: Send + Sync + Debug {
    /// Read the part of `asset` covering `xyz`, resampled to `tile_size` pixels.
    ///
    /// Fails with [`ReaderError::OutsideBounds`] if the asset does not intersect the tile.
    async fn read_tile(
        &self,
        asset: &str,
        xyz: TileCoord,
        tile_size: u32,
        resampling: Resampling,
    ) -> ReaderResult<RasterTile>;

    /// Describe `asset`.
    async fn asset_info(&self, asset: &str) -> ReaderResult<AssetInfo>;
}
