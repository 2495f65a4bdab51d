use cogmosaic_tile_utils::{TileCoord, TileFormat};

use crate::InvalidLocation;
use crate::mosaic::MosaicId;
use crate::reader::ReaderError;
use crate::render::EncodeError;
use crate::store::StoreError;

/// Errors produced while serving a mosaic request.
///
/// Some variants describe a bad request rather than a failure of the service,
/// see [`MosaicError::is_user_error`].
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    /// Neither a mosaic identifier nor a URL was given.
    #[error("Missing 'MosaicID or URL' parameter")]
    MissingReference,

    /// A required request parameter is absent.
    #[error("Missing '{0}' parameter")]
    MissingParameter(&'static str),

    /// The tile address is outside of the tile pyramid.
    #[error("Invalid tile {0:#}")]
    InvalidTile(TileCoord),

    /// A request parameter could not be understood.
    #[error("Invalid value '{1}' for parameter '{0}'")]
    InvalidParameter(&'static str, String),

    /// A mosaic definition submitted by a client is inconsistent.
    #[error("Invalid mosaic definition: {0}")]
    InvalidDefinition(String),

    /// A mosaic location is neither a URL nor a usable file path.
    #[error(transparent)]
    InvalidLocation(#[from] InvalidLocation),

    /// Explicit registration found a definition already stored under the id.
    #[error("Mosaic: {0} already exist.")]
    AlreadyExists(MosaicId),

    /// No mosaic definition is stored at the resolved location.
    #[error("Mosaic {0} not found")]
    NotFound(String),

    /// The requested output format cannot be produced from raster data.
    #[error("Tile format {0} is not supported for raster tiles")]
    UnsupportedFormat(TileFormat),

    /// The builder could not turn the creation parameters into a definition.
    #[error("Unable to build mosaic: {0}")]
    Build(String),

    /// A response document could not be serialized.
    #[error("Unable to serialize response: {0}")]
    Json(#[from] serde_json::Error),

    /// Mosaic store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Raster reader failure.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// Tile encoding failure.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl MosaicError {
    /// Errors caused by the request itself. They are reported back to the
    /// client as a `NOK` response instead of a service failure.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingReference
                | Self::MissingParameter(_)
                | Self::InvalidTile(_)
                | Self::InvalidParameter(..)
                | Self::InvalidDefinition(_)
                | Self::InvalidLocation(_)
                | Self::AlreadyExists(_)
                | Self::UnsupportedFormat(_)
        )
    }
}

/// A convenience [`Result`] for mosaic operations.
pub type MosaicResult<T> = Result<T, MosaicError>;
