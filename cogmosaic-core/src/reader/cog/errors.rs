//! Error types for `Cloud Optimized GeoTIFF` assets.

use tiff::TiffError;

use crate::InvalidLocation;

/// Errors that can occur when reading COG assets.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum CogError {
    /// The asset location is neither a URL nor a file path.
    #[error(transparent)]
    InvalidLocation(#[from] InvalidLocation),

    /// The asset could not be fetched from its object store.
    #[error("Unable to fetch {1}: {0}")]
    Fetch(#[source] object_store::Error, String),

    /// Cannot decode file as valid TIFF.
    #[error("Couldn't decode {1} as tiff file: {0}")]
    InvalidTiffFile(#[source] TiffError, String),

    /// No images found in TIFF file.
    #[error("Couldn't find any image in the tiff file: {0}")]
    NoImagesFound(String),

    /// Cannot seek to Image File Directory.
    #[error("Couldn't seek to ifd number {1} (0 based indexing) in tiff file {2}: {0}")]
    IfdSeekFailed(#[source] TiffError, usize, String),

    /// Required TIFF tags not found.
    #[error("Couldn't find tags {1:?} at ifd {2} of tiff file {3}: {0}")]
    TagsNotFound(#[source] TiffError, Vec<u16>, usize, String),

    /// Unsupported planar configuration in TIFF.
    #[error(
        "Unsupported planar configuration {2} at IFD {1} in TIFF file {0}. Only planar configuration 1 is supported."
    )]
    PlanarConfigurationNotSupported(String, usize, u16),

    /// Failed to read TIFF chunk data.
    #[error("Failed to read {1}th chunk(0 based index) at ifd {2} from tiff file {3}: {0}")]
    ReadChunkFailed(#[source] TiffError, u32, usize, String),

    /// Unsupported color type or bit depth.
    #[error("The color type {0:?} and its bit depth of the tiff file {1} is not supported yet")]
    NotSupportedColorTypeAndBitDepth(tiff::ColorType, String),

    /// Invalid coordinate transformation information.
    #[error("Coord transformation in {0} is invalid: {1}")]
    InvalidGeoInformation(String, String),

    /// Image pixels are not square.
    #[error(
        "The pixel size of the image {0} is not squared, the x_scale is {1}, the y_scale is {2}"
    )]
    NonSquaredImage(String, f64, f64),

    /// Cannot determine the image origin from TIFF tags.
    #[error(
        "Calculating the origin failed for {0}: the length of ModelTiepointTag should be >= 6, or the length of ModelTransformationTag should be >= 12"
    )]
    GetOriginFailed(String),

    /// Cannot determine full resolution from TIFF tags.
    #[error(
        "Get full resolution failed for {0}: either a valid ModelPixelScaleTag or ModelPixelScaleTag is required"
    )]
    GetFullResolutionFailed(String),

    /// The image has no pixels.
    #[error("The image at ifd {1} of tiff file {0} is empty")]
    EmptyImage(String, usize),
}
