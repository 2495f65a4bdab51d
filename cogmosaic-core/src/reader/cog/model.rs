use std::io::{Read, Seek};

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::reader::cog::CogError;
use crate::reader::cog::ranges::optional_tag;

/// EPSG code of web mercator.
pub const WEB_MERCATOR_EPSG: u16 = 3857;

const PROJECTED_CRS_GEO_KEY: u16 = 3072;

/// `GeoTIFF` tags relating raster space to model space.
/// See [ogc doc](https://docs.ogc.org/is/19-008r4/19-008r4.html#_coordinate_transformations).
///
/// ```raw
///        ModelPixelScaleTag
///          ModelTiepointTag
///  R ------------ OR --------------> M
/// (I,J,K) ModelTransformationTag (X,Y,Z)
/// ```
#[derive(Clone, Debug, Default)]
pub struct ModelInfo {
    /// `(ScaleX, ScaleY, ScaleZ)`, tag 33550.
    pub pixel_scale: Option<Vec<f64>>,
    /// `(..., I, J, K, X, Y, Z, ...)` raster to model tie points, tag 33922.
    pub tie_points: Option<Vec<f64>>,
    /// Row major 4x4 raster to model matrix, tag 34264.
    pub transformation: Option<Vec<f64>>,
    /// `ProjectedCRSGeoKey` of the `GeoKeyDirectoryTag`.
    pub projected_crs: Option<u16>,
}

impl ModelInfo {
    /// Read the model tags of the current image. Missing tags are left empty.
    pub fn decode<R: Read + Seek>(decoder: &mut Decoder<R>, uri: &str) -> Result<Self, CogError> {
        let err = |e| CogError::InvalidTiffFile(e, uri.to_string());
        let pixel_scale =
            optional_tag(decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag)).map_err(err)?;
        let tie_points =
            optional_tag(decoder.get_tag_f64_vec(Tag::ModelTiepointTag)).map_err(err)?;
        let transformation =
            optional_tag(decoder.get_tag_f64_vec(Tag::ModelTransformationTag)).map_err(err)?;
        let projected_crs = optional_tag(decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag))
            .map_err(err)?
            .and_then(|keys| projected_crs(&keys));
        Ok(Self {
            pixel_scale,
            tie_points,
            transformation,
            projected_crs,
        })
    }

    /// Check that the image is georeferenced in web mercator with square pixels.
    pub fn verify(&self, uri: &str) -> Result<(), CogError> {
        let invalid = |msg: &str| {
            Err(CogError::InvalidGeoInformation(
                uri.to_string(),
                msg.to_string(),
            ))
        };
        match (&self.pixel_scale, &self.tie_points, &self.transformation) {
            (Some(scale), Some(tie_points), _) => {
                if scale.len() != 3 {
                    return invalid("The count of pixel scale should be 3");
                }
                if (scale[0].abs() - scale[1].abs()).abs() > 0.01 {
                    return Err(CogError::NonSquaredImage(uri.to_string(), scale[0], scale[1]));
                }
                if tie_points.len() % 6 != 0 {
                    return invalid("The count of tie points should be a multiple of 6");
                }
            }
            (_, _, Some(matrix)) => {
                if matrix.len() != 16 {
                    return invalid("The length of matrix should be 16");
                }
            }
            _ => {
                return invalid(
                    "Either a valid transformation (tag 34264) or both pixel scale (tag 33550) and tie points (tag 33922) must be provided",
                );
            }
        }
        if self.projected_crs != Some(WEB_MERCATOR_EPSG) {
            return invalid("The projected coordinate reference system must be EPSG:3857");
        }
        Ok(())
    }

    /// Model coordinates of raster point `(0, 0)`.
    pub fn origin(&self, uri: &str) -> Result<[f64; 2], CogError> {
        match (&self.tie_points, &self.transformation) {
            // the first tie point should establish the location of raster (0, 0)
            (Some(points), _) if points.len() >= 6 => Ok([points[3], points[4]]),
            // x = I*a + J*b + K*c + d, y = I*e + J*f + K*g + h with (I, J, K) = 0
            (_, Some(matrix)) if matrix.len() >= 12 => Ok([matrix[3], matrix[7]]),
            _ => Err(CogError::GetOriginFailed(uri.to_string())),
        }
    }

    /// Size of a full resolution pixel in model units along x and y.
    pub fn resolution(&self, uri: &str) -> Result<[f64; 2], CogError> {
        match (&self.pixel_scale, &self.transformation) {
            (Some(scale), _) if scale.len() >= 2 => Ok([scale[0].abs(), scale[1].abs()]),
            (_, Some(matrix)) if matrix.len() >= 6 => Ok([
                matrix[0].hypot(matrix[4]),
                matrix[1].hypot(matrix[5]),
            ]),
            _ => Err(CogError::GetFullResolutionFailed(uri.to_string())),
        }
    }
}

/// The projected CRS from a `GeoKeyDirectoryTag`: a 4 value header
/// `(version = 1, revision = 1, minor = 0, key count)` followed by 4 values per key.
fn projected_crs(keys: &[u16]) -> Option<u16> {
    let mut entries = keys.chunks_exact(4);
    match entries.next()? {
        [1, 1, 0, count] if *count > 0 => {}
        _ => return None,
    }
    entries
        .find(|entry| entry[0] == PROJECTED_CRS_GEO_KEY)
        .map(|entry| entry[3])
}
