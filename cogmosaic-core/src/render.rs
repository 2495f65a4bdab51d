//! Encoding composited tiles into the requested image format.

use std::io::{Cursor, Write as _};

use cogmosaic_tile_utils::{TileCoord, TileFormat, tile_bounds_mercator};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder as _};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::reader::RasterTile;
use crate::{MosaicError, MosaicResult};

/// Quality of JPEG tiles.
pub const JPEG_QUALITY: u8 = 85;

/// `GeoKeyDirectoryTag` of a web mercator image: projected model, pixel is area, EPSG:3857.
const WEB_MERCATOR_GEO_KEYS: [u16; 16] = [
    1, 1, 0, 3, //
    1024, 0, 1, 1, //
    1025, 0, 1, 1, //
    3072, 0, 1, 3857,
];

/// Errors of the image encoders.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// PNG, JPEG or WebP encoding failed.
    #[error("Unable to encode image: {0}")]
    Image(#[from] image::ImageError),

    /// GeoTIFF encoding failed.
    #[error("Unable to encode GeoTIFF: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Writing the array failed.
    #[error("Unable to write array: {0}")]
    Io(#[from] std::io::Error),

    /// Vector formats cannot hold raster tiles.
    #[error("Raster tiles cannot be encoded as {0}")]
    Unsupported(TileFormat),
}

/// Pick the output format. Without an explicit format, tiles without
/// any masked pixel become JPEG and all others PNG.
pub fn negotiate_format(
    requested: Option<TileFormat>,
    tile: &RasterTile,
) -> MosaicResult<TileFormat> {
    match requested {
        Some(format @ (TileFormat::Pbf | TileFormat::Mvt)) => {
            Err(MosaicError::UnsupportedFormat(format))
        }
        Some(format) => Ok(format),
        None if tile.is_opaque() => Ok(TileFormat::Jpeg),
        None => Ok(TileFormat::Png),
    }
}

/// Encode `tile` as `format`. `xyz` georeferences GeoTIFF output.
pub fn encode_tile(
    tile: &RasterTile,
    format: TileFormat,
    xyz: TileCoord,
) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    match format {
        TileFormat::Png if tile.bands == 1 => {
            PngEncoder::new(&mut buffer).write_image(
                &interleave_mask(tile),
                tile.width,
                tile.height,
                ExtendedColorType::La8,
            )?;
        }
        TileFormat::Png => {
            PngEncoder::new(&mut buffer).write_image(
                &rgba(tile),
                tile.width,
                tile.height,
                ExtendedColorType::Rgba8,
            )?;
        }
        TileFormat::Jpeg if tile.bands == 1 => {
            JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).write_image(
                &tile.data,
                tile.width,
                tile.height,
                ExtendedColorType::L8,
            )?;
        }
        TileFormat::Jpeg => {
            let rgb: Vec<u8> = (0..tile.pixel_count())
                .flat_map(|i| rgb_of(tile.pixel(i)))
                .collect();
            JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).write_image(
                &rgb,
                tile.width,
                tile.height,
                ExtendedColorType::Rgb8,
            )?;
        }
        TileFormat::Webp => {
            WebPEncoder::new_lossless(&mut buffer).write_image(
                &rgba(tile),
                tile.width,
                tile.height,
                ExtendedColorType::Rgba8,
            )?;
        }
        TileFormat::Tiff => encode_geotiff(tile, xyz, &mut buffer)?,
        TileFormat::Npy => encode_npy(tile, &mut buffer)?,
        TileFormat::Pbf | TileFormat::Mvt => return Err(EncodeError::Unsupported(format)),
    }
    Ok(buffer)
}

fn rgb_of(pixel: &[u8]) -> [u8; 3] {
    match *pixel {
        [r, g, b, ..] => [r, g, b],
        [v, ..] => [v, v, v],
        [] => [0, 0, 0],
    }
}

fn rgba(tile: &RasterTile) -> Vec<u8> {
    (0..tile.pixel_count())
        .flat_map(|i| {
            let [r, g, b] = rgb_of(tile.pixel(i));
            [r, g, b, tile.mask[i]]
        })
        .collect()
}

fn interleave_mask(tile: &RasterTile) -> Vec<u8> {
    (0..tile.pixel_count())
        .flat_map(|i| [tile.data[i * tile.bands], tile.mask[i]])
        .collect()
}

/// RGBA GeoTIFF in web mercator covering exactly the tile bounds.
fn encode_geotiff(
    tile: &RasterTile,
    xyz: TileCoord,
    buffer: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let [min_x, _, max_x, max_y] = tile_bounds_mercator(xyz);
    let resolution = (max_x - min_x) / f64::from(tile.width);
    let mut encoder = TiffEncoder::new(Cursor::new(buffer))?;
    let mut image = encoder.new_image::<colortype::RGBA8>(tile.width, tile.height)?;
    let dir = image.encoder();
    dir.write_tag(Tag::ModelPixelScaleTag, &[resolution, resolution, 0.0][..])?;
    dir.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, min_x, max_y, 0.0][..])?;
    dir.write_tag(Tag::GeoKeyDirectoryTag, &WEB_MERCATOR_GEO_KEYS[..])?;
    image.write_data(&rgba(tile))?;
    Ok(())
}

/// NumPy `.npy` v1.0 array of shape `(bands + 1, height, width)`, the mask last.
fn encode_npy(tile: &RasterTile, buffer: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut header = format!(
        "{{'descr': '|u1', 'fortran_order': False, 'shape': ({}, {}, {}), }}",
        tile.bands + 1,
        tile.height,
        tile.width
    );
    // magic, version and header length take 10 bytes, the header ends with a newline
    let padding = (64 - (10 + header.len() + 1) % 64) % 64;
    header.extend(std::iter::repeat_n(' ', padding));
    header.push('\n');

    buffer.write_all(b"\x93NUMPY\x01\x00")?;
    buffer.write_all(&(header.len() as u16).to_le_bytes())?;
    buffer.write_all(header.as_bytes())?;
    for band in 0..tile.bands {
        buffer.extend(tile.data.iter().skip(band).step_by(tile.bands));
    }
    buffer.extend_from_slice(&tile.mask);
    Ok(())
}
