use std::io::{Read, Seek};
use std::ops::Range;

use cogmosaic_tile_utils::EARTH_CIRCUMFERENCE;
use tiff::ColorType;
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::tags::{PlanarConfiguration, Tag};
use tracing::debug;

use crate::reader::RasterTile;
use crate::reader::cog::CogError;
use crate::reader::cog::ranges::optional_tag;

/// How the samples of a pixel are stored and which of them flag missing data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    /// Samples stored per pixel, including alpha.
    pub samples: usize,
    /// Data bands per pixel.
    pub bands: usize,
    /// The last sample is an alpha channel.
    pub alpha: bool,
    /// Band value marking a pixel as missing when every band holds it.
    pub nodata: Option<u8>,
}

impl PixelLayout {
    /// Read the layout of the current image. Only 8-bit chunky images are supported.
    pub fn decode<R: Read + Seek>(decoder: &mut Decoder<R>, uri: &str) -> Result<Self, CogError> {
        let color_type = decoder
            .colortype()
            .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?;
        let (samples, alpha) = match color_type {
            ColorType::Gray(8) => (1, false),
            ColorType::GrayA(8) => (2, true),
            ColorType::RGB(8) => (3, false),
            ColorType::RGBA(8) => (4, true),
            other => {
                return Err(CogError::NotSupportedColorTypeAndBitDepth(
                    other,
                    uri.to_string(),
                ));
            }
        };
        if samples > 1 {
            // an absent tag means chunky
            let config = decoder
                .get_tag_unsigned(Tag::PlanarConfiguration)
                .unwrap_or(PlanarConfiguration::Chunky.to_u16());
            if config != PlanarConfiguration::Chunky.to_u16() {
                return Err(CogError::PlanarConfigurationNotSupported(
                    uri.to_string(),
                    0,
                    config,
                ));
            }
        }
        let nodata = optional_tag(decoder.get_tag_ascii_string(Tag::GdalNodata))
            .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?
            .and_then(|value| parse_nodata(&value));
        Ok(Self {
            samples,
            bands: if alpha { samples - 1 } else { samples },
            alpha,
            nodata,
        })
    }

    fn is_valid(&self, samples: &[u8]) -> bool {
        if self.alpha {
            samples[self.bands] != 0
        } else if let Some(nodata) = self.nodata {
            samples[..self.bands].iter().any(|v| *v != nodata)
        } else {
            true
        }
    }
}

/// GDAL writes nodata as text. Values that are not an 8-bit integer can never match a pixel.
fn parse_nodata(value: &str) -> Option<u8> {
    let value: f64 = value.trim_matches(char::from(0)).trim().parse().ok()?;
    (value.fract() == 0.0 && (0.0..=255.0).contains(&value)).then_some(value as u8)
}

/// A rectangle in global pixel coordinates of one resolution level,
/// counted from the top left corner of the web mercator world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Window {
    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One image of a COG file: the full resolution image or one of its overviews.
#[derive(Clone, Debug)]
pub struct Image {
    /// Index of the Image File Directory holding this image.
    ifd_index: usize,
    /// Model units per pixel.
    resolution: f64,
    /// Global pixel coordinates of the top left pixel.
    pixel_origin: (i64, i64),
    width: u32,
    height: u32,
    /// Tile size, or image width and rows per strip for stripped images.
    chunk_size: (u32, u32),
    chunks_across: u32,
    /// Byte range of every chunk in the file. Empty for chunks that were never written.
    chunks: Vec<Range<u64>>,
}

impl Image {
    /// Describe the image the decoder currently points at.
    pub fn decode<R: Read + Seek>(
        decoder: &mut Decoder<R>,
        ifd_index: usize,
        origin: [f64; 2],
        resolution: f64,
        uri: &str,
    ) -> Result<Self, CogError> {
        let (width, height) = decoder.dimensions().map_err(|e| {
            CogError::TagsNotFound(
                e,
                vec![Tag::ImageWidth.to_u16(), Tag::ImageLength.to_u16()],
                ifd_index,
                uri.to_string(),
            )
        })?;
        if width == 0 || height == 0 {
            return Err(CogError::EmptyImage(uri.to_string(), ifd_index));
        }
        let chunk_size = decoder.chunk_dimensions();
        let (offsets_tag, counts_tag) = match decoder.get_chunk_type() {
            ChunkType::Tile => (Tag::TileOffsets, Tag::TileByteCounts),
            ChunkType::Strip => (Tag::StripOffsets, Tag::StripByteCounts),
        };
        let mut chunk_table = |tag: Tag| {
            decoder.get_tag_u64_vec(tag).map_err(|e| {
                CogError::TagsNotFound(e, vec![tag.to_u16()], ifd_index, uri.to_string())
            })
        };
        let offsets = chunk_table(offsets_tag)?;
        let counts = chunk_table(counts_tag)?;
        let chunks = offsets
            .iter()
            .zip(&counts)
            .map(|(offset, count)| *offset..offset.saturating_add(*count))
            .collect();
        let half = EARTH_CIRCUMFERENCE / 2.0;
        let pixel_origin = (
            ((origin[0] + half) / resolution).round() as i64,
            ((half - origin[1]) / resolution).round() as i64,
        );
        Ok(Self {
            ifd_index,
            resolution,
            pixel_origin,
            width,
            height,
            chunk_size,
            chunks_across: width.div_ceil(chunk_size.0.max(1)),
            chunks,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Bytes held by the chunk table.
    pub fn table_size(&self) -> usize {
        self.chunks.len() * size_of::<Range<u64>>()
    }

    /// The part of the image inside the square of `span` pixels whose top left
    /// corner is at global pixel `start`. `None` if they do not intersect.
    pub fn clip(&self, start: (f64, f64), span: f64) -> Option<Window> {
        let (origin_x, origin_y) = self.pixel_origin;
        let left = (start.0.floor() as i64).max(origin_x);
        let top = (start.1.floor() as i64).max(origin_y);
        let right = ((start.0 + span).ceil() as i64).min(origin_x + i64::from(self.width));
        let bottom = ((start.1 + span).ceil() as i64).min(origin_y + i64::from(self.height));
        (left < right && top < bottom).then(|| Window {
            x: left,
            y: top,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    fn chunk_index(&self, chunk_x: u32, chunk_y: u32) -> u32 {
        chunk_y * self.chunks_across + chunk_x
    }

    /// Indices of the chunks covering `window`, a window returned by [`Image::clip`].
    fn chunks_of(&self, window: Window) -> impl Iterator<Item = u32> {
        let (chunk_w, chunk_h) = (
            i64::from(self.chunk_size.0.max(1)),
            i64::from(self.chunk_size.1.max(1)),
        );
        let left = window.x - self.pixel_origin.0;
        let top = window.y - self.pixel_origin.1;
        let right = left + i64::from(window.width);
        let bottom = top + i64::from(window.height);
        (top / chunk_h..=(bottom - 1) / chunk_h).flat_map(move |chunk_y| {
            (left / chunk_w..=(right - 1) / chunk_w)
                .map(move |chunk_x| self.chunk_index(chunk_x as u32, chunk_y as u32))
        })
    }

    /// Byte ranges of the chunks needed to read `window`, skipping chunks never written.
    pub fn chunk_ranges(&self, window: Window) -> Vec<Range<u64>> {
        self.chunks_of(window)
            .filter_map(|index| self.chunks.get(index as usize))
            .filter(|range| !range.is_empty())
            .cloned()
            .collect()
    }

    /// Read the pixels of `window`, a window returned by [`Image::clip`].
    ///
    /// Pixels in missing or unreadable chunks and pixels flagged by alpha or
    /// nodata are masked.
    pub fn read_window<R: Read + Seek>(
        &self,
        decoder: &mut Decoder<R>,
        layout: &PixelLayout,
        window: Window,
        uri: &str,
    ) -> Result<RasterTile, CogError> {
        decoder
            .seek_to_image(self.ifd_index)
            .map_err(|e| CogError::IfdSeekFailed(e, self.ifd_index, uri.to_string()))?;

        let mut tile = RasterTile::empty(window.width, window.height, layout.bands);
        debug_assert_eq!(tile.pixel_count(), window.pixel_count());
        let left = window.x - self.pixel_origin.0;
        let top = window.y - self.pixel_origin.1;
        let right = left + i64::from(window.width);
        let bottom = top + i64::from(window.height);
        let (chunk_w, chunk_h) = (i64::from(self.chunk_size.0), i64::from(self.chunk_size.1));
        for index in self.chunks_of(window) {
            if self.chunks.get(index as usize).is_none_or(Range::is_empty) {
                continue;
            }
            let data = match decoder.read_chunk(index) {
                Ok(DecodingResult::U8(data)) => data,
                Ok(_) => {
                    let color_type = decoder
                        .colortype()
                        .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?;
                    return Err(CogError::NotSupportedColorTypeAndBitDepth(
                        color_type,
                        uri.to_string(),
                    ));
                }
                Err(e) => {
                    debug!("Chunk {index} of ifd {} in {uri} is unreadable: {e}", self.ifd_index);
                    continue;
                }
            };
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            // tiles may come padded to the full chunk size
            let full = self.chunk_size.0 as usize * self.chunk_size.1 as usize * layout.samples;
            let stride = if data.len() >= full {
                self.chunk_size.0
            } else {
                data_w
            };

            let chunk_left = i64::from(index % self.chunks_across) * chunk_w;
            let chunk_top = i64::from(index / self.chunks_across) * chunk_h;
            let cols = left.max(chunk_left)..right.min(chunk_left + i64::from(data_w));
            let rows = top.max(chunk_top)..bottom.min(chunk_top + i64::from(data_h));
            for row in rows {
                for col in cols.clone() {
                    let src = ((row - chunk_top) as usize * stride as usize
                        + (col - chunk_left) as usize)
                        * layout.samples;
                    let Some(samples) = data.get(src..src + layout.samples) else {
                        continue;
                    };
                    if !layout.is_valid(samples) {
                        continue;
                    }
                    let dst = (row - top) as usize * window.width as usize + (col - left) as usize;
                    tile.data[dst * layout.bands..(dst + 1) * layout.bands]
                        .copy_from_slice(&samples[..layout.bands]);
                    tile.mask[dst] = 255;
                }
            }
        }
        Ok(tile)
    }
}
