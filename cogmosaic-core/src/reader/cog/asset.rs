use std::ops::Range;

use bytes::Bytes;
use cogmosaic_tile_utils::{
    EARTH_CIRCUMFERENCE, MAX_ZOOM, TILE_SIZE, TileCoord, tile_bounds_mercator,
    webmercator_to_wgs84,
};
use image::{Rgba, RgbaImage};
use tiff::decoder::{Decoder, Limits};
use tiff::tags::Tag;

use crate::reader::cog::CogError;
use crate::reader::cog::image::{Image, PixelLayout, Window};
use crate::reader::cog::model::ModelInfo;
use crate::reader::cog::ranges::{SparseBytes, SparseReader, is_not_fetched, optional_tag};
use crate::reader::{AssetInfo, RasterTile, Resampling};

/// Relative slack when comparing resolutions, so exact overview matches are kept.
const RESOLUTION_TOLERANCE: f64 = 1e-9;

/// The structure of a `Cloud Optimized GeoTIFF` in web mercator: its resolution
/// levels and where their chunks are in the file. Pixel data is fetched per tile.
#[derive(Clone, Debug)]
pub struct CogAsset {
    uri: String,
    /// The fetched start of the file, holding the image file directories.
    header: SparseBytes,
    layout: PixelLayout,
    /// Finest first.
    images: Vec<Image>,
    /// `[min_x, min_y, max_x, max_y]` in meters.
    extent: [f64; 4],
    info: AssetInfo,
}

/// Where a tile falls on one resolution level of an asset.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePlan {
    image: usize,
    /// Top left corner of the tile in global pixels of the level.
    start: (f64, f64),
    /// Width of the tile in pixels of the level.
    span: f64,
    /// Part of the level covered by the tile.
    window: Window,
    ranges: Vec<Range<u64>>,
}

impl TilePlan {
    /// Byte ranges of the chunks to fetch before rendering.
    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }
}

impl CogAsset {
    /// Decode the structure of a COG from the fetched start of the file.
    ///
    /// Fails with an error satisfying [`is_not_fetched`] if the image file
    /// directories reach beyond `header`.
    pub fn parse(uri: &str, header: SparseBytes) -> Result<Self, CogError> {
        let mut decoder = Self::decoder(uri, &header)?;
        let model = ModelInfo::decode(&mut decoder, uri)?;
        model.verify(uri)?;
        let layout = PixelLayout::decode(&mut decoder, uri)?;
        let origin = model.origin(uri)?;
        let [res_x, res_y] = model.resolution(uri)?;

        let (full_width, full_height) = decoder
            .dimensions()
            .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?;
        let model_width = f64::from(full_width) * res_x;
        let model_height = f64::from(full_height) * res_y;
        let extent = [
            origin[0],
            origin[1] - model_height,
            origin[0] + model_width,
            origin[1],
        ];

        let mut images = Vec::new();
        for ifd_index in 0.. {
            if let Err(e) = decoder.seek_to_image(ifd_index) {
                if is_not_fetched(&e) {
                    return Err(CogError::IfdSeekFailed(e, ifd_index, uri.to_string()));
                }
                break;
            }
            // absent: the source image, 0: full resolution, 1: overview; others are masks
            let subfile_type = optional_tag(decoder.get_tag_u32(Tag::NewSubfileType))
                .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?
                .unwrap_or(0);
            if subfile_type > 1 {
                continue;
            }
            let width = decoder
                .dimensions()
                .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?
                .0;
            if width == 0 {
                return Err(CogError::EmptyImage(uri.to_string(), ifd_index));
            }
            let resolution = model_width / f64::from(width);
            images.push(Image::decode(
                &mut decoder,
                ifd_index,
                origin,
                resolution,
                uri,
            )?);
        }
        if images.is_empty() {
            return Err(CogError::NoImagesFound(uri.to_string()));
        }
        images.sort_by(|a, b| a.resolution().total_cmp(&b.resolution()));

        let info = Self::describe(&images, &layout, extent);
        Ok(Self {
            uri: uri.to_string(),
            header,
            layout,
            images,
            extent,
            info,
        })
    }

    fn decoder(uri: &str, bytes: &SparseBytes) -> Result<Decoder<SparseReader>, CogError> {
        Ok(Decoder::new(bytes.reader())
            .map_err(|e| CogError::InvalidTiffFile(e, uri.to_string()))?
            .with_limits(Limits::default()))
    }

    fn describe(images: &[Image], layout: &PixelLayout, extent: [f64; 4]) -> AssetInfo {
        let finest = images.first().map_or(EARTH_CIRCUMFERENCE, Image::resolution);
        let coarsest = images.last().map_or(EARTH_CIRCUMFERENCE, Image::resolution);
        let (west, south) = webmercator_to_wgs84(extent[0], extent[1]);
        let (east, north) = webmercator_to_wgs84(extent[2], extent[3]);
        AssetInfo {
            bounds: [west, south, east, north],
            minzoom: native_zoom(coarsest),
            maxzoom: native_zoom(finest),
            band_names: (1..=layout.bands).map(|b| format!("b{b}")).collect(),
            dtype: "uint8".to_string(),
        }
    }

    /// Description of the asset.
    pub fn info(&self) -> &AssetInfo {
        &self.info
    }

    /// Bytes held in memory.
    pub fn size(&self) -> usize {
        let header = usize::try_from(self.header.fetched()).unwrap_or(usize::MAX);
        self.images
            .iter()
            .map(Image::table_size)
            .fold(header, usize::saturating_add)
    }

    /// Locate tile `xyz`, rendered at `tile_size` pixels. `None` if the asset misses the tile.
    pub fn plan(&self, xyz: TileCoord, tile_size: u32) -> Option<TilePlan> {
        let [min_x, min_y, max_x, max_y] = tile_bounds_mercator(xyz);
        if min_x >= self.extent[2]
            || max_x <= self.extent[0]
            || min_y >= self.extent[3]
            || max_y <= self.extent[1]
        {
            return None;
        }

        let index = self.pick_image((max_x - min_x) / f64::from(tile_size));
        let image = &self.images[index];
        let res = image.resolution();
        let half = EARTH_CIRCUMFERENCE / 2.0;
        let start = ((min_x + half) / res, (half - max_y) / res);
        let span = (max_x - min_x) / res;
        let window = image.clip(start, span)?;
        Some(TilePlan {
            image: index,
            start,
            span,
            window,
            ranges: image.chunk_ranges(window),
        })
    }

    /// Render a planned tile from the chunks fetched for it, given with their file offsets.
    pub fn render(
        &self,
        plan: &TilePlan,
        chunks: impl IntoIterator<Item = (u64, Bytes)>,
        tile_size: u32,
        resampling: Resampling,
    ) -> Result<RasterTile, CogError> {
        let image = &self.images[plan.image];
        let mut decoder = Self::decoder(&self.uri, &self.header.with_parts(chunks))?;
        let source = image.read_window(&mut decoder, &self.layout, plan.window, &self.uri)?;

        // where the tile starts, relative to the window
        let offset = (
            plan.start.0 - plan.window.x as f64,
            plan.start.1 - plan.window.y as f64,
        );
        if offset == (0.0, 0.0)
            && plan.span == f64::from(tile_size)
            && source.width == tile_size
            && source.height == tile_size
        {
            return Ok(source);
        }
        // a window narrower than a source pixel has nothing to interpolate
        Ok(if resampling == Resampling::Nearest || plan.span < 1.0 {
            sample_nearest(&source, offset, plan.span, tile_size)
        } else {
            resize(&source, offset, plan.span, tile_size, resampling)
        })
    }

    /// The coarsest image still at least as fine as `target`, else the finest one.
    fn pick_image(&self, target: f64) -> usize {
        self.images
            .iter()
            .rposition(|image| image.resolution() <= target * (1.0 + RESOLUTION_TOLERANCE))
            .unwrap_or(0)
    }
}

/// Zoom level whose tiles are at least as fine as `resolution`.
fn native_zoom(resolution: f64) -> u8 {
    let zoom = (EARTH_CIRCUMFERENCE / (f64::from(TILE_SIZE) * resolution)).log2();
    (zoom - RESOLUTION_TOLERANCE).ceil().clamp(0.0, f64::from(MAX_ZOOM)) as u8
}

/// Index of the source pixel at `position`, if inside of `len` pixels.
fn source_index(position: f64, len: u32) -> Option<usize> {
    let index = position.floor();
    (index >= 0.0 && index < f64::from(len)).then_some(index as usize)
}

/// Sample the source pixel under the center of every tile pixel. `offset` is the
/// top left corner of the tile relative to `source`, `span` its width, both in source pixels.
fn sample_nearest(source: &RasterTile, offset: (f64, f64), span: f64, size: u32) -> RasterTile {
    let bands = source.bands;
    let mut tile = RasterTile::empty(size, size, bands);
    let step = span / f64::from(size);
    let columns: Vec<Option<usize>> = (0..size)
        .map(|col| source_index(offset.0 + (f64::from(col) + 0.5) * step, source.width))
        .collect();
    for row in 0..size {
        let Some(src_y) = source_index(offset.1 + (f64::from(row) + 0.5) * step, source.height)
        else {
            continue;
        };
        for (col, src_x) in columns.iter().enumerate() {
            let Some(src_x) = *src_x else {
                continue;
            };
            let src = src_y * source.width as usize + src_x;
            let dst = row as usize * size as usize + col;
            tile.mask[dst] = source.mask[src];
            tile.data[dst * bands..(dst + 1) * bands].copy_from_slice(source.pixel(src));
        }
    }
    tile
}

/// Resize with an interpolating filter and paste the result at its place in the tile.
/// Bands ride in the color channels, the mask in alpha, which is thresholded back afterwards.
fn resize(
    source: &RasterTile,
    offset: (f64, f64),
    span: f64,
    size: u32,
    resampling: Resampling,
) -> RasterTile {
    let bands = source.bands;
    let window = RgbaImage::from_fn(source.width, source.height, |x, y| {
        let index = y as usize * source.width as usize + x as usize;
        let pixel = source.pixel(index);
        let band = |b: usize| pixel[b.min(bands - 1)];
        Rgba([band(0), band(1), band(2), source.mask[index]])
    });

    let scale = f64::from(size) / span;
    let width = ((f64::from(source.width) * scale).round() as u32).max(1);
    let height = ((f64::from(source.height) * scale).round() as u32).max(1);
    let resized = image::imageops::resize(&window, width, height, resampling.filter());
    let left = (-offset.0 * scale).round() as i64;
    let top = (-offset.1 * scale).round() as i64;

    let mut tile = RasterTile::empty(size, size, bands);
    let inside = 0..i64::from(size);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (col, row) = (left + i64::from(x), top + i64::from(y));
        if pixel[3] < 128 || !inside.contains(&col) || !inside.contains(&row) {
            continue;
        }
        let index = row as usize * size as usize + col as usize;
        tile.mask[index] = 255;
        tile.data[index * bands..(index + 1) * bands].copy_from_slice(&pixel.0[..bands]);
    }
    tile
}
