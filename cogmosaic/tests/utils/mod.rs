#![allow(clippy::missing_panics_doc)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cogmosaic::config::file::srv::SrvConfig;
use cogmosaic_core::ObjectLocator;
use cogmosaic_core::builder::DefaultMosaicBuilder;
use cogmosaic_core::mosaic::StorageTemplate;
use cogmosaic_core::reader::{
    AssetInfo, RasterTile, ReaderError, ReaderResult, Resampling, TileReader,
};
use cogmosaic_core::service::MosaicService;
use cogmosaic_core::store::ObjectMosaicStore;
use cogmosaic_tile_utils::{TileCoord, tile_bounds_lnglat};
use object_store::memory::InMemory;
use url::Url;

pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

/// Solid color assets. A tile is readable if it overlaps the asset bounds.
#[derive(Debug)]
pub struct SolidReader(HashMap<&'static str, (AssetInfo, [u8; 3])>);

impl Default for SolidReader {
    fn default() -> Self {
        Self(HashMap::from([
            ("red.tif", (info([-180.0, -85.0, 0.0, 85.0], 2, 6), RED)),
            ("blue.tif", (info([-90.0, -60.0, 90.0, 60.0], 3, 7), BLUE)),
        ]))
    }
}

fn info(bounds: [f64; 4], minzoom: u8, maxzoom: u8) -> AssetInfo {
    AssetInfo {
        bounds,
        minzoom,
        maxzoom,
        band_names: vec!["b1".to_string(), "b2".to_string(), "b3".to_string()],
        dtype: "uint8".to_string(),
    }
}

#[async_trait]
impl TileReader for SolidReader {
    async fn read_tile(
        &self,
        asset: &str,
        xyz: TileCoord,
        tile_size: u32,
        _resampling: Resampling,
    ) -> ReaderResult<RasterTile> {
        let outside = || ReaderError::OutsideBounds(asset.to_string(), xyz);
        let (info, color) = self.0.get(asset).ok_or_else(outside)?;
        let [west, south, east, north] = tile_bounds_lnglat(xyz);
        let [min_x, min_y, max_x, max_y] = info.bounds;
        if west >= max_x || east <= min_x || south >= max_y || north <= min_y {
            return Err(outside());
        }
        let mut tile = RasterTile::empty(tile_size, tile_size, 3);
        for pixel in tile.data.chunks_exact_mut(3) {
            pixel.copy_from_slice(color);
        }
        tile.mask.fill(255);
        Ok(tile)
    }

    async fn asset_info(&self, asset: &str) -> ReaderResult<AssetInfo> {
        let world = TileCoord { z: 0, x: 0, y: 0 };
        self.0
            .get(asset)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| ReaderError::OutsideBounds(asset.to_string(), world))
    }
}

/// A service storing mosaics in memory under `memory:///mosaics/`.
#[must_use]
pub fn mock_service() -> MosaicService {
    let base = Url::parse("memory:///").unwrap();
    let locator = ObjectLocator::with_store(base, Arc::new(InMemory::new()));
    let reader = Arc::new(SolidReader::default());
    let builder = Arc::new(DefaultMosaicBuilder::new(reader.clone(), 2));
    let template = StorageTemplate::new("memory:///", Some("mosaics")).unwrap();
    MosaicService::new(
        Arc::new(ObjectMosaicStore::new(locator)),
        reader,
        builder,
        template,
    )
}

#[must_use]
pub fn srv_config() -> SrvConfig {
    SrvConfig {
        cache_control: Some("public, max-age=3600".to_string()),
        ..SrvConfig::default()
    }
}

/// The body of a `.npy` tile without its header.
#[must_use]
pub fn npy_data(body: &[u8]) -> &[u8] {
    assert!(body.starts_with(b"\x93NUMPY"));
    let header_len = usize::from(u16::from_le_bytes([body[8], body[9]]));
    &body[10 + header_len..]
}
