use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cogmosaic_tile_utils::TileCoord;
use moka::future::Cache;
use object_store::path::Path;
use object_store::{GetOptions, ObjectStore};
use tracing::{debug, info};

use crate::reader::cog::CogError;
use crate::reader::cog::asset::CogAsset;
use crate::reader::cog::ranges::{SparseBytes, is_not_fetched};
use crate::reader::{AssetInfo, RasterTile, ReaderError, ReaderResult, Resampling, TileReader};
use crate::{ObjectLocator, parse_location};

/// Bytes fetched from the start of an asset to find its image file directories.
/// Grown fourfold until the directories fit.
const HEADER_FETCH_BYTES: u64 = 64 * 1024;

/// An asset whose structure is known, with the store holding its pixels.
#[derive(Debug)]
struct OpenAsset {
    store: Arc<dyn ObjectStore>,
    path: Path,
    cog: CogAsset,
}

/// Reads tiles from COG assets in any object store the locator can reach.
///
/// Only the structure of each asset is cached, weighted by its size in bytes.
/// Tiles fetch the byte ranges of the chunks they cover.
#[derive(Clone)]
pub struct CogReader {
    locator: ObjectLocator,
    cache: Cache<String, Arc<OpenAsset>>,
}

impl Debug for CogReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CogReader")
            .field("locator", &self.locator)
            .field("cached_assets", &self.cache.entry_count())
            .finish()
    }
}

impl CogReader {
    /// Create a reader keeping up to `cache_size_bytes` of asset headers,
    /// each for at most `expiry` if given.
    #[must_use]
    pub fn new(locator: ObjectLocator, cache_size_bytes: u64, expiry: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .name("cog_header_cache")
            .weigher(|key: &String, value: &Arc<OpenAsset>| -> u32 {
                (key.len() + value.cog.size()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(cache_size_bytes);
        if let Some(expiry) = expiry {
            builder = builder.time_to_live(expiry);
        }
        info!("Caching up to {cache_size_bytes} bytes of COG headers");
        Self {
            locator,
            cache: builder.build(),
        }
    }

    async fn asset(&self, uri: &str) -> Result<Arc<OpenAsset>, Arc<CogError>> {
        self.cache
            .try_get_with(uri.to_string(), self.open(uri))
            .await
    }

    async fn open(&self, uri: &str) -> Result<Arc<OpenAsset>, CogError> {
        let url = parse_location(uri)?;
        let err = |e| CogError::Fetch(e, uri.to_string());
        let (store, path) = self.locator.resolve(&url).map_err(err)?;
        let mut fetch = HEADER_FETCH_BYTES;
        loop {
            let options = GetOptions::default().with_range(Some(0..fetch));
            let result = store.get_opts(&path, options).await.map_err(err)?;
            let size = result.meta.size;
            let mut header = SparseBytes::new(size);
            header.insert(0, result.bytes().await.map_err(err)?);
            match CogAsset::parse(uri, header) {
                Ok(cog) => {
                    let read = fetch.min(size);
                    debug!("Read the structure of {uri} from its first {read} bytes");
                    return Ok(Arc::new(OpenAsset { store, path, cog }));
                }
                Err(e) if fetch < size && is_not_fetched(&e) => {
                    fetch = fetch.saturating_mul(4);
                    debug!("Header of {uri} is larger, fetching {fetch} bytes");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl TileReader for CogReader {
    async fn read_tile(
        &self,
        asset: &str,
        xyz: TileCoord,
        tile_size: u32,
        resampling: Resampling,
    ) -> ReaderResult<RasterTile> {
        let open = self.asset(asset).await?;
        let Some(plan) = open.cog.plan(xyz, tile_size) else {
            return Err(ReaderError::OutsideBounds(asset.to_string(), xyz));
        };
        let ranges = plan.ranges();
        let chunks = if ranges.is_empty() {
            Vec::new()
        } else {
            open.store
                .get_ranges(&open.path, ranges)
                .await
                .map_err(|e| CogError::Fetch(e, asset.to_string()))?
        };
        debug!("Fetched {} chunks of {asset} for tile {xyz:#}", chunks.len());
        let fetched = ranges.iter().map(|range| range.start).zip(chunks);
        Ok(open.cog.render(&plan, fetched, tile_size, resampling)?)
    }

    async fn asset_info(&self, asset: &str) -> ReaderResult<AssetInfo> {
        Ok(self.asset(asset).await?.cog.info().clone())
    }
}
