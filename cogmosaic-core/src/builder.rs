//! Building mosaic definitions from a list of assets.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use cogmosaic_tile_utils::{
    MAX_ZOOM, TileCoord, tile_bounds_mercator, tile_to_quadkey, tiles_covering,
    wgs84_to_webmercator,
};
use futures::{StreamExt as _, TryStreamExt as _, stream};
use tracing::{debug, info};

use crate::mosaic::{CreationParams, MOSAICJSON_VERSION, MosaicDefinition};
use crate::reader::{AssetInfo, TileReader};
use crate::{MosaicError, MosaicResult};

/// Turns creation parameters into a mosaic definition.
#[async_trait]
pub trait MosaicBuilder: Send + Sync + Debug {
    /// Build the definition. Fails if no usable index can be produced.
    async fn build(&self, params: &CreationParams) -> MosaicResult<MosaicDefinition>;
}

/// Indexes every asset under the quadkeys its footprint touches at `minzoom`.
#[derive(Clone, Debug)]
pub struct DefaultMosaicBuilder {
    reader: Arc<dyn TileReader>,
    concurrency: usize,
}

impl DefaultMosaicBuilder {
    /// Describe assets with `reader`, at most `concurrency` at a time.
    #[must_use]
    pub fn new(reader: Arc<dyn TileReader>, concurrency: usize) -> Self {
        Self {
            reader,
            concurrency: concurrency.max(1),
        }
    }

    async fn describe(&self, assets: &[String]) -> MosaicResult<Vec<AssetInfo>> {
        let reader = self.reader.clone();
        stream::iter(assets.to_vec())
            .map(move |asset| {
                let reader = reader.clone();
                async move {
                    reader
                        .asset_info(&asset)
                        .await
                        .map_err(|e| MosaicError::Build(format!("Unable to read {asset}: {e}")))
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

#[async_trait]
impl MosaicBuilder for DefaultMosaicBuilder {
    async fn build(&self, params: &CreationParams) -> MosaicResult<MosaicDefinition> {
        if params.assets.is_empty() {
            return Err(MosaicError::Build("no assets given".to_string()));
        }
        let infos = self.describe(&params.assets).await?;

        let minzoom = params
            .minzoom
            .or_else(|| infos.iter().map(|i| i.minzoom).min())
            .unwrap_or_default();
        let maxzoom = params
            .maxzoom
            .or_else(|| infos.iter().map(|i| i.maxzoom).max())
            .unwrap_or(MAX_ZOOM);
        if minzoom > maxzoom || maxzoom > MAX_ZOOM {
            return Err(MosaicError::Build(format!(
                "invalid zoom range {minzoom}..={maxzoom}"
            )));
        }

        let mut index: BTreeMap<String, Vec<(f64, String)>> = BTreeMap::new();
        for (asset, info) in params.assets.iter().zip(&infos) {
            for xyz in tiles_covering(info.bounds, minzoom) {
                let cover = coverage(info.bounds, xyz);
                if cover <= 0.0 || params.min_tile_cover.is_some_and(|min| cover < min) {
                    continue;
                }
                index
                    .entry(tile_to_quadkey(xyz))
                    .or_default()
                    .push((cover, asset.clone()));
            }
        }
        if index.is_empty() {
            return Err(MosaicError::Build(format!(
                "no asset covers any tile at zoom {minzoom}"
            )));
        }

        let tiles = index
            .into_iter()
            .map(|(quadkey, mut assets)| {
                if params.tile_cover_sort {
                    // stable: equal coverage keeps the input order
                    assets.sort_by(|a, b| b.0.total_cmp(&a.0));
                }
                (quadkey, assets.into_iter().map(|(_, asset)| asset).collect())
            })
            .collect::<BTreeMap<_, Vec<_>>>();

        let bounds = infos.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |acc, info| {
                [
                    acc[0].min(info.bounds[0]),
                    acc[1].min(info.bounds[1]),
                    acc[2].max(info.bounds[2]),
                    acc[3].max(info.bounds[3]),
                ]
            },
        );
        info!(
            "Built mosaic of {} assets with {} quadkeys at zoom {minzoom}",
            params.assets.len(),
            tiles.len()
        );
        debug!("Mosaic zoom range {minzoom}..={maxzoom}, bounds {bounds:?}");

        Ok(MosaicDefinition {
            mosaicjson: MOSAICJSON_VERSION.to_string(),
            name: None,
            description: None,
            version: "1.0.0".to_string(),
            attribution: None,
            minzoom,
            maxzoom,
            quadkey_zoom: Some(minzoom),
            center: Some([
                (bounds[0] + bounds[2]) / 2.0,
                (bounds[1] + bounds[3]) / 2.0,
                f64::from(minzoom),
            ]),
            bounds,
            tiles,
            creation_params: Some(params.clone()),
        })
    }
}

/// Fraction of the tile area covered by `bounds`, measured in web mercator.
fn coverage(bounds: [f64; 4], xyz: TileCoord) -> f64 {
    let (min_x, min_y) = wgs84_to_webmercator(bounds[0], bounds[1]);
    let (max_x, max_y) = wgs84_to_webmercator(bounds[2], bounds[3]);
    let [tile_min_x, tile_min_y, tile_max_x, tile_max_y] = tile_bounds_mercator(xyz);
    let width = max_x.min(tile_max_x) - min_x.max(tile_min_x);
    let height = max_y.min(tile_max_y) - min_y.max(tile_min_y);
    if width <= 0.0 || height <= 0.0 {
        return 0.0;
    }
    width * height / ((tile_max_x - tile_min_x) * (tile_max_y - tile_min_y))
}
