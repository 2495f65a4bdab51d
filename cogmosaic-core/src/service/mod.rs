use std::sync::Arc;

use cogmosaic_tile_utils::TileCoord;
use futures::{StreamExt as _, stream};
use rand::Rng;
use rand::seq::IndexedRandom as _;
use tracing::{debug, info, warn};
use url::Url;

use crate::builder::MosaicBuilder;
use crate::mosaic::{
    CreationParams, MosaicDefinition, MosaicId, MosaicRef, StorageTemplate, compute_identity,
    resolve_assets,
};
use crate::reader::{RasterTile, TileReader};
use crate::render::{encode_tile, negotiate_format};
use crate::store::{Insert, Lookup, MosaicStore};
use crate::{MosaicError, MosaicResult};

mod metadata;
pub use metadata::{Footprint, MosaicInfo, TILEJSON_VERSION, tilejson_document};

mod request;
pub use request::{MAX_SCALE, TileRequest, TileUrlOptions};

mod response;
pub use response::{JSON_CONTENT_TYPE, Response, ResponseStatus, TEXT_CONTENT_TYPE};

/// Assets of one tile read at once unless configured otherwise.
pub const DEFAULT_READ_CONCURRENCY: usize = 16;

/// Creates mosaics and serves their metadata and composited tiles.
///
/// All collaborators are shared, the service itself holds no per-request state.
#[derive(Clone, Debug)]
pub struct MosaicService {
    store: Arc<dyn MosaicStore>,
    reader: Arc<dyn TileReader>,
    builder: Arc<dyn MosaicBuilder>,
    template: StorageTemplate,
    read_concurrency: usize,
}

impl MosaicService {
    /// Serve mosaics kept in `store` at the locations given by `template`.
    #[must_use]
    pub fn new(
        store: Arc<dyn MosaicStore>,
        reader: Arc<dyn TileReader>,
        builder: Arc<dyn MosaicBuilder>,
        template: StorageTemplate,
    ) -> Self {
        Self {
            store,
            reader,
            builder,
            template,
            read_concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    /// Read at most `concurrency` assets at once for a tile.
    #[must_use]
    pub fn with_read_concurrency(mut self, concurrency: usize) -> Self {
        self.read_concurrency = concurrency.max(1);
        self
    }

    /// Where mosaics addressed by identifier are stored.
    #[must_use]
    pub fn storage(&self) -> &StorageTemplate {
        &self.template
    }

    /// Create the mosaic described by `params` unless it already exists,
    /// and describe it as TileJSON.
    ///
    /// The mosaic is stored under its content identifier, so repeating a
    /// request reuses the stored definition instead of building it again.
    pub async fn create(
        &self,
        params: &CreationParams,
        urls: &TileUrlOptions,
    ) -> MosaicResult<Response> {
        let id = compute_identity(params);
        let location = self.template.location_for(&id);
        let definition = match self.store.read(&location).await {
            Ok(Lookup::Found(definition)) => {
                info!("Mosaic {id} already exists at {location}");
                definition
            }
            lookup => {
                if let Err(e) = lookup {
                    warn!("Unable to look up mosaic {id}, building it: {e}");
                }
                let definition = self.builder.build(params).await?;
                self.store.write(&location, &definition).await?;
                info!("Created mosaic {id} at {location}");
                definition
            }
        };
        let reference = MosaicRef::Id(id);
        let tiles = urls.template(&reference);
        Response::json(&tilejson_document(&definition, reference.name(), tiles))
    }

    /// Store a complete definition under `id`. Never replaces a stored definition.
    pub async fn add(
        &self,
        id: MosaicId,
        definition: &MosaicDefinition,
    ) -> MosaicResult<Response> {
        definition.validate()?;
        let location = self.template.location_for(&id);
        match self.store.write_new(&location, definition).await? {
            Insert::Created => {
                info!("Added mosaic {id} at {location}");
                Response::json(&serde_json::json!({"id": id, "status": "READY"}))
            }
            Insert::AlreadyExists => Err(MosaicError::AlreadyExists(id)),
        }
    }

    /// Read a stored mosaic. Any failure to read it is reported as not found.
    async fn load(&self, reference: &MosaicRef) -> MosaicResult<(Url, MosaicDefinition)> {
        let location = self.template.resolve_path(reference)?;
        match self.store.read(&location).await {
            Ok(Lookup::Found(definition)) => Ok((location, definition)),
            Ok(Lookup::NotFound) => Err(MosaicError::NotFound(reference.to_string())),
            Err(e) => {
                warn!("Unable to read mosaic {reference}: {e}");
                Err(MosaicError::NotFound(reference.to_string()))
            }
        }
    }

    /// Summary of a mosaic. The band layout is taken from the first asset of a
    /// quadkey picked with `rng`, if the store can enumerate quadkeys.
    pub async fn info<R: Rng + ?Sized>(
        &self,
        reference: &MosaicRef,
        rng: &mut R,
    ) -> MosaicResult<Response> {
        let (location, definition) = self.load(reference).await?;
        let mut summary = MosaicInfo::new(&definition, reference.name());
        if !self.store.lists_quadkeys(&location) {
            warn!("Quadkeys of {reference} cannot be listed, skipping asset sampling");
            return Response::json(&summary);
        }
        let keys: Vec<&String> = definition.tiles.keys().collect();
        let sample = keys
            .choose(rng)
            .and_then(|key| definition.tiles[*key].first().cloned());
        match sample {
            Some(asset) => match self.reader.asset_info(&asset).await {
                Ok(sample) => summary.add_sample(&definition, sample),
                Err(e) => warn!("Unable to sample {asset} of {reference}: {e}"),
            },
            None => warn!("Mosaic {reference} has no asset to sample"),
        }
        Response::json(&summary)
    }

    /// GeoJSON footprint of the quadkeys of a mosaic.
    pub async fn geojson(&self, reference: &MosaicRef) -> MosaicResult<Response> {
        let (_, definition) = self.load(reference).await?;
        Response::json(&Footprint::new(&definition))
    }

    /// TileJSON of a mosaic.
    pub async fn tilejson(
        &self,
        reference: &MosaicRef,
        urls: &TileUrlOptions,
    ) -> MosaicResult<Response> {
        let (_, definition) = self.load(reference).await?;
        let tiles = urls.template(reference);
        Response::json(&tilejson_document(&definition, reference.name(), tiles))
    }

    /// Composite the assets covering the requested tile.
    ///
    /// Assets that cannot be read are left out. A tile without assets or
    /// without any valid pixel is an `EMPTY` response.
    pub async fn tile(&self, request: &TileRequest) -> MosaicResult<Response> {
        let xyz = request.xyz;
        let (_, definition) = self.load(&request.mosaic).await?;
        let mut assets = resolve_assets(&definition, xyz);
        if assets.is_empty() {
            let TileCoord { z, x, y } = xyz;
            return Ok(Response::empty(format!(
                "No assets found for tile {z}-{x}-{y}"
            )));
        }
        let selection = request.pixel_selection.effective(&mut assets);

        let size = request.tile_size();
        let results: Vec<_> = stream::iter(&assets)
            .map(|asset| self.reader.read_tile(asset, xyz, size, request.resampling))
            .buffered(self.read_concurrency)
            .collect()
            .await;
        let tiles: Vec<RasterTile> = results
            .into_iter()
            .zip(&assets)
            .filter_map(|(result, asset)| {
                result
                    .inspect_err(|e| debug!("Leaving {asset} out of tile {xyz:#}: {e}"))
                    .ok()
            })
            .collect();
        debug!(
            "Compositing {} of {} assets for tile {xyz:#} with {selection}",
            tiles.len(),
            assets.len()
        );

        let Some(tile) = selection.composite(&tiles) else {
            return Ok(Response::empty("empty tiles"));
        };
        let format = negotiate_format(request.format, &tile)?;
        let body = encode_tile(&tile, format, xyz)?;
        Ok(Response::ok(format.content_type(), body))
    }
}
