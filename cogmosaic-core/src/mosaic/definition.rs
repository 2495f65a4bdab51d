use std::collections::BTreeMap;

use cogmosaic_tile_utils::{MAX_ZOOM, quadkey_to_tile};
use serde::{Deserialize, Serialize};

use crate::{MosaicError, MosaicResult};

/// Version of the `MosaicJSON` document layout written by the builder.
pub const MOSAICJSON_VERSION: &str = "0.0.2";

/// Version of the builder, part of every content-addressed mosaic identifier.
pub const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parameters of a `/create` request. Together they determine the mosaic identifier.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreationParams {
    /// Asset URIs, most preferred first.
    pub assets: Vec<String>,
    /// Lowest zoom of the index, defaults to the lowest native zoom of the assets.
    pub minzoom: Option<u8>,
    /// Highest zoom of the index, defaults to the highest native zoom of the assets.
    pub maxzoom: Option<u8>,
    /// Minimum fraction of a quadkey tile an asset has to cover to be listed for it.
    pub min_tile_cover: Option<f64>,
    /// List the assets of each quadkey by decreasing coverage instead of input order.
    #[serde(default)]
    pub tile_cover_sort: bool,
    /// Version of the builder that produced the definition.
    pub builder_version: String,
}

impl CreationParams {
    /// Parameters with builder defaults for the given assets.
    #[must_use]
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            minzoom: None,
            maxzoom: None,
            min_tile_cover: None,
            tile_cover_sort: false,
            builder_version: BUILDER_VERSION.to_string(),
        }
    }
}

/// The stored description of a mosaic, laid out as a `MosaicJSON` document.
///
/// `tiles` maps quadkeys at [`MosaicDefinition::quadkey_zoom`] to the assets covering them.
/// Asset order is significant: the first asset is the preferred one.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MosaicDefinition {
    /// Version of the document layout.
    #[serde(default = "default_mosaicjson")]
    pub mosaicjson: String,
    /// Human readable name.
    pub name: Option<String>,
    /// Human readable description.
    pub description: Option<String>,
    /// Version of this mosaic.
    #[serde(default = "default_version")]
    pub version: String,
    /// Attribution of the underlying data.
    pub attribution: Option<String>,
    /// Lowest zoom the index is valid for.
    pub minzoom: u8,
    /// Highest zoom the index is valid for.
    pub maxzoom: u8,
    /// Zoom of the quadkeys in `tiles`, `minzoom` if absent.
    pub quadkey_zoom: Option<u8>,
    /// `[west, south, east, north]` in degrees.
    #[serde(default = "default_bounds")]
    pub bounds: [f64; 4],
    /// `[longitude, latitude, zoom]`, derived from the bounds if absent.
    pub center: Option<[f64; 3]>,
    /// Quadkey index of assets.
    pub tiles: BTreeMap<String, Vec<String>>,
    /// Parameters the mosaic was built with, if it was built by this service.
    pub creation_params: Option<CreationParams>,
}

fn default_mosaicjson() -> String {
    MOSAICJSON_VERSION.to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_bounds() -> [f64; 4] {
    [-180.0, -90.0, 180.0, 90.0]
}

impl MosaicDefinition {
    /// Zoom level of the quadkeys in the index.
    #[must_use]
    pub fn quadkey_zoom(&self) -> u8 {
        self.quadkey_zoom.unwrap_or(self.minzoom)
    }

    /// The stored center, or the middle of the bounds at `minzoom`.
    #[must_use]
    pub fn center(&self) -> [f64; 3] {
        self.center.unwrap_or_else(|| {
            let [west, south, east, north] = self.bounds;
            [
                (west + east) / 2.0,
                (south + north) / 2.0,
                f64::from(self.minzoom),
            ]
        })
    }

    /// Check a definition submitted by a client before it is stored.
    pub fn validate(&self) -> MosaicResult<()> {
        let invalid = |msg: String| Err(MosaicError::InvalidDefinition(msg));
        if self.minzoom > self.maxzoom {
            return invalid(format!(
                "minzoom {} is greater than maxzoom {}",
                self.minzoom, self.maxzoom
            ));
        }
        if self.maxzoom > MAX_ZOOM {
            return invalid(format!("maxzoom {} is above {MAX_ZOOM}", self.maxzoom));
        }
        let [west, south, east, north] = self.bounds;
        if !(west <= east && south <= north) {
            return invalid(format!("bounds {:?} are not ordered", self.bounds));
        }
        let zoom = self.quadkey_zoom();
        for key in self.tiles.keys() {
            match quadkey_to_tile(key) {
                Ok(xyz) if xyz.z == zoom => {}
                Ok(_) => return invalid(format!("quadkey {key} is not at zoom {zoom}")),
                Err(e) => return invalid(e.to_string()),
            }
        }
        Ok(())
    }
}
