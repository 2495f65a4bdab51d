use cogmosaic_tile_utils::{TileCoord, quadkey_to_tile, tile_bounds_lnglat};
use serde::Serialize;
use tilejson::{Bounds, Center, TileJSON, tilejson};
use tracing::warn;

use crate::mosaic::MosaicDefinition;
use crate::reader::AssetInfo;

/// TileJSON version advertised for mosaics.
pub const TILEJSON_VERSION: &str = "2.1.0";

/// Summary of a mosaic, optionally with what was learned from one sampled asset.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MosaicInfo {
    /// `[west, south, east, north]` in degrees.
    pub bounds: [f64; 4],
    /// `[longitude, latitude, zoom]`.
    pub center: [f64; 3],
    /// Highest zoom of the index.
    pub maxzoom: u8,
    /// Lowest zoom of the index.
    pub minzoom: u8,
    /// Identifier or URL of the mosaic.
    pub name: String,
    /// Every quadkey of the index.
    pub quadkeys: Option<Vec<String>>,
    /// Band names of the sampled asset.
    pub layers: Option<Vec<String>>,
    /// Data type of the sampled asset.
    pub dtype: Option<String>,
}

impl MosaicInfo {
    /// Summary of `definition` published under `name`.
    #[must_use]
    pub fn new(definition: &MosaicDefinition, name: &str) -> Self {
        Self {
            bounds: definition.bounds,
            center: definition.center(),
            maxzoom: definition.maxzoom,
            minzoom: definition.minzoom,
            name: name.to_string(),
            quadkeys: None,
            layers: None,
            dtype: None,
        }
    }

    /// Add the quadkeys of `definition` and the band layout of a sampled asset.
    pub fn add_sample(&mut self, definition: &MosaicDefinition, sample: AssetInfo) {
        self.quadkeys = Some(definition.tiles.keys().cloned().collect());
        self.layers = Some(sample.band_names);
        self.dtype = Some(sample.dtype);
    }
}

/// TileJSON of a mosaic served at `tiles`.
#[must_use]
pub fn tilejson_document(definition: &MosaicDefinition, name: &str, tiles: String) -> TileJSON {
    let [west, south, east, north] = definition.bounds;
    let [longitude, latitude, zoom] = definition.center();
    let mut tilejson = tilejson! {
        tiles: vec![tiles],
        bounds: Bounds::new(west, south, east, north),
        center: Center {
            longitude,
            latitude,
            zoom: zoom as u8,
        },
        minzoom: definition.minzoom,
        maxzoom: definition.maxzoom,
    };
    tilejson.name = Some(name.to_string());
    tilejson.tilejson = TILEJSON_VERSION.to_string();
    tilejson
}

/// GeoJSON `FeatureCollection` of the quadkey tiles of a mosaic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Footprint {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<TileFeature>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct TileFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    bbox: [f64; 4],
    id: String,
    geometry: Polygon,
    properties: TileProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Polygon {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [[[f64; 2]; 5]; 1],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct TileProperties {
    title: String,
    files: Vec<String>,
}

impl Footprint {
    /// One polygon per quadkey, in key order. Keys that are not quadkeys are skipped.
    #[must_use]
    pub fn new(definition: &MosaicDefinition) -> Self {
        let features = definition
            .tiles
            .iter()
            .filter_map(|(quadkey, files)| match quadkey_to_tile(quadkey) {
                Ok(xyz) => Some(TileFeature::new(xyz, files.clone())),
                Err(e) => {
                    warn!("Skipping quadkey {quadkey} of the footprint: {e}");
                    None
                }
            })
            .collect();
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

impl TileFeature {
    fn new(xyz: TileCoord, files: Vec<String>) -> Self {
        let bbox = tile_bounds_lnglat(xyz);
        let [west, south, east, north] = bbox;
        let TileCoord { z, x, y } = xyz;
        Self {
            kind: "Feature",
            bbox,
            id: format!("Tile(x={x}, y={y}, z={z})"),
            geometry: Polygon {
                kind: "Polygon",
                coordinates: [[
                    [west, south],
                    [west, north],
                    [east, north],
                    [east, south],
                    [west, south],
                ]],
            },
            properties: TileProperties {
                title: format!("XYZ tile ({x}, {y}, {z})"),
                files,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;

    use super::*;

    fn definition() -> MosaicDefinition {
        MosaicDefinition {
            mosaicjson: "0.0.2".to_string(),
            name: None,
            description: None,
            version: "1.0.0".to_string(),
            attribution: None,
            minzoom: 1,
            maxzoom: 6,
            quadkey_zoom: None,
            bounds: [-180.0, 0.0, 0.0, 80.0],
            center: None,
            tiles: BTreeMap::from([
                ("0".to_string(), vec!["a.tif".to_string(), "b.tif".to_string()]),
                ("bad".to_string(), vec!["c.tif".to_string()]),
            ]),
            creation_params: None,
        }
    }

    #[test]
    fn footprint() {
        let footprint = serde_json::to_value(Footprint::new(&definition())).unwrap();
        let [w, s, e, n] = tile_bounds_lnglat(TileCoord { z: 1, x: 0, y: 0 });
        assert_eq!(
            footprint,
            serde_json::json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "bbox": [w, s, e, n],
                    "id": "Tile(x=0, y=0, z=1)",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[w, s], [w, n], [e, n], [e, s], [w, s]]],
                    },
                    "properties": {
                        "title": "XYZ tile (0, 0, 1)",
                        "files": ["a.tif", "b.tif"],
                    },
                }],
            })
        );
        assert_relative_eq!(n, 85.051_128_779_806_59, epsilon = 1e-9);
    }

    #[test]
    fn info_with_sample() {
        let definition = definition();
        let mut info = MosaicInfo::new(&definition, "abc");
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "bounds": [-180.0, 0.0, 0.0, 80.0],
                "center": [-90.0, 40.0, 1.0],
                "maxzoom": 6,
                "minzoom": 1,
                "name": "abc",
            })
        );
        info.add_sample(
            &definition,
            AssetInfo {
                bounds: [0.0; 4],
                minzoom: 0,
                maxzoom: 0,
                band_names: vec!["b1".to_string(), "b2".to_string()],
                dtype: "uint8".to_string(),
            },
        );
        assert_eq!(info.quadkeys.unwrap(), ["0", "bad"]);
        assert_eq!(info.layers.unwrap(), ["b1", "b2"]);
        assert_eq!(info.dtype.as_deref(), Some("uint8"));
    }

    #[test]
    fn tilejson_fields() {
        let tiles = "http://h/{z}/{x}/{y}@1x".to_string();
        let tilejson = tilejson_document(&definition(), "abc", tiles);
        let value = serde_json::to_value(&tilejson).unwrap();
        assert_eq!(value["tilejson"], "2.1.0");
        assert_eq!(value["name"], "abc");
        assert_eq!(value["tiles"], serde_json::json!(["http://h/{z}/{x}/{y}@1x"]));
        assert_eq!(value["minzoom"], 1);
        assert_eq!(value["maxzoom"], 6);
        assert_eq!(value["bounds"], serde_json::json!([-180.0, 0.0, 0.0, 80.0]));
        assert_eq!(value["center"], serde_json::json!([-90.0, 40.0, 1]));
    }
}
