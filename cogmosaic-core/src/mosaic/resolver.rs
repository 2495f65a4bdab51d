use std::cmp::Ordering;

use cogmosaic_tile_utils::{TileCoord, parent_at, tile_to_quadkey};
use itertools::Itertools as _;

use crate::mosaic::MosaicDefinition;

/// Assets of `definition` covering the tile `xyz`, most preferred first.
///
/// Tiles above the quadkey zoom of the index use the key of their ancestor.
/// Tiles below it collect the assets of all their descendant keys in key order,
/// keeping the first occurrence of each asset. A tile the index does not cover
/// has no assets.
#[must_use]
pub fn resolve_assets(definition: &MosaicDefinition, xyz: TileCoord) -> Vec<String> {
    let zoom = definition.quadkey_zoom();
    match xyz.z.cmp(&zoom) {
        Ordering::Equal => lookup(definition, &tile_to_quadkey(xyz)),
        Ordering::Greater => parent_at(xyz, zoom)
            .map(|parent| lookup(definition, &tile_to_quadkey(parent)))
            .unwrap_or_default(),
        Ordering::Less => {
            let prefix = tile_to_quadkey(xyz);
            definition
                .tiles
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .filter(|(key, _)| key.len() == usize::from(zoom))
                .flat_map(|(_, assets)| assets)
                .unique()
                .cloned()
                .collect()
        }
    }
}

fn lookup(definition: &MosaicDefinition, quadkey: &str) -> Vec<String> {
    definition.tiles.get(quadkey).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn definition() -> MosaicDefinition {
        let tiles = BTreeMap::from([
            ("0230".to_string(), vec!["a.tif".to_string(), "b.tif".to_string()]),
            ("0231".to_string(), vec!["b.tif".to_string(), "c.tif".to_string()]),
            ("0233".to_string(), vec!["d.tif".to_string()]),
            ("1000".to_string(), vec!["e.tif".to_string()]),
        ]);
        MosaicDefinition {
            mosaicjson: "0.0.2".to_string(),
            name: None,
            description: None,
            version: "1.0.0".to_string(),
            attribution: None,
            minzoom: 4,
            maxzoom: 8,
            quadkey_zoom: None,
            bounds: [-180.0, -85.0, 180.0, 85.0],
            center: None,
            tiles,
            creation_params: None,
        }
    }

    fn tile(quadkey: &str) -> TileCoord {
        cogmosaic_tile_utils::quadkey_to_tile(quadkey).unwrap()
    }

    #[test]
    fn same_zoom_uses_own_key() {
        assert_eq!(resolve_assets(&definition(), tile("0231")), ["b.tif", "c.tif"]);
        assert!(resolve_assets(&definition(), tile("0232")).is_empty());
    }

    #[test]
    fn higher_zoom_uses_ancestor() {
        assert_eq!(resolve_assets(&definition(), tile("023012")), ["a.tif", "b.tif"]);
        assert_eq!(resolve_assets(&definition(), tile("10003")), ["e.tif"]);
        assert!(resolve_assets(&definition(), tile("3000000")).is_empty());
    }

    #[test]
    fn lower_zoom_merges_descendants() {
        assert_eq!(
            resolve_assets(&definition(), tile("023")),
            ["a.tif", "b.tif", "c.tif", "d.tif"]
        );
        assert_eq!(
            resolve_assets(&definition(), tile("")),
            ["a.tif", "b.tif", "c.tif", "d.tif", "e.tif"]
        );
        assert!(resolve_assets(&definition(), tile("2")).is_empty());
    }
}
