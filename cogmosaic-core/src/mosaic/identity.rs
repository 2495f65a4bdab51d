use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest as _, Sha224};

use crate::mosaic::CreationParams;

/// Number of hex characters in a mosaic identifier (a SHA-224 digest).
pub const MOSAIC_ID_LEN: usize = 56;

/// Content-addressed mosaic identifier: 56 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MosaicId(String);

impl MosaicId {
    /// Accept exactly 56 hex characters in any case. Anything else is not an identifier.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        (value.len() == MOSAIC_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| Self(value.to_ascii_lowercase()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MosaicId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MosaicId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| format!("'{value}' is not a {MOSAIC_ID_LEN} character hex mosaic id"))
    }
}

impl From<MosaicId> for String {
    fn from(value: MosaicId) -> Self {
        value.0
    }
}

/// Identifier of the mosaic built from `params`.
///
/// The parameters are hashed as compact JSON with sorted keys, so the result
/// only depends on their values. Reordering the asset list changes the identifier.
#[must_use]
pub fn compute_identity(params: &CreationParams) -> MosaicId {
    let canonical = json!({
        "body": params.assets,
        "maxzoom": params.maxzoom,
        "min_tile_cover": params.min_tile_cover,
        "minzoom": params.minzoom,
        "tile_cover_sort": params.tile_cover_sort,
        "version": params.builder_version,
    });
    let digest = Sha224::digest(canonical.to_string().as_bytes());
    MosaicId(format!("{digest:x}"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn params() -> CreationParams {
        CreationParams {
            assets: vec!["a.tif".to_string(), "b.tif".to_string()],
            minzoom: Some(10),
            maxzoom: Some(12),
            min_tile_cover: None,
            tile_cover_sort: false,
            builder_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn identity_is_stable() {
        let id = compute_identity(&params());
        assert_eq!(id, compute_identity(&params()));
        assert_eq!(id.as_str().len(), MOSAIC_ID_LEN);
        assert!(id.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn identity_hashes_canonical_json() {
        let canonical = r#"{"body":["a.tif","b.tif"],"maxzoom":12,"min_tile_cover":null,"minzoom":10,"tile_cover_sort":false,"version":"0.1.0"}"#;
        let expected = format!("{:x}", Sha224::digest(canonical.as_bytes()));
        assert_eq!(compute_identity(&params()).as_str(), expected);
    }

    #[rstest]
    #[case::minzoom(|p: &mut CreationParams| p.minzoom = Some(9))]
    #[case::maxzoom(|p: &mut CreationParams| p.maxzoom = None)]
    #[case::cover(|p: &mut CreationParams| p.min_tile_cover = Some(0.1))]
    #[case::sort(|p: &mut CreationParams| p.tile_cover_sort = true)]
    #[case::version(|p: &mut CreationParams| p.builder_version = "0.2.0".to_string())]
    #[case::order(|p: &mut CreationParams| p.assets.reverse())]
    #[case::assets(|p: &mut CreationParams| p.assets.push("c.tif".to_string()))]
    fn identity_is_sensitive(#[case] change: fn(&mut CreationParams)) {
        let mut changed = params();
        change(&mut changed);
        assert_ne!(compute_identity(&params()), compute_identity(&changed));
    }

    #[rstest]
    #[case("", None)]
    #[case("deadbeef", None)]
    #[case(&"g".repeat(56), None)]
    #[case(&"0".repeat(57), None)]
    #[case(
        "ABCDEF0123456789abcdef0123456789ABCDEF0123456789abcdef01",
        Some("abcdef0123456789abcdef0123456789abcdef0123456789abcdef01".to_string())
    )]
    fn parse_ids(#[case] value: &str, #[case] expected: Option<String>) {
        assert_eq!(MosaicId::parse(value).map(String::from), expected);
    }
}
