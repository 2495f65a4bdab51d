//! Quadkeys encode a tile address as one base-4 digit per zoom level,
//! most significant level first. The empty string addresses the world tile.

use crate::{MAX_ZOOM, TileCoord};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum QuadkeyError {
    #[error("Quadkey {0} is longer than the maximum zoom level 30")]
    TooLong(String),

    #[error("Quadkey {0} contains {1:?}, only digits 0 to 3 are allowed")]
    InvalidDigit(String, char),
}

#[must_use]
pub fn tile_to_quadkey(xyz: TileCoord) -> String {
    (1..=xyz.z)
        .rev()
        .map(|level| {
            let mask = 1_u32 << (level - 1);
            let mut digit = b'0';
            if xyz.x & mask != 0 {
                digit += 1;
            }
            if xyz.y & mask != 0 {
                digit += 2;
            }
            char::from(digit)
        })
        .collect()
}

pub fn quadkey_to_tile(quadkey: &str) -> Result<TileCoord, QuadkeyError> {
    let z = u8::try_from(quadkey.len())
        .ok()
        .filter(|z| *z <= MAX_ZOOM)
        .ok_or_else(|| QuadkeyError::TooLong(quadkey.to_string()))?;
    let mut xyz = TileCoord { z, x: 0, y: 0 };
    for c in quadkey.chars() {
        let digit = c
            .to_digit(4)
            .ok_or_else(|| QuadkeyError::InvalidDigit(quadkey.to_string(), c))?;
        xyz.x = (xyz.x << 1) | (digit & 1);
        xyz.y = (xyz.y << 1) | (digit >> 1);
    }
    Ok(xyz)
}

/// The ancestor of `xyz` at a lower (or equal) zoom level.
#[must_use]
pub fn parent_at(xyz: TileCoord, zoom: u8) -> Option<TileCoord> {
    let shift = xyz.z.checked_sub(zoom)?;
    Some(TileCoord {
        z: zoom,
        x: xyz.x >> shift,
        y: xyz.y >> shift,
    })
}
