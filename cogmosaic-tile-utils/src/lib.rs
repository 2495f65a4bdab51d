#![doc = include_str!("../README.md")]

mod decoders;
pub use decoders::{decode_gzip, encode_gzip};

mod format;
pub use format::TileFormat;

mod grid;
pub use grid::*;

mod quadkey;
pub use quadkey::{QuadkeyError, parent_at, quadkey_to_tile, tile_to_quadkey};
