//! Reading web mercator tiles from `Cloud Optimized GeoTIFF` assets.

mod asset;
mod errors;
mod image;
mod model;
mod ranges;
mod reader;

pub use errors::CogError;
pub use reader::CogReader;
