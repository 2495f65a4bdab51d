#![doc = "HTTP tile server for mosaics of Cloud Optimized GeoTIFFs, built on `cogmosaic-core`."]
#![forbid(unsafe_code)]

pub mod config;

mod error;
pub use error::{CogMosaicError, CogMosaicResult};

pub mod logging;

pub mod srv;
