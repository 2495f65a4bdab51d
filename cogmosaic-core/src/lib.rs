#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Turning a list of assets into a mosaic definition.
pub mod builder;

mod error;
pub use error::{MosaicError, MosaicResult};

/// Mosaic definitions, their identity, location and quadkey index.
pub mod mosaic;

mod objects;
pub use objects::{InvalidLocation, ObjectLocator, parse_location};

/// Pixel selection methods used to composite overlapping assets.
pub mod pixsel;

/// Reading tiles out of individual raster assets.
pub mod reader;

/// Negotiating output formats and encoding composited tiles.
pub mod render;

/// The request-level operations of a mosaic tile service.
pub mod service;

/// Persistence of mosaic definitions.
pub mod store;
