mod definition;
pub use definition::{BUILDER_VERSION, CreationParams, MOSAICJSON_VERSION, MosaicDefinition};

mod identity;
pub use identity::{MOSAIC_ID_LEN, MosaicId, compute_identity};

mod location;
pub use location::{MosaicRef, StorageTemplate};

mod resolver;
pub use resolver::resolve_assets;

mod template;
pub use template::tile_url_template;
