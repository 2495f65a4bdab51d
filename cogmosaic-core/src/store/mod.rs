use std::fmt::Debug;

use async_trait::async_trait;
use url::Url;

use crate::mosaic::MosaicDefinition;

mod object;
pub use object::ObjectMosaicStore;

/// Outcome of reading a location that may legitimately be empty.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    /// The location holds a document.
    Found(T),
    /// Nothing is stored at the location.
    NotFound,
}

/// Outcome of a create-if-absent write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    /// The document was written.
    Created,
    /// Another document already occupies the location, nothing was written.
    AlreadyExists,
}

/// Errors of a [`MosaicStore`].
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The object store failed to read or write.
    #[error("Unable to access mosaic at {1}: {0}")]
    ObjectStore(#[source] object_store::Error, Url),

    /// The stored bytes are not a mosaic definition.
    #[error("Unable to parse mosaic definition at {1}: {0}")]
    Parse(#[source] serde_json::Error, Url),

    /// The definition could not be turned into JSON.
    #[error("Unable to serialize mosaic definition for {1}: {0}")]
    Serialize(#[source] serde_json::Error, Url),

    /// Gzip compression or decompression failed.
    #[error("Unable to (de)compress mosaic definition at {1}: {0}")]
    Compression(#[source] std::io::Error, Url),
}

/// A convenience [`Result`] for mosaic stores.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence of mosaic definitions by location.
#[async_trait]
pub trait MosaicStore: Send + Sync + Debug {
    /// Read the definition stored at `location`.
    async fn read(&self, location: &Url) -> StoreResult<Lookup<MosaicDefinition>>;

    /// Write `definition` to `location`, replacing any previous document.
    async fn write(&self, location: &Url, definition: &MosaicDefinition) -> StoreResult<()>;

    /// Write `definition` to `location` unless a document is already there.
    ///
    /// The check and the write are one atomic operation of the store.
    async fn write_new(&self, location: &Url, definition: &MosaicDefinition)
    -> StoreResult<Insert>;

    /// Whether the quadkeys of a mosaic at `location` can be enumerated cheaply.
    /// Key-value backends keeping one record per quadkey cannot do so.
    fn lists_quadkeys(&self, _location: &Url) -> bool {
        true
    }
}
