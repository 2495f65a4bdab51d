use std::io;

use cogmosaic_core::MosaicError;

use crate::config::file::ConfigFileError;

/// A convenience [`Result`] for the cogmosaic server.
pub type CogMosaicResult<T> = Result<T, CogMosaicError>;

#[derive(thiserror::Error, Debug)]
pub enum CogMosaicError {
    #[error("Unable to bind to {1}: {0}")]
    BindingError(#[source] io::Error, String),

    #[error("Base path must be a valid URL path, and must begin with a '/' symbol, but is '{0}'")]
    BasePathError(String),

    #[error(
        "No mosaic storage configured. Set `storage.url` in the config file, pass --store-url, or set MOSAIC_STORE_URL or MOSAIC_DEF_BUCKET."
    )]
    NoStorage,

    #[error("Unable to open mosaic storage {1}: {0}")]
    StorageError(#[source] object_store::Error, String),

    #[error(transparent)]
    ConfigFileError(#[from] ConfigFileError),

    #[error(transparent)]
    MosaicError(#[from] MosaicError),

    #[error(transparent)]
    IoError(#[from] io::Error),
}
