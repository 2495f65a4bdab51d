mod main;
pub use main::*;

pub mod cors;
pub mod srv;
pub mod storage;

mod error;
pub use error::{ConfigFileError, ConfigFileResult};
