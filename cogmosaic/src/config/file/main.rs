use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cogmosaic_core::ObjectLocator;
use cogmosaic_core::builder::DefaultMosaicBuilder;
use cogmosaic_core::mosaic::StorageTemplate;
use cogmosaic_core::reader::CogReader;
use cogmosaic_core::service::{DEFAULT_READ_CONCURRENCY, MosaicService};
use cogmosaic_core::store::ObjectMosaicStore;
use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::{info, warn};

use crate::config::file::srv::SrvConfig;
use crate::config::file::storage::StorageConfig;
use crate::config::file::{ConfigFileError, ConfigFileResult};
use crate::{CogMosaicError, CogMosaicResult};

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
pub type UnrecognizedKeys = HashSet<String>;

/// Configuration sections that keep track of keys they do not know.
pub trait ConfigExtras {
    fn get_unrecognized_keys(&self) -> UnrecognizedKeys;

    fn get_unrecognized_keys_with_prefix(&self, prefix: &str) -> UnrecognizedKeys {
        self.get_unrecognized_keys()
            .into_iter()
            .map(|key| format!("{prefix}{key}"))
            .collect()
    }
}

/// Size of the COG header cache in megabytes, unless configured.
pub const ASSET_CACHE_SIZE_MB_DEFAULT: u64 = 128;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub srv: SrvConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Maximum size of the asset header cache in megabytes (0 to disable)
    pub asset_cache_size_mb: Option<u64>,

    /// Maximum lifetime of cached assets, e.g. "1h" or "30m".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub asset_cache_expiry: Option<Duration>,

    /// Number of assets described at once while building a mosaic [default: number of CPUs]
    pub builder_concurrency: Option<usize>,

    /// Number of assets read at once for one tile [default: 16]
    pub read_concurrency: Option<usize>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl Config {
    /// Validate the config and report the keys that were not understood.
    pub fn finalize(&mut self) -> CogMosaicResult<UnrecognizedKeys> {
        let mut res = self.srv.get_unrecognized_keys();
        res.extend(self.unrecognized.keys().cloned());
        res.extend(self.storage.get_unrecognized_keys_with_prefix("storage."));
        for key in &res {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }

        if let Some(path) = &self.srv.base_path {
            self.srv.base_path = Some(parse_base_path(path)?);
        }
        if let Some(cors) = &self.srv.cors {
            cors.validate()?;
        }
        if self.storage.url.is_none() {
            return Err(CogMosaicError::NoStorage);
        }
        Ok(res)
    }

    /// Build the mosaic service described by this config.
    pub fn resolve(&self) -> CogMosaicResult<MosaicService> {
        let url = self.storage.url.as_deref().ok_or(CogMosaicError::NoStorage)?;
        let template = StorageTemplate::new(url, Some(self.storage.prefix()))?;
        let locator = ObjectLocator::new(template.base().clone(), self.storage.options.clone())
            .map_err(|e| CogMosaicError::StorageError(e, url.to_string()))?;
        info!(
            "Storing mosaics in {} under '{}'",
            template.base(),
            template.prefix()
        );

        let cache_size_mb = self
            .asset_cache_size_mb
            .unwrap_or(ASSET_CACHE_SIZE_MB_DEFAULT);
        if cache_size_mb == 0 {
            info!("Asset caching is disabled");
        }
        let reader = Arc::new(CogReader::new(
            locator.clone(),
            cache_size_mb * 1000 * 1000,
            self.asset_cache_expiry,
        ));
        let concurrency = self.builder_concurrency.unwrap_or_else(num_cpus::get);
        let builder = Arc::new(DefaultMosaicBuilder::new(reader.clone(), concurrency));
        let store = Arc::new(ObjectMosaicStore::new(locator));
        let read_concurrency = self.read_concurrency.unwrap_or(DEFAULT_READ_CONCURRENCY);
        Ok(MosaicService::new(store, reader, builder, template)
            .with_read_concurrency(read_concurrency))
    }

    /// Write the config as YAML to `file_name`, or print it if the name is `-`.
    pub fn save_to_file(&self, file_name: &Path) -> ConfigFileResult<()> {
        let yaml = serde_yaml::to_string(&self).map_err(ConfigFileError::ConfigSerializeError)?;
        if file_name.as_os_str() == OsStr::new("-") {
            info!("Current system configuration:");
            println!("\n\n{yaml}\n");
            Ok(())
        } else {
            info!(
                "Saving config to {}, use --config to load it",
                file_name.display()
            );
            File::create(file_name)
                .and_then(|mut file| file.write_all(yaml.as_bytes()))
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))
        }
    }
}

/// Read config from a file
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

/// Parse a YAML config, substituting `${VAR}` references from `env`.
pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}

/// Normalize a URL path prefix: it must start with `/`, trailing slashes are dropped.
pub fn parse_base_path(path: &str) -> CogMosaicResult<String> {
    if !path.starts_with('/') {
        return Err(CogMosaicError::BasePathError(path.to_string()));
    }
    if let Ok(uri) = path.parse::<actix_web::http::Uri>() {
        return Ok(uri.path().trim_end_matches('/').to_string());
    }
    Err(CogMosaicError::BasePathError(path.to_string()))
}
