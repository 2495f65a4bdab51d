use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use object_store::ObjectStore;
use object_store::path::Path;
use url::Url;

/// A location that is neither a URL nor a usable file path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid location '{location}': {reason}")]
pub struct InvalidLocation {
    /// The location as given.
    pub location: String,
    /// Why it cannot be used.
    pub reason: String,
}

impl InvalidLocation {
    /// Describe why `location` is unusable.
    pub fn new(location: impl ToString, reason: impl ToString) -> Self {
        Self {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse a location given by a client or by the configuration.
///
/// Anything with a URL scheme is used as is. Everything else is a local
/// file path, made absolute because object stores do not accept relative paths.
pub fn parse_location(location: &str) -> Result<Url, InvalidLocation> {
    // single letter schemes are windows drive letters
    if let Ok(url) = Url::parse(location)
        && url.scheme().len() > 1
    {
        return Ok(url);
    }
    let path = std::path::absolute(location).map_err(|e| InvalidLocation::new(location, e))?;
    Url::from_file_path(&path).map_err(|()| InvalidLocation::new(location, "not an absolute path"))
}

/// Maps URLs to an object store and a path inside of it.
///
/// URLs on the same scheme and host as the base URL share one store instance,
/// any other URL gets a store built from its own URL and the configured options.
#[derive(Clone)]
pub struct ObjectLocator {
    base_url: Url,
    base_store: Arc<dyn ObjectStore>,
    options: HashMap<String, String>,
}

impl Debug for ObjectLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLocator")
            .field("base_url", &self.base_url.as_str())
            .field("base_store", &self.base_store.to_string())
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ObjectLocator {
    /// Build the store for `base_url` from the URL scheme and `options`
    /// (credentials, region, endpoint and the like).
    pub fn new(
        base_url: Url,
        options: HashMap<String, String>,
    ) -> Result<Self, object_store::Error> {
        let (store, _) = object_store::parse_url_opts(&base_url, &options)?;
        Ok(Self {
            base_url,
            base_store: Arc::from(store),
            options,
        })
    }

    /// Use an existing store for all URLs sharing the origin of `base_url`.
    #[must_use]
    pub fn with_store(base_url: Url, base_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            base_url,
            base_store,
            options: HashMap::new(),
        }
    }

    /// URL whose origin is served by the base store.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The local filesystem store rejects object attributes such as the content type.
    #[must_use]
    pub fn supports_attributes(&self, location: &Url) -> bool {
        location.scheme() != "file"
    }

    /// Store and object path holding `location`.
    pub fn resolve(
        &self,
        location: &Url,
    ) -> Result<(Arc<dyn ObjectStore>, Path), object_store::Error> {
        if self.shares_origin(location) {
            let path = Path::from_url_path(location.path())?;
            return Ok((self.base_store.clone(), path));
        }
        let (store, path) = object_store::parse_url_opts(location, &self.options)?;
        Ok((Arc::from(store), path))
    }

    fn shares_origin(&self, location: &Url) -> bool {
        location.scheme() == self.base_url.scheme()
            && location.host_str() == self.base_url.host_str()
            && location.port() == self.base_url.port()
    }
}
