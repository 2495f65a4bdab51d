use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::env::Env;
use crate::config::file::{ConfigExtras, UnrecognizedKeys, UnrecognizedValues};

/// Path prefix of stored mosaics inside of the storage root.
pub const PREFIX_DEFAULT: &str = "mosaics";

/// Where mosaics created by the service are stored.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// Root of the storage: an object store URL such as `s3://bucket`, or a local directory.
    pub url: Option<String>,
    /// Path of the mosaics inside of the root [default: `mosaics`, empty for none].
    pub prefix: Option<String>,
    /// Object store options such as `aws_region` or `aws_endpoint`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl StorageConfig {
    /// Fill values missing from the configuration from the environment.
    ///
    /// `MOSAIC_STORE_URL` wins over `MOSAIC_DEF_BUCKET`, which names an S3 bucket.
    pub fn apply_env<'a>(&mut self, env: &impl Env<'a>) {
        if self.url.is_none() {
            self.url = env.get_env_str("MOSAIC_STORE_URL").or_else(|| {
                env.get_env_str("MOSAIC_DEF_BUCKET")
                    .map(|bucket| format!("s3://{bucket}"))
            });
        }
        if self.prefix.is_none() {
            // kept even when empty: an empty prefix stores mosaics at the root
            self.prefix = env
                .var_os("MOSAIC_PREFIX")
                .and_then(|prefix| prefix.into_string().ok());
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(PREFIX_DEFAULT)
    }
}

impl ConfigExtras for StorageConfig {
    fn get_unrecognized_keys(&self) -> UnrecognizedKeys {
        self.unrecognized.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use rstest::rstest;

    use super::*;
    use crate::config::env::FauxEnv;

    #[rstest]
    #[case(&[], None, "mosaics")]
    #[case(&[("MOSAIC_DEF_BUCKET", "my-bucket")], Some("s3://my-bucket"), "mosaics")]
    #[case(
        &[("MOSAIC_DEF_BUCKET", "my-bucket"), ("MOSAIC_STORE_URL", "gs://other")],
        Some("gs://other"),
        "mosaics"
    )]
    #[case(&[("MOSAIC_PREFIX", "tiles/v2")], None, "tiles/v2")]
    #[case(&[("MOSAIC_PREFIX", "")], None, "")]
    fn environment_fallbacks(
        #[case] vars: &[(&'static str, &str)],
        #[case] url: Option<&str>,
        #[case] prefix: &str,
    ) {
        let env = FauxEnv(
            vars.iter()
                .map(|(k, v)| (*k, OsString::from(v)))
                .collect(),
        );
        let mut config = StorageConfig::default();
        config.apply_env(&env);
        assert_eq!(config.url.as_deref(), url);
        assert_eq!(config.prefix(), prefix);
    }

    #[test]
    fn configured_values_win() {
        let env = FauxEnv(HashMap::from([
            ("MOSAIC_STORE_URL", OsString::from("s3://env")),
            ("MOSAIC_PREFIX", OsString::from("env")),
        ]));
        let mut config = StorageConfig {
            url: Some("file:///data".to_string()),
            prefix: Some("defs".to_string()),
            ..Default::default()
        };
        config.apply_env(&env);
        assert_eq!(config.url.as_deref(), Some("file:///data"));
        assert_eq!(config.prefix(), "defs");
    }
}
