use serde::{Deserialize, Serialize};

use crate::config::file::cors::CorsConfig;
use crate::config::file::{ConfigExtras, UnrecognizedKeys};

pub const KEEP_ALIVE_DEFAULT: u64 = 75;
pub const LISTEN_ADDRESSES_DEFAULT: &str = "0.0.0.0:3000";

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SrvConfig {
    pub keep_alive: Option<u64>,
    pub listen_addresses: Option<String>,
    /// Path prefix of the advertised tile URLs, for servers behind a reverse proxy.
    pub base_path: Option<String>,
    pub worker_processes: Option<usize>,
    /// CORS is disabled unless configured.
    pub cors: Option<CorsConfig>,
    /// `Cache-Control` header value of metadata and tile responses.
    pub cache_control: Option<String>,
}

impl ConfigExtras for SrvConfig {
    fn get_unrecognized_keys(&self) -> UnrecognizedKeys {
        match &self.cors {
            Some(CorsConfig::Properties(cors)) => cors
                .get_unrecognized_keys()
                .into_iter()
                .map(|k| format!("cors.{k}"))
                .collect(),
            _ => UnrecognizedKeys::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::config::file::cors::CorsProperties;

    #[test]
    fn parse_config() {
        assert_eq!(
            serde_yaml::from_str::<SrvConfig>(indoc! {"
                keep_alive: 75
                listen_addresses: '0.0.0.0:3000'
                worker_processes: 8
                cache_control: public, max-age=3600
            "})
            .unwrap(),
            SrvConfig {
                keep_alive: Some(75),
                listen_addresses: Some("0.0.0.0:3000".to_string()),
                worker_processes: Some(8),
                cache_control: Some("public, max-age=3600".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn parse_config_cors() {
        let config = serde_yaml::from_str::<SrvConfig>(indoc! {"
            cors:
              origin:
                - https://tiles.example.org
        "})
        .unwrap();
        assert_eq!(
            config.cors,
            Some(CorsConfig::Properties(CorsProperties {
                origin: vec!["https://tiles.example.org".to_string()],
                ..Default::default()
            }))
        );
        assert!(config.get_unrecognized_keys().is_empty());

        let config = serde_yaml::from_str::<SrvConfig>("cors: true").unwrap();
        assert_eq!(config.cors, Some(CorsConfig::SimpleFlag(true)));
    }
}
