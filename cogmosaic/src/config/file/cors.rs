use actix_http::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::file::{
    ConfigExtras, ConfigFileError, ConfigFileResult, UnrecognizedKeys, UnrecognizedValues,
};

/// `cors: true`, `cors: false`, or the allowed origins.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CorsConfig {
    Properties(CorsProperties),
    SimpleFlag(bool),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CorsProperties {
    #[serde(default)]
    pub origin: Vec<String>,
    pub max_age: Option<usize>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl Default for CorsProperties {
    fn default() -> Self {
        Self {
            origin: vec!["*".to_string()],
            max_age: None,
            unrecognized: UnrecognizedValues::default(),
        }
    }
}

impl ConfigExtras for CorsProperties {
    fn get_unrecognized_keys(&self) -> UnrecognizedKeys {
        self.unrecognized.keys().cloned().collect()
    }
}

impl CorsConfig {
    pub fn log_current_configuration(&self) {
        match self {
            Self::SimpleFlag(false) => info!("CORS is disabled"),
            Self::SimpleFlag(true) => info!(
                "CORS enabled with defaults: {:?}",
                CorsProperties::default()
            ),
            Self::Properties(props) => info!("CORS enabled with custom properties: {props:?}"),
        }
    }

    /// Explicit properties must name at least one origin.
    pub fn validate(&self) -> ConfigFileResult<()> {
        match self {
            Self::Properties(props) if props.origin.is_empty() => {
                Err(ConfigFileError::CorsNoOriginsConfigured)
            }
            _ => Ok(()),
        }
    }

    /// Create [`actix_cors::Cors`] from the configuration, `None` if CORS is disabled.
    #[must_use]
    pub fn make_cors_middleware(&self) -> Option<actix_cors::Cors> {
        match self {
            Self::SimpleFlag(false) => None,
            Self::SimpleFlag(true) => Some(Self::create_cors(&CorsProperties::default())),
            Self::Properties(props) => Some(Self::create_cors(props)),
        }
    }

    fn create_cors(properties: &CorsProperties) -> actix_cors::Cors {
        let mut cors = actix_cors::Cors::default();
        if properties.origin.iter().any(|o| o == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &properties.origin {
                cors = cors.allowed_origin(origin);
            }
        }
        // mosaics are created with POST
        cors.allowed_methods([Method::GET, Method::HEAD, Method::POST])
            .allow_any_header()
            .max_age(properties.max_age)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn parse_flags_and_properties() {
        let config: CorsConfig = serde_yaml::from_str("false").unwrap();
        assert_eq!(config, CorsConfig::SimpleFlag(false));
        assert!(config.make_cors_middleware().is_none());

        let config: CorsConfig = serde_yaml::from_str("true").unwrap();
        assert!(config.make_cors_middleware().is_some());

        let config: CorsConfig = serde_yaml::from_str(indoc! {"
            origin:
              - https://example.org
            max_age: 3600
        "})
        .unwrap();
        let CorsConfig::Properties(props) = &config else {
            panic!("expected properties, got {config:?}");
        };
        assert_eq!(props.origin, ["https://example.org"]);
        assert_eq!(props.max_age, Some(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn origins_are_required() {
        let config: CorsConfig = serde_yaml::from_str("max_age: 10").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigFileError::CorsNoOriginsConfigured)
        ));
    }

    #[test]
    fn unknown_keys() {
        let config: CorsProperties = serde_yaml::from_str(indoc! {"
            origin: ['*']
            allow_credentials: true
        "})
        .unwrap();
        assert_eq!(
            config.get_unrecognized_keys(),
            UnrecognizedKeys::from(["allow_credentials".to_string()])
        );
    }
}
