use std::fmt::{Display, Formatter};

use url::Url;

use crate::mosaic::MosaicId;
use crate::{InvalidLocation, MosaicError, MosaicResult, parse_location};

/// How a request refers to a mosaic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MosaicRef {
    /// A mosaic stored by this service under its identifier.
    Id(MosaicId),
    /// A mosaic document at an arbitrary location, used as is.
    Url(String),
}

impl MosaicRef {
    /// Pick the reference of a request: the path identifier wins over the `url` parameter.
    pub fn from_request(id: Option<MosaicId>, url: Option<String>) -> MosaicResult<Self> {
        match (id, url) {
            (Some(id), _) => Ok(Self::Id(id)),
            (None, Some(url)) if !url.is_empty() => Ok(Self::Url(url)),
            _ => Err(MosaicError::MissingReference),
        }
    }

    /// Name reported in metadata: the identifier or the URL.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Id(id) => id.as_str(),
            Self::Url(url) => url,
        }
    }

    /// The identifier, if the mosaic is addressed by one.
    #[must_use]
    pub fn id(&self) -> Option<&MosaicId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Url(_) => None,
        }
    }
}

impl Display for MosaicRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where mosaics addressed by identifier are stored: `{base}/{prefix}/{id}.json.gz`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageTemplate {
    base: Url,
    prefix: String,
}

impl StorageTemplate {
    /// `base` is a URL or a local directory, `prefix` a path inside of it.
    pub fn new(base: &str, prefix: Option<&str>) -> MosaicResult<Self> {
        let base = parse_location(base)?;
        if base.cannot_be_a_base() {
            return Err(InvalidLocation::new(base, "URL cannot hold a path").into());
        }
        let prefix = prefix.unwrap_or_default().trim_matches('/').to_string();
        Ok(Self { base, prefix })
    }

    /// Root of the storage, shared by all mosaic locations.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Path prefix inside of the storage root, without surrounding slashes.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Storage location of the mosaic with the given identifier.
    #[must_use]
    pub fn location_for(&self, id: &MosaicId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(self.prefix.split('/').filter(|s| !s.is_empty()));
            segments.push(&format!("{id}.json.gz"));
        }
        url
    }

    /// Storage location of a referenced mosaic. Identifiers go through the
    /// template, URLs and file paths are used as given.
    pub fn resolve_path(&self, reference: &MosaicRef) -> MosaicResult<Url> {
        match reference {
            MosaicRef::Id(id) => Ok(self.location_for(id)),
            MosaicRef::Url(url) => Ok(parse_location(url)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn id() -> MosaicId {
        MosaicId::parse(&"ab".repeat(28)).unwrap()
    }

    #[rstest]
    #[case("s3://bucket", Some("mosaics"), "s3://bucket/mosaics/")]
    #[case("s3://bucket/", Some("/mosaics/"), "s3://bucket/mosaics/")]
    #[case("s3://bucket/root", Some("a/b"), "s3://bucket/root/a/b/")]
    #[case("s3://bucket", None, "s3://bucket/")]
    #[case("s3://bucket", Some(""), "s3://bucket/")]
    #[case("/var/lib/mosaics", None, "file:///var/lib/mosaics/")]
    fn locations(#[case] base: &str, #[case] prefix: Option<&str>, #[case] dir: &str) {
        let template = StorageTemplate::new(base, prefix).unwrap();
        let expected = format!("{dir}{}.json.gz", id());
        assert_eq!(template.location_for(&id()).as_str(), expected);
        assert_eq!(
            template.resolve_path(&MosaicRef::Id(id())).unwrap().as_str(),
            expected
        );
    }

    #[test]
    fn urls_bypass_the_template() {
        let template = StorageTemplate::new("s3://bucket", Some("mosaics")).unwrap();
        let reference = MosaicRef::Url("https://example.org/mosaic.json".to_string());
        assert_eq!(
            template.resolve_path(&reference).unwrap().as_str(),
            "https://example.org/mosaic.json"
        );
    }

    #[test]
    fn request_references() {
        assert!(matches!(
            MosaicRef::from_request(None, None),
            Err(MosaicError::MissingReference)
        ));
        assert!(matches!(
            MosaicRef::from_request(None, Some(String::new())),
            Err(MosaicError::MissingReference)
        ));
        let reference = MosaicRef::from_request(Some(id()), Some("s3://x/y.json".to_string()));
        assert_eq!(reference.unwrap(), MosaicRef::Id(id()));
        let reference = MosaicRef::from_request(None, Some("s3://x/y.json".to_string())).unwrap();
        assert_eq!(reference.name(), "s3://x/y.json");
        assert_eq!(reference.id(), None);
    }

    #[test]
    fn base_must_hold_paths() {
        assert!(StorageTemplate::new("mailto:someone@example.org", None).is_err());
    }
}
