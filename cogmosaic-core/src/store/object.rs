use std::borrow::Cow;

use async_trait::async_trait;
use cogmosaic_tile_utils::{decode_gzip, encode_gzip};
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, PutMode, PutOptions, PutPayload,
};
use tracing::debug;
use url::Url;

use crate::ObjectLocator;
use crate::mosaic::MosaicDefinition;
use crate::store::{Insert, Lookup, MosaicStore, StoreError, StoreResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Stores mosaic definitions as JSON documents in an object store.
///
/// Locations ending with `.gz` are written gzip compressed. Reading detects
/// compression from the content, so plain and compressed documents both load.
#[derive(Clone, Debug)]
pub struct ObjectMosaicStore {
    locator: ObjectLocator,
}

impl ObjectMosaicStore {
    /// Store documents in the object stores resolved by `locator`.
    #[must_use]
    pub fn new(locator: ObjectLocator) -> Self {
        Self { locator }
    }

    fn encode(location: &Url, definition: &MosaicDefinition) -> StoreResult<Vec<u8>> {
        let json = serde_json::to_vec(definition)
            .map_err(|e| StoreError::Serialize(e, location.clone()))?;
        if location.path().ends_with(".gz") {
            encode_gzip(&json).map_err(|e| StoreError::Compression(e, location.clone()))
        } else {
            Ok(json)
        }
    }

    fn put_options(&self, location: &Url, mode: PutMode) -> PutOptions {
        let mut attributes = Attributes::new();
        if self.locator.supports_attributes(location) {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from("application/json"),
            );
            if location.path().ends_with(".gz") {
                attributes.insert(Attribute::ContentEncoding, AttributeValue::from("gzip"));
            }
        }
        PutOptions {
            mode,
            attributes,
            ..Default::default()
        }
    }

    async fn put(
        &self,
        location: &Url,
        definition: &MosaicDefinition,
        mode: PutMode,
    ) -> StoreResult<()> {
        let data = Self::encode(location, definition)?;
        let err = |e| StoreError::ObjectStore(e, location.clone());
        let (store, path) = self.locator.resolve(location).map_err(err)?;
        let opts = self.put_options(location, mode);
        store
            .put_opts(&path, PutPayload::from(data), opts)
            .await
            .map_err(err)?;
        debug!("Stored mosaic definition at {location}");
        Ok(())
    }
}

#[async_trait]
impl MosaicStore for ObjectMosaicStore {
    async fn read(&self, location: &Url) -> StoreResult<Lookup<MosaicDefinition>> {
        let err = |e| StoreError::ObjectStore(e, location.clone());
        let (store, path) = self.locator.resolve(location).map_err(err)?;
        let data = match store.get_opts(&path, GetOptions::default()).await {
            Ok(result) => result.bytes().await.map_err(err)?,
            Err(object_store::Error::NotFound { .. }) => {
                debug!("No mosaic definition at {location}");
                return Ok(Lookup::NotFound);
            }
            Err(e) => return Err(err(e)),
        };
        let json = if data.starts_with(&GZIP_MAGIC) {
            Cow::Owned(
                decode_gzip(&data).map_err(|e| StoreError::Compression(e, location.clone()))?,
            )
        } else {
            Cow::Borrowed(data.as_ref())
        };
        let definition =
            serde_json::from_slice(&json).map_err(|e| StoreError::Parse(e, location.clone()))?;
        Ok(Lookup::Found(definition))
    }

    async fn write(&self, location: &Url, definition: &MosaicDefinition) -> StoreResult<()> {
        self.put(location, definition, PutMode::Overwrite).await
    }

    async fn write_new(
        &self,
        location: &Url,
        definition: &MosaicDefinition,
    ) -> StoreResult<Insert> {
        match self.put(location, definition, PutMode::Create).await {
            Ok(()) => Ok(Insert::Created),
            Err(StoreError::ObjectStore(object_store::Error::AlreadyExists { .. }, _)) => {
                Ok(Insert::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use object_store::ObjectStore;
    use object_store::memory::InMemory;
    use object_store::path::Path;

    use super::*;

    fn definition(name: &str) -> MosaicDefinition {
        MosaicDefinition {
            mosaicjson: "0.0.2".to_string(),
            name: Some(name.to_string()),
            description: None,
            version: "1.0.0".to_string(),
            attribution: None,
            minzoom: 7,
            maxzoom: 9,
            quadkey_zoom: None,
            bounds: [-10.0, -10.0, 10.0, 10.0],
            center: None,
            tiles: BTreeMap::from([("0123333".to_string(), vec!["a.tif".to_string()])]),
            creation_params: None,
        }
    }

    fn memory_store() -> (Arc<InMemory>, ObjectMosaicStore) {
        let memory = Arc::new(InMemory::new());
        let base = Url::parse("memory:///").unwrap();
        let locator = ObjectLocator::with_store(base, memory.clone());
        (memory, ObjectMosaicStore::new(locator))
    }

    #[tokio::test]
    async fn write_then_read() {
        let (memory, store) = memory_store();
        let location = Url::parse("memory:///mosaics/a.json.gz").unwrap();

        assert_eq!(store.read(&location).await.unwrap(), Lookup::NotFound);

        store.write(&location, &definition("a")).await.unwrap();
        assert_eq!(
            store.read(&location).await.unwrap(),
            Lookup::Found(definition("a"))
        );

        let raw = memory
            .get_opts(&Path::from("mosaics/a.json.gz"), GetOptions::default())
            .await
            .unwrap();
        assert_eq!(
            raw.attributes.get(&Attribute::ContentEncoding),
            Some(&AttributeValue::from("gzip"))
        );
        assert!(raw.bytes().await.unwrap().starts_with(&GZIP_MAGIC));
    }

    #[tokio::test]
    async fn plain_json_documents() {
        let (memory, store) = memory_store();
        let json = serde_json::to_vec(&definition("plain")).unwrap();
        memory
            .put_opts(
                &Path::from("plain.json"),
                PutPayload::from(json),
                PutOptions::default(),
            )
            .await
            .unwrap();

        let location = Url::parse("memory:///plain.json").unwrap();
        let Lookup::Found(found) = store.read(&location).await.unwrap() else {
            panic!("plain document not found");
        };
        assert_eq!(found.name.as_deref(), Some("plain"));
    }

    #[tokio::test]
    async fn write_new_never_overwrites() {
        let (_, store) = memory_store();
        let location = Url::parse("memory:///mosaics/b.json.gz").unwrap();

        let first = store.write_new(&location, &definition("first")).await;
        assert_eq!(first.unwrap(), Insert::Created);
        let second = store.write_new(&location, &definition("second")).await;
        assert_eq!(second.unwrap(), Insert::AlreadyExists);

        let Lookup::Found(stored) = store.read(&location).await.unwrap() else {
            panic!("first document not found");
        };
        assert_eq!(stored.name.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn garbage_is_an_error() {
        let (memory, store) = memory_store();
        memory
            .put_opts(
                &Path::from("broken.json"),
                PutPayload::from_static(b"not json"),
                PutOptions::default(),
            )
            .await
            .unwrap();
        let location = Url::parse("memory:///broken.json").unwrap();
        assert!(matches!(
            store.read(&location).await,
            Err(StoreError::Parse(_, _))
        ));
    }

    #[tokio::test]
    async fn local_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = Url::from_directory_path(dir.path()).unwrap();
        let locator = ObjectLocator::new(base.clone(), Default::default()).unwrap();
        let store = ObjectMosaicStore::new(locator);

        let location = base.join("nested/c.json.gz").unwrap();
        assert_eq!(
            store.write_new(&location, &definition("c")).await.unwrap(),
            Insert::Created
        );
        assert!(dir.path().join("nested/c.json.gz").exists());
        assert_eq!(
            store.write_new(&location, &definition("d")).await.unwrap(),
            Insert::AlreadyExists
        );
        let Lookup::Found(stored) = store.read(&location).await.unwrap() else {
            panic!("local document not found");
        };
        assert_eq!(stored.name.as_deref(), Some("c"));
    }
}
