//! Item repository
//!
//! A thin façade over a [`StorageBackend`]. Every operation maps to a single
//! store call bounded by a deadline; there are no retries and no caching.
//! Documents live at `{collection}/{id}.json`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::storage::StorageBackend;
use crate::types::{Item, ItemId, StoredItem};
use crate::{Error, Result};

/// Default deadline applied to each store call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DOCUMENT_SUFFIX: &str = ".json";

/// Keeps `<id>.json` within a 255-byte filename and well under S3's key limit
pub const MAX_ID_LEN: usize = 200;

/// Lazy, finite sequence of items produced by [`Repository::get_all`]
///
/// The set of ids is fixed when the stream is created; documents are fetched
/// one at a time as the stream is polled. It cannot be restarted.
pub type ItemStream = BoxStream<'static, Result<Item>>;

#[derive(Clone)]
pub struct Repository {
    storage: Arc<dyn StorageBackend>,
    collection: String,
    timeout: Duration,
}

impl Repository {
    pub fn new(storage: Arc<dyn StorageBackend>, collection: impl Into<String>) -> Self {
        Self {
            storage,
            collection: collection.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Store a new item under a freshly generated id
    pub async fn create(&self, item: Item) -> Result<Item> {
        let id = Uuid::new_v4().simple().to_string();
        let item = item.with_id(id);
        self.write(&item).await?;

        tracing::debug!(collection = %self.collection, id = %item.id, "Created item");
        Ok(item)
    }

    /// Fetch a single item, `Error::NotFound` when it does not exist
    pub async fn get(&self, id: &str) -> Result<Item> {
        validate_id(id)?;
        let key = self.key_for(id);
        fetch(self.storage.as_ref(), &key, id, self.timeout).await
    }

    /// Stream every item currently in the collection
    pub async fn get_all(&self) -> Result<ItemStream> {
        let keys = deadline(self.timeout, self.storage.list(&self.collection)).await?;

        let prefix = format!("{}/", self.collection);
        let entries: Vec<(String, ItemId)> = keys
            .into_iter()
            .filter_map(|key| {
                let id = key
                    .strip_prefix(&prefix)?
                    .strip_suffix(DOCUMENT_SUFFIX)?
                    .to_string();
                Some((key, id))
            })
            .collect();

        tracing::debug!(collection = %self.collection, count = entries.len(), "Listing items");

        let storage = self.storage.clone();
        let timeout = self.timeout;
        let items = stream::iter(entries)
            .then(move |(key, id)| {
                let storage = storage.clone();
                async move {
                    match fetch(storage.as_ref(), &key, &id, timeout).await {
                        Ok(item) => Ok(Some(item)),
                        // Deleted between the listing and the fetch
                        Err(Error::NotFound(_)) => Ok(None),
                        Err(e) => Err(e),
                    }
                }
            })
            .try_filter_map(|item| async move { Ok(item) });

        Ok(items.boxed())
    }

    /// Overwrite (or create) the item stored under `id`
    pub async fn update(&self, id: &str, item: Item) -> Result<Item> {
        validate_id(id)?;
        let item = item.with_id(id);
        self.write(&item).await?;

        tracing::debug!(collection = %self.collection, id = %item.id, "Updated item");
        Ok(item)
    }

    /// Remove the item stored under `id`; a missing item is not an error
    pub async fn delete(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        let key = self.key_for(id);
        deadline(self.timeout, self.storage.delete(&key)).await?;

        tracing::debug!(collection = %self.collection, %id, "Deleted item");
        Ok(())
    }

    async fn write(&self, item: &Item) -> Result<()> {
        let body = serde_json::to_vec(&item.to_document())?;
        let key = self.key_for(&item.id);
        deadline(self.timeout, self.storage.put(&key, Bytes::from(body))).await
    }

    fn key_for(&self, id: &str) -> String {
        format!("{}/{}{}", self.collection, id, DOCUMENT_SUFFIX)
    }
}

async fn fetch(
    storage: &dyn StorageBackend,
    key: &str,
    id: &str,
    timeout: Duration,
) -> Result<Item> {
    let data = deadline(timeout, storage.get(key)).await?;
    let stored: StoredItem = serde_json::from_slice(&data)?;
    Ok(stored.into_item(id))
}

async fn deadline<T>(timeout: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Storage call timed out");
            Err(Error::Timeout(timeout))
        }
    }
}

/// Ids must map onto exactly one key inside the collection
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::invalid_request("item id must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::invalid_request(format!(
            "item id must be at most {} bytes",
            MAX_ID_LEN
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(Error::invalid_request(
            "item id must not contain control characters",
        ));
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(Error::invalid_request(format!("invalid item id: {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use async_trait::async_trait;

    fn repo() -> (Arc<MemoryStorage>, Repository) {
        let storage = Arc::new(MemoryStorage::new());
        let repo = Repository::new(storage.clone(), "items");
        (storage, repo)
    }

    /// Backend whose calls never complete within a test's deadline
    struct SlowStorage;

    #[async_trait]
    impl StorageBackend for SlowStorage {
        async fn get(&self, _key: &str) -> Result<Bytes> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Bytes::new())
        }

        async fn put(&self, _key: &str, _data: Bytes) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (storage, repo) = repo();

        let created = repo.create(Item::new("milk", "buy milk")).await.unwrap();
        assert!(!created.id.is_empty());
        let stored = storage
            .get(&format!("items/{}.json", created.id))
            .await
            .unwrap();
        assert_eq!(&stored[..], br#"{"name":"milk","description":"buy milk"}"#);

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_ignores_client_id() {
        let (_storage, repo) = repo();

        let created = repo
            .create(Item::new("milk", "").with_id("chosen-by-client"))
            .await
            .unwrap();
        assert_ne!(created.id, "chosen-by-client");
    }

    #[tokio::test]
    async fn update_overwrites_without_merge() {
        let (_storage, repo) = repo();

        let created = repo.create(Item::new("milk", "buy milk")).await.unwrap();
        repo.update(&created.id, Item::new("bread", "")).await.unwrap();

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched, Item::new("bread", "").with_id(created.id));
    }

    #[tokio::test]
    async fn update_creates_missing_item() {
        let (_storage, repo) = repo();

        let updated = repo
            .update("abc", Item::new("bread", "").with_id("ignored"))
            .await
            .unwrap();
        assert_eq!(updated.id, "abc");

        let fetched = repo.get("abc").await.unwrap();
        assert_eq!(fetched, Item::new("bread", "").with_id("abc"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_storage, repo) = repo();

        let created = repo.create(Item::new("milk", "")).await.unwrap();
        repo.delete(&created.id).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo.get(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn get_all_drains_collection() {
        let (storage, repo) = repo();

        let empty: Vec<Item> = repo.get_all().await.unwrap().try_collect().await.unwrap();
        assert!(empty.is_empty());

        repo.update("a", Item::new("one", "")).await.unwrap();
        repo.update("b", Item::new("two", "")).await.unwrap();
        // Objects outside the collection layout are ignored
        storage
            .put("items/notes.txt", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let items: Vec<Item> = repo.get_all().await.unwrap().try_collect().await.unwrap();
        assert_eq!(
            items,
            vec![
                Item::new("one", "").with_id("a"),
                Item::new("two", "").with_id("b"),
            ]
        );
    }

    #[tokio::test]
    async fn get_all_skips_items_deleted_after_listing() {
        let (_storage, repo) = repo();

        repo.update("a", Item::new("one", "")).await.unwrap();
        repo.update("b", Item::new("two", "")).await.unwrap();

        let stream = repo.get_all().await.unwrap();
        repo.delete("a").await.unwrap();

        let items: Vec<Item> = stream.try_collect().await.unwrap();
        assert_eq!(items, vec![Item::new("two", "").with_id("b")]);
    }

    #[tokio::test]
    async fn rejects_ids_that_escape_the_collection() {
        let (_storage, repo) = repo();

        let too_long = "a".repeat(MAX_ID_LEN + 1);
        let invalid = [
            "",
            ".",
            "..",
            "a/b",
            "..\\x",
            "a\0b",
            "tab\there",
            too_long.as_str(),
        ];
        for id in invalid {
            let err = repo.get(id).await.unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "id {:?}", id);
        }

        let longest = "a".repeat(MAX_ID_LEN);
        repo.update(&longest, Item::new("edge", "")).await.unwrap();
    }

    #[tokio::test]
    async fn slow_storage_hits_deadline() {
        let repo =
            Repository::new(Arc::new(SlowStorage), "items").with_timeout(Duration::from_millis(20));

        let err = repo.get("abc").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        let err = repo.create(Item::new("milk", "")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
