//! In-memory storage implementation for document stores.
//!
//! Documents live in one ordered map per collection, keyed by id, behind an
//! async-aware read-write lock. Unsorted queries return documents in id order.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::trace;
use uuid::Uuid;

use firefly_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::StoreResult,
    query::{Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type CollectionMap = BTreeMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones
/// share the same documents. Queries scan the whole collection.
///
/// # Example
///
/// ```ignore
/// use firefly_memory::InMemoryStore;
/// use firefly::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.set_document("bugs", "1", doc! { "name": "Steve" }).await?;
/// assert!(store.get_document("bugs", "1").await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

/// Merges `patch` into `target`, descending into maps present on both sides.
fn merge_into(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        if let Bson::Document(incoming) = value {
            if let Some(Bson::Document(existing)) = target.get_mut(&key) {
                merge_into(existing, incoming);
                continue;
            }
            target.insert(key, Bson::Document(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.iter(), filter),
            None => collection_map
                .iter()
                .map(|(id, doc)| (id.clone(), doc.clone()))
                .collect::<Vec<_>>(),
        };

        if let Some(sort) = &query.sort {
            // Stable, so ties stay in id order.
            documents.sort_by(|(_, a), (_, b)| {
                let left = lookup(a, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = lookup(b, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.sort_cmp(&right),
                    SortDirection::Desc => right.sort_cmp(&left),
                }
            });
        }

        trace!(collection, matched = documents.len(), "evaluated query");

        Ok(documents
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);

        Ok(())
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let existing = store
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();

        merge_into(existing, document);

        Ok(())
    }

    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);

        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            documents.remove(id);
        }

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Always succeeds with a fresh, empty store.
    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
