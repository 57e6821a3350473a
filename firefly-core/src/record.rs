//! Active-record style persistence for [`Model`] types.
//!
//! [`TypedCollection`] runs the model operations against one store, resolving the
//! collection from the model type. [`ActiveRecord`] is implemented for every model
//! and exposes the same operations as associated functions on the model type itself,
//! plus instance `save` and `delete`.
//!
//! ```ignore
//! use firefly::prelude::*;
//!
//! let mut bug = Bug::build(doc! { "id": 1, "name": "Steve", "type": "moth" })?;
//! bug.save(&store).await?;
//!
//! let steve = Bug::get(&store, "1").await?.unwrap();
//! let moths = Bug::filter(&store, ("type", "moth")).await?;
//! assert!(bug.delete(&store).await?);
//! ```
//!
//! Bulk operations are best effort. `save_many` and `delete_many` work through their
//! input one document at a time and stop at the first failure, leaving whatever was
//! already written in place.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use std::{fmt, marker::PhantomData};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{StoreError, StoreResult},
    model::{ID_FIELD, Model, to_document},
    query::{Condition, FieldOp, SortDirection},
    store::DocumentStore,
};

/// A single `field == value` selection.
///
/// Only ever one pair: selecting on several fields at once is what
/// [`TypedCollection::where_and`] is for.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub field: String,
    pub value: Bson,
}

impl Criteria {
    pub fn new(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), value: value.into() }
    }
}

impl<K: Into<String>, V: Into<Bson>> From<(K, V)> for Criteria {
    fn from((field, value): (K, V)) -> Self {
        Criteria::new(field, value)
    }
}

/// Model operations bound to the collection of `M`.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
/// * `M` - The model type
pub struct TypedCollection<'a, B: StoreBackend, M: Model> {
    inner: Collection<'a, B>,
    _marker: PhantomData<M>,
}

impl<B: StoreBackend, M: Model> fmt::Debug for TypedCollection<'_, B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("name", &self.inner.name())
            .finish()
    }
}

impl<'a, B: StoreBackend, M: Model> TypedCollection<'a, B, M> {
    pub(crate) fn new(inner: Collection<'a, B>) -> Self {
        Self { inner, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped handle on the same collection.
    pub fn raw(&self) -> &Collection<'a, B> {
        &self.inner
    }

    /// Builds a model from `fields` and saves it.
    pub async fn create<F: Serialize>(&self, fields: F) -> StoreResult<M> {
        let mut model = M::build(fields)?;
        self.save(&mut model).await?;

        Ok(model)
    }

    /// Fetches and rehydrates the model with the given id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<M>> {
        self.inner.get(id).await?.map(hydrate::<M>).transpose()
    }

    /// Whether a model with the given id is stored.
    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.inner.get(id).await?.is_some())
    }

    /// First model whose field equals the criteria value.
    pub async fn find(&self, criteria: impl Into<Criteria>) -> StoreResult<Option<M>> {
        let Criteria { field, value } = criteria.into();

        self.inner
            .find_one(&field, value)
            .await?
            .map(hydrate::<M>)
            .transpose()
    }

    /// Every model whose field equals the criteria value, up to the default limit.
    pub async fn filter(&self, criteria: impl Into<Criteria>) -> StoreResult<Vec<M>> {
        let Criteria { field, value } = criteria.into();

        rehydrate(self.inner.find(&field, value).await?)
    }

    /// Raw comparison query. Matches come back as plain documents.
    pub async fn where_op(
        &self,
        key: &str,
        op: FieldOp,
        value: impl Into<Bson>,
    ) -> StoreResult<Vec<Document>> {
        self.inner.where_op(key, op, value).await
    }

    /// Conjunctive comparison query. Matches come back as plain documents.
    pub async fn where_and(&self, conditions: Vec<Condition>) -> StoreResult<Vec<Document>> {
        self.inner.where_and(conditions).await
    }

    /// Documents that have `key` set, ascending by `key`, up to the default limit.
    pub async fn where_key_exists(&self, key: &str) -> StoreResult<Vec<Document>> {
        self.inner.order_by(key, SortDirection::Asc, None).await
    }

    /// Every model in the collection.
    pub async fn all(&self) -> StoreResult<Vec<M>> {
        rehydrate(self.inner.all().await?)
    }

    /// Deletes by id. Returns `true` even when nothing was stored under `id`.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    /// Deletes every document matching the criteria, one at a time, and returns how
    /// many were deleted. Stops at the first failed delete.
    pub async fn delete_many(&self, criteria: impl Into<Criteria>) -> StoreResult<usize> {
        let Criteria { field, value } = criteria.into();
        let matches = self.inner.find(&field, value).await?;
        let mut deleted = 0;

        for document in matches {
            let id = document_id(&document)?;
            self.inner.delete(&id).await?;
            deleted += 1;
        }

        debug!(collection = %self.name(), deleted, "deleted matching documents");

        Ok(deleted)
    }

    /// Persists a model.
    ///
    /// A model with an id is written with replace-or-insert under that id, so saving
    /// the same instance twice touches one document. A model without one is added and
    /// receives the id the store assigned.
    pub async fn save(&self, model: &mut M) -> StoreResult<()> {
        let mut document = model.to_document()?;

        if !model.id().is_empty() {
            self.inner.update(model.id(), document).await?;
            return Ok(());
        }

        document.remove(M::id_field());
        let added = self.inner.add(document).await?;
        model.set_id(document_id(&added)?);

        Ok(())
    }

    /// Saves models one after another, returning them in input order.
    pub async fn save_many(&self, models: Vec<M>) -> StoreResult<Vec<M>> {
        let mut saved = Vec::with_capacity(models.len());

        for mut model in models {
            self.save(&mut model).await?;
            saved.push(model);
        }

        Ok(saved)
    }

    /// Saves models with at most `limit` writes in flight, returning them in input
    /// order. Stops at the first failure; models not yet started are not written.
    pub async fn save_many_concurrent(&self, models: Vec<M>, limit: usize) -> StoreResult<Vec<M>> {
        stream::iter(models)
            .map(|mut model| async move {
                self.save(&mut model).await?;
                Ok::<_, StoreError>(model)
            })
            .buffered(limit.max(1))
            .try_collect()
            .await
    }

    /// Merges `fields` into the document stored under `id`, creating it if absent.
    pub async fn update<F: Serialize>(&self, id: &str, fields: F) -> StoreResult<Document> {
        self.inner.update_one(id, to_document(&fields)?).await
    }
}

/// Rebuilds a model from a stored document. The store id, always merged under `id`,
/// wins over whatever the document holds in the model's own identity field.
fn hydrate<M: Model>(mut document: Document) -> StoreResult<M> {
    if M::id_field() != ID_FIELD {
        if let Some(id) = document.remove(ID_FIELD) {
            document.insert(M::id_field(), id);
        }
    }

    M::from_document(document)
}

fn rehydrate<M: Model>(documents: Vec<Document>) -> StoreResult<Vec<M>> {
    documents.into_iter().map(hydrate::<M>).collect()
}

fn document_id(document: &Document) -> StoreResult<String> {
    match document.get(ID_FIELD) {
        Some(Bson::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(StoreError::InvalidDocument("document has no id".to_string())),
    }
}

/// Class-style persistence for every [`Model`].
///
/// Associated functions take the store to run against; the collection is always the
/// implementing type's own.
#[async_trait]
pub trait ActiveRecord: Model {
    /// Builds a model from `fields` and saves it.
    async fn create<B, F>(store: &DocumentStore<B>, fields: F) -> StoreResult<Self>
    where
        B: StoreBackend,
        F: Serialize + Send,
    {
        store.typed_collection::<Self>().create(fields).await
    }

    async fn get<B: StoreBackend>(store: &DocumentStore<B>, id: &str) -> StoreResult<Option<Self>> {
        store.typed_collection::<Self>().get(id).await
    }

    async fn exists<B: StoreBackend>(store: &DocumentStore<B>, id: &str) -> StoreResult<bool> {
        store.typed_collection::<Self>().exists(id).await
    }

    /// First match of a single-field equality, or `None`.
    async fn find<B, C>(store: &DocumentStore<B>, criteria: C) -> StoreResult<Option<Self>>
    where
        B: StoreBackend,
        C: Into<Criteria> + Send,
    {
        store.typed_collection::<Self>().find(criteria).await
    }

    /// Every match of a single-field equality, up to the store's default limit.
    async fn filter<B, C>(store: &DocumentStore<B>, criteria: C) -> StoreResult<Vec<Self>>
    where
        B: StoreBackend,
        C: Into<Criteria> + Send,
    {
        store.typed_collection::<Self>().filter(criteria).await
    }

    async fn where_op<B, V>(
        store: &DocumentStore<B>,
        key: &str,
        op: FieldOp,
        value: V,
    ) -> StoreResult<Vec<Document>>
    where
        B: StoreBackend,
        V: Into<Bson> + Send,
    {
        store.typed_collection::<Self>().where_op(key, op, value).await
    }

    async fn where_and<B: StoreBackend>(
        store: &DocumentStore<B>,
        conditions: Vec<Condition>,
    ) -> StoreResult<Vec<Document>> {
        store.typed_collection::<Self>().where_and(conditions).await
    }

    async fn where_key_exists<B: StoreBackend>(
        store: &DocumentStore<B>,
        key: &str,
    ) -> StoreResult<Vec<Document>> {
        store.typed_collection::<Self>().where_key_exists(key).await
    }

    async fn all<B: StoreBackend>(store: &DocumentStore<B>) -> StoreResult<Vec<Self>> {
        store.typed_collection::<Self>().all().await
    }

    async fn delete_by_id<B: StoreBackend>(store: &DocumentStore<B>, id: &str) -> StoreResult<bool> {
        store.typed_collection::<Self>().delete(id).await
    }

    async fn delete_many<B, C>(store: &DocumentStore<B>, criteria: C) -> StoreResult<usize>
    where
        B: StoreBackend,
        C: Into<Criteria> + Send,
    {
        store.typed_collection::<Self>().delete_many(criteria).await
    }

    async fn save_many<B: StoreBackend>(
        store: &DocumentStore<B>,
        models: Vec<Self>,
    ) -> StoreResult<Vec<Self>> {
        store.typed_collection::<Self>().save_many(models).await
    }

    async fn save_many_concurrent<B: StoreBackend>(
        store: &DocumentStore<B>,
        models: Vec<Self>,
        limit: usize,
    ) -> StoreResult<Vec<Self>> {
        store.typed_collection::<Self>().save_many_concurrent(models, limit).await
    }

    /// Merge-upsert of `fields` into the document stored under `id`.
    async fn update<B, F>(store: &DocumentStore<B>, id: &str, fields: F) -> StoreResult<Document>
    where
        B: StoreBackend,
        F: Serialize + Send,
    {
        store.typed_collection::<Self>().update(id, fields).await
    }

    /// Saves this instance, picking up the store-assigned id if it had none.
    async fn save<B: StoreBackend>(&mut self, store: &DocumentStore<B>) -> StoreResult<()> {
        store.typed_collection::<Self>().save(self).await
    }

    /// Deletes this instance's document. Returns `true`.
    async fn delete<B: StoreBackend>(&self, store: &DocumentStore<B>) -> StoreResult<bool> {
        store.typed_collection::<Self>().delete(self.id()).await
    }
}

impl<M: Model> ActiveRecord for M {}
