//! Raw document access for a single named collection.
//!
//! [`Collection`] is the store client the model layer is written against. It checks
//! its arguments before touching the backend, and every document it hands back has
//! the document's id merged in under `"id"`.
//!
//! # Example
//!
//! ```ignore
//! use firefly::query::{FieldOp, SortDirection};
//! use bson::doc;
//!
//! let bugs = store.collection("bugs");
//! bugs.create("1", doc! { "name": "Steve", "legs": 6 }).await?;
//!
//! let steve = bugs.find_one("name", "Steve").await?;
//! let leggy = bugs.where_op("legs", FieldOp::Gte, 6).await?;
//! let newest = bugs.order_by("created_at", SortDirection::Desc, Some(10)).await?;
//! ```

use bson::{Bson, Document};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    error::{StoreError, StoreResult},
    model::ID_FIELD,
    query::{Condition, Expr, FieldOp, Filter, Query, Sort, SortDirection},
};

/// A handle on the documents of one collection.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
    default_limit: usize,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B, default_limit: usize) -> Self {
        Self { name, backend, default_limit }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the result cap applied when no explicit limit is given.
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Fetches the document with the given id, or `None` if there is none.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.check_name()?;
        require("id", id)?;
        debug!(collection = %self.name, id, "get document");

        Ok(self
            .backend
            .get_document(&self.name, id)
            .await?
            .map(|document| with_id(id.to_string(), document)))
    }

    /// Lists every document in the collection.
    pub async fn all(&self) -> StoreResult<Vec<Document>> {
        self.check_name()?;
        debug!(collection = %self.name, "list documents");

        self.run(Query::new()).await
    }

    /// Equality lookup capped at the default limit.
    pub async fn find(&self, key: &str, value: impl Into<Bson>) -> StoreResult<Vec<Document>> {
        self.find_with_limit(key, value, self.default_limit).await
    }

    /// Equality lookup returning at most `limit` documents.
    pub async fn find_with_limit(
        &self,
        key: &str,
        value: impl Into<Bson>,
        limit: usize,
    ) -> StoreResult<Vec<Document>> {
        let value = value.into();

        self.check_name()?;
        require("key", key)?;
        require_value(&value)?;
        debug!(collection = %self.name, key, limit, "find documents");

        self.run(Query::builder().filter(Filter::eq(key, value)).limit(limit).build())
            .await
    }

    /// Equality lookup returning only the first match.
    pub async fn find_one(
        &self,
        key: &str,
        value: impl Into<Bson>,
    ) -> StoreResult<Option<Document>> {
        Ok(self.find_with_limit(key, value, 1).await?.into_iter().next())
    }

    /// Runs a single `key op value` comparison.
    ///
    /// ```ignore
    /// let op: FieldOp = "array-contains".parse()?;
    /// let hunters = bugs.where_op("tags", op, "hunter").await?;
    /// ```
    pub async fn where_op(
        &self,
        key: &str,
        op: FieldOp,
        value: impl Into<Bson>,
    ) -> StoreResult<Vec<Document>> {
        self.check_name()?;
        require("key", key)?;
        debug!(collection = %self.name, key, op = %op, "where");

        self.run(Query::builder().filter(Expr::field(key.to_string(), op, value.into())).build())
            .await
    }

    /// Runs a conjunction of comparisons; a document must satisfy every condition.
    pub async fn where_and(&self, conditions: Vec<Condition>) -> StoreResult<Vec<Document>> {
        self.check_name()?;
        if conditions.is_empty() {
            return Err(StoreError::missing("conditions"));
        }
        for condition in &conditions {
            require("key", &condition.key)?;
        }
        debug!(collection = %self.name, conditions = conditions.len(), "where and");

        self.run(
            Query::builder()
                .filter(Filter::and(conditions.into_iter().map(Expr::from)))
                .build(),
        )
        .await
    }

    /// Lists documents sorted by `key`, capped at `limit` or the default limit.
    ///
    /// Documents that lack `key` entirely are left out, matching how ordered
    /// queries behave on hosted document stores.
    pub async fn order_by(
        &self,
        key: &str,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        self.check_name()?;
        require("key", key)?;

        let limit = limit.unwrap_or(self.default_limit);
        debug!(collection = %self.name, key, ?direction, limit, "order by");

        self.run(Query {
            filter: Some(Filter::exists(key)),
            limit: Some(limit),
            sort: Some(Sort { field: key.to_string(), direction }),
        })
        .await
    }

    /// Writes a document under the given id, replacing whatever was there.
    pub async fn create(&self, id: &str, document: Document) -> StoreResult<Document> {
        self.check_name()?;
        require("id", id)?;
        debug!(collection = %self.name, id, "create document");

        self.backend.set_document(&self.name, id, document.clone()).await?;

        Ok(with_id(id.to_string(), document))
    }

    /// Replace-or-insert by id.
    pub async fn update(&self, id: &str, document: Document) -> StoreResult<Document> {
        self.check_name()?;
        require("id", id)?;
        debug!(collection = %self.name, id, "update document");

        self.backend.set_document(&self.name, id, document.clone()).await?;

        Ok(with_id(id.to_string(), document))
    }

    /// Merge-upsert by id: the given fields are merged into the stored document,
    /// which is created if absent. Returns the merged fields with the id.
    pub async fn update_one(&self, id: &str, document: Document) -> StoreResult<Document> {
        self.check_name()?;
        require("id", id)?;
        debug!(collection = %self.name, id, "merge document");

        self.backend.merge_document(&self.name, id, document.clone()).await?;

        Ok(with_id(id.to_string(), document))
    }

    /// Inserts a document under an id assigned by the store.
    pub async fn add(&self, document: Document) -> StoreResult<Document> {
        self.check_name()?;
        debug!(collection = %self.name, "add document");

        let id = self.backend.add_document(&self.name, document.clone()).await?;

        Ok(with_id(id, document))
    }

    /// Deletes by id. Always `true` once the backend call succeeds, whether or not
    /// anything was stored under `id`.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check_name()?;
        require("id", id)?;
        debug!(collection = %self.name, id, "delete document");

        self.backend.delete_document(&self.name, id).await?;

        Ok(true)
    }

    /// Whether any document has `key` equal to `value`.
    pub async fn exists(&self, key: &str, value: impl Into<Bson>) -> StoreResult<bool> {
        Ok(!self.find_with_limit(key, value, 1).await?.is_empty())
    }

    async fn run(&self, query: Query) -> StoreResult<Vec<Document>> {
        Ok(self
            .backend
            .query_documents(&self.name, query)
            .await?
            .into_iter()
            .map(|(id, document)| with_id(id, document))
            .collect())
    }

    fn check_name(&self) -> StoreResult<()> {
        require("collection", &self.name)
    }
}

fn require(what: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::missing(what));
    }

    Ok(())
}

fn require_value(value: &Bson) -> StoreResult<()> {
    match value {
        Bson::Null | Bson::Undefined => Err(StoreError::missing("value")),
        _ => Ok(()),
    }
}

fn with_id(id: String, mut document: Document) -> Document {
    document.insert(ID_FIELD, id);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::doc;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    /// Counts backend calls and remembers the last query.
    #[derive(Debug, Default)]
    struct Recording {
        calls: AtomicUsize,
        last_query: Mutex<Option<Query>>,
    }

    impl Recording {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_query(&self) -> Option<Query> {
            self.last_query.lock().unwrap().clone()
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StoreBackend for Recording {
        async fn get_document(&self, _: &str, id: &str) -> StoreResult<Option<Document>> {
            self.hit();
            Ok((id == "1").then(|| doc! { "name": "Steve" }))
        }

        async fn query_documents(
            &self,
            _: &str,
            query: Query,
        ) -> StoreResult<Vec<(String, Document)>> {
            self.hit();
            *self.last_query.lock().unwrap() = Some(query);
            Ok(vec![
                ("1".into(), doc! { "name": "Steve" }),
                ("2".into(), doc! { "name": "Ray" }),
            ])
        }

        async fn set_document(&self, _: &str, _: &str, _: Document) -> StoreResult<()> {
            self.hit();
            Ok(())
        }

        async fn merge_document(&self, _: &str, _: &str, _: Document) -> StoreResult<()> {
            self.hit();
            Ok(())
        }

        async fn add_document(&self, _: &str, _: Document) -> StoreResult<String> {
            self.hit();
            Ok("assigned".into())
        }

        async fn delete_document(&self, _: &str, _: &str) -> StoreResult<()> {
            self.hit();
            Ok(())
        }
    }

    fn bugs(backend: &Recording) -> Collection<'_, Recording> {
        Collection::new("bugs".into(), backend, 500)
    }

    #[tokio::test]
    async fn get_merges_id_into_document() {
        let backend = Recording::default();
        let found = bugs(&backend).get("1").await.unwrap().unwrap();

        assert_eq!(found, doc! { "name": "Steve", "id": "1" });
        assert!(bugs(&backend).get("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_results_carry_their_ids() {
        let backend = Recording::default();
        let all = bugs(&backend).all().await.unwrap();

        let ids: Vec<_> = all.iter().map(|d| d.get_str("id").unwrap()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(backend.last_query(), Some(Query::new()));
    }

    #[tokio::test]
    async fn preconditions_fail_before_any_backend_call() {
        let backend = Recording::default();
        let unnamed = Collection::new(String::new(), &backend, 500);

        assert!(matches!(unnamed.all().await, Err(StoreError::Precondition(_))));
        assert!(matches!(bugs(&backend).get("").await, Err(StoreError::Precondition(_))));
        assert!(matches!(
            bugs(&backend).find("", "Steve").await,
            Err(StoreError::Precondition(_))
        ));
        assert!(matches!(
            bugs(&backend).find("name", Bson::Null).await,
            Err(StoreError::Precondition(_))
        ));
        assert!(matches!(
            bugs(&backend).create("", doc! {}).await,
            Err(StoreError::Precondition(_))
        ));
        assert!(matches!(bugs(&backend).delete("").await, Err(StoreError::Precondition(_))));
        assert!(matches!(
            bugs(&backend).where_and(Vec::new()).await,
            Err(StoreError::Precondition(_))
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn precondition_message_names_the_argument() {
        let backend = Recording::default();
        let err = bugs(&backend).get("").await.unwrap_err();

        assert_eq!(err.to_string(), "Precondition failed: Need id please");
    }

    #[tokio::test]
    async fn find_applies_default_limit() {
        let backend = Recording::default();
        bugs(&backend).find("name", "Steve").await.unwrap();

        let query = backend.last_query().unwrap();
        assert_eq!(query.limit, Some(500));
        assert_eq!(query.filter, Some(Filter::eq("name", "Steve")));
    }

    #[tokio::test]
    async fn order_by_filters_on_presence_and_sorts() {
        let backend = Recording::default();
        bugs(&backend).order_by("name", SortDirection::Desc, None).await.unwrap();

        let query = backend.last_query().unwrap();
        assert_eq!(query.filter, Some(Filter::exists("name")));
        assert_eq!(query.limit, Some(500));
        assert_eq!(
            query.sort,
            Some(Sort { field: "name".into(), direction: SortDirection::Desc })
        );
    }

    #[tokio::test]
    async fn where_and_builds_a_conjunction() {
        let backend = Recording::default();
        bugs(&backend)
            .where_and(vec![
                Condition::new("name", FieldOp::Eq, "Steve"),
                Condition::new("legs", FieldOp::Gte, 6),
            ])
            .await
            .unwrap();

        match backend.last_query().unwrap().filter {
            Some(Expr::And(clauses)) => assert_eq!(clauses.len(), 2),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_returns_the_assigned_id() {
        let backend = Recording::default();
        let added = bugs(&backend).add(doc! { "name": "Steve" }).await.unwrap();

        assert_eq!(added.get_str("id").unwrap(), "assigned");
    }

    #[tokio::test]
    async fn delete_reports_true() {
        let backend = Recording::default();

        assert!(bugs(&backend).delete("missing").await.unwrap());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn exists_asks_for_a_single_match() {
        let backend = Recording::default();

        assert!(bugs(&backend).exists("name", "Steve").await.unwrap());
        assert_eq!(backend.last_query().unwrap().limit, Some(1));
    }
}
