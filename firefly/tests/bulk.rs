use async_trait::async_trait;
use bson::Document;
use firefly::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
struct Bug {
    id: String,
    created_at: String,
    timestamp: i64,
    name: String,
}

/// Wraps the in-memory store and fails writes touching a poisoned name or id.
#[derive(Debug)]
struct FlakyBackend {
    inner: InMemoryStore,
    poisoned: &'static str,
}

impl FlakyBackend {
    fn poisoned(poisoned: &'static str) -> Self {
        Self { inner: InMemoryStore::new(), poisoned }
    }

    fn check(&self, id: &str, document: Option<&Document>) -> StoreResult<()> {
        let poisoned_name = document
            .and_then(|document| document.get_str("name").ok())
            .is_some_and(|name| name == self.poisoned);

        if id == self.poisoned || poisoned_name {
            return Err(StoreError::Backend(format!("write to `{id}` refused")));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for FlakyBackend {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get_document(collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        self.inner.query_documents(collection, query).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        self.check(id, Some(&document))?;
        self.inner.set_document(collection, id, document).await
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        self.check(id, Some(&document))?;
        self.inner.merge_document(collection, id, document).await
    }

    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String> {
        self.check("", Some(&document))?;
        self.inner.add_document(collection, document).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check(id, None)?;
        self.inner.delete_document(collection, id).await
    }
}

fn bugs(names: &[&str]) -> Vec<Bug> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Bug::build(doc! { "id": format!("{i}"), "name": *name }).unwrap())
        .collect()
}

fn names(bugs: &[Bug]) -> Vec<&str> {
    bugs.iter().map(|bug| bug.name.as_str()).collect()
}

#[tokio::test]
async fn save_many_keeps_input_order() {
    let store = DocumentStore::new(InMemoryStore::new());

    let saved = Bug::save_many(&store, bugs(&["Steve", "Ray", "Dolly"])).await.unwrap();

    assert_eq!(names(&saved), ["Steve", "Ray", "Dolly"]);
    assert_eq!(Bug::all(&store).await.unwrap().len(), 3);
}

#[tokio::test]
async fn save_many_concurrent_keeps_input_order() {
    let store = DocumentStore::new(InMemoryStore::new());
    let input = bugs(&["a", "b", "c", "d", "e", "f"]);

    let saved = Bug::save_many_concurrent(&store, input.clone(), 3).await.unwrap();

    assert_eq!(names(&saved), names(&input));
    assert_eq!(Bug::all(&store).await.unwrap().len(), 6);
}

#[tokio::test]
async fn save_many_concurrent_treats_zero_as_one() {
    let store = DocumentStore::new(InMemoryStore::new());

    let saved = Bug::save_many_concurrent(&store, bugs(&["a", "b"]), 0).await.unwrap();

    assert_eq!(saved.len(), 2);
}

#[tokio::test]
async fn save_many_stops_at_the_first_failure_leaving_a_prefix() {
    let store = DocumentStore::new(FlakyBackend::poisoned("Boom"));

    let result = Bug::save_many(&store, bugs(&["Steve", "Boom", "Dolly"])).await;

    assert!(matches!(result, Err(StoreError::Backend(_))));
    let remaining = Bug::all(&store).await.unwrap();
    assert_eq!(names(&remaining), ["Steve"]);
}

#[tokio::test]
async fn delete_many_counts_deletions() {
    let store = DocumentStore::new(InMemoryStore::new());
    Bug::save_many(&store, bugs(&["Steve", "Ray", "Steve"])).await.unwrap();

    let deleted = Bug::delete_many(&store, ("name", "Steve")).await.unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(names(&Bug::all(&store).await.unwrap()), ["Ray"]);
    assert_eq!(Bug::delete_many(&store, ("name", "Steve")).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_many_is_best_effort() {
    let store = DocumentStore::new(FlakyBackend::poisoned("1"));
    for bug in bugs(&["Steve", "Steve", "Steve"]) {
        store.backend().inner.set_document("bugs", &bug.id, bug.to_document().unwrap()).await.unwrap();
    }

    let result = Bug::delete_many(&store, ("name", "Steve")).await;

    assert!(matches!(result, Err(StoreError::Backend(_))));
    let ids: Vec<_> = Bug::all(&store).await.unwrap().into_iter().map(|bug| bug.id).collect();
    assert_eq!(ids, ["1", "2"]);
}

#[tokio::test]
async fn store_failures_propagate_unchanged() {
    let store = DocumentStore::new(FlakyBackend::poisoned("Boom"));

    let err = Bug::create(&store, doc! { "name": "Boom" }).await.unwrap_err();

    assert!(err.to_string().starts_with("Backend error: write to"));
    assert!(matches!(err, StoreError::Backend(message) if message.contains("refused")));
}
