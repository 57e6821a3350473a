use firefly::{config::FireflyConfig, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
struct Firefly {
    id: String,
    created_at: String,
    timestamp: i64,
    glow: i32,
}

#[tokio::test]
async fn default_config_connects_to_memory() {
    let store = FireflyConfig::default().connect().await.unwrap();

    let mut firefly = Firefly::build(doc! { "glow": 3 }).unwrap();
    firefly.save(&store).await.unwrap();

    assert_eq!(Firefly::collection_name(), "fireflies");
    assert_eq!(Firefly::all(&store).await.unwrap().len(), 1);
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn configured_limit_reaches_the_store() {
    let config = FireflyConfig::from_toml_str(
        r#"
        [store]
        backend = "memory"
        default_limit = 2
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let store = config.connect().await.unwrap();
    assert_eq!(store.options().default_limit, 2);

    for glow in 0..3 {
        Firefly::create(&store, doc! { "glow": glow }).await.unwrap();
    }

    let ordered = Firefly::where_key_exists(&store, "glow").await.unwrap();
    let glows: Vec<_> = ordered.iter().map(|d| d.get_i32("glow").unwrap()).collect();
    assert_eq!(glows, [0, 1]);
}

#[cfg(not(feature = "mongodb"))]
#[tokio::test]
async fn mongodb_backend_needs_the_feature() {
    let config = FireflyConfig::from_toml_str(
        r#"
        [store]
        backend = "mongodb"

        [store.mongodb]
        uri = "mongodb://localhost:27017"
        database = "fireflies"
        "#,
    )
    .unwrap();

    assert!(matches!(
        config.connect().await,
        Err(StoreError::Initialization(_))
    ));
}
