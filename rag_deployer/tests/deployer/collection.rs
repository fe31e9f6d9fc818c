use rag_deployer::domain::entities::collection::Distance;

use crate::helpers::{a_record, spawn_deployer, TEST_COLLECTION, TEST_DIMENSIONALITY};

#[tokio::test]
async fn ensure_collection_creates_a_missing_collection_sized_for_the_embeddings() {
    let app = spawn_deployer();

    assert!(app.deployer.ensure_collection(TEST_COLLECTION).await);

    let info = app
        .deployer
        .collection_info(TEST_COLLECTION)
        .await
        .expect("Collection was not created");
    assert_eq!(info.vector_size, TEST_DIMENSIONALITY);
    assert_eq!(info.distance, Distance::Cosine);
    assert_eq!(info.points_count, 0);
}

#[tokio::test]
async fn ensure_collection_twice_creates_it_only_once() {
    let app = spawn_deployer();

    assert!(app.deployer.ensure_collection(TEST_COLLECTION).await);
    assert!(app.deployer.ensure_collection(TEST_COLLECTION).await);

    assert_eq!(
        app.vector_store.created_collections(),
        vec![TEST_COLLECTION.to_string()]
    );
}

#[tokio::test]
async fn ensure_collection_returns_false_when_the_store_is_unreachable() {
    let app = spawn_deployer();
    app.vector_store.set_unavailable(true);

    assert!(!app.deployer.ensure_collection(TEST_COLLECTION).await);
    assert!(app.vector_store.created_collections().is_empty());
}

#[tokio::test]
async fn collection_info_counts_the_uploaded_points() {
    let app = spawn_deployer();
    app.deployer.ensure_collection(TEST_COLLECTION).await;

    let records = vec![
        a_record(1, "law", "tax", "Taxes are due in April."),
        a_record(2, "law", "labour", "Twelve days of paid leave."),
    ];
    app.deployer.upload(TEST_COLLECTION, &records, 10).await;

    let info = app.deployer.collection_info(TEST_COLLECTION).await.unwrap();
    assert_eq!(info.points_count, 2);
}

#[tokio::test]
async fn collection_info_of_a_missing_collection_is_none() {
    let app = spawn_deployer();

    assert_eq!(app.deployer.collection_info("missing").await, None);
}
