use std::path::Path;

use claims::{assert_err, assert_ok};
use rag_deployer::{
    configuration::{
        DeploymentSettings, EmbeddingSettings, EvaluationSettings, QdrantSettings, Settings,
    },
    startup::{Application, ApplicationError},
};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::helpers::{
    spawn_deployer, write_json_file, write_raw_file, TestDeployer, TEST_COLLECTION,
    TEST_DIMENSIONALITY,
};

fn test_settings(chunks_path: &Path, metadata_path: &Path, queries_path: Option<&Path>) -> Settings {
    Settings {
        qdrant: QdrantSettings {
            host: "localhost".into(),
            grpc_port: 6334,
            api_key: None,
            collection: TEST_COLLECTION.into(),
        },
        embedding: EmbeddingSettings {
            model: "all-minilm-l12-v2".into(),
        },
        deployment: DeploymentSettings {
            chunks_path: chunks_path.to_path_buf(),
            metadata_path: metadata_path.to_path_buf(),
            batch_size: 2,
        },
        evaluation: EvaluationSettings {
            queries_path: queries_path.map(Path::to_path_buf),
            limit: 3,
        },
    }
}

fn spawn_application(settings: Settings) -> (Application, TestDeployer) {
    let test_deployer = spawn_deployer();
    let application = Application::with_services(
        settings,
        test_deployer.embeddings_service.clone(),
        test_deployer.vector_store.clone(),
    );
    (application, test_deployer)
}

/// Files are removed once the handles are dropped, keep them until the end of the test
fn corpus_files() -> (NamedTempFile, NamedTempFile) {
    let chunks = write_json_file(&json!([
        {"id": 1, "content": "Income tax returns are due in April."},
        {"id": 2, "content": "Employees get twelve days of paid leave."},
        {"id": 3, "content": "This chunk has no metadata."}
    ]));
    let metadata = write_json_file(&json!([
        {"id": 1, "folder": "law", "topic": "tax"},
        {"id": 2, "folder": "law", "topic": "labour"}
    ]));
    (chunks, metadata)
}

#[tokio::test]
async fn run_deploys_the_joinable_records_and_evaluates_them() {
    let (chunks, metadata) = corpus_files();
    let queries = write_json_file(&json!([
        {"query": "When are tax returns due?", "folder": "law", "topic": "tax"},
        {"query": "How much paid leave?", "folder": "law", "topic": "labour"}
    ]));
    let (application, test_deployer) =
        spawn_application(test_settings(
        chunks.path(),
        metadata.path(),
        Some(queries.path()),
    ));

    let report = assert_ok!(application.run().await);

    assert_eq!(report.upload.total, 2);
    assert_eq!(report.upload.uploaded, 2);
    assert_eq!(test_deployer.vector_store.upsert_batch_sizes(), vec![2]);

    let evaluation = report.evaluation.expect("Evaluation did not run");
    assert_eq!(evaluation.queries.len(), 2);
    // Both points are returned for each query, one of them with the expected labels
    assert_eq!(evaluation.correct(), 2);
    assert_eq!(evaluation.total(), 4);
}

#[tokio::test]
async fn run_twice_reuses_the_collection_and_overwrites_the_points() {
    let (chunks, metadata) = corpus_files();
    let (application, test_deployer) =
        spawn_application(test_settings(chunks.path(), metadata.path(), None));

    assert_ok!(application.run().await);
    let report = assert_ok!(application.run().await);

    assert!(report.evaluation.is_none());
    assert_eq!(test_deployer.vector_store.created_collections().len(), 1);
    assert_eq!(test_deployer.vector_store.points(TEST_COLLECTION).len(), 2);
}

#[tokio::test]
async fn run_fails_on_a_malformed_metadata_file() {
    let (chunks, _) = corpus_files();
    let metadata = write_raw_file("{\"id\": 1}");
    let (application, test_deployer) =
        spawn_application(test_settings(chunks.path(), metadata.path(), None));

    let error = assert_err!(application.run().await);

    assert!(matches!(error, ApplicationError::DataLoaderError(_)));
    assert!(test_deployer.vector_store.created_collections().is_empty());
}

#[tokio::test]
async fn run_fails_when_the_collection_can_not_be_provisioned() {
    let (chunks, metadata) = corpus_files();
    let (application, test_deployer) =
        spawn_application(test_settings(chunks.path(), metadata.path(), None));
    test_deployer.vector_store.set_unavailable(true);

    let error = assert_err!(application.run().await);

    assert!(matches!(error, ApplicationError::CollectionUnavailable(_)));
    assert!(test_deployer.vector_store.upsert_batch_sizes().is_empty());
}

#[tokio::test]
async fn application_deployer_uses_the_embeddings_dimensionality() {
    let (chunks, metadata) = corpus_files();
    let (application, _test_deployer) =
        spawn_application(test_settings(chunks.path(), metadata.path(), None));

    assert_eq!(application.deployer().vector_size(), TEST_DIMENSIONALITY);
}

#[tokio::test]
async fn run_skips_records_with_malformed_metadata_and_deploys_the_others() {
    let chunks = write_json_file(&json!([
        {"id": 1, "content": "Income tax returns are due in April."},
        {"id": 2, "content": "Employees get twelve days of paid leave."},
        {"id": 3, "content": "Antibiotics need a prescription."},
        {"id": 4, "content": "Medical expenses can be deducted."}
    ]));
    let metadata = write_json_file(&json!([
        {"id": 1, "folder": "law", "topic": "tax"},
        {"id": 2, "folder": "law"},
        {"id": 3, "folder": {"name": "health"}, "topic": "pharmacy"},
        {"folder": "health", "topic": "tax"}
    ]));
    let (application, test_deployer) =
        spawn_application(test_settings(chunks.path(), metadata.path(), None));

    let report = assert_ok!(application.run().await);

    assert_eq!(report.upload.total, 3);
    assert_eq!(report.upload.uploaded, 2);
    assert_eq!(report.upload.skipped_ids, vec![3]);

    let points = test_deployer.vector_store.points(TEST_COLLECTION);
    let ids: Vec<u64> = points.iter().map(|point| point.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(points[1].payload.get_str("topic"), None);
}
