use claims::{assert_err, assert_ok};
use rag_deployer::domain::{
    entities::record::{Record, RecordId},
    services::data_loader::{load, load_queries, DataLoaderError},
};
use serde_json::json;

use crate::helpers::{write_json_file, write_raw_file};

#[test]
fn load_joins_chunks_and_metadata_files_on_their_id() {
    let chunks = write_json_file(&json!([
        {"id": 1, "content": "A"},
        {"id": 2, "content": "B"}
    ]));
    let metadata = write_json_file(&json!([
        {"id": 1, "folder": "F", "topic": "T"},
        {"id": 2, "folder": "F", "topic": "T"}
    ]));

    let records = assert_ok!(load(chunks.path(), metadata.path()));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id(), 1);
    assert_eq!(records[0].content, "A");
    assert_eq!(records[0].metadata.get_str("folder"), Some("F"));
    assert_eq!(records[1].id(), 2);
    assert_eq!(records[1].metadata.get_str("topic"), Some("T"));
}

#[test]
fn load_drops_chunks_missing_from_the_metadata_file() {
    let chunks = write_json_file(&json!([
        {"id": 1, "content": "A"},
        {"id": 2, "content": "B"},
        {"id": 3, "content": "C"}
    ]));
    let metadata = write_json_file(&json!([
        {"id": 1, "folder": "F", "topic": "T"},
        {"id": 2, "folder": "F", "topic": "T"},
        {"id": 4, "folder": "F", "topic": "T"}
    ]));

    let records = assert_ok!(load(chunks.path(), metadata.path()));

    let ids: Vec<RecordId> = records.iter().map(Record::id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn load_reads_files_keyed_by_data_id() {
    let chunks = write_json_file(&json!([{"data_id": 5, "content": "E"}]));
    let metadata = write_json_file(&json!([
        {"data_id": 5, "folder": "F", "topic": "T", "tags": ["x"]}
    ]));

    let records = assert_ok!(load(chunks.path(), metadata.path()));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), 5);
    assert_eq!(records[0].metadata.get("tags"), Some(&json!(["x"])));
}

#[test]
fn malformed_chunks_file_is_an_error() {
    let chunks = write_raw_file("[{\"id\": 1, \"content\": ");
    let metadata = write_json_file(&json!([]));

    let error = assert_err!(load(chunks.path(), metadata.path()));

    assert!(matches!(error, DataLoaderError::InvalidJson { path, .. } if path == chunks.path()));
}

#[test]
fn missing_metadata_file_is_an_error() {
    let chunks = write_json_file(&json!([]));
    let metadata = std::env::temp_dir().join("rag_deployer_test_does_not_exist.json");

    let error = assert_err!(load(chunks.path(), metadata.as_path()));

    assert!(matches!(error, DataLoaderError::UnreadableFile { .. }));
}

#[test]
fn load_queries_reads_the_expected_labels() {
    let queries_file = write_json_file(&json!([
        {"query": "When are taxes due?", "folder": "law", "topic": "tax"},
        {"query": "Paid leave?", "expected_folder": "law", "expected_topic": "labour"}
    ]));

    let queries = assert_ok!(load_queries(queries_file.path()));

    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].folder, "law");
    assert_eq!(queries[1].topic, "labour");
}

#[test]
fn metadata_entries_with_bad_labels_or_no_id_do_not_fail_the_load() {
    let chunks = write_json_file(&json!([
        {"id": 1, "content": "A"},
        {"id": 2, "content": "B"},
        {"id": 3, "content": "C"}
    ]));
    let metadata = write_json_file(&json!([
        {"id": 1, "folder": "F", "topic": "T"},
        {"id": 2, "folder": "F"},
        {"id": 3, "folder": ["F"], "topic": "T"},
        {"folder": "F", "topic": "T"}
    ]));

    let records = assert_ok!(load(chunks.path(), metadata.path()));

    let ids: Vec<RecordId> = records.iter().map(Record::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}
