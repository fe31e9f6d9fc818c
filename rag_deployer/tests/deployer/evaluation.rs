use rag_deployer::domain::{
    entities::query_record::QueryRecord, services::evaluation::evaluate,
};

use crate::helpers::{a_record, spawn_deployer, TEST_COLLECTION};

fn a_query(query: &str, folder: &str, topic: &str) -> QueryRecord {
    QueryRecord {
        query: query.to_string(),
        folder: folder.to_string(),
        topic: topic.to_string(),
    }
}

#[tokio::test]
async fn evaluation_tallies_every_query_of_the_run() {
    let app = spawn_deployer();
    app.deployer.ensure_collection(TEST_COLLECTION).await;
    let records = vec![
        a_record(1, "law", "tax", "Income tax returns are due in April."),
        a_record(2, "law", "tax", "Late tax payments carry a penalty."),
        a_record(3, "health", "pharmacy", "Antibiotics need a prescription."),
    ];
    app.deployer.upload(TEST_COLLECTION, &records, 100).await;

    // With 3 points and a limit of 3, every query gets back the whole collection
    let queries = vec![
        a_query("When are tax returns due?", "law", "tax"),
        a_query("Do antibiotics need a prescription?", "health", "pharmacy"),
    ];

    let report = evaluate(&app.deployer, TEST_COLLECTION, &queries, 3).await;

    assert_eq!(report.queries.len(), 2);
    assert_eq!(report.queries[0].correct, 2);
    assert_eq!(report.queries[0].total, 3);
    assert_eq!(report.queries[1].correct, 1);
    assert_eq!(report.queries[1].total, 3);
    assert_eq!(report.correct(), 3);
    assert_eq!(report.total(), 6);
    assert_eq!(report.ratio(), 0.5);
}

#[tokio::test]
async fn evaluation_without_results_has_a_zero_ratio() {
    let app = spawn_deployer();
    app.deployer.ensure_collection(TEST_COLLECTION).await;

    let report = evaluate(
        &app.deployer,
        TEST_COLLECTION,
        &[a_query("anything", "law", "tax")],
        3,
    )
    .await;

    assert_eq!(report.queries[0].total, 0);
    assert_eq!(report.ratio(), 0.0);
}
