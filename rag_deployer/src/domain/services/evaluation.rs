use tracing::info;

use crate::domain::{
    entities::{query_record::QueryRecord, search_result::SearchResult},
    services::deployer::RagDeployer,
};

pub const DEFAULT_EVALUATION_LIMIT: u64 = 3;

/// Number of content characters shown for each inspected result
const CONTENT_PREVIEW_CHARS: usize = 100;

/// Tally of one query: how many of its results carry the expected folder and topic
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvaluation {
    pub query: String,
    pub correct: usize,
    pub total: usize,
}

/// Tallies of a whole evaluation run, accumulated across every query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub queries: Vec<QueryEvaluation>,
}

impl EvaluationReport {
    pub fn correct(&self) -> usize {
        self.queries.iter().map(|query| query.correct).sum()
    }

    pub fn total(&self) -> usize {
        self.queries.iter().map(|query| query.total).sum()
    }

    /// Ratio of correct results over all inspected results, 0 when nothing was returned
    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }
}

pub fn is_expected_match(result: &SearchResult, query: &QueryRecord) -> bool {
    result.folder() == Some(query.folder.as_str()) && result.topic() == Some(query.topic.as_str())
}

/// Runs every labeled query unfiltered and counts the results matching the expected labels
#[tracing::instrument(name = "Evaluating retrieval", skip(deployer, queries), fields(nb_queries = queries.len()))]
pub async fn evaluate(
    deployer: &RagDeployer,
    collection_name: &str,
    queries: &[QueryRecord],
    limit: u64,
) -> EvaluationReport {
    let mut report = EvaluationReport::default();

    for query in queries {
        info!("Searching: '{}'", query.query);
        let results = deployer
            .search(collection_name, &query.query, limit, None, None)
            .await;

        let mut correct = 0;
        for (rank, result) in results.iter().enumerate() {
            let is_match = is_expected_match(result, query);
            if is_match {
                correct += 1;
            }

            info!(
                rank = rank + 1,
                score = result.score,
                id = ?result.id(),
                topic = ?result.topic(),
                folder = ?result.folder(),
                is_match,
                "{}...",
                content_preview(&result.content)
            );
        }

        report.queries.push(QueryEvaluation {
            query: query.query.clone(),
            correct,
            total: results.len(),
        });
    }

    info!(
        correct = report.correct(),
        total = report.total(),
        ratio = report.ratio(),
        "Correct results: {}/{}",
        report.correct(),
        report.total()
    );
    report
}

fn content_preview(content: &str) -> &str {
    match content.char_indices().nth(CONTENT_PREVIEW_CHARS) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}
