mod metrics;

pub use metrics::{average_precision, calculate_scores};

use tracing::warn;

use crate::types::{Query, QueryResult, RetrievalRun, RetrievedDocument};

/// Joins a retrieval engine's ranked output against the filtered query set.
///
/// A query absent from the engine's output is skipped with a diagnostic; the
/// returned set covers only queries present in both. The retrieved list is
/// ordered by rank ascending, since engine run maps carry no order of their
/// own.
pub fn merge_results(queries: Vec<Query>, run: &RetrievalRun) -> Vec<QueryResult> {
    let mut results = Vec::new();
    for query in queries {
        let Some(docs) = run.get(&query.query_id) else {
            warn!(query_id = %query.query_id, "query missing from retrieval output; skipping");
            continue;
        };

        let mut retrieved: Vec<RetrievedDocument> = docs
            .iter()
            .map(|(doc_id, entry)| RetrievedDocument {
                doc_id: doc_id.clone(),
                rank: entry.rank,
                score: entry.score,
                is_relevant: query.relevant_documents.contains(doc_id),
            })
            .collect();
        retrieved.sort_by(|a, b| a.rank.cmp(&b.rank));

        let num_rel_ret = retrieved.iter().filter(|d| d.is_relevant).count();
        results.push(QueryResult {
            query_id: query.query_id,
            query_text: query.query_text,
            relevant_documents: query.relevant_documents,
            num_rel: query.num_rel,
            num_ret: retrieved.len(),
            num_rel_ret,
            retrieved_documents: retrieved,
        });
    }
    results
}
