use std::collections::HashSet;

use tracing::info;

use crate::types::{CorpusMetrics, QueryResult, RetrievedDocument};

/// Computes micro precision/recall/F1 and MAP over all query results.
///
/// Returns the aggregate metrics plus the filtered result set: only queries
/// with at least one true positive are retained there, though every query
/// still contributes to the pooled counts and to MAP.
///
/// Zero denominators yield 0.0 for precision, recall, F1 and AP alike;
/// never an error and never NaN.
pub fn calculate_scores(results: &[QueryResult]) -> (CorpusMetrics, Vec<QueryResult>) {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut ap_values = Vec::with_capacity(results.len());
    let mut filtered = Vec::new();

    for result in results {
        tp += result.num_rel_ret;
        fp += result.num_ret - result.num_rel_ret;

        let retrieved_ids: HashSet<&str> = result
            .retrieved_documents
            .iter()
            .map(|d| d.doc_id.as_str())
            .collect();
        fn_ += result
            .relevant_documents
            .iter()
            .filter(|d| !retrieved_ids.contains(d.as_str()))
            .count();

        ap_values.push(average_precision(
            &result.retrieved_documents,
            result.num_rel,
        ));

        if result.num_rel_ret > 0 {
            filtered.push(result.clone());
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision > 0.0 && recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let map = if ap_values.is_empty() {
        0.0
    } else {
        ap_values.iter().sum::<f64>() / ap_values.len() as f64
    };

    info!(tp, fp, fn_, evaluated = results.len(), retained = filtered.len(), "pooled counts");

    (
        CorpusMetrics {
            precision,
            recall,
            f1,
            map,
        },
        filtered,
    )
}

/// Standard rank-based average precision.
///
/// Precision is taken at each rank where a relevant document occurs, summed,
/// and divided by the query's total number of relevant documents. The
/// retrieved list must be ordered by rank ascending. Undefined cases (no
/// relevant documents, empty list, no hits) coerce to 0.0.
pub fn average_precision(retrieved: &[RetrievedDocument], num_rel: usize) -> f64 {
    if num_rel == 0 || retrieved.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut total = 0.0;
    for (i, doc) in retrieved.iter().enumerate() {
        if doc.is_relevant {
            hits += 1;
            total += hits as f64 / (i + 1) as f64;
        }
    }
    if hits == 0 {
        return 0.0;
    }
    total / num_rel as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
