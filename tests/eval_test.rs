use std::collections::HashMap;

use bioqa::eval::{calculate_scores, merge_results};
use bioqa::types::{Query, RetrievalRun, RetrievedEntry};

fn query(id: &str, relevant: &[&str]) -> Query {
    let mut q = Query::new(id, &format!("text of {id}"), 0);
    q.relevant_documents = relevant.iter().map(|d| d.to_string()).collect();
    q.num_rel = q.relevant_documents.len();
    q
}

fn run_entry(docs: &[(&str, usize, f64)]) -> HashMap<String, RetrievedEntry> {
    docs.iter()
        .map(|&(id, rank, score)| (id.to_string(), RetrievedEntry { rank, score }))
        .collect()
}

#[test]
fn test_merge_marks_relevance_and_counts() {
    let queries = vec![query("q1", &["A", "B", "C"])];
    let mut run: RetrievalRun = HashMap::new();
    run.insert(
        "q1".to_string(),
        run_entry(&[("A", 0, 3.0), ("X", 1, 2.0), ("B", 2, 1.0)]),
    );

    let results = merge_results(queries, &run);
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.num_rel, 3);
    assert_eq!(r.num_ret, 3);
    assert_eq!(r.num_rel_ret, 2);

    let flags: Vec<(&str, bool)> = r
        .retrieved_documents
        .iter()
        .map(|d| (d.doc_id.as_str(), d.is_relevant))
        .collect();
    assert_eq!(flags, vec![("A", true), ("X", false), ("B", true)]);

    let (metrics, filtered) = calculate_scores(&results);
    // tp=2, fp=1, fn=1: precision = recall = f1 = 2/3
    assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-12);
    assert!((metrics.f1 - 2.0 / 3.0).abs() < 1e-12);
    // hits at ranks 1 and 3: (1/1 + 2/3) / 3
    assert!((metrics.map - (1.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
    assert_eq!(filtered.len(), 1);
}

#[test]
fn test_merge_skips_queries_missing_from_run() {
    let queries = vec![query("q1", &["A"]), query("q2", &["B"])];
    let mut run: RetrievalRun = HashMap::new();
    run.insert("q1".to_string(), run_entry(&[("A", 0, 1.0)]));

    let results = merge_results(queries, &run);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].query_id, "q1");
}

#[test]
fn test_merge_orders_by_rank_not_map_order() {
    let queries = vec![query("q1", &["A"])];
    let mut run: RetrievalRun = HashMap::new();
    // hash map order carries no meaning; ranks must decide
    run.insert(
        "q1".to_string(),
        run_entry(&[("Z", 2, 0.1), ("A", 0, 0.9), ("M", 1, 0.5)]),
    );

    let results = merge_results(queries, &run);
    let order: Vec<&str> = results[0]
        .retrieved_documents
        .iter()
        .map(|d| d.doc_id.as_str())
        .collect();
    assert_eq!(order, vec!["A", "M", "Z"]);
}

#[test]
fn test_zero_hit_query_counts_toward_map_but_not_filtered() {
    let queries = vec![query("q1", &["A"]), query("q2", &["B", "C"])];
    let mut run: RetrievalRun = HashMap::new();
    run.insert("q1".to_string(), run_entry(&[("A", 0, 1.0)]));
    run.insert("q2".to_string(), run_entry(&[("X", 0, 1.0), ("Y", 1, 0.5)]));

    let results = merge_results(queries, &run);
    let (metrics, filtered) = calculate_scores(&results);

    // q1 is a perfect ranking, q2 found nothing
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].query_id, "q1");
    // AP(q1)=1.0, AP(q2)=0.0, map averages over both
    assert!((metrics.map - 0.5).abs() < 1e-12);
    // q2 still contributes two false positives and two false negatives
    assert!((metrics.precision - 1.0 / 3.0).abs() < 1e-12);
    assert!((metrics.recall - 1.0 / 3.0).abs() < 1e-12);
    assert!(!metrics.map.is_nan());
}

#[test]
fn test_empty_results_yield_all_zero_metrics() {
    let (metrics, filtered) = calculate_scores(&[]);
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.f1, 0.0);
    assert_eq!(metrics.map, 0.0);
    assert!(filtered.is_empty());
}

#[test]
fn test_query_with_empty_retrieval_list() {
    let queries = vec![query("q1", &["A", "B"])];
    let mut run: RetrievalRun = HashMap::new();
    run.insert("q1".to_string(), HashMap::new());

    let results = merge_results(queries, &run);
    assert_eq!(results[0].num_ret, 0);
    assert_eq!(results[0].num_rel_ret, 0);

    let (metrics, filtered) = calculate_scores(&results);
    // nothing retrieved: both relevant documents are false negatives
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert!(filtered.is_empty());
}
