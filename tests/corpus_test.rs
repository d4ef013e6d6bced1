use std::cell::RefCell;
use std::rc::Rc;

use bioqa::cache::ResolutionCache;
use bioqa::corpus::export::{load_query_file, write_corpus_csv, write_query_file};
use bioqa::corpus::CorpusBuilder;
use bioqa::resolver::{LookupApi, LookupError, LookupResult, UrlResolver};
use bioqa::types::AnswerRecord;
use tempfile::TempDir;

/// Lookup service that fails every call; corpus tests only use references
/// that resolve without the network, so any call at all is a test failure.
struct OfflineLookup {
    calls: Rc<RefCell<usize>>,
}

impl OfflineLookup {
    fn new() -> (Self, Rc<RefCell<usize>>) {
        let calls = Rc::new(RefCell::new(0));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn fail(&self) -> LookupError {
        *self.calls.borrow_mut() += 1;
        LookupError {
            message: "offline".to_string(),
        }
    }
}

impl LookupApi for OfflineLookup {
    fn convert_id(&mut self, _accession: &str) -> LookupResult<Option<String>> {
        Err(self.fail())
    }
    fn convert_id_text(&mut self, _accession: &str) -> LookupResult<Option<String>> {
        Err(self.fail())
    }
    fn search(&mut self, _term: &str) -> LookupResult<Vec<String>> {
        Err(self.fail())
    }
    fn article_pmid(&mut self, _pii: &str) -> LookupResult<Option<String>> {
        Err(self.fail())
    }
}

fn offline_resolver(dir: &TempDir) -> (UrlResolver<OfflineLookup>, Rc<RefCell<usize>>) {
    let cache =
        ResolutionCache::open(&dir.path().join("cache.db"), 0).expect("failed to open cache");
    let (client, calls) = OfflineLookup::new();
    (
        UrlResolver::new(cache, client).expect("failed to build resolver"),
        calls,
    )
}

fn answer(qid: &str, aid: &str, score: i64, links: &[&str]) -> AnswerRecord {
    AnswerRecord {
        question_id: qid.to_string(),
        answer_id: aid.to_string(),
        score,
        question_title: format!("question {qid}"),
        answer_text: "some answer".to_string(),
        links: links.iter().map(|l| l.to_string()).collect(),
    }
}

/// Direct PubMed links resolve via the path-segment fallback, no network.
fn pubmed_link(pmid: &str) -> String {
    format!("http://www.ncbi.nlm.nih.gov/pubmed/{pmid}")
}

#[test]
fn test_build_and_dedup_across_answers() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(-100, 1, false);

    let link_a = pubmed_link("11111");
    let a1 = answer("q1", "a1", 3, &[&link_a, &pubmed_link("22222")]);
    // second answer repeats a document of the first
    let a2 = answer("q1", "a2", 5, &[&link_a]);

    builder
        .add_answer(&mut resolver, &a1, "question q1", 7, None)
        .expect("add_answer failed");
    builder
        .add_answer(&mut resolver, &a2, "question q1", 7, None)
        .expect("add_answer failed");

    let (corpus, counters) = builder.finalize();
    assert_eq!(corpus.queries.len(), 1);
    let query = &corpus.queries[0];
    assert_eq!(query.num_rel, 2);
    assert!(query.relevant_documents.contains("11111"));
    assert!(query.relevant_documents.contains("22222"));
    // the duplicate produced no third row
    assert_eq!(corpus.rows.len(), 2);
    // a2 contributed nothing, so it vanished from the per-answer counts
    assert!(!counters.answer_pubmed_counts.contains_key("a2"));
    assert!(!counters.answer_scores.contains_key("a2"));
    assert_eq!(*calls.borrow(), 0, "no lookup should have gone out");
}

#[test]
fn test_threshold_excludes_query_and_rows() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, _calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(-100, 1, false);

    let good = answer("q1", "a1", 1, &[&pubmed_link("11111")]);
    // homepage link: candidate by marker, but resolves to a negative
    let bad = answer("q2", "a2", 1, &["http://www.ncbi.nlm.nih.gov/pubmed/"]);

    builder
        .add_answer(&mut resolver, &good, "question q1", 0, None)
        .expect("add_answer failed");
    builder
        .add_answer(&mut resolver, &bad, "question q2", 0, None)
        .expect("add_answer failed");

    let (corpus, counters) = builder.finalize();
    assert_eq!(corpus.queries.len(), 1);
    assert_eq!(corpus.queries[0].query_id, "q1");
    assert!(
        corpus.rows.iter().all(|r| r.question_id == "q1"),
        "rows of an excluded query must be discarded"
    );
    assert_eq!(counters.excluded_questions, 1);
    assert!(!counters.question_pubmed_counts.contains_key("q2"));
}

#[test]
fn test_min_count_two_drops_single_document_query() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, _calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(-100, 2, false);

    let one_doc = answer("q1", "a1", 1, &[&pubmed_link("11111")]);
    let two_docs = answer("q2", "a2", 1, &[&pubmed_link("22222"), &pubmed_link("33333")]);

    builder
        .add_answer(&mut resolver, &one_doc, "question q1", 0, None)
        .expect("add_answer failed");
    builder
        .add_answer(&mut resolver, &two_docs, "question q2", 0, None)
        .expect("add_answer failed");

    let (corpus, _counters) = builder.finalize();
    assert_eq!(corpus.queries.len(), 1);
    assert_eq!(corpus.queries[0].query_id, "q2");
    assert_eq!(corpus.rows.len(), 2);
}

#[test]
fn test_below_score_answers_are_skipped() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, _calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(2, 1, false);

    let low = answer("q1", "a1", 1, &[&pubmed_link("11111")]);
    builder
        .add_answer(&mut resolver, &low, "question q1", 0, None)
        .expect("add_answer failed");

    let (corpus, counters) = builder.finalize();
    assert!(corpus.queries.is_empty());
    assert!(corpus.rows.is_empty());
    assert_eq!(counters.below_score_count, 1);
}

#[test]
fn test_non_candidate_links_never_reach_resolution() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(-100, 1, false);

    let social = answer(
        "q1",
        "a1",
        1,
        &[
            "https://en.wikipedia.org/wiki/Creatine",
            "https://www.reddit.com/r/science/comments/abc",
            "https://fitness.stackexchange.com/a/123",
        ],
    );
    builder
        .add_answer(&mut resolver, &social, "question q1", 0, None)
        .expect("add_answer failed");

    let (corpus, _counters) = builder.finalize();
    assert!(corpus.queries.is_empty());
    assert_eq!(*calls.borrow(), 0);
    // not even a negative cache entry: the links were filtered out up front
    assert_eq!(resolver.cache().negative_len(), 0);
}

#[test]
fn test_query_file_roundtrip_and_csv_header() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (mut resolver, _calls) = offline_resolver(&dir);
    let mut builder = CorpusBuilder::new(-100, 1, false);

    let record = answer("q1", "a1", 4, &[&pubmed_link("11111")]);
    builder
        .add_answer(&mut resolver, &record, "question q1", 9, None)
        .expect("add_answer failed");
    let (corpus, _counters) = builder.finalize();

    let query_path = dir.path().join("corpus.json");
    write_query_file(&query_path, &corpus.queries).expect("failed to write query file");
    let loaded = load_query_file(&query_path).expect("failed to load query file");
    assert_eq!(loaded, corpus.queries);
    assert_eq!(loaded[0].query_score, 9);

    let csv_path = dir.path().join("corpus.csv");
    write_corpus_csv(&csv_path, &corpus.rows).expect("failed to write corpus csv");
    let content = std::fs::read_to_string(&csv_path).expect("failed to read corpus csv");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("question_id,answer_id,question_text,question_score,pmid,pmtitle")
    );
    assert_eq!(lines.count(), corpus.rows.len());
}
