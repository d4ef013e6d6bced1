pub mod export;
pub mod reader;

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::docstore::DocStore;
use crate::errors::Result;
use crate::resolver::{LookupApi, UrlResolver};
use crate::types::{AnswerRecord, CorpusRow, Query};

/// Link markers that qualify a reference for resolution. Everything else
/// (forum links, images, blogs) is skipped without a cache entry.
const CANDIDATE_MARKERS: &[&str] = &[
    "/pubmed/",
    "/pmc/articles/",
    "doi.org",
    "researchgate",
    "sciencedirect",
    "accid=",
    "pmid=",
];

/// Running counts over a corpus build, reported at the end.
#[derive(Debug, Default)]
pub struct CorpusCounters {
    pub all_questions: HashSet<String>,
    pub questions_with_pubmed: HashSet<String>,
    pub question_pubmed_counts: HashMap<String, usize>,
    pub answer_pubmed_counts: HashMap<String, usize>,
    pub answer_scores: HashMap<String, i64>,
    pub below_score_count: usize,
    pub excluded_questions: usize,
}

impl CorpusCounters {
    /// Total (question, pmid) pairs across all answers.
    pub fn total_pairs(&self) -> usize {
        self.answer_pubmed_counts.values().sum()
    }

    pub fn log_summary(&self) {
        info!(all_questions = self.all_questions.len(), "questions seen");
        info!(
            questions_with_pubmed = self.questions_with_pubmed.len(),
            answers_with_pubmed = self.answer_pubmed_counts.len(),
            "with resolved documents"
        );
        info!(
            below_score = self.below_score_count,
            excluded = self.excluded_questions,
            "skipped"
        );
        info!(total_pairs = self.total_pairs(), "question-pmid pairs");
        if !self.answer_pubmed_counts.is_empty() {
            let avg = self.total_pairs() as f64 / self.answer_pubmed_counts.len() as f64;
            info!(avg_pubmeds_per_answer = avg, "density");
        }
        if !self.answer_scores.is_empty() {
            let avg = self.answer_scores.values().sum::<i64>() as f64
                / self.answer_scores.len() as f64;
            info!(avg_answer_score = avg, "answer scores");
        }
    }
}

/// Finalized corpus: the filtered query set and the corpus rows that survived
/// with them.
#[derive(Debug, Default)]
pub struct Corpus {
    pub queries: Vec<Query>,
    pub rows: Vec<CorpusRow>,
}

/// Aggregates resolved references into per-query relevant-document sets.
///
/// Rows are buffered rather than emitted because a query's final document
/// count is only known after all of its answers have been seen; `finalize`
/// runs the second pass that drops queries below `min_a_count` together with
/// their buffered rows.
pub struct CorpusBuilder {
    min_a_score: i64,
    min_a_count: usize,
    revisit_missing: bool,
    queries: HashMap<String, Query>,
    rows: Vec<CorpusRow>,
    counters: CorpusCounters,
}

impl CorpusBuilder {
    pub fn new(min_a_score: i64, min_a_count: usize, revisit_missing: bool) -> Self {
        Self {
            min_a_score,
            min_a_count,
            revisit_missing,
            queries: HashMap::new(),
            rows: Vec::new(),
            counters: CorpusCounters::default(),
        }
    }

    /// Feeds one answer through resolution.
    ///
    /// Each candidate link is resolved; ids not yet in the query's relevant
    /// set are added and emit one buffered corpus row. An answer whose links
    /// all fail to resolve leaves no trace in the per-answer counters.
    pub fn add_answer<C: LookupApi>(
        &mut self,
        resolver: &mut UrlResolver<C>,
        record: &AnswerRecord,
        query_text: &str,
        query_score: i64,
        docstore: Option<&DocStore>,
    ) -> Result<()> {
        if record.score < self.min_a_score {
            self.counters.below_score_count += 1;
            return Ok(());
        }

        let qid = record.question_id.clone();
        let aid = record.answer_id.clone();
        self.counters.all_questions.insert(qid.clone());
        self.counters
            .question_pubmed_counts
            .entry(qid.clone())
            .or_insert(0);
        self.counters
            .answer_pubmed_counts
            .entry(aid.clone())
            .or_insert(0);
        self.counters
            .answer_scores
            .entry(aid.clone())
            .or_insert(record.score);

        let query = self
            .queries
            .entry(qid.clone())
            .or_insert_with(|| Query::new(&qid, query_text, query_score));

        for link in &record.links {
            let link = link.trim().to_lowercase();
            if link.is_empty() || !is_candidate_link(&link) {
                continue;
            }
            let link = unwrap_markdown_link(&link);
            let Some(doc_id) = resolver.resolve(link, self.revisit_missing)? else {
                continue;
            };

            if query.relevant_documents.contains(&doc_id) {
                continue;
            }
            query.relevant_documents.insert(doc_id.clone());
            *self
                .counters
                .answer_pubmed_counts
                .entry(aid.clone())
                .or_insert(0) += 1;
            *self
                .counters
                .question_pubmed_counts
                .entry(qid.clone())
                .or_insert(0) += 1;

            let pmtitle = docstore
                .and_then(|ds| ds.get(&doc_id))
                .map(|doc| doc.title)
                .unwrap_or_default();
            self.rows.push(CorpusRow {
                question_id: qid.clone(),
                answer_id: aid.clone(),
                question_text: query_text.replace('\n', " "),
                question_score: query_score,
                pmid: doc_id,
                pmtitle,
            });
        }

        // An answer that contributed nothing is dropped entirely from the
        // per-answer counts rather than partially credited.
        if self.counters.answer_pubmed_counts.get(&aid) == Some(&0) {
            self.counters.answer_pubmed_counts.remove(&aid);
            self.counters.answer_scores.remove(&aid);
        }
        Ok(())
    }

    /// Second pass: freezes `num_rel`, drops queries below the minimum
    /// document count, and discards their buffered rows.
    pub fn finalize(mut self) -> (Corpus, CorpusCounters) {
        let mut excluded: HashSet<String> = HashSet::new();
        let mut queries: Vec<Query> = Vec::new();

        for (qid, mut query) in self.queries {
            query.num_rel = query.relevant_documents.len();
            if query.num_rel < self.min_a_count {
                self.counters.question_pubmed_counts.remove(&qid);
                self.counters.excluded_questions += 1;
                excluded.insert(qid);
                continue;
            }
            if query.num_rel > 0 {
                self.counters.questions_with_pubmed.insert(qid);
            }
            queries.push(query);
        }
        queries.sort_by(|a, b| a.query_id.cmp(&b.query_id));

        let rows = self
            .rows
            .into_iter()
            .filter(|row| !excluded.contains(&row.question_id))
            .collect();

        (Corpus { queries, rows }, self.counters)
    }
}

fn is_candidate_link(link: &str) -> bool {
    CANDIDATE_MARKERS.iter().any(|m| link.contains(m))
}

/// Strips a surrounding markdown-style parenthesis wrapper. DOIs can contain
/// parentheses themselves, so a residue shorter than 5 chars falls back to
/// the original link.
fn unwrap_markdown_link(link: &str) -> &str {
    let inner = link
        .split('(')
        .last()
        .unwrap_or(link)
        .split(')')
        .next()
        .unwrap_or(link);
    if inner.len() < 5 {
        link
    } else {
        inner
    }
}
