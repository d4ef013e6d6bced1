use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One answer parsed from a community Q&A export.
///
/// `links` holds the raw reference strings attached to the answer; they are
/// candidates for resolution into PMIDs, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer_id: String,
    pub score: i64,
    pub question_title: String,
    pub answer_text: String,
    pub links: Vec<String>,
}

/// A query with its ground-truth relevant document set.
///
/// Built by the corpus builder; `relevant_documents` is only mutated during
/// aggregation and is frozen once the builder finalizes. `num_rel` is derived
/// at finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query_id: String,
    pub query_text: String,
    #[serde(default)]
    pub query_score: i64,
    pub relevant_documents: BTreeSet<String>,
    #[serde(default)]
    pub num_rel: usize,
}

impl Query {
    pub fn new(query_id: &str, query_text: &str, query_score: i64) -> Self {
        Self {
            query_id: query_id.to_string(),
            query_text: query_text.to_string(),
            query_score,
            relevant_documents: BTreeSet::new(),
            num_rel: 0,
        }
    }
}

/// On-disk corpus of queries, written as JSON and consumed by `evaluate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFile {
    pub queries: Vec<Query>,
}

/// One emitted corpus row: a (question, answer, document) triple that
/// survived resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub question_id: String,
    pub answer_id: String,
    pub question_text: String,
    pub question_score: i64,
    pub pmid: String,
    pub pmtitle: String,
}

/// Rank and score a retrieval engine assigned to one candidate document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEntry {
    pub rank: usize,
    pub score: f64,
}

/// Output of a retrieval engine: for each query id, the candidate documents
/// with their rank and score. Any engine producing this shape is
/// interchangeable.
pub type RetrievalRun = HashMap<String, HashMap<String, RetrievedEntry>>;

/// One retrieved document after merging against the relevant set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub doc_id: String,
    pub rank: usize,
    pub score: f64,
    pub is_relevant: bool,
}

/// A query joined with the ranked output of a retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: String,
    pub query_text: String,
    pub relevant_documents: BTreeSet<String>,
    pub num_rel: usize,
    /// Ordered by rank, ascending.
    pub retrieved_documents: Vec<RetrievedDocument>,
    pub num_ret: usize,
    pub num_rel_ret: usize,
}

/// Per-query results persisted after an evaluation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultFile {
    pub queries: Vec<QueryResult>,
}

/// Aggregate retrieval quality over all evaluated queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetrics {
    /// Micro precision over pooled true/false positives.
    pub precision: f64,
    /// Micro recall over pooled true positives and false negatives.
    pub recall: f64,
    pub f1: f64,
    /// Mean of per-query average precision.
    pub map: f64,
}

/// Title and abstract of one PubMed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEntry {
    pub title: String,
    #[serde(rename = "abstractText")]
    pub abstract_text: String,
    #[serde(rename = "publicationDate")]
    pub publication_date: String,
}

/// One question of the BioASQ-style relevance-judgment export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioasqQuestion {
    pub id: String,
    pub body: String,
    /// Relevant documents as PubMed URLs.
    pub documents: Vec<String>,
    #[serde(rename = "type")]
    pub question_type: String,
    pub snippets: Vec<String>,
}

/// BioASQ-style relevance-judgment export file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BioasqFile {
    pub questions: Vec<BioasqQuestion>,
}
