use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::BioQaConfig;
use crate::errors::Result;
use crate::retrieval::build_query_terms;
use crate::types::{Query, RetrievalRun, RetrievedEntry};

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";

/// Max tokens per generated query.
const MAX_QUERY_TOKENS: usize = 20;

/// Max request URL length; longer URLs are truncated with a diagnostic.
const MAX_URL_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Retrieval engine over the PubMed entrez esearch API.
///
/// Documents come back relevance-sorted; rank is the list position and the
/// score a linear decay `(n - i) / n`. Requests are paced by the fixed
/// inter-call delay.
pub struct PubmedEngine {
    agent: ureq::Agent,
    api_key: String,
    delay: Duration,
    last_request: Option<Instant>,
}

impl PubmedEngine {
    pub fn new(config: &BioQaConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            api_key: config.pubmed_api_key.clone(),
            delay: Duration::from_millis(config.request_delay_ms),
            last_request: None,
        }
    }

    /// Retrieves up to `topk` documents for every query. A query whose
    /// request fails yields an empty result entry rather than aborting the
    /// batch.
    pub fn retrieve(&mut self, queries: &[Query], topk: usize) -> Result<RetrievalRun> {
        let mut run: RetrievalRun = HashMap::new();
        let mut result_counts = Vec::with_capacity(queries.len());

        for query in queries {
            let pmids = self.search_query(&query.query_text, topk);
            result_counts.push(pmids.len());
            let n = pmids.len();
            let docs: HashMap<String, RetrievedEntry> = pmids
                .into_iter()
                .enumerate()
                .map(|(i, pmid)| {
                    (
                        pmid,
                        RetrievedEntry {
                            rank: i,
                            score: (n - i) as f64 / n as f64,
                        },
                    )
                })
                .collect();
            run.insert(query.query_id.clone(), docs);
        }

        if !result_counts.is_empty() {
            let avg = result_counts.iter().sum::<usize>() as f64 / result_counts.len() as f64;
            info!(avg_results = avg, "pubmed retrieval finished");
        }
        Ok(run)
    }

    fn search_query(&mut self, text: &str, topk: usize) -> Vec<String> {
        let terms = build_query_terms(text, MAX_QUERY_TOKENS);
        if terms.is_empty() {
            return Vec::new();
        }
        let mut url = format!(
            "{ESEARCH_URL}?api_key={}&db=pubmed&retmode=json&sort=relevance&retmax={topk}&term={}",
            self.api_key,
            terms.join("+OR+"),
        );
        clip_url(&mut url);

        self.pace();
        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "esearch request failed; empty result for query");
                return Vec::new();
            }
        };
        match response.into_json::<EsearchResponse>() {
            Ok(body) => body.esearchresult.idlist,
            Err(e) => {
                warn!(error = %e, "esearch response not JSON; empty result for query");
                Vec::new()
            }
        }
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Truncates an over-long request URL. Query terms may contain multibyte
/// characters, so the cut backs down to the nearest char boundary.
fn clip_url(url: &mut String) {
    if url.len() <= MAX_URL_CHARS {
        return;
    }
    warn!(len = url.len(), "long request url; truncating");
    let mut end = MAX_URL_CHARS;
    while !url.is_char_boundary(end) {
        end -= 1;
    }
    url.truncate(end);
}
