use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::config::BioQaConfig;

const ID_CONVERTER_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/";
const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const ELSEVIER_ARTICLE_URL: &str = "https://api.elsevier.com/content/article/pii/";

/// Failure of an external lookup: network error, malformed payload, or an
/// unexpected response shape. The resolver turns every one of these into a
/// cached negative outcome.
#[derive(Debug)]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// External identifier-lookup capability consumed by the resolver.
///
/// `Ok(None)` means the service answered but had no mapping; `Err` means the
/// lookup itself failed. The resolver treats both as negative outcomes, with
/// one exception: the DOI strategy falls back to search only on `Ok(None)`.
pub trait LookupApi {
    /// NCBI ID converter, JSON format. Returns the mapped PMID if the first
    /// record carries one.
    fn convert_id(&mut self, accession: &str) -> LookupResult<Option<String>>;

    /// NCBI ID converter, default text format; the PMID is parsed out of a
    /// `pmid=` key-value pair.
    fn convert_id_text(&mut self, accession: &str) -> LookupResult<Option<String>>;

    /// PubMed esearch. Returns the result id list, possibly empty.
    fn search(&mut self, term: &str) -> LookupResult<Vec<String>>;

    /// Elsevier article metadata. Returns the PMID embedded in the
    /// `<pubmed-id>` tag if present.
    fn article_pmid(&mut self, pii: &str) -> LookupResult<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct IdConvResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    records: Vec<IdConvRecord>,
}

#[derive(Debug, Deserialize)]
struct IdConvRecord {
    #[serde(default)]
    pmid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Production lookup client over the NCBI and Elsevier HTTP APIs.
///
/// Every request is preceded by a blocking wait so consecutive calls respect
/// the fixed inter-call delay; the NCBI services cap requests per second per
/// client.
pub struct EntrezClient {
    agent: ureq::Agent,
    toolname: String,
    email: String,
    pubmed_api_key: String,
    elsevier_api_key: String,
    delay: Duration,
    last_request: Option<Instant>,
}

impl EntrezClient {
    pub fn new(config: &BioQaConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            toolname: config.toolname.clone(),
            email: config.email.clone(),
            pubmed_api_key: config.pubmed_api_key.clone(),
            elsevier_api_key: config.elsevier_api_key.clone(),
            delay: Duration::from_millis(config.request_delay_ms),
            last_request: None,
        }
    }

    /// Blocks until the inter-call delay since the previous request has
    /// elapsed, then marks this request.
    fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn converter_url(&self, accession: &str, json: bool) -> String {
        let mut url = format!(
            "{ID_CONVERTER_URL}?tool={}&email={}&ids={}",
            urlencoding::encode(&self.toolname),
            urlencoding::encode(&self.email),
            urlencoding::encode(accession),
        );
        if json {
            url.push_str("&format=json");
        }
        url
    }
}

impl LookupApi for EntrezClient {
    fn convert_id(&mut self, accession: &str) -> LookupResult<Option<String>> {
        self.pace();
        let url = self.converter_url(accession, true);
        debug!(accession, "calling id converter");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LookupError::new(format!("id converter request failed: {e}")))?;
        let body: IdConvResponse = response
            .into_json()
            .map_err(|e| LookupError::new(format!("id converter response not JSON: {e}")))?;
        if body.status.as_deref() == Some("error") {
            return Ok(None);
        }
        Ok(body.records.into_iter().next().and_then(|r| r.pmid))
    }

    fn convert_id_text(&mut self, accession: &str) -> LookupResult<Option<String>> {
        self.pace();
        let url = self.converter_url(accession, false);
        debug!(accession, "calling id converter (text format)");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LookupError::new(format!("id converter request failed: {e}")))?;
        let text = response
            .into_string()
            .map_err(|e| LookupError::new(format!("failed to read converter response: {e}")))?;
        if !text.contains("pmid=") {
            return Ok(None);
        }
        let pmid = text
            .split("pmid=")
            .last()
            .unwrap_or("")
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches('"')
            .to_string();
        if pmid.is_empty() {
            return Ok(None);
        }
        Ok(Some(pmid))
    }

    fn search(&mut self, term: &str) -> LookupResult<Vec<String>> {
        self.pace();
        let url = format!(
            "{ESEARCH_URL}?db=pubmed&term={}&api_key={}&format=json",
            urlencoding::encode(term),
            self.pubmed_api_key,
        );
        debug!(term, "calling pubmed esearch");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LookupError::new(format!("esearch request failed: {e}")))?;
        let body: EsearchResponse = response
            .into_json()
            .map_err(|e| LookupError::new(format!("esearch response not JSON: {e}")))?;
        Ok(body.esearchresult.idlist)
    }

    fn article_pmid(&mut self, pii: &str) -> LookupResult<Option<String>> {
        self.pace();
        let url = format!(
            "{ELSEVIER_ARTICLE_URL}{}?apiKey={}",
            urlencoding::encode(pii),
            self.elsevier_api_key,
        );
        debug!(pii, "calling elsevier article api");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LookupError::new(format!("article request failed: {e}")))?;
        let text = response
            .into_string()
            .map_err(|e| LookupError::new(format!("failed to read article response: {e}")))?;
        match text.split_once("<pubmed-id>") {
            Some((_, rest)) => Ok(rest
                .split("</pubmed-id>")
                .next()
                .map(|id| id.trim().to_string())),
            None => Ok(None),
        }
    }
}
