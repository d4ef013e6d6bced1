use regex::Regex;

use crate::errors::{BioQaError, Result};

/// Domains and extensions that are known to never map to a PubMed document.
const IRRELEVANT_MARKERS: &[&str] = &[
    "imgur", "youtube", "book", "projects", "wiki", ".jpg", "flickr",
];

/// Structural classification of a raw answer reference.
///
/// Exactly one variant is produced per reference; the tests below are ordered
/// by priority and the first structural match wins. Payloads carry whatever
/// the matching strategy extracted, so the resolver can dispatch on the shape
/// alone.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceKind {
    /// Bare link to the PMC or PubMed homepage.
    Homepage,
    /// PMC-style link carrying an explicit `pmcNNNN` accession.
    Pmc { pmcid: String },
    /// Search link (`?term=` or `cmd=search`); term already URL-decoded.
    TermSearch { term: String },
    /// DOI link; payload is the suffix after the host.
    Doi { doi: String },
    /// `linkname=` query parameter; trailing value taken verbatim.
    LinkName { id: String },
    /// `cmd=retrieve` link; payload is the first 8-digit run.
    Retrieve { id: String },
    /// Mobile path (`/m/pubmed/<id>`).
    Mobile { id: String },
    /// `artid=` / `accid=` query parameter; PMC accession for the converter.
    Accession { accession: String },
    /// `pmid=` query parameter; trailing value taken verbatim.
    PmidParam { id: String },
    /// sciencedirect link; payload is the PII for the publisher API.
    Publisher { pii: String },
    /// researchgate link; payload is a title-like search term from the path.
    Aggregator { term: String },
    /// Known-irrelevant domain or media extension.
    Irrelevant,
    /// Fallback: fixed path segment taken as a best-effort id.
    PathSegment { id: String },
    /// Matched a strategy structurally but carried no usable payload.
    Unresolvable,
}

/// Compiled patterns shared by all classifications.
///
/// Built once at resolver construction, like the lookup caches of a resolver
/// are.
pub struct Patterns {
    pmc_id: Regex,
    eight_digits: Regex,
}

impl Patterns {
    pub fn new() -> Result<Self> {
        let pmc_id = Regex::new(r"pmc([0-9]+)").map_err(|e| BioQaError::Corpus {
            message: format!("failed to compile pmc pattern: {e}"),
        })?;
        let eight_digits = Regex::new(r"[0-9]{8}").map_err(|e| BioQaError::Corpus {
            message: format!("failed to compile digit pattern: {e}"),
        })?;
        Ok(Self {
            pmc_id,
            eight_digits,
        })
    }
}

/// Classifies a raw reference into the strategy that will resolve it.
///
/// Matching is case-insensitive: two references differing only in letter case
/// classify identically.
pub fn classify(patterns: &Patterns, reference: &str) -> ReferenceKind {
    let url = reference.to_lowercase();

    // Bare homepage links carry no document at all.
    let last_segment = url.trim_matches('/').rsplit('/').next().unwrap_or("");
    if last_segment == "pmc" || last_segment == "pubmed" {
        return ReferenceKind::Homepage;
    }

    let has_term = url.contains("?term=");
    let has_search = url.contains("cmd=search");

    if url.contains("pmc") && !url.contains("pmid") && !has_term && !has_search {
        return match patterns.pmc_id.find(&url) {
            Some(m) => ReferenceKind::Pmc {
                pmcid: m.as_str().to_string(),
            },
            None => ReferenceKind::Unresolvable,
        };
    }

    if (url.contains("pubmed") || url.contains("pmc")) && (has_term || has_search) {
        let raw = url.rsplit('=').next().unwrap_or("");
        let term = urlencoding::decode(raw)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        return ReferenceKind::TermSearch { term };
    }

    if url.contains("doi.org") {
        let doi = url.split('/').skip(3).collect::<Vec<_>>().join("/");
        if doi.is_empty() {
            return ReferenceKind::Unresolvable;
        }
        return ReferenceKind::Doi { doi };
    }

    if url.contains("linkname=") {
        let id = url.rsplit('=').next().unwrap_or("").to_string();
        return ReferenceKind::LinkName { id };
    }

    if url.contains("cmd=retrieve") {
        return match patterns.eight_digits.find(&url) {
            Some(m) => ReferenceKind::Retrieve {
                id: m.as_str().to_string(),
            },
            None => ReferenceKind::Unresolvable,
        };
    }

    if url.contains("/m/pubmed") {
        return match url.split('/').nth(5) {
            Some(id) if !id.is_empty() => ReferenceKind::Mobile { id: id.to_string() },
            _ => ReferenceKind::Unresolvable,
        };
    }

    if url.contains("artid=") {
        let raw = param_value(&url, "artid=");
        if raw.is_empty() {
            return ReferenceKind::Unresolvable;
        }
        // artid values lack the PMC prefix the converter expects.
        return ReferenceKind::Accession {
            accession: format!("PMC{raw}"),
        };
    }

    if url.contains("accid=") {
        let raw = param_value(&url, "accid=");
        if raw.is_empty() {
            return ReferenceKind::Unresolvable;
        }
        return ReferenceKind::Accession {
            accession: raw.to_string(),
        };
    }

    if url.contains("pmid=") {
        let id = url.split("pmid=").last().unwrap_or("").to_string();
        return ReferenceKind::PmidParam { id };
    }

    if url.contains("sciencedirect") {
        let pii = url
            .split("pii/")
            .last()
            .unwrap_or("")
            .split('?')
            .next()
            .unwrap_or("")
            .to_string();
        if pii.is_empty() {
            return ReferenceKind::Unresolvable;
        }
        return ReferenceKind::Publisher { pii };
    }

    if url.contains("researchgate") {
        // Path tail looks like "publication/NNN_Some_Article_Title"; the words
        // after the first underscore approximate the title.
        let tail = url.split('/').next_back().unwrap_or("");
        let words: Vec<&str> = tail.split('_').skip(1).collect();
        if words.is_empty() {
            return ReferenceKind::Unresolvable;
        }
        return ReferenceKind::Aggregator {
            term: words.join("+"),
        };
    }

    if IRRELEVANT_MARKERS.iter().any(|m| url.contains(m)) {
        return ReferenceKind::Irrelevant;
    }

    match url.split('/').nth(4) {
        Some(segment) if !segment.is_empty() => ReferenceKind::PathSegment {
            id: segment.to_string(),
        },
        _ => ReferenceKind::Unresolvable,
    }
}

/// Value of a `key=` query parameter, up to the next `&`.
fn param_value<'a>(url: &'a str, key: &str) -> &'a str {
    url.split(key)
        .last()
        .unwrap_or("")
        .split('&')
        .next()
        .unwrap_or("")
}
