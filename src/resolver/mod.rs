mod classify;
mod entrez;

pub use classify::{classify, Patterns, ReferenceKind};
pub use entrez::{EntrezClient, LookupApi, LookupError, LookupResult};

use tracing::debug;

use crate::cache::{CacheLookup, ResolutionCache};
use crate::errors::Result;

/// Resolves heterogeneous reference strings to canonical PMIDs.
///
/// Each reference is classified into exactly one strategy, resolved through
/// the external lookup capability where the strategy needs one, canonicalized
/// to a digits-only id, and recorded in the cache whatever the outcome.
/// Lookup failures of any kind degrade to negatives; resolution never fails
/// the pipeline.
pub struct UrlResolver<C: LookupApi> {
    cache: ResolutionCache,
    client: C,
    patterns: Patterns,
}

impl<C: LookupApi> UrlResolver<C> {
    pub fn new(cache: ResolutionCache, client: C) -> Result<Self> {
        Ok(Self {
            cache,
            client,
            patterns: Patterns::new()?,
        })
    }

    /// Resolves one reference.
    ///
    /// A cached positive is returned without any network call. A cached
    /// negative short-circuits to `None` unless `revisit_missing` asks for a
    /// re-attempt. Every fresh outcome is recorded in the cache before
    /// returning, so a repeat call costs no lookup.
    pub fn resolve(&mut self, reference: &str, revisit_missing: bool) -> Result<Option<String>> {
        match self.cache.lookup(reference) {
            CacheLookup::Hit(pmid) => return Ok(Some(pmid)),
            CacheLookup::NegativeHit if !revisit_missing => return Ok(None),
            _ => {}
        }

        let outcome = self.resolve_uncached(reference);
        match &outcome {
            Some(pmid) => self.cache.record_positive(reference, pmid)?,
            None => self.cache.record_negative(reference)?,
        }
        Ok(outcome)
    }

    fn resolve_uncached(&mut self, reference: &str) -> Option<String> {
        let kind = classify(&self.patterns, reference);
        debug!(reference, ?kind, "dispatching resolution strategy");

        let raw = match kind {
            ReferenceKind::Homepage
            | ReferenceKind::Irrelevant
            | ReferenceKind::Unresolvable => None,

            ReferenceKind::Pmc { pmcid } => match self.client.convert_id(&pmcid) {
                Ok(pmid) => pmid,
                Err(e) => {
                    debug!(reference, error = %e, "id converter lookup failed");
                    None
                }
            },

            ReferenceKind::TermSearch { term } => self.first_search_hit(&term),

            // The one strategy with an internal fallback: when the converter
            // has no mapping for the DOI, search for it as an article id.
            ReferenceKind::Doi { doi } => match self.client.convert_id(&doi) {
                Ok(Some(pmid)) => Some(pmid),
                Ok(None) => self.first_search_hit(&format!("{doi}[aid]")),
                Err(e) => {
                    debug!(reference, error = %e, "doi converter lookup failed");
                    None
                }
            },

            ReferenceKind::LinkName { id }
            | ReferenceKind::Retrieve { id }
            | ReferenceKind::Mobile { id }
            | ReferenceKind::PmidParam { id }
            | ReferenceKind::PathSegment { id } => Some(id),

            ReferenceKind::Accession { accession } => {
                match self.client.convert_id_text(&accession) {
                    Ok(pmid) => pmid,
                    Err(e) => {
                        debug!(reference, error = %e, "accession lookup failed");
                        None
                    }
                }
            }

            ReferenceKind::Publisher { pii } => match self.client.article_pmid(&pii) {
                Ok(pmid) => pmid,
                Err(e) => {
                    debug!(reference, error = %e, "publisher lookup failed");
                    None
                }
            },

            ReferenceKind::Aggregator { term } => {
                self.first_search_hit(&format!("{term}[title]"))
            }
        };

        raw.map(|id| canonicalize_pmid(&id))
            .filter(|id| !id.is_empty())
    }

    fn first_search_hit(&mut self, term: &str) -> Option<String> {
        match self.client.search(term) {
            Ok(ids) => ids.into_iter().next(),
            Err(e) => {
                debug!(term, error = %e, "search lookup failed");
                None
            }
        }
    }

    /// Flushes the underlying cache to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Consumes the resolver, returning the cache for explicit shutdown.
    pub fn into_cache(self) -> ResolutionCache {
        self.cache
    }
}

/// Canonicalization policy: a resolved id keeps only its digit characters,
/// regardless of how the source formatted it.
pub fn canonicalize_pmid(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_non_digits() {
        assert_eq!(canonicalize_pmid("PMC00123extra"), "00123");
        assert_eq!(canonicalize_pmid("19404678"), "19404678");
        assert_eq!(canonicalize_pmid("no-digits"), "");
    }
}
