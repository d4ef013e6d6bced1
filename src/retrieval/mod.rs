pub mod galago;
pub mod pubmed;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::types::RetrievalRun;

/// Minimal stopword list applied when turning query text into search terms.
/// The heavy linguistic preprocessing of the surrounding system happens
/// upstream; retrieval only needs the obvious noise gone.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does", "for",
    "from", "how", "i", "if", "in", "is", "it", "my", "no", "not", "of", "on", "or", "so", "that",
    "the", "there", "this", "to", "was", "what", "when", "which", "why", "will", "with", "you",
    "your",
];

/// Turns query text into deduplicated lowercase search terms, stopwords
/// removed, capped at `max_tokens`. Order of first occurrence is preserved.
pub fn build_query_terms(text: &str, max_tokens: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if terms.len() >= max_tokens {
            break;
        }
        let token = token.to_lowercase();
        if token.is_empty() || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            terms.push(token);
        }
    }
    terms
}

/// Loads a retrieval run from JSON: `{qid: {doc_id: {rank, score}}}`.
///
/// Any engine producing this shape is interchangeable with the built-in ones.
pub fn load_run_file(path: &Path) -> Result<RetrievalRun> {
    let content = fs::read_to_string(path)?;
    let run: RetrievalRun = serde_json::from_str(&content)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_terms_filters_and_dedupes() {
        let terms = build_query_terms("What is the role of the BRCA1 gene? BRCA1!", 20);
        assert_eq!(terms, vec!["role", "brca1", "gene"]);
    }

    #[test]
    fn test_build_query_terms_caps_length() {
        let text = "alpha beta gamma delta epsilon";
        assert_eq!(build_query_terms(text, 2), vec!["alpha", "beta"]);
    }
}
