use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BioQaError, Result};

/// Default name of the configuration file.
pub const CONFIG_FILENAME: &str = "params.json";

/// Configuration threaded into the resolver and retrieval engines at
/// construction time.
///
/// Holds the identification values the NCBI services require (tool name and
/// contact email), the API keys for the external services, and the knobs of
/// the pipeline itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BioQaConfig {
    /// Tool name sent to the NCBI ID converter and registered with PRAW-style
    /// site agents.
    pub toolname: String,
    /// Contact email sent to the NCBI ID converter.
    pub email: String,
    /// API key for the PubMed E-utilities.
    pub pubmed_api_key: String,
    /// API key for the Elsevier article metadata API.
    pub elsevier_api_key: String,
    /// Path of the SQLite file backing the resolution cache.
    pub cache_path: String,
    /// Directory holding PubMed abstracts as `<pmid>.txt` files.
    pub abstract_dir: String,
    /// Fixed delay between external requests, in milliseconds. The NCBI
    /// services enforce a requests-per-second ceiling.
    pub request_delay_ms: u64,
    /// Number of pending cache writes that triggers an intermediate flush.
    /// Zero disables checkpointing; the cache then persists only on the final
    /// explicit flush.
    pub cache_checkpoint_every: usize,
    /// Worker count for bulk document-text fetches.
    pub fetch_workers: usize,
}

impl Default for BioQaConfig {
    fn default() -> Self {
        Self {
            toolname: "bioqa".to_string(),
            email: String::new(),
            pubmed_api_key: String::new(),
            elsevier_api_key: String::new(),
            cache_path: "pmid_mapping.db".to_string(),
            abstract_dir: "pubmed_abstracts".to_string(),
            request_delay_ms: 100,
            cache_checkpoint_every: 500,
            fetch_workers: 20,
        }
    }
}

/// Loads the configuration from the given path.
///
/// A missing configuration file is a fatal startup error: the API keys cannot
/// be guessed and the external services reject unidentified clients.
pub fn load_config(path: &Path) -> Result<BioQaConfig> {
    if !path.exists() {
        return Err(BioQaError::Config {
            message: format!("configuration file '{}' not found", path.display()),
        });
    }
    let content = fs::read_to_string(path)?;
    let config: BioQaConfig =
        serde_json::from_str(&content).map_err(|e| BioQaError::Config {
            message: format!("failed to parse '{}': {e}", path.display()),
        })?;
    Ok(config)
}

/// Writes the configuration to the given path as pretty-printed JSON.
pub fn save_config(path: &Path, config: &BioQaConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
