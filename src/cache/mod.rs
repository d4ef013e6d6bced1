use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::errors::{BioQaError, Result};

/// The embedded SQL schema applied when opening a cache.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// The reference resolved to this PMID in a previous run or earlier in
    /// this one.
    Hit(String),
    /// The reference was attempted before and could not be resolved.
    NegativeHit,
    /// The reference was never attempted.
    Miss,
}

/// Persistent mapping from raw reference strings to resolved PMIDs.
///
/// The full cache is loaded into memory at open. Mutations accumulate in
/// memory and reach the SQLite file only on [`flush`](Self::flush) (or an
/// intermediate checkpoint); a run that terminates abnormally between
/// checkpoints loses the resolutions made since the last one.
///
/// Invariants: a positive entry never changes once recorded; a negative entry
/// may later be overridden by a positive one, never the reverse.
pub struct ResolutionCache {
    conn: Connection,
    positives: HashMap<String, String>,
    negatives: HashSet<String>,
    /// Entries not yet written to SQLite. `None` marks a negative.
    dirty: HashMap<String, Option<String>>,
    checkpoint_every: usize,
}

impl ResolutionCache {
    /// Opens the cache at `path`, creating an empty one if the file does not
    /// exist yet. A fresh cache is valid; its negative set starts empty.
    pub fn open(path: &Path, checkpoint_every: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| BioQaError::Cache {
                    message: format!("failed to create cache directory: {e}"),
                    operation: "open".to_string(),
                })?;
            }
        }

        let fresh = !path.exists();
        let conn = Connection::open(path).map_err(|e| BioQaError::Cache {
            message: format!("failed to open cache: {e}"),
            operation: "open".to_string(),
        })?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(|e| BioQaError::Cache {
                message: format!("failed to apply pragmas: {e}"),
                operation: "open".to_string(),
            })?;
        conn.execute_batch(SCHEMA_SQL).map_err(|e| BioQaError::Cache {
            message: format!("failed to apply schema: {e}"),
            operation: "open".to_string(),
        })?;

        let mut cache = Self {
            conn,
            positives: HashMap::new(),
            negatives: HashSet::new(),
            dirty: HashMap::new(),
            checkpoint_every,
        };
        cache.load()?;
        if fresh {
            info!("created new resolution cache");
        } else {
            info!(
                positives = cache.positives.len(),
                negatives = cache.negatives.len(),
                "loaded resolution cache"
            );
        }
        Ok(cache)
    }

    fn load(&mut self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT reference, pmid FROM resolutions")
            .map_err(|e| BioQaError::Cache {
                message: format!("failed to prepare load query: {e}"),
                operation: "load".to_string(),
            })?;
        let rows = stmt
            .query_map([], |row| {
                let reference: String = row.get(0)?;
                let pmid: Option<String> = row.get(1)?;
                Ok((reference, pmid))
            })
            .map_err(|e| BioQaError::Cache {
                message: format!("failed to load cache entries: {e}"),
                operation: "load".to_string(),
            })?;
        for row in rows {
            let (reference, pmid) = row.map_err(|e| BioQaError::Cache {
                message: format!("failed to read cache row: {e}"),
                operation: "load".to_string(),
            })?;
            match pmid {
                Some(pmid) => {
                    self.positives.insert(reference, pmid);
                }
                None => {
                    self.negatives.insert(reference);
                }
            }
        }
        Ok(())
    }

    /// Looks up a reference.
    pub fn lookup(&self, reference: &str) -> CacheLookup {
        if let Some(pmid) = self.positives.get(reference) {
            return CacheLookup::Hit(pmid.clone());
        }
        if self.negatives.contains(reference) {
            return CacheLookup::NegativeHit;
        }
        CacheLookup::Miss
    }

    /// Records a successful resolution.
    ///
    /// An existing positive entry is never overwritten; a negative entry for
    /// the same reference is replaced.
    pub fn record_positive(&mut self, reference: &str, pmid: &str) -> Result<()> {
        if self.positives.contains_key(reference) {
            return Ok(());
        }
        self.negatives.remove(reference);
        self.positives
            .insert(reference.to_string(), pmid.to_string());
        self.dirty
            .insert(reference.to_string(), Some(pmid.to_string()));
        self.maybe_checkpoint()
    }

    /// Records a failed resolution so it is not re-attempted next time.
    ///
    /// A no-op when a positive entry already exists for the reference.
    pub fn record_negative(&mut self, reference: &str) -> Result<()> {
        if self.positives.contains_key(reference) {
            return Ok(());
        }
        self.negatives.insert(reference.to_string());
        self.dirty.insert(reference.to_string(), None);
        self.maybe_checkpoint()
    }

    fn maybe_checkpoint(&mut self) -> Result<()> {
        if self.checkpoint_every > 0 && self.dirty.len() >= self.checkpoint_every {
            debug!(pending = self.dirty.len(), "checkpointing resolution cache");
            self.flush()?;
        }
        Ok(())
    }

    /// Writes all pending entries to SQLite in a single transaction.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| BioQaError::Cache {
                message: format!("failed to begin transaction: {e}"),
                operation: "flush".to_string(),
            })?;
        for (reference, pmid) in &self.dirty {
            tx.execute(
                "INSERT OR REPLACE INTO resolutions (reference, pmid) VALUES (?1, ?2)",
                params![reference, pmid],
            )
            .map_err(|e| BioQaError::Cache {
                message: format!("failed to write cache entry: {e}"),
                operation: "flush".to_string(),
            })?;
        }
        tx.commit().map_err(|e| BioQaError::Cache {
            message: format!("failed to commit: {e}"),
            operation: "flush".to_string(),
        })?;
        debug!(written = self.dirty.len(), "flushed resolution cache");
        self.dirty.clear();
        Ok(())
    }

    /// Number of positive entries.
    pub fn len(&self) -> usize {
        self.positives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positives.is_empty()
    }

    /// Number of negative entries.
    pub fn negative_len(&self) -> usize {
        self.negatives.len()
    }

    /// Number of entries not yet written to disk.
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }
}
