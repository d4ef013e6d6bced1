use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, info};

use crate::types::DocEntry;

/// Publication date placeholder for abstracts stored without one.
const DEFAULT_PUBLICATION_DATE: &str = "1950-01-01";

/// Read-only store of PubMed abstracts on disk.
///
/// One `<pmid>.txt` file per document: first line the title, remaining lines
/// the abstract. PMIDs may arrive as full PubMed URLs; only the trailing id
/// is used.
#[derive(Debug, Clone)]
pub struct DocStore {
    dir: PathBuf,
}

impl DocStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Fetches one document. `None` when the file is absent or the title
    /// line is empty (PubMed has no abstract in text form for that id).
    pub fn get(&self, pmid: &str) -> Option<DocEntry> {
        let pmid = pmid.rsplit('/').next().unwrap_or(pmid);
        let path = self.dir.join(format!("{pmid}.txt"));
        let text = fs::read_to_string(&path).ok()?;
        let mut lines = text.lines();
        let title = lines.next()?.trim().to_string();
        if title.is_empty() {
            debug!(pmid, "abstract file has no title line");
            return None;
        }
        let abstract_text = lines.collect::<Vec<_>>().join(" ").trim().to_string();
        Some(DocEntry {
            title,
            abstract_text,
            publication_date: DEFAULT_PUBLICATION_DATE.to_string(),
        })
    }

    /// Fetches a flat list of documents across a bounded worker pool.
    ///
    /// The worker count is a fixed cap independent of input size. Workers
    /// only read from the store; each returns its own result vector and the
    /// caller assembles the map, so no shared mutable state exists. A failed
    /// individual lookup simply yields no entry for that id.
    pub fn fetch_all(&self, pmids: &[String], workers: usize) -> HashMap<String, DocEntry> {
        let workers = workers.max(1).min(pmids.len().max(1));
        let chunk_size = pmids.len().div_ceil(workers);
        if chunk_size == 0 {
            return HashMap::new();
        }
        info!(ids = pmids.len(), workers, "fetching document texts");

        let mut doc_set = HashMap::new();
        thread::scope(|scope| {
            let handles: Vec<_> = pmids
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .filter_map(|pmid| self.get(pmid).map(|doc| (pmid.clone(), doc)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                for (pmid, doc) in handle.join().unwrap_or_default() {
                    doc_set.insert(pmid, doc);
                }
            }
        });
        doc_set
    }
}
