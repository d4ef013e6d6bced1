use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, warn};

use crate::errors::{BioQaError, Result};
use crate::retrieval::build_query_terms;
use crate::types::{Query, RetrievalRun, RetrievedEntry};

/// Poll interval while waiting for the subprocess.
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Max tokens per generated query.
const MAX_QUERY_TOKENS: usize = 20;

/// Batch-search adapter over a local galago installation.
///
/// Galago runs as a subprocess under an overall wall-clock timeout; on expiry
/// the process is killed and whatever partial output it produced is parsed.
pub struct GalagoEngine {
    pub binary: PathBuf,
    pub index: PathBuf,
    pub thread_count: usize,
    pub timeout: Duration,
}

impl GalagoEngine {
    pub fn new(binary: &Path, index: &Path, timeout: Duration) -> Self {
        Self {
            binary: binary.to_path_buf(),
            index: index.to_path_buf(),
            thread_count: 20,
            timeout,
        }
    }

    /// Runs a batch search over all queries, requesting `topk` documents per
    /// query.
    pub fn retrieve(&self, queries: &[Query], topk: usize, workdir: &Path) -> Result<RetrievalRun> {
        let query_file = workdir.join("galago_query.json");
        write_query_file(&query_file, queries)?;
        let output = self.run_batch_search(&query_file, topk)?;
        let run = parse_batch_output(&output);
        info!(queries = run.len(), "galago produced results");
        Ok(run)
    }

    fn run_batch_search(&self, query_file: &Path, topk: usize) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg("threaded-batch-search")
            .arg(format!("--threadCount={}", self.thread_count))
            .arg("--caseFold=true")
            .arg(format!("--index={}", self.index.display()))
            .arg(format!("--requested={topk}"))
            .arg(query_file)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BioQaError::Engine {
                message: format!("failed to spawn '{}': {e}", self.binary.display()),
                engine: "galago".to_string(),
            })?;

        // Drain stdout on a separate thread; the child would otherwise block
        // on a full pipe before we ever see it exit.
        let mut stdout = child.stdout.take().ok_or_else(|| BioQaError::Engine {
            message: "no stdout handle on subprocess".to_string(),
            engine: "galago".to_string(),
        })?;
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).ok();
            buf
        });

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(
                            timeout_secs = self.timeout.as_secs(),
                            "galago timed out; killing and parsing partial output"
                        );
                        child.kill().ok();
                        child.wait().ok();
                        break;
                    }
                    thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    child.kill().ok();
                    return Err(BioQaError::Engine {
                        message: format!("failed to wait on subprocess: {e}"),
                        engine: "galago".to_string(),
                    });
                }
            }
        }

        Ok(reader.join().unwrap_or_default())
    }
}

/// Writes the galago batch-search query file: one `#combine(...)` query per
/// corpus query.
pub fn write_query_file(path: &Path, queries: &[Query]) -> Result<()> {
    let query_dic = json!({
        "queries": queries
            .iter()
            .map(|q| {
                let terms = build_query_terms(&q.query_text.replace('.', " "), MAX_QUERY_TOKENS);
                json!({
                    "number": q.query_id,
                    "text": format!("#combine({})", terms.join(" ")),
                })
            })
            .collect::<Vec<_>>(),
    });
    fs::write(path, serde_json::to_string_pretty(&query_dic)?)?;
    Ok(())
}

/// Parses galago batch-search output.
///
/// Result lines end in the literal token `galago` and carry, in order: query
/// id, the document path (PMID is the file stem), rank, and score. Anything
/// else (progress chatter, malformed lines) is skipped, with a diagnostic
/// when a line looked like a result but did not parse.
pub fn parse_batch_output(output: &str) -> RetrievalRun {
    let mut run: RetrievalRun = HashMap::new();
    for line in output.lines() {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.last() != Some(&"galago") {
            continue;
        }
        if values.len() < 5 {
            warn!(line, "short result line; skipping");
            continue;
        }
        let qid = values[0];
        let pmid = values[2]
            .rsplit('/')
            .next()
            .unwrap_or(values[2])
            .split('.')
            .next()
            .unwrap_or(values[2]);
        let (rank, score) = match (values[3].parse::<usize>(), values[4].parse::<f64>()) {
            (Ok(rank), Ok(score)) => (rank, score),
            _ => {
                warn!(line, "unparseable rank or score; skipping");
                continue;
            }
        };
        run.entry(qid.to_string())
            .or_default()
            .insert(pmid.to_string(), RetrievedEntry { rank, score });
    }
    run
}
