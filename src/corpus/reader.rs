use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::errors::{BioQaError, Result};
use crate::types::AnswerRecord;

/// Column positions of the two known input layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnLayout {
    pub qid: usize,
    pub aid: usize,
    pub score: usize,
    pub qtext: usize,
    pub atext: usize,
    pub links: usize,
}

/// Plain exports as produced by the scraping scripts.
const PLAIN_LAYOUT: ColumnLayout = ColumnLayout {
    qid: 0,
    aid: 1,
    score: 3,
    qtext: 6,
    atext: 7,
    links: 8,
};

/// Manually annotated exports carry extra leading columns.
const ANNOTATED_LAYOUT: ColumnLayout = ColumnLayout {
    qid: 3,
    aid: 4,
    score: 6,
    qtext: 9,
    atext: 10,
    links: 11,
};

/// Picks the column layout from the input file name.
pub fn layout_for(path: &Path) -> ColumnLayout {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("alinks") || name.contains("annotated") {
        ANNOTATED_LAYOUT
    } else {
        PLAIN_LAYOUT
    }
}

/// Reads answer records from a CSV export.
///
/// Rows too short to carry a links column are skipped with a diagnostic; the
/// links cell is a comma-separated list.
pub fn read_answers(path: &Path) -> Result<Vec<AnswerRecord>> {
    let layout = layout_for(path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() <= layout.links {
            warn!(line = line + 2, "row too short, no links column; skipping");
            continue;
        }
        let score: i64 = match row[layout.score].trim().parse() {
            Ok(score) => score,
            Err(_) => {
                warn!(
                    line = line + 2,
                    value = &row[layout.score],
                    "unparseable answer score; skipping row"
                );
                continue;
            }
        };
        records.push(AnswerRecord {
            question_id: row[layout.qid].to_string(),
            answer_id: row[layout.aid].to_string(),
            score,
            question_title: row[layout.qtext].trim().to_string(),
            answer_text: row[layout.atext].to_string(),
            links: row[layout.links]
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        });
    }
    Ok(records)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostEntry {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
}

/// Cache of previously scraped post texts, keyed by question id.
///
/// Produced by the site-specific scraping scripts; this crate only consumes
/// it. When body text has been requested, a missing cache file is fatal:
/// there is no way to recover the text at this stage.
#[derive(Debug, Default)]
pub struct PostsCache {
    posts: HashMap<String, PostEntry>,
}

impl PostsCache {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BioQaError::Config {
                message: format!("posts cache '{}' not found", path.display()),
            });
        }
        let content = fs::read_to_string(path)?;
        let posts: HashMap<String, PostEntry> = serde_json::from_str(&content)?;
        Ok(Self { posts })
    }

    pub fn body(&self, question_id: &str) -> Option<&str> {
        self.posts
            .get(question_id)
            .map(|p| p.body.as_str())
            .filter(|b| !b.is_empty())
    }

    pub fn score(&self, question_id: &str) -> i64 {
        self.posts.get(question_id).map(|p| p.score).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Assembles the query text for a question from its title and, when
/// requested, the post body from the cache.
pub fn build_query_text(
    record: &AnswerRecord,
    posts: Option<&PostsCache>,
    use_body: bool,
) -> String {
    let mut text = record.question_title.clone();
    if use_body {
        if let Some(body) = posts.and_then(|p| p.body(&record.question_id)) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(body.trim());
        }
    }
    text
}
