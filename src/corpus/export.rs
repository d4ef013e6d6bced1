use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::types::{
    BioasqFile, BioasqQuestion, CorpusRow, Query, QueryFile, QueryResult, ResultFile,
};

/// Base PubMed URL used in the relevance-judgment export.
const PUBMED_DOC_URL: &str = "http://www.ncbi.nlm.nih.gov/pubmed/";

/// Writes the corpus rows as CSV.
pub fn write_corpus_csv(path: &Path, rows: &[CorpusRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "question_id",
        "answer_id",
        "question_text",
        "question_score",
        "pmid",
        "pmtitle",
    ])?;
    for row in rows {
        writer.write_record([
            row.question_id.as_str(),
            row.answer_id.as_str(),
            row.question_text.as_str(),
            &row.question_score.to_string(),
            row.pmid.as_str(),
            row.pmtitle.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the query set as the JSON file `evaluate` consumes.
pub fn write_query_file(path: &Path, queries: &[Query]) -> Result<()> {
    let file = QueryFile {
        queries: queries.to_vec(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Loads a query set previously written by [`write_query_file`].
pub fn load_query_file(path: &Path) -> Result<Vec<Query>> {
    let content = fs::read_to_string(path)?;
    let file: QueryFile = serde_json::from_str(&content)?;
    Ok(file.queries)
}

/// Writes the per-query evaluation results.
pub fn write_result_file(path: &Path, results: &[QueryResult]) -> Result<()> {
    let file = ResultFile {
        queries: results.to_vec(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Writes the BioASQ-style relevance-judgment export: per query, its id,
/// text, and relevant documents as PubMed URLs, with placeholder type and
/// snippet fields.
pub fn write_bioasq(path: &Path, results: &[QueryResult]) -> Result<()> {
    let questions = results
        .iter()
        .map(|r| BioasqQuestion {
            id: r.query_id.clone(),
            body: r.query_text.clone(),
            documents: r
                .relevant_documents
                .iter()
                .map(|d| format!("{PUBMED_DOC_URL}{d}"))
                .collect(),
            question_type: String::new(),
            snippets: Vec::new(),
        })
        .collect();
    let file = BioasqFile { questions };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Output naming convention: `<input stem>_ascore<N>_acount<M>[_title][_body]`.
pub fn output_stem(input: &Path, min_a_score: i64, min_a_count: usize, use_body: bool) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "corpus".to_string());
    let mut name = format!("{stem}_ascore{min_a_score}_acount{min_a_count}_title");
    if use_body {
        name.push_str("_body");
    }
    name
}
