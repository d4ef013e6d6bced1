use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bioqa::cache::ResolutionCache;
use bioqa::config::load_config;
use bioqa::corpus::export::{
    load_query_file, output_stem, write_bioasq, write_corpus_csv, write_query_file,
    write_result_file,
};
use bioqa::corpus::reader::{build_query_text, read_answers, PostsCache};
use bioqa::corpus::CorpusBuilder;
use bioqa::docstore::DocStore;
use bioqa::errors::{BioQaError, Result};
use bioqa::eval::{calculate_scores, merge_results};
use bioqa::resolver::{EntrezClient, UrlResolver};
use bioqa::retrieval::galago::GalagoEngine;
use bioqa::retrieval::load_run_file;
use bioqa::retrieval::pubmed::PubmedEngine;

/// PubMed QA corpus construction and retrieval evaluation.
#[derive(Parser)]
#[command(
    name = "bioqa",
    about = "Builds PubMed QA corpora from community Q&A exports and evaluates retrieval engines against them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a corpus from a CSV export of answers with links
    Build {
        /// CSV file to process
        file: PathBuf,
        /// Configuration file
        #[arg(short, long, default_value = "params.json")]
        config: PathBuf,
        /// Posts cache (JSON) with question bodies and scores
        #[arg(long)]
        posts_cache: Option<PathBuf>,
        /// Minimum answer score
        #[arg(long, default_value_t = -100)]
        min_a_score: i64,
        /// Minimum number of resolved documents per question
        #[arg(long, default_value_t = 1)]
        min_a_count: usize,
        /// Append question body text from the posts cache to the query text
        #[arg(long)]
        body_text: bool,
        /// Re-attempt references with a cached negative outcome
        #[arg(long)]
        revisit_missing: bool,
        /// Directory of PubMed abstracts (overrides the configured one)
        #[arg(long)]
        abstracts: Option<PathBuf>,
    },
    /// Evaluate a retrieval engine against a built corpus
    Evaluate {
        /// Retrieval engine: galago, pubmed, or file
        engine: String,
        /// Corpus query file produced by `build`
        corpus: PathBuf,
        /// Configuration file
        #[arg(short, long, default_value = "params.json")]
        config: PathBuf,
        /// Documents to request per query
        #[arg(long, default_value_t = 100)]
        topk: usize,
        /// Output prefix for result, qrel, and docset files
        #[arg(short, long)]
        out: Option<String>,
        /// Also fetch document texts for all retrieved ids
        #[arg(long)]
        fetch_docs: bool,
        /// Retrieval run file (required with engine 'file')
        #[arg(long)]
        run_file: Option<PathBuf>,
        /// Path to the galago binary
        #[arg(long)]
        galago_binary: Option<PathBuf>,
        /// Path to the galago index
        #[arg(long)]
        galago_index: Option<PathBuf>,
        /// Wall-clock timeout for the galago subprocess, in seconds
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
        /// Evaluate only the first N queries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Resolve a single reference to a PMID
    Resolve {
        /// Reference URL
        url: String,
        /// Configuration file
        #[arg(short, long, default_value = "params.json")]
        config: PathBuf,
        /// Re-attempt even with a cached negative outcome
        #[arg(long)]
        revisit_missing: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            file,
            config,
            posts_cache,
            min_a_score,
            min_a_count,
            body_text,
            revisit_missing,
            abstracts,
        } => {
            let config = load_config(&config)?;

            let posts = match (&posts_cache, body_text) {
                (Some(path), _) => Some(PostsCache::load(path)?),
                (None, true) => {
                    return Err(BioQaError::Config {
                        message: "--body-text requires --posts-cache".to_string(),
                    });
                }
                (None, false) => None,
            };

            let cache = ResolutionCache::open(
                Path::new(&config.cache_path),
                config.cache_checkpoint_every,
            )?;
            let mut resolver = UrlResolver::new(cache, EntrezClient::new(&config))?;
            let abstract_dir =
                abstracts.unwrap_or_else(|| PathBuf::from(&config.abstract_dir));
            let docstore = DocStore::new(&abstract_dir);

            let records = read_answers(&file)?;
            println!("processing {} answers from {}", records.len(), file.display());

            let mut builder = CorpusBuilder::new(min_a_score, min_a_count, revisit_missing);
            for record in &records {
                let query_text = build_query_text(record, posts.as_ref(), body_text);
                let query_score = posts
                    .as_ref()
                    .map(|p| p.score(&record.question_id))
                    .unwrap_or(0);
                builder.add_answer(
                    &mut resolver,
                    record,
                    &query_text,
                    query_score,
                    Some(&docstore),
                )?;
            }

            let (corpus, counters) = builder.finalize();
            resolver.flush()?;
            counters.log_summary();

            let stem = output_stem(&file, min_a_score, min_a_count, body_text);
            let csv_path = PathBuf::from(format!("{stem}.csv"));
            let query_path = PathBuf::from(format!("{stem}.json"));
            write_corpus_csv(&csv_path, &corpus.rows)?;
            write_query_file(&query_path, &corpus.queries)?;

            println!(
                "Built corpus: {} queries, {} rows ({} questions excluded)",
                corpus.queries.len(),
                corpus.rows.len(),
                counters.excluded_questions
            );
            println!("  wrote {} and {}", csv_path.display(), query_path.display());
        }

        Commands::Evaluate {
            engine,
            corpus,
            config,
            topk,
            out,
            fetch_docs,
            run_file,
            galago_binary,
            galago_index,
            timeout_secs,
            limit,
        } => {
            let config = load_config(&config)?;
            let mut queries = load_query_file(&corpus)?;
            if let Some(limit) = limit {
                queries.truncate(limit);
            }
            println!("{} queries loaded from {}", queries.len(), corpus.display());

            let run = match engine.as_str() {
                "galago" => {
                    let binary = galago_binary.ok_or_else(|| BioQaError::Config {
                        message: "engine 'galago' requires --galago-binary".to_string(),
                    })?;
                    let index = galago_index.ok_or_else(|| BioQaError::Config {
                        message: "engine 'galago' requires --galago-index".to_string(),
                    })?;
                    GalagoEngine::new(&binary, &index, Duration::from_secs(timeout_secs))
                        .retrieve(&queries, topk, Path::new("."))?
                }
                "pubmed" => PubmedEngine::new(&config).retrieve(&queries, topk)?,
                "file" => {
                    let path = run_file.ok_or_else(|| BioQaError::Config {
                        message: "engine 'file' requires --run-file".to_string(),
                    })?;
                    load_run_file(&path)?
                }
                other => {
                    return Err(BioQaError::Engine {
                        message: format!("unknown retrieval engine '{other}'"),
                        engine: other.to_string(),
                    });
                }
            };

            let results = merge_results(queries, &run);
            let (metrics, filtered) = calculate_scores(&results);

            println!("Evaluation ({engine}, top {topk})");
            println!("  precision: {:.4}", metrics.precision);
            println!("  recall:    {:.4}", metrics.recall);
            println!("  f1:        {:.4}", metrics.f1);
            println!("  map:       {:.4}", metrics.map);
            println!(
                "  queries evaluated: {}, with relevant retrieved: {}",
                results.len(),
                filtered.len()
            );

            if let Some(out) = out {
                let results_path = PathBuf::from(format!("{out}.top{topk}.results.json"));
                let qrel_path = PathBuf::from(format!("{out}.qrel.json"));
                write_result_file(&results_path, &filtered)?;
                write_bioasq(&qrel_path, &results)?;
                println!("  wrote {} and {}", results_path.display(), qrel_path.display());

                if fetch_docs {
                    let all_pmids: Vec<String> = run
                        .values()
                        .flat_map(|docs| docs.keys().cloned())
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect();
                    let docstore = DocStore::new(Path::new(&config.abstract_dir));
                    let doc_set = docstore.fetch_all(&all_pmids, config.fetch_workers);
                    let docset_path = PathBuf::from(format!("{out}.docset_top{topk}.json"));
                    fs::write(&docset_path, serde_json::to_string_pretty(&doc_set)?)?;
                    println!(
                        "  wrote {} ({} documents)",
                        docset_path.display(),
                        doc_set.len()
                    );
                }
            }
        }

        Commands::Resolve {
            url,
            config,
            revisit_missing,
        } => {
            let config = load_config(&config)?;
            let cache = ResolutionCache::open(
                Path::new(&config.cache_path),
                config.cache_checkpoint_every,
            )?;
            let mut resolver = UrlResolver::new(cache, EntrezClient::new(&config))?;
            match resolver.resolve(&url, revisit_missing)? {
                Some(pmid) => println!("{pmid}"),
                None => println!("unresolved"),
            }
            resolver.flush()?;
        }
    }
    Ok(())
}
