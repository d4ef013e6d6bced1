use thiserror::Error;

/// Errors that can occur while building or evaluating a corpus.
///
/// Failures inside an individual resolution strategy are deliberately not
/// represented here: they degrade to cached negative outcomes inside the
/// resolver and never surface to callers.
#[derive(Error, Debug)]
pub enum BioQaError {
    #[error("config error: {message}")]
    Config { message: String },

    #[error("cache error: {message} (operation: {operation})")]
    Cache { message: String, operation: String },

    #[error("corpus error: {message}")]
    Corpus { message: String },

    #[error("engine error: {message} (engine: {engine})")]
    Engine { message: String, engine: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience alias for results using `BioQaError`.
pub type Result<T> = std::result::Result<T, BioQaError>;
