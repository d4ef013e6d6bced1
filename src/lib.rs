pub mod cache;
pub mod config;
pub mod corpus;
pub mod docstore;
pub mod errors;
pub mod eval;
pub mod resolver;
pub mod retrieval;
pub mod types;
