//! DeTTECT Store - administration files and the ATT&CK knowledge base
//!
//! Provides:
//! - Typed technique and data source administration formats (YAML)
//! - File validation and the health check
//! - A small query language and the filter adapter producing
//!   content-addressed derived files in the cache directory
//! - Atomic (temp → rename) writes
//! - The ATT&CK STIX knowledge base loader

pub mod admin;
pub mod atomic;
pub mod errors;
pub mod knowledge;
pub mod query;

// Re-export key types
pub use admin::validation::FsValidator;
pub use errors::Result;
pub use knowledge::KnowledgeBase;
pub use query::filter::FsQueryFilter;
