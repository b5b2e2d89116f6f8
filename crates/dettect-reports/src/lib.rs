//! DeTTECT Reports - filesystem report generators
//!
//! Provides:
//! - ATT&CK Navigator layers (data sources, visibility, detection, overlay,
//!   group heat maps)
//! - CSV spreadsheets and SVG growth graphs
//! - Technique administration synthesis and in-place update
//! - Knowledge base statistics
//!
//! `FsGenerators` implements the generator traits of `dettect-core` on top
//! of these modules.

pub mod export;
pub mod generators;
pub mod graph;
pub mod group;
pub mod layer;
pub mod scoring;
pub mod statistics;
pub mod synthesize;
pub mod update;

pub use generators::FsGenerators;
