//! Command orchestration layer.

pub mod dispatch;
