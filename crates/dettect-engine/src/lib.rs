//! DeTTECT Engine - Command Dispatcher
//!
//! Resolves the administration files a request needs, validates them,
//! applies the query filter once and runs the requested generators in the
//! fixed order of the execution plan.

pub mod commands;

pub use commands::dispatch::dispatch;
