//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility. Log
//! events always go to stderr; stdout belongs to the generators' console
//! progress and the statistics reports.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Crates whose events are enabled by the default filters
const CRATES: &[&str] = &[
    "dettect_core",
    "dettect_store",
    "dettect_reports",
    "dettect_engine",
    "dettect_cli",
];

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output, warnings only (command-line default)
    Console,
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Build the default filter directive for all workspace crates
fn default_filter(level: &str) -> EnvFilter {
    let directives = CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Initialize the logging facility
///
/// This function should be called once at application startup. Later
/// calls are no-ops. `RUST_LOG` overrides the profile's default filter.
///
/// # Profiles
///
/// - **Console**: Human-readable logs with warn level
/// - **Development**: Human-readable logs with debug level
/// - **Production**: JSON structured logs with info level
/// - **Test**: Capture mode for test assertions
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Console => {
            tracing_subscriber::fmt()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter("warn")),
                )
                .init();
        }
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter("debug")),
                )
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter("info")),
                )
                .init();
        }
        Profile::Test => {
            // Test capture is initialized separately via init_test_capture()
            tracing_subscriber::registry().init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_names_every_crate() {
        let rendered = default_filter("info").to_string();
        for krate in CRATES {
            assert!(rendered.contains(krate), "missing {}", krate);
        }
    }

    #[test]
    fn test_profile_equality() {
        assert_eq!(Profile::Console, Profile::Console);
        assert_ne!(Profile::Development, Profile::Production);
    }
}
