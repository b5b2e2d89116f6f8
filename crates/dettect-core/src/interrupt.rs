//! Interrupt handling
//!
//! Ctrl+C terminates the process immediately. In-process consumers (tests,
//! the interactive session) can instead observe the shared flag, which the
//! dispatcher checks between steps and generators check inside their
//! record loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{DtError, DtErrorKind, Result};

/// What the signal handler does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnSignal {
    /// Raise the flag, then exit the process with this status
    Exit(i32),
    /// Only raise the flag
    RaiseFlag,
}

/// Shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process-wide Ctrl+C handler
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a handler is already registered.
    pub fn install(&self, on_signal: OnSignal) -> Result<()> {
        let raised = self.raised.clone();
        ctrlc::set_handler(move || {
            raised.store(true, Ordering::SeqCst);
            if let OnSignal::Exit(code) = on_signal {
                std::process::exit(code);
            }
        })
        .map_err(|e| {
            DtError::new(DtErrorKind::Internal)
                .with_op("install_interrupt")
                .with_message(e.to_string())
        })
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Fail with `Interrupted` once the flag is raised
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` (tagged with `op`) if the flag is raised.
    pub fn check(&self, op: &str) -> Result<()> {
        if self.is_raised() {
            return Err(DtError::new(DtErrorKind::Interrupted)
                .with_op(op)
                .with_message("interrupted"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_until_raised() {
        let interrupt = Interrupt::new();
        assert!(interrupt.check("step").is_ok());

        interrupt.raise();

        let err = interrupt.check("step").unwrap_err();
        assert_eq!(err.kind(), DtErrorKind::Interrupted);
        assert_eq!(err.op(), Some("step"));
    }

    #[test]
    fn test_clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let observer = interrupt.clone();

        interrupt.raise();

        assert!(observer.is_raised());
    }
}
