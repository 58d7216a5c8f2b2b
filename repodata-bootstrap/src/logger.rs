// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap-phase logging and the process-wide `tracing` subscriber
//! (SPEC_FULL §1, grounded in the teacher's `adaptive_pipeline_bootstrap::logger`).
//!
//! Two things live here: a minimal [`BootstrapLogger`] trait for messages
//! emitted before the subscriber is installed (argument validation, config
//! loading), and [`init_subscriber`], which installs the real `tracing`
//! pipeline the rest of the process logs through.

use tracing_subscriber::EnvFilter;

/// Bootstrap-phase logging abstraction, used only before [`init_subscriber`]
/// runs. Once the subscriber is installed, call sites use `tracing::*!`
/// macros directly.
pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
}

/// Routes bootstrap-phase messages through `tracing` under a fixed target,
/// same as the post-init call sites, so early failures show up in the same
/// log stream.
pub struct ConsoleLogger;

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "{message}");
    }
}

/// No-op logger for tests that exercise validation paths without caring
/// about log output.
pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
}

/// Installs the process-wide `tracing` subscriber. `verbose` raises the
/// default filter from `info` to `debug` (SPEC_FULL §1: "`--verbose` raises
/// the default filter from `info` to `debug`"); `RUST_LOG` always overrides
/// both when set.
pub fn init_subscriber(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLogger {
        calls: AtomicUsize,
    }

    impl BootstrapLogger for CountingLogger {
        fn error(&self, _message: &str) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
        fn warn(&self, _message: &str) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
        fn info(&self, _message: &str) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn no_op_logger_discards_everything() {
        let logger = NoOpLogger;
        logger.error("x");
        logger.warn("y");
        logger.info("z");
    }

    #[test]
    fn custom_logger_receives_every_call() {
        let logger = CountingLogger { calls: AtomicUsize::new(0) };
        logger.error("a");
        logger.warn("b");
        logger.info("c");
        assert_eq!(logger.calls.load(Ordering::Relaxed), 3);
    }
}
