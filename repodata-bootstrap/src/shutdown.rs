// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SIGINT-driven shutdown for the synchronous build pipeline (SPEC_FULL §0,
//! spec §4.8/§9 scenario S6: "SIGINT mid-build removes the staging directory
//! and exits non-zero, leaving the previous `repodata/` untouched").
//!
//! The teacher's [`crate::logger`] sibling and `adaptive_pipeline_bootstrap`'s
//! `ShutdownCoordinator` are built on `tokio::sync::Notify` and async tasks;
//! this pipeline is thread-based, so the same role — "remember what to clean
//! up, act on it exactly once when a signal arrives" — is played here with a
//! `signal-hook` flag and a polling watcher thread instead.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Removes the tracked staging directory, if any. Split out from the watcher
/// loop so it is testable without an actual signal.
fn cleanup_staging(staging_dir: &Mutex<Option<PathBuf>>) {
    if let Some(dir) = staging_dir.lock().unwrap().take() {
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => tracing::warn!(staging_dir = %dir.display(), "SIGINT: removed staging directory"),
            Err(e) => tracing::error!(staging_dir = %dir.display(), error = %e, "SIGINT: failed to remove staging directory"),
        }
    }
}

/// Tracks the in-flight build's staging directory and removes it if SIGINT
/// arrives before publication. One instance per process.
pub struct ShutdownGuard {
    staging_dir: Arc<Mutex<Option<PathBuf>>>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownGuard {
    /// Registers the SIGINT handler and starts the watcher thread. The
    /// process exits with code 130 (128 + SIGINT) once cleanup completes,
    /// matching the conventional "killed by signal N" exit status.
    pub fn install() -> std::io::Result<Self> {
        let triggered = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&triggered))?;

        let staging_dir = Arc::new(Mutex::new(None));
        let watcher_triggered = Arc::clone(&triggered);
        let watcher_staging = Arc::clone(&staging_dir);
        thread::spawn(move || loop {
            if watcher_triggered.load(Ordering::SeqCst) {
                cleanup_staging(&watcher_staging);
                std::process::exit(130);
            }
            thread::sleep(POLL_INTERVAL);
        });

        Ok(Self { staging_dir, triggered })
    }

    /// Registers the directory a build in progress would need removed on a
    /// signal. Overwrites whatever was tracked before.
    pub fn track(&self, staging_dir: PathBuf) {
        *self.staging_dir.lock().unwrap() = Some(staging_dir);
    }

    /// Clears the tracked path once a build has published successfully, so
    /// a later signal in the same process does nothing.
    pub fn clear(&self) {
        self.staging_dir.lock().unwrap().take();
    }

    pub fn was_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_removes_tracked_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        std::fs::create_dir(&path).unwrap();
        let tracked = Mutex::new(Some(path.clone()));

        cleanup_staging(&tracked);

        assert!(!path.exists());
        assert!(tracked.lock().unwrap().is_none());
    }

    #[test]
    fn cleanup_is_a_no_op_when_nothing_tracked() {
        let tracked: Mutex<Option<PathBuf>> = Mutex::new(None);
        cleanup_staging(&tracked);
        assert!(tracked.lock().unwrap().is_none());
    }

    #[test]
    fn clear_drops_the_tracked_path_without_removing_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        std::fs::create_dir(&path).unwrap();
        let tracked = Arc::new(Mutex::new(Some(path.clone())));

        *tracked.lock().unwrap() = None;

        assert!(path.exists());
    }
}
