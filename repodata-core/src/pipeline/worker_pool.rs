// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C7 §4.6.2: bounded worker pool executing the per-task routine.

use super::discovery::Task;
use super::ordered_writer::OrderedWriter;
use crate::xml::{filelists, other, primary};
use crossbeam::channel::{self, Receiver};
use repodata_domain::entities::package_fact::{PackageFact, Provenance};
use repodata_domain::error::RepoResult;
use repodata_domain::services::old_metadata::OldMetadataMap;
use repodata_domain::services::rpm_fact_extractor::{ExtractionRequest, RpmFactExtractor};
use repodata_domain::services::xml_emitter::PackageFragments;
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct WorkerPoolConfig {
    pub workers: usize,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub legacy_sha_alias: bool,
    pub changelog_limit: usize,
    pub base_url: Option<String>,
    pub skip_stat: bool,
}

/// Counts real C3 invocations, surfaced for the "update idempotence" property
/// (spec §8 invariant 5: "C3 is not invoked" when every fact was reused).
#[derive(Default)]
pub struct WorkerStats {
    pub extractions: AtomicUsize,
    pub warnings: AtomicUsize,
}

fn try_reuse(
    task: &Task,
    old_metadata: Option<&OldMetadataMap>,
    cfg: &WorkerPoolConfig,
) -> Option<PackageFact> {
    let map = old_metadata?;
    let cached = map.get(&task.basename)?;
    if !cfg.skip_stat {
        let meta = std::fs::metadata(&task.full_path).ok()?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)?;
        if mtime != cached.timestamps.file_mtime || meta.len() != cached.sizes.package {
            return None;
        }
        if cached.checksum_type != format!("{}", cfg.checksum_algorithm) {
            return None;
        }
    }
    let mut reused = cached.clone();
    reused.location.href = task.basename.clone();
    reused.location.base = cfg.base_url.clone();
    reused.provenance = Provenance::Cached;
    Some(reused)
}

fn build_fact(
    task: &Task,
    extractor: &dyn RpmFactExtractor,
    old_metadata: Option<&OldMetadataMap>,
    cfg: &WorkerPoolConfig,
) -> RepoResult<PackageFact> {
    if let Some(fact) = try_reuse(task, old_metadata, cfg) {
        return Ok(fact);
    }
    extractor.extract(ExtractionRequest {
        rpm_path: &task.full_path,
        checksum_algorithm: cfg.checksum_algorithm,
        legacy_sha_alias: cfg.legacy_sha_alias,
        location_href: task.basename.clone(),
        location_base: cfg.base_url.clone(),
        changelog_limit: cfg.changelog_limit,
    })
}

fn render_fragments(fact: &PackageFact) -> RepoResult<PackageFragments> {
    Ok(PackageFragments {
        primary: primary::render(fact)?,
        filelists: filelists::render(fact)?,
        other: other::render(fact)?,
    })
}

/// Runs the pool to completion: spawns `cfg.workers` OS threads pulling
/// tasks off a shared channel, each executing the per-task routine (reuse
/// or extract, render, submit) against `writer` (spec §4.6.2).
pub fn run(
    tasks: Vec<Task>,
    writer: Arc<OrderedWriter>,
    extractor: Arc<dyn RpmFactExtractor + Send + Sync>,
    old_metadata: Option<Arc<OldMetadataMap>>,
    cfg: WorkerPoolConfig,
) -> RepoResult<Arc<WorkerStats>> {
    let last_id = tasks.len().saturating_sub(1);
    let (sender, receiver): (_, Receiver<Task>) = channel::unbounded();
    for task in tasks {
        sender.send(task).expect("receiver outlives pool spawn");
    }
    drop(sender);

    let stats = Arc::new(WorkerStats::default());
    let worker_count = cfg.workers.max(1);
    let cfg = Arc::new(cfg);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|_| {
                let receiver = receiver.clone();
                let writer = Arc::clone(&writer);
                let extractor = Arc::clone(&extractor);
                let old_metadata = old_metadata.clone();
                let cfg = Arc::clone(&cfg);
                let stats = Arc::clone(&stats);
                scope.spawn(move || -> RepoResult<()> {
                    while let Ok(task) = receiver.recv() {
                        let is_last = task.id == last_id;
                        match build_fact(&task, extractor.as_ref(), old_metadata.as_deref(), &cfg) {
                            Ok(fact) => {
                                if matches!(fact.provenance, Provenance::Fresh) {
                                    stats.extractions.fetch_add(1, Ordering::Relaxed);
                                }
                                let fragments = render_fragments(&fact)?;
                                writer.submit(task.id, fragments, fact, is_last)?;
                            }
                            Err(_) => {
                                // Worker-local failure: log and keep the
                                // pipeline alive (spec §7 propagation
                                // policy) by still advancing every cursor.
                                stats.warnings.fetch_add(1, Ordering::Relaxed);
                                tracing::warn!(package = %task.basename, "dropping package: extraction failed");
                                writer.submit_failure(task.id)?;
                            }
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker thread panicked")?;
        }
        Ok(stats)
    })
}
