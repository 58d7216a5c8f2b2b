// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C7 §4.6.3: the ordered multi-sink writer.
//!
//! Three independent output streams (primary/filelists/other) each have
//! their own "next id" cursor. Workers complete tasks in arbitrary order but
//! each sink must receive fragments in strict ascending `id` order. A bounded
//! reorder buffer absorbs short-lived scheduling asymmetries so a worker
//! that finishes early doesn't block on a sink whose earlier tasks are still
//! in flight elsewhere.
//!
//! Rust's ownership model frees the original's manual fresh/cached
//! free-on-write bookkeeping: a buffered task simply owns its
//! `PackageFact` (cloned out of the old-metadata arena when cached), so
//! there is no separate "ownership flag" to track — see DESIGN.md.

use parking_lot::{Condvar, Mutex};
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::sqlite_emitter::SqliteSink;
use repodata_domain::services::xml_emitter::PackageFragments;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reorder buffer capacity (spec §4.6.3: "a fixed capacity (≈20)").
const REORDER_CAPACITY: usize = 20;

struct SinkState {
    next_id: usize,
    writer: Box<dyn Write + Send>,
    sqlite: Option<Box<dyn SqliteSink + Send>>,
}

struct Sink {
    state: Mutex<SinkState>,
    condvar: Condvar,
}

impl Sink {
    fn new(writer: Box<dyn Write + Send>, sqlite: Option<Box<dyn SqliteSink + Send>>) -> Self {
        Self { state: Mutex::new(SinkState { next_id: 0, writer, sqlite }), condvar: Condvar::new() }
    }

    fn peek_next_id(&self) -> usize {
        self.state.lock().next_id
    }

    /// Waits until this sink's cursor reaches `id`, then writes (or skips,
    /// on a worker failure) and advances the cursor. Releases the lock
    /// before broadcasting, per §5: "they do not hold more than one lock at
    /// a time in the waiting state". Also wakes on `aborted`, so a
    /// writer-fatal error on one sink does not leave the other two workers
    /// parked on a cursor that will never advance.
    fn write_in_turn(
        &self,
        id: usize,
        payload: Option<(&str, &PackageFact)>,
        aborted: &AtomicBool,
    ) -> RepoResult<()> {
        let mut state = self.state.lock();
        while state.next_id != id {
            if aborted.load(Ordering::Acquire) {
                return Err(RepoError::assertion("ordered writer aborted"));
            }
            self.condvar.wait(&mut state);
        }
        if aborted.load(Ordering::Acquire) {
            return Err(RepoError::assertion("ordered writer aborted"));
        }
        if let Some((fragment, fact)) = payload {
            state
                .writer
                .write_all(fragment.as_bytes())
                .map_err(|e| RepoError::io("<sink>", e))?;
            if let Some(sqlite) = state.sqlite.as_deref_mut() {
                sqlite.insert(fact)?;
            }
        }
        state.next_id += 1;
        drop(state);
        self.condvar.notify_all();
        Ok(())
    }

    fn into_writer(self) -> (Box<dyn Write + Send>, Option<Box<dyn SqliteSink + Send>>) {
        let state = self.state.into_inner();
        (state.writer, state.sqlite)
    }
}

struct BufferedTask {
    id: usize,
    fragments: PackageFragments,
    fact: PackageFact,
}

/// The shared writer all pool workers submit completed tasks to.
pub struct OrderedWriter {
    primary: Sink,
    filelists: Sink,
    other: Sink,
    reorder_buffer: Mutex<BTreeMap<usize, BufferedTask>>,
    /// Set once any sink write fails fatally, and broadcast to every sink's
    /// condvar so a worker parked on a *different* sink's cursor doesn't
    /// wait forever for an id that will now never arrive.
    aborted: AtomicBool,
}

impl OrderedWriter {
    pub fn new(
        primary_writer: Box<dyn Write + Send>,
        primary_sqlite: Option<Box<dyn SqliteSink + Send>>,
        filelists_writer: Box<dyn Write + Send>,
        filelists_sqlite: Option<Box<dyn SqliteSink + Send>>,
        other_writer: Box<dyn Write + Send>,
        other_sqlite: Option<Box<dyn SqliteSink + Send>>,
    ) -> Self {
        Self {
            primary: Sink::new(primary_writer, primary_sqlite),
            filelists: Sink::new(filelists_writer, filelists_sqlite),
            other: Sink::new(other_writer, other_sqlite),
            reorder_buffer: Mutex::new(BTreeMap::new()),
            aborted: AtomicBool::new(false),
        }
    }

    /// Flags the writer as aborted and wakes every sink's waiters, per
    /// `write_in_turn`'s doc comment.
    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.primary.condvar.notify_all();
        self.filelists.condvar.notify_all();
        self.other.condvar.notify_all();
    }

    /// Per-task submission protocol (spec §4.6.3 steps 1-3). `is_last` marks
    /// the final task in discovery order, which must always fall through to
    /// the ordered-write path so the build can close.
    pub fn submit(&self, id: usize, fragments: PackageFragments, fact: PackageFact, is_last: bool) -> RepoResult<()> {
        let mut buffer = self.reorder_buffer.lock();
        let on_turn = id == self.primary.peek_next_id();
        if !on_turn && buffer.len() < REORDER_CAPACITY && !is_last {
            buffer.insert(id, BufferedTask { id, fragments, fact });
            return Ok(());
        }
        drop(buffer);

        self.write_task(id, &fragments, &fact)?;
        self.drain_contiguous()
    }

    /// A worker that failed before rendering fragments still must advance
    /// all three cursors, or the pipeline deadlocks waiting on this id
    /// forever (spec §4.6.3 "Error paths").
    pub fn submit_failure(&self, id: usize) -> RepoResult<()> {
        if let Err(e) = self.primary.write_in_turn(id, None, &self.aborted) {
            self.abort();
            return Err(e);
        }
        if let Err(e) = self.filelists.write_in_turn(id, None, &self.aborted) {
            self.abort();
            return Err(e);
        }
        if let Err(e) = self.other.write_in_turn(id, None, &self.aborted) {
            self.abort();
            return Err(e);
        }
        self.drain_contiguous()
    }

    fn write_task(&self, id: usize, fragments: &PackageFragments, fact: &PackageFact) -> RepoResult<()> {
        if let Err(e) = self.primary.write_in_turn(id, Some((fragments.primary.as_str(), fact)), &self.aborted) {
            self.abort();
            return Err(e);
        }
        if let Err(e) = self.filelists.write_in_turn(id, Some((fragments.filelists.as_str(), fact)), &self.aborted) {
            self.abort();
            return Err(e);
        }
        if let Err(e) = self.other.write_in_turn(id, Some((fragments.other.as_str(), fact)), &self.aborted) {
            self.abort();
            return Err(e);
        }
        Ok(())
    }

    /// After writing its own id, a worker drains as many contiguous buffered
    /// tasks as it can (spec §4.6.3 step 3).
    fn drain_contiguous(&self) -> RepoResult<()> {
        loop {
            let next = self.primary.peek_next_id();
            let task = {
                let mut buffer = self.reorder_buffer.lock();
                match buffer.first_key_value() {
                    Some((&k, _)) if k == next => buffer.remove(&k),
                    _ => None,
                }
            };
            match task {
                Some(t) => self.write_task(t.id, &t.fragments, &t.fact)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Closes all three sinks in order primary, filelists, other, returning
    /// each sink's compressed writer and (optional) SQLite sink for the
    /// caller to finalize (flush/compress/checksum — spec §4.6.4).
    pub fn into_sinks(
        self,
    ) -> (
        (Box<dyn Write + Send>, Option<Box<dyn SqliteSink + Send>>),
        (Box<dyn Write + Send>, Option<Box<dyn SqliteSink + Send>>),
        (Box<dyn Write + Send>, Option<Box<dyn SqliteSink + Send>>),
    ) {
        (self.primary.into_writer(), self.filelists.into_writer(), self.other.into_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodata_domain::entities::package_fact::{
        Descriptive, DependencySets, HeaderRange, Identity, Provenance, Sizes, Timestamps,
    };
    use repodata_domain::value_objects::location::Location;

    fn fact(name: &str) -> PackageFact {
        PackageFact {
            identity: Identity {
                pkg_id: format!("{name}-id"),
                name: name.to_string(),
                arch: "x86_64".into(),
                epoch: None,
                version: "1".into(),
                release: "1".into(),
            },
            location: Location::new(format!("{name}.rpm")),
            descriptive: Descriptive::default(),
            sizes: Sizes::default(),
            timestamps: Timestamps::default(),
            header_range: HeaderRange::new(0, 1),
            checksum_type: "sha256".into(),
            dependencies: DependencySets::default(),
            files: Vec::new(),
            changelogs: Vec::new(),
            provenance: Provenance::Fresh,
        }
    }

    fn fragments(tag: &str) -> PackageFragments {
        PackageFragments {
            primary: format!("<primary-{tag}/>"),
            filelists: format!("<filelists-{tag}/>"),
            other: format!("<other-{tag}/>"),
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn new_writer() -> (OrderedWriter, SharedBuf, SharedBuf, SharedBuf) {
        let primary = SharedBuf::default();
        let filelists = SharedBuf::default();
        let other = SharedBuf::default();
        let writer = OrderedWriter::new(
            Box::new(primary.clone()),
            None,
            Box::new(filelists.clone()),
            None,
            Box::new(other.clone()),
            None,
        );
        (writer, primary, filelists, other)
    }

    #[test]
    fn out_of_order_submissions_write_in_ascending_id_order() {
        let (writer, primary, filelists, other) = new_writer();
        writer.submit(2, fragments("c"), fact("c"), false).unwrap();
        writer.submit(0, fragments("a"), fact("a"), false).unwrap();
        writer.submit(1, fragments("b"), fact("b"), true).unwrap();

        assert_eq!(primary.contents(), "<primary-a/><primary-b/><primary-c/>");
        assert_eq!(filelists.contents(), "<filelists-a/><filelists-b/><filelists-c/>");
        assert_eq!(other.contents(), "<other-a/><other-b/><other-c/>");
    }

    #[test]
    fn submit_failure_advances_cursors_without_writing() {
        let (writer, primary, _filelists, _other) = new_writer();
        writer.submit_failure(0).unwrap();
        writer.submit(1, fragments("b"), fact("b"), true).unwrap();

        assert_eq!(primary.contents(), "<primary-b/>");
    }
}
