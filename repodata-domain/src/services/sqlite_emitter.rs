// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-package SQLite row insertion, one batch per sink (spec §4.4, C5).

use crate::entities::package_fact::PackageFact;
use crate::error::RepoResult;

/// Schema version stamped into every `db_info` table (spec §4.4).
pub const SCHEMA_VERSION: u32 = 10;

/// A single metadata family's database (primary/filelists/other). Infra
/// wraps one `rusqlite::Connection` per sink, each inside the same writer
/// transaction the ordered writer already serializes through.
pub trait SqliteSink {
    fn insert(&mut self, fact: &PackageFact) -> RepoResult<()>;

    /// Builds indexes, fills in `db_info.checksum` from the sink's finished
    /// XML checksum, and commits (spec §4.4, §4.6.4).
    fn close(self: Box<Self>, xml_checksum_hex: &str) -> RepoResult<()>;
}
