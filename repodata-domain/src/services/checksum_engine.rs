// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Incremental digest abstraction (spec §4.1, C1).

use crate::error::RepoResult;
use crate::value_objects::checksum_algorithm::ChecksumAlgorithm;
use std::path::Path;

/// An incremental digest. Infrastructure implements this once per algorithm
/// family over the `md-5`/`sha1`/`sha2` crates; the domain only needs the
/// shape of the operation.
pub trait ChecksumEngine {
    fn new(algorithm: ChecksumAlgorithm) -> Self
    where
        Self: Sized;

    fn update(&mut self, bytes: &[u8]);

    /// Consumes the engine and returns the lowercase hex digest.
    fn finalize(self) -> String;
}

/// One-shot convenience: digest an entire file without the caller managing
/// an engine instance directly (spec §4.1).
pub trait DigestFile {
    fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> RepoResult<String>;
}
