// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C1: incremental checksum engine over the five algorithm families the
//! wire format recognises (spec §4.1).

use md5::Md5;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::checksum_engine::ChecksumEngine;
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Tagged union over the digest families, so callers don't need a type
/// parameter per algorithm (spec §4.2's "avoid per-byte virtual calls by
/// buffering" note applies here too — one `update` call per read chunk).
pub enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl ChecksumEngine for Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            ChecksumAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            ChecksumAlgorithm::Sha224 => Hasher::Sha224(Sha224::new()),
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            ChecksumAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            ChecksumAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(bytes),
            Hasher::Sha1(h) => h.update(bytes),
            Hasher::Sha224(h) => h.update(bytes),
            Hasher::Sha256(h) => h.update(bytes),
            Hasher::Sha384(h) => h.update(bytes),
            Hasher::Sha512(h) => h.update(bytes),
        }
    }

    fn finalize(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Sha224(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha384(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

const READ_CHUNK: usize = 64 * 1024;

/// One-shot whole-file digest (spec §4.1 `digest_file`).
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> RepoResult<String> {
    let mut file = File::open(path).map_err(|e| RepoError::io(path, e))?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).map_err(|e| RepoError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input_matches_known_digest() {
        let mut hasher = Hasher::new(ChecksumAlgorithm::Sha256);
        hasher.update(b"");
        let digest = hasher.finalize();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn chunked_updates_match_single_update() {
        let mut a = Hasher::new(ChecksumAlgorithm::Sha1);
        a.update(b"hello world");
        let whole = a.finalize();

        let mut b = Hasher::new(ChecksumAlgorithm::Sha1);
        b.update(b"hello ");
        b.update(b"world");
        let chunked = b.finalize();

        assert_eq!(whole, chunked);
    }
}
