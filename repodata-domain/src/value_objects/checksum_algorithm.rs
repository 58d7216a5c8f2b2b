// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::error::RepoError;
use std::fmt;
use std::str::FromStr;

/// Checksum algorithm label, as used both on the wire (repomd.xml, primary.xml
/// `checksum type="..."`) and as the `--checksum` CLI value (spec §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Canonical wire label. The legacy `sha` alias parses to `Sha1` but always
    /// *serializes* back as `"sha"`, matching the historical compatibility
    /// requirement in spec §4.1 ("legacy alias `sha` resolves to `sha1` on
    /// parse and serialises as `sha` for compatibility"). That asymmetry is
    /// represented with a dedicated flag rather than folding `sha` into
    /// `Sha1` outright, so a round-tripped `--checksum sha` repo keeps writing
    /// `type="sha"` on every package checksum, not `type="sha1"`.
    pub fn wire_label(&self, legacy_sha_alias: bool) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 if legacy_sha_alias => "sha",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha224 => "sha224",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha384 => "sha384",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(RepoError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_label(false))
    }
}

/// A checksum value paired with the algorithm label that produced it (spec §3
/// "checksum type label string and the hash actually computed agree").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Whether this checksum was requested via the legacy `sha` alias, so the
    /// wire form keeps writing `type="sha"`.
    pub legacy_sha_alias: bool,
    pub hex_digest: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, legacy_sha_alias: bool, hex_digest: String) -> Self {
        Self { algorithm, legacy_sha_alias, hex_digest }
    }

    pub fn wire_type(&self) -> &'static str {
        self.algorithm.wire_label(self.legacy_sha_alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha_alias_parses_to_sha1_but_serializes_as_sha() {
        let algo: ChecksumAlgorithm = "sha".parse().unwrap();
        assert_eq!(algo, ChecksumAlgorithm::Sha1);
        assert_eq!(algo.wire_label(true), "sha");
        assert_eq!(algo.wire_label(false), "sha1");
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!("sha3".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn round_trip_labels() {
        for (label, expected) in [
            ("md5", ChecksumAlgorithm::Md5),
            ("sha1", ChecksumAlgorithm::Sha1),
            ("sha224", ChecksumAlgorithm::Sha224),
            ("sha256", ChecksumAlgorithm::Sha256),
            ("sha384", ChecksumAlgorithm::Sha384),
            ("sha512", ChecksumAlgorithm::Sha512),
        ] {
            assert_eq!(label.parse::<ChecksumAlgorithm>().unwrap(), expected);
            assert_eq!(expected.wire_label(false), label);
        }
    }
}
