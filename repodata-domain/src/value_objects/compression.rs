// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::error::RepoError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Compression codec (spec §4.2). `None` is a real wire value (plain XML),
/// not the absence of a codec choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl CompressionType {
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionType::None => "",
            CompressionType::Gzip => ".gz",
            CompressionType::Bzip2 => ".bz2",
            CompressionType::Xz => ".xz",
        }
    }

    /// Suffix-based detection, tried before MIME sniffing (spec §4.2 and the
    /// preserved-quirk in §9: a `.xml` suffix always wins, even over
    /// compressed-looking bytes).
    pub fn from_suffix(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".xml") {
            return Some(CompressionType::None);
        }
        if name.ends_with(".gz") || name.ends_with(".gzip") || name.ends_with(".gunzip") {
            return Some(CompressionType::Gzip);
        }
        if name.ends_with(".bz2") || name.ends_with(".bzip2") {
            return Some(CompressionType::Bzip2);
        }
        if name.ends_with(".xz") {
            return Some(CompressionType::Xz);
        }
        None
    }
}

impl FromStr for CompressionType {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "plain" => Ok(Self::None),
            "gz" | "gzip" => Ok(Self::Gzip),
            "bz2" | "bzip2" => Ok(Self::Bzip2),
            "xz" => Ok(Self::Xz),
            other => Err(RepoError::UnknownCompression(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Bzip2 => "bzip2",
            CompressionType::Xz => "xz",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn xml_suffix_wins_even_if_bytes_look_compressed() {
        // Preserved quirk from spec §9: suffix precedence is absolute.
        assert_eq!(
            CompressionType::from_suffix(&PathBuf::from("primary.xml")),
            Some(CompressionType::None)
        );
    }

    #[test]
    fn suffix_variants() {
        for (name, expected) in [
            ("a.gz", CompressionType::Gzip),
            ("a.gzip", CompressionType::Gzip),
            ("a.gunzip", CompressionType::Gzip),
            ("a.bz2", CompressionType::Bzip2),
            ("a.bzip2", CompressionType::Bzip2),
            ("a.xz", CompressionType::Xz),
        ] {
            assert_eq!(CompressionType::from_suffix(&PathBuf::from(name)), Some(expected));
        }
    }

    #[test]
    fn unrecognized_suffix_falls_through() {
        assert_eq!(CompressionType::from_suffix(&PathBuf::from("a.rpm")), None);
    }
}
