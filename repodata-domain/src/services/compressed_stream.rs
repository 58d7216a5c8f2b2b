// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Uniform read/write interface over the four supported codecs
//! (spec §4.2, C2).

use crate::error::RepoResult;
use crate::value_objects::checksum_algorithm::ChecksumAlgorithm;
use crate::value_objects::compression::CompressionType;
use std::io::{Read, Write};
use std::path::Path;

/// Explicit codec, or auto-detect (read-only — illegal on open-for-write,
/// spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCodec {
    Explicit(CompressionType),
    AutoDetect,
}

/// The `(open size, open checksum)` pair captured by the content-stat hook
/// while decompressed bytes are streamed to the reader (spec §4.2).
#[derive(Debug, Clone)]
pub struct ContentStat {
    pub open_size: u64,
    pub open_checksum_hex: String,
}

pub trait CompressedReader: Read {
    /// Available only after the stream has been fully consumed and closed.
    fn content_stat(&self) -> Option<ContentStat>;
}

pub trait CompressedWriter: Write {
    fn finish(self: Box<Self>) -> RepoResult<()>;
}

/// Factory for opening compressed streams. Infrastructure backs this with
/// `niffler` for the codec machinery plus a wrapping reader/writer that taps
/// the byte stream for the content-stat hook.
pub trait CompressedStreamFactory {
    fn open_read(
        path: &Path,
        codec: ReadCodec,
        stat_algorithm: Option<ChecksumAlgorithm>,
    ) -> RepoResult<Box<dyn CompressedReader>>;

    fn open_write(path: &Path, codec: CompressionType) -> RepoResult<Box<dyn CompressedWriter>>;
}
