// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C2: compressed stream abstraction over none/gzip/bzip2/xz, backed by
//! `niffler`, with an optional content-stat hook on read (spec §4.2).

use crate::checksum::Hasher;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::checksum_engine::ChecksumEngine;
use repodata_domain::services::compressed_stream::{CompressedReader, CompressedWriter, ContentStat, ReadCodec};
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

fn niffler_format(codec: CompressionType) -> niffler::compression::Format {
    match codec {
        CompressionType::None => niffler::compression::Format::No,
        CompressionType::Gzip => niffler::compression::Format::Gzip,
        CompressionType::Bzip2 => niffler::compression::Format::Bzip,
        CompressionType::Xz => niffler::compression::Format::Lzma,
    }
}

/// MIME-sniffing fallback used when suffix detection is inconclusive
/// (spec §4.2). Magic bytes only; no external `file` invocation.
fn sniff(first_bytes: &[u8]) -> CompressionType {
    if first_bytes.starts_with(&[0x1f, 0x8b]) {
        CompressionType::Gzip
    } else if first_bytes.starts_with(b"BZh") {
        CompressionType::Bzip2
    } else if first_bytes.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        CompressionType::Xz
    } else {
        CompressionType::None
    }
}

fn resolve_read_codec(path: &Path, codec: ReadCodec) -> RepoResult<CompressionType> {
    match codec {
        ReadCodec::Explicit(c) => Ok(c),
        ReadCodec::AutoDetect => {
            if let Some(c) = CompressionType::from_suffix(path) {
                return Ok(c);
            }
            let mut head = [0u8; 6];
            let mut f = File::open(path).map_err(|e| RepoError::io(path, e))?;
            let n = f.read(&mut head).map_err(|e| RepoError::io(path, e))?;
            Ok(sniff(&head[..n]))
        }
    }
}

/// Reader that taps the decompressed byte stream through an optional
/// checksum+counter, exposing `(open_size, open_checksum)` once the stream is
/// fully drained (spec §4.2 content-stat hook).
pub struct StatReader {
    inner: Box<dyn Read>,
    hasher: Option<Hasher>,
    size: u64,
    has_stat: bool,
}

impl Read for StatReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.size += n as u64;
            if let Some(h) = self.hasher.as_mut() {
                h.update(&buf[..n]);
            }
        }
        Ok(n)
    }
}

impl CompressedReader for StatReader {
    /// Only meaningful after the stream has been read to EOF; the engine
    /// itself is consumed by `finalize`, so callers drain first via
    /// [`StatReader::into_stat`].
    fn content_stat(&self) -> Option<ContentStat> {
        None
    }
}

impl StatReader {
    /// Consumes the tap, finalizing the checksum. Call only after the
    /// underlying stream has been read to EOF.
    pub fn into_stat(self) -> Option<ContentStat> {
        if !self.has_stat {
            return None;
        }
        let hex = self.hasher.map(|h| h.finalize()).unwrap_or_default();
        Some(ContentStat { open_size: self.size, open_checksum_hex: hex })
    }
}

pub fn open_read(
    path: &Path,
    codec: ReadCodec,
    stat_algorithm: Option<ChecksumAlgorithm>,
) -> RepoResult<StatReader> {
    let resolved = resolve_read_codec(path, codec)?;
    let file = File::open(path).map_err(|e| RepoError::io(path, e))?;
    let reader = BufReader::new(file);
    let decoder: Box<dyn Read> = if resolved == CompressionType::None {
        Box::new(reader)
    } else {
        let (r, _format) = niffler::get_reader(Box::new(reader))
            .map_err(|e| RepoError::MalformedStream(e.to_string()))?;
        r
    };
    let has_stat = stat_algorithm.is_some();
    let hasher = stat_algorithm.map(Hasher::new);
    Ok(StatReader { inner: decoder, hasher, size: 0, has_stat })
}

pub struct NifflerWriter {
    inner: Option<Box<dyn Write>>,
    path: std::path::PathBuf,
}

impl Write for NifflerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.as_mut().expect("write after finish").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.as_mut().expect("write after finish").flush()
    }
}

impl CompressedWriter for NifflerWriter {
    fn finish(mut self: Box<Self>) -> RepoResult<()> {
        if let Some(mut w) = self.inner.take() {
            w.flush().map_err(|e| RepoError::io(self.path.clone(), e))?;
        }
        Ok(())
    }
}

pub fn open_write(path: &Path, codec: CompressionType) -> RepoResult<NifflerWriter> {
    let file = File::create(path).map_err(|e| RepoError::io(path, e))?;
    let writer = BufWriter::new(file);
    let boxed: Box<dyn Write> = if codec == CompressionType::None {
        Box::new(writer)
    } else {
        niffler::get_writer(Box::new(writer), niffler_format(codec), niffler::compression::Level::Six)
            .map_err(|e| RepoError::MalformedStream(e.to_string()))?
    };
    Ok(NifflerWriter { inner: Some(boxed), path: path.to_path_buf() })
}

// niffler's `get_writer` returns `Box<dyn Write>` without a `Send` bound,
// since the crate is agnostic about threading. Every concrete encoder it can
// return (`GzEncoder`/`BzEncoder`/`XzEncoder` over `BufWriter<File>`) is in
// fact `Send` — only the trait object's declared bound is conservative. The
// ordered writer (pipeline/ordered_writer.rs) shares one `NifflerWriter` per
// sink across worker threads behind a `Mutex`, which requires this.
unsafe impl Send for NifflerWriter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_recognizes_gzip_magic() {
        assert_eq!(sniff(&[0x1f, 0x8b, 0x08]), CompressionType::Gzip);
    }

    #[test]
    fn sniff_recognizes_bzip2_magic() {
        assert_eq!(sniff(b"BZh9"), CompressionType::Bzip2);
    }

    #[test]
    fn sniff_falls_back_to_none() {
        assert_eq!(sniff(b"<?xml"), CompressionType::None);
    }
}
