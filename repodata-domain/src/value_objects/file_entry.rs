// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use std::fmt;

/// File type tag used in both filelists.xml and the primary-set filter
/// (spec §3, §4.3). Regular files omit the `type` attribute on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Regular,
    Dir,
    Ghost,
}

impl FileType {
    /// `type="..."` attribute value, or `None` for regular files which omit
    /// the attribute entirely (spec §6 primary.xml wire format).
    pub fn wire_attr(&self) -> Option<&'static str> {
        match self {
            FileType::Regular => None,
            FileType::Dir => Some("dir"),
            FileType::Ghost => Some("ghost"),
        }
    }

    /// Single-char code used in the SQLite `filelist.filetypes` batch column
    /// (spec §6 SQLite schemas).
    pub fn code(&self) -> char {
        match self {
            FileType::Regular => 'f',
            FileType::Dir => 'd',
            FileType::Ghost => 'g',
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_attr().unwrap_or("file"))
    }
}

/// One path a package owns. `dir`/`basename` are kept split because both the
/// primary-file predicate (§4.3) and the filelists SQLite schema's
/// `dirname`/`filenames` batching (§6) operate on the directory component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file_type: FileType,
    pub dir: String,
    pub basename: String,
}

impl FileEntry {
    pub fn new(file_type: FileType, dir: impl Into<String>, basename: impl Into<String>) -> Self {
        Self { file_type, dir: dir.into(), basename: basename.into() }
    }

    /// Full repo-relative path, `dir` + `basename`. `dir` is expected to carry
    /// its own trailing slash (or be empty for root-level files), matching how
    /// RPM's own `dirnames`/`basenames`/`dirindexes` tag triple is laid out.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.dir, self.basename)
    }
}

/// The literal §4.3 predicate deciding whether a file entry appears in
/// primary.xml (filelists.xml always carries every entry, spec §3 invariant).
///
/// Intentionally reproduces historical package-manager expectations rather
/// than anything "clean" — see spec §4.3's own disclaimer.
pub fn is_primary_file(entry: &FileEntry) -> bool {
    let full = entry.full_path();
    if full.starts_with("/etc/") {
        return true;
    }
    if matches!(entry.dir.as_str(), "/bin/" | "/sbin/" | "/usr/bin/" | "/usr/sbin/") {
        return true;
    }
    if full == "/usr/lib/sendmail" {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(dir: &str, base: &str) -> FileEntry {
        FileEntry::new(FileType::Regular, dir, base)
    }

    #[test]
    fn etc_at_any_depth_is_primary() {
        assert!(is_primary_file(&f("/etc/", "foo.conf")));
        assert!(is_primary_file(&f("/etc/sub/dir/", "foo.conf")));
    }

    #[test]
    fn direct_children_of_bin_dirs_are_primary() {
        for dir in ["/bin/", "/sbin/", "/usr/bin/", "/usr/sbin/"] {
            assert!(is_primary_file(&f(dir, "tool")));
        }
        // nested under /usr/bin/sub/ is NOT a direct child, so not primary.
        assert!(!is_primary_file(&f("/usr/bin/sub/", "tool")));
    }

    #[test]
    fn sendmail_exact_path_is_primary() {
        assert!(is_primary_file(&f("/usr/lib/", "sendmail")));
        assert!(!is_primary_file(&f("/usr/lib/", "sendmail.cf")));
    }

    #[test]
    fn everything_else_is_not_primary() {
        assert!(!is_primary_file(&f("/usr/share/doc/", "README")));
    }
}
