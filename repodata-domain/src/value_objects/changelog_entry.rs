// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

/// One `%changelog` entry (spec §3). `date` is kept as epoch seconds, matching
/// the wire format's `changelog date="..."` attribute, rather than a parsed
/// calendar type — nothing downstream needs to do date arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub author: String,
    pub date: i64,
    pub text: String,
}

impl ChangelogEntry {
    pub fn new(author: impl Into<String>, date: i64, text: impl Into<String>) -> Self {
        Self { author: author.into(), date, text: text.into() }
    }
}
