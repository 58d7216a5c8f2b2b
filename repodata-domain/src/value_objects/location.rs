// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

/// The `<location>` element of primary.xml: the package's path relative to the
/// repo root, with an optional alternate base URL (spec §3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub base: Option<String>,
}

impl Location {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into(), base: None }
    }

    pub fn with_base(href: impl Into<String>, base: impl Into<String>) -> Self {
        Self { href: href.into(), base: Some(base.into()) }
    }
}
