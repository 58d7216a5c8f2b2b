// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use std::fmt;

/// Comparison flag on a dependency entry, restricted to the wire vocabulary in
/// spec §3/§6: `{EQ, LT, LE, GT, GE}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyFlag {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for DependencyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyFlag::Eq => "EQ",
            DependencyFlag::Lt => "LT",
            DependencyFlag::Le => "LE",
            DependencyFlag::Gt => "GT",
            DependencyFlag::Ge => "GE",
        };
        write!(f, "{s}")
    }
}

/// One entry in a requires/provides/conflicts/obsoletes list (spec §3).
///
/// Equality is strict on every field including `pre`: spec §9 records that the
/// original tool can emit two dependency records with the same name/flag/evr
/// that differ only in `pre`, and a naive dedupe would silently drop one.
/// `#[derive(PartialEq)]` here intentionally does *not* collapse those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub flag: Option<DependencyFlag>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    /// Requires-only: true when the RPM's dependency flags carried a
    /// pre-install/pre-transaction bit not covered by `{EQ,LT,LE,GT,GE}`.
    pub pre: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), flag: None, epoch: None, version: None, release: None, pre: false }
    }
}
