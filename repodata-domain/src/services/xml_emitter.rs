// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-package XML fragment rendering (spec §4.4, C4).

use crate::entities::package_fact::PackageFact;
use crate::error::RepoResult;

/// The three independent fragments produced for one `PackageFact`, each a
/// self-contained `<package>...</package>` element ready to be appended to
/// its sink (spec §4.4: "renders one Package Fact into three independent
/// UTF-8 XML fragments bounded by a single `<package>` element each").
pub struct PackageFragments {
    pub primary: String,
    pub filelists: String,
    pub other: String,
}

pub trait XmlEmitter {
    fn render(&self, fact: &PackageFact) -> RepoResult<PackageFragments>;
}
