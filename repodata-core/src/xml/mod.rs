// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C4: per-package XML fragment rendering plus the three sink root elements
//! (spec §4.4, §6 wire formats).

pub mod filelists;
pub mod other;
pub mod primary;
pub mod repomd;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use repodata_domain::error::{RepoError, RepoResult};

pub(crate) fn xml_declaration() -> RepoResult<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(map_xml_err)?;
    let mut out = String::from_utf8(writer.into_inner()).map_err(|e| RepoError::MalformedXml { line: 0, reason: e.to_string() })?;
    out.push('\n');
    Ok(out)
}

pub(crate) fn map_xml_err(e: quick_xml::Error) -> RepoError {
    RepoError::MalformedXml { line: 0, reason: e.to_string() }
}

/// Writes a leaf element with no attributes and plain text content. Used for
/// the many simple `<tag>value</tag>` wire elements.
pub(crate) fn write_text_elem(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> RepoResult<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))
        .map_err(map_xml_err)?;
    Ok(())
}
