// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::map_xml_err;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::RepoResult;

pub const NAMESPACE: &str = "http://linux.duke.edu/metadata/other";

pub fn root_open(package_count: usize) -> String {
    format!("<otherdata xmlns=\"{NAMESPACE}\" packages=\"{package_count}\">\n")
}

pub fn root_close() -> &'static str {
    "</otherdata>\n"
}

/// Renders one `<package>` fragment carrying newest-first changelog entries
/// (spec §3, §6). Truncation to the configured limit already happened in C3.
pub fn render(fact: &PackageFact) -> RepoResult<String> {
    let mut writer = Writer::new(Vec::new());
    let mut pkg = BytesStart::new("package");
    pkg.push_attribute(("pkgid", fact.identity.pkg_id.as_str()));
    pkg.push_attribute(("name", fact.identity.name.as_str()));
    pkg.push_attribute(("arch", fact.identity.arch.as_str()));
    writer.write_event(Event::Start(pkg)).map_err(map_xml_err)?;

    let epoch = fact.identity.epoch.clone().unwrap_or_else(|| "0".to_string());
    writer
        .create_element("version")
        .with_attribute(("epoch", epoch.as_str()))
        .with_attribute(("ver", fact.identity.version.as_str()))
        .with_attribute(("rel", fact.identity.release.as_str()))
        .write_empty()
        .map_err(map_xml_err)?;

    for entry in &fact.changelogs {
        writer
            .create_element("changelog")
            .with_attribute(("author", entry.author.as_str()))
            .with_attribute(("date", entry.date.to_string().as_str()))
            .write_text_content(BytesText::new(&entry.text))
            .map_err(map_xml_err)?;
    }

    writer.write_event(Event::End(BytesEnd::new("package"))).map_err(map_xml_err)?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|e| repodata_domain::error::RepoError::MalformedXml { line: 0, reason: e.to_string() })?;
    out.push('\n');
    Ok(out)
}
