// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::map_xml_err;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::RepoResult;
use repodata_domain::value_objects::dependency::Dependency;
use repodata_domain::value_objects::file_entry::is_primary_file;

pub const NAMESPACE: &str = "http://linux.duke.edu/metadata/common";
pub const RPM_NAMESPACE: &str = "http://linux.duke.edu/metadata/rpm";

/// Root element opening tag, written once per build with the final package
/// count (spec §6: `<metadata ... packages="N">`).
pub fn root_open(package_count: usize) -> String {
    format!(
        "<metadata xmlns=\"{NAMESPACE}\" xmlns:rpm=\"{RPM_NAMESPACE}\" packages=\"{package_count}\">\n"
    )
}

pub fn root_close() -> &'static str {
    "</metadata>\n"
}

fn write_deps(writer: &mut Writer<Vec<u8>>, tag: &str, deps: &[Dependency], emit_pre: bool) -> RepoResult<()> {
    writer.write_event(Event::Start(BytesStart::new(format!("rpm:{tag}")))).map_err(map_xml_err)?;
    for dep in deps {
        let mut entry = BytesStart::new("rpm:entry");
        entry.push_attribute(("name", dep.name.as_str()));
        if let Some(flag) = dep.flag {
            entry.push_attribute(("flags", flag.to_string().as_str()));
        }
        if let Some(epoch) = &dep.epoch {
            entry.push_attribute(("epoch", epoch.as_str()));
        }
        if let Some(version) = &dep.version {
            entry.push_attribute(("ver", version.as_str()));
        }
        if let Some(release) = &dep.release {
            entry.push_attribute(("rel", release.as_str()));
        }
        if emit_pre && dep.pre {
            entry.push_attribute(("pre", "1"));
        }
        writer.write_event(Event::Empty(entry)).map_err(map_xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new(format!("rpm:{tag}")))).map_err(map_xml_err)?;
    Ok(())
}

/// Renders one `<package type="rpm">...</package>` fragment (spec §4.4, §6).
pub fn render(fact: &PackageFact) -> RepoResult<String> {
    let mut writer = Writer::new(Vec::new());
    let mut pkg = BytesStart::new("package");
    pkg.push_attribute(("type", "rpm"));
    writer.write_event(Event::Start(pkg)).map_err(map_xml_err)?;

    writer
        .create_element("name")
        .write_text_content(BytesText::new(&fact.identity.name))
        .map_err(map_xml_err)?;
    writer
        .create_element("arch")
        .write_text_content(BytesText::new(&fact.identity.arch))
        .map_err(map_xml_err)?;

    let epoch = fact.identity.epoch.clone().unwrap_or_else(|| "0".to_string());
    writer
        .create_element("version")
        .with_attribute(("epoch", epoch.as_str()))
        .with_attribute(("ver", fact.identity.version.as_str()))
        .with_attribute(("rel", fact.identity.release.as_str()))
        .write_empty()
        .map_err(map_xml_err)?;

    writer
        .create_element("checksum")
        .with_attribute(("type", fact.checksum_type.as_str()))
        .with_attribute(("pkgid", "YES"))
        .write_text_content(BytesText::new(&fact.identity.pkg_id))
        .map_err(map_xml_err)?;

    writer
        .create_element("summary")
        .write_text_content(BytesText::new(&fact.descriptive.summary))
        .map_err(map_xml_err)?;
    writer
        .create_element("description")
        .write_text_content(BytesText::new(&fact.descriptive.description))
        .map_err(map_xml_err)?;
    writer
        .create_element("packager")
        .write_text_content(BytesText::new(&fact.descriptive.packager))
        .map_err(map_xml_err)?;
    writer
        .create_element("url")
        .write_text_content(BytesText::new(&fact.descriptive.url))
        .map_err(map_xml_err)?;

    writer
        .create_element("time")
        .with_attribute(("file", fact.timestamps.file_mtime.to_string().as_str()))
        .with_attribute(("build", fact.timestamps.build_time.to_string().as_str()))
        .write_empty()
        .map_err(map_xml_err)?;

    writer
        .create_element("size")
        .with_attribute(("package", fact.sizes.package.to_string().as_str()))
        .with_attribute(("installed", fact.sizes.installed.to_string().as_str()))
        .with_attribute(("archive", fact.sizes.archive.to_string().as_str()))
        .write_empty()
        .map_err(map_xml_err)?;

    {
        let mut loc = writer.create_element("location").with_attribute(("href", fact.location.href.as_str()));
        if let Some(base) = &fact.location.base {
            loc = loc.with_attribute(("xml:base", base.as_str()));
        }
        loc.write_empty().map_err(map_xml_err)?;
    }

    writer.write_event(Event::Start(BytesStart::new("format"))).map_err(map_xml_err)?;
    super::write_text_elem(&mut writer, "rpm:license", &fact.descriptive.license)?;
    super::write_text_elem(&mut writer, "rpm:vendor", &fact.descriptive.vendor)?;
    super::write_text_elem(&mut writer, "rpm:group", &fact.descriptive.group)?;
    super::write_text_elem(&mut writer, "rpm:buildhost", &fact.descriptive.build_host)?;
    super::write_text_elem(&mut writer, "rpm:sourcerpm", &fact.descriptive.source_rpm)?;
    writer
        .create_element("rpm:header-range")
        .with_attribute(("start", fact.header_range.start.to_string().as_str()))
        .with_attribute(("end", fact.header_range.end.to_string().as_str()))
        .write_empty()
        .map_err(map_xml_err)?;

    write_deps(&mut writer, "provides", &fact.dependencies.provides, false)?;
    write_deps(&mut writer, "requires", &fact.dependencies.requires, true)?;
    write_deps(&mut writer, "conflicts", &fact.dependencies.conflicts, false)?;
    write_deps(&mut writer, "obsoletes", &fact.dependencies.obsoletes, false)?;

    for entry in fact.files.iter().filter(|e| is_primary_file(e)) {
        let mut elem = writer.create_element("file");
        if let Some(attr) = entry.file_type.wire_attr() {
            elem = elem.with_attribute(("type", attr));
        }
        elem.write_text_content(BytesText::new(&entry.full_path())).map_err(map_xml_err)?;
    }

    writer.write_event(Event::End(BytesEnd::new("format"))).map_err(map_xml_err)?;
    writer.write_event(Event::End(BytesEnd::new("package"))).map_err(map_xml_err)?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|e| repodata_domain::error::RepoError::MalformedXml { line: 0, reason: e.to_string() })?;
    out.push('\n');
    Ok(out)
}
