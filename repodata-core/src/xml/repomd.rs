// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::{map_xml_err, xml_declaration};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use repodata_domain::entities::manifest_record::ManifestRecord;
use repodata_domain::error::RepoResult;

pub const NAMESPACE: &str = "http://linux.duke.edu/metadata/repo";
pub const RPM_NAMESPACE: &str = "http://linux.duke.edu/metadata/rpm";

/// Renders the complete `repomd.xml` document (spec §4.7, §6). Unlike the
/// three sinks, this is small enough to build as a single document rather
/// than a streamed fragment set.
pub fn render(records: &[ManifestRecord], revision: i64, user_revision: Option<&str>) -> RepoResult<String> {
    let mut out = xml_declaration()?;
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("repomd");
    root.push_attribute(("xmlns", NAMESPACE));
    root.push_attribute(("xmlns:rpm", RPM_NAMESPACE));
    writer.write_event(Event::Start(root)).map_err(map_xml_err)?;

    writer
        .create_element("revision")
        .write_text_content(BytesText::new(&revision.to_string()))
        .map_err(map_xml_err)?;
    if let Some(rev) = user_revision {
        writer
            .create_element("tags")
            .write_inner_content(|w| {
                w.create_element("repo").write_text_content(BytesText::new(rev)).map(|_| ())
            })
            .map_err(map_xml_err)?;
    }

    for record in records {
        let mut data = BytesStart::new("data");
        data.push_attribute(("type", record.record_type.wire_type()));
        writer.write_event(Event::Start(data)).map_err(map_xml_err)?;

        writer
            .create_element("checksum")
            .with_attribute(("type", record.checksum.wire_type()))
            .write_text_content(BytesText::new(&record.checksum.hex_digest))
            .map_err(map_xml_err)?;
        writer
            .create_element("open-checksum")
            .with_attribute(("type", record.open_checksum.wire_type()))
            .write_text_content(BytesText::new(&record.open_checksum.hex_digest))
            .map_err(map_xml_err)?;

        {
            let mut loc = writer.create_element("location").with_attribute(("href", record.href.as_str()));
            if let Some(base) = &record.base {
                loc = loc.with_attribute(("xml:base", base.as_str()));
            }
            loc.write_empty().map_err(map_xml_err)?;
        }

        writer
            .create_element("timestamp")
            .write_text_content(BytesText::new(&record.mtime.to_string()))
            .map_err(map_xml_err)?;
        writer
            .create_element("size")
            .write_text_content(BytesText::new(&record.compressed_size.to_string()))
            .map_err(map_xml_err)?;
        writer
            .create_element("open-size")
            .write_text_content(BytesText::new(&record.open_size.to_string()))
            .map_err(map_xml_err)?;

        if let Some(version) = record.database_version {
            writer
                .create_element("database_version")
                .write_text_content(BytesText::new(&version.to_string()))
                .map_err(map_xml_err)?;
        }

        writer.write_event(Event::End(BytesEnd::new("data"))).map_err(map_xml_err)?;
    }

    writer.write_event(Event::End(BytesEnd::new("repomd"))).map_err(map_xml_err)?;

    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| repodata_domain::error::RepoError::MalformedXml { line: 0, reason: e.to_string() })?;
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}
