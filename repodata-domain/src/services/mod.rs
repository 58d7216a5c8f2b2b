// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

pub mod checksum_engine;
pub mod compressed_stream;
pub mod old_metadata;
pub mod rpm_fact_extractor;
pub mod sqlite_emitter;
pub mod xml_emitter;
