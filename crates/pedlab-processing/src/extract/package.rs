//! Helpers shared by the zip-packaged XML formats (DOCX, ODT).

use pedlab_core::IngestError;
use quick_xml::events::BytesStart;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Largest decompressed size accepted for a single package entry.
pub(crate) const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

pub(crate) fn open_package(data: &[u8]) -> Result<Package<'_>, IngestError> {
    ZipArchive::new(Cursor::new(data))
        .map_err(|e| IngestError::extraction(format!("not a valid zip package: {}", e)))
}

/// Read an entry fully; `Ok(None)` when the package has no such entry.
pub(crate) fn read_entry(
    package: &mut Package<'_>,
    name: &str,
) -> Result<Option<Vec<u8>>, IngestError> {
    let mut file = match package.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(IngestError::extraction(format!(
                "failed to open {}: {}",
                name, e
            )))
        }
    };
    read_limited(&mut file, name, MAX_ENTRY_BYTES).map(Some)
}

/// Read at most `limit` bytes; a longer stream fails instead of being cut.
fn read_limited(reader: impl Read, name: &str, limit: u64) -> Result<Vec<u8>, IngestError> {
    let mut buf = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| IngestError::extraction(format!("failed to read {}: {}", name, e)))?;
    if buf.len() as u64 > limit {
        return Err(IngestError::extraction(format!(
            "{} exceeds {} bytes when decompressed",
            name, limit
        )));
    }
    Ok(buf)
}

pub(crate) fn read_xml_entry(
    package: &mut Package<'_>,
    name: &str,
) -> Result<Option<String>, IngestError> {
    match read_entry(package, name)? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| IngestError::extraction(format!("{} is not valid UTF-8", name))),
        None => Ok(None),
    }
}

pub(crate) fn local_name(q: &[u8]) -> &[u8] {
    match q.iter().position(|&b| b == b':') {
        Some(i) => &q[i + 1..],
        None => q,
    }
}

/// Attribute value by qualified name (`w:val`, `xlink:href`, ...).
pub(crate) fn attr_val(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Attribute value by local name, ignoring the namespace prefix.
pub(crate) fn attr_val_local(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key_local)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Resolve a relative package path against a base directory, handling `..`.
pub(crate) fn resolve_path(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
pub(crate) fn build_package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::FileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
