//! Reading and writing jsonnetfiles
//!
//! Files are encoded with 4-space indentation and a trailing newline so that
//! unchanged inputs always produce byte-identical output. Writes go through a
//! temporary file in the target directory followed by a rename, so readers
//! never observe a half-written file.

use super::{JsonnetFile, LOCK_FILE};
use crate::error::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lockfile path belonging to a manifest path
pub fn lock_path_for(manifest_path: &Path) -> PathBuf {
    manifest_path.with_file_name(LOCK_FILE)
}

/// Load and validate a jsonnetfile.
pub fn load(path: &Path) -> Result<JsonnetFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::manifest_load(path, "file not found. Run `jb init` to create one.")
        } else {
            Error::manifest_load(path, e.to_string())
        }
    })?;

    parse(path, &content)
}

/// Load a jsonnetfile if it exists.
///
/// Returns `None` when the file is absent; a file that exists but does not
/// parse is still an error.
pub fn load_optional(path: &Path) -> Result<Option<JsonnetFile>> {
    if !path.exists() {
        return Ok(None);
    }
    load(path).map(Some)
}

fn parse(path: &Path, content: &str) -> Result<JsonnetFile> {
    let file: JsonnetFile =
        serde_json::from_str(content).map_err(|e| Error::manifest_load(path, e.to_string()))?;
    file.validate()
        .map_err(|message| Error::manifest_load(path, message))?;
    Ok(file)
}

/// Encode a jsonnetfile: 4-space indentation, trailing newline.
pub fn encode(file: &JsonnetFile) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    file.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Encode and atomically write a jsonnetfile.
pub fn save(path: &Path, file: &JsonnetFile) -> Result<()> {
    let bytes = encode(file).map_err(|source| Error::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes)
}

/// Replace `path` with `bytes` in a single rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".jsonnetfile.")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote jsonnetfile");
    Ok(())
}
