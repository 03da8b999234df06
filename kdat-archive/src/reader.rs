//! Archive expansion: validate, decode, and extract every record.
//!
//! The reader is a per-record state machine (metadata, then path safety,
//! then payload, then write) and any failed step aborts the whole archive.
//! Files extracted before the failure are left on disk.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use log::debug;

use kdat_codec::file::{decode_file, Storage};
use kdat_core::error::{KdatError, Result};

use crate::format::{self, RecordMeta};
use crate::writer::ArchiveStats;

/// Join a record path to the extraction root, rejecting any escape.
///
/// Only plain name components are allowed; absolute paths, drive prefixes,
/// `.` and `..` are all treated as traversal attempts. This runs before
/// anything is created on disk.
fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    if rel.is_empty() {
        return Err(KdatError::path_traversal(rel));
    }
    for component in rel_path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(KdatError::path_traversal(rel)),
        }
    }
    Ok(root.join(rel_path))
}

/// Read `stored_size` payload bytes.
fn read_payload<R: Read>(reader: &mut R, stored_size: u64) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; stored_size as usize];
    reader.read_exact(&mut payload).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            KdatError::unexpected_eof(payload.len())
        } else {
            KdatError::Io(err)
        }
    })?;
    Ok(payload)
}

/// Decompress the archive at `origin` into the existing directory `target`.
///
/// Path-level preconditions (origin is a regular `.kdat` file, target is a
/// writable existing directory) are the caller's job. `on_file` is invoked
/// once per extracted file with its relative path.
pub fn decompress_archive<F>(origin: &Path, target: &Path, mut on_file: F) -> Result<ArchiveStats>
where
    F: FnMut(&str),
{
    let archive_bytes = fs::metadata(origin)?.len();
    let mut input = BufReader::new(File::open(origin)?);
    let file_count = format::read_header(&mut input)?;
    let root = target.canonicalize()?;

    let mut stats = ArchiveStats {
        files: file_count,
        archive_bytes,
        ..Default::default()
    };

    for _ in 0..file_count {
        let meta = RecordMeta::read(&mut input)?;
        meta.validate()?;

        // A stored size beyond the archive itself cannot be satisfied.
        if meta.stored_size > archive_bytes {
            return Err(KdatError::corrupted(format!(
                "record '{}' claims {} stored bytes in a {archive_bytes}-byte archive",
                meta.path, meta.stored_size
            )));
        }

        let out_path = safe_join(&root, &meta.path)?;

        match meta.storage {
            Storage::Compressed => {
                stats.compressed += 1;
                debug!(
                    "[DECOMPRESS] '{}': {} -> {} bytes",
                    meta.path, meta.stored_size, meta.original_size
                );
            }
            Storage::Raw if meta.original_size == 0 => {
                stats.empty += 1;
                debug!("[EMPTY] '{}'", meta.path);
            }
            Storage::Raw => {
                stats.raw += 1;
                debug!("[RAW] '{}': {} bytes unchanged", meta.path, meta.stored_size);
            }
        }

        let payload = read_payload(&mut input, meta.stored_size)?;
        let data =
            decode_file(meta.storage, meta.original_size, &payload).map_err(|err| match err {
                KdatError::Io(_) => err,
                other => KdatError::corrupted(format!("record '{}': {other}", meta.path)),
            })?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
            // The lexical check above cannot see symlinks already present
            // under the target; verify the resolved parent stays inside.
            if !parent.canonicalize()?.starts_with(&root) {
                return Err(KdatError::path_traversal(meta.path.clone()));
            }
        }
        fs::write(&out_path, &data)?;

        stats.original_bytes += data.len() as u64;
        on_file(&meta.path);
    }

    Ok(stats)
}

/// Read only the header and record metadata, skipping payloads.
pub fn read_archive_index(origin: &Path) -> Result<Vec<RecordMeta>> {
    let mut input = BufReader::new(File::open(origin)?);
    let file_count = format::read_header(&mut input)?;

    let mut records = Vec::new();
    for _ in 0..file_count {
        let meta = RecordMeta::read(&mut input)?;
        meta.validate()?;
        let skip = i64::try_from(meta.stored_size).map_err(|_| {
            KdatError::corrupted(format!(
                "record '{}' claims an absurd stored size",
                meta.path
            ))
        })?;
        input.seek(SeekFrom::Current(skip))?;
        records.push(meta);
    }
    Ok(records)
}
