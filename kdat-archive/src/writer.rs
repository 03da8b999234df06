//! Archive creation: walk a directory tree and pack every regular file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use log::debug;

use kdat_codec::file::{encode_file, Storage};
use kdat_core::error::{KdatError, Result};
use kdat_core::profile::CompressionProfile;

use crate::format::{self, RecordMeta, MAX_FILE_COUNT};

/// Summary of one archive build or expansion.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveStats {
    /// Total records.
    pub files: u32,
    /// Records stored compressed.
    pub compressed: u32,
    /// Non-empty records stored raw.
    pub raw: u32,
    /// Empty records.
    pub empty: u32,
    /// Sum of original file sizes.
    pub original_bytes: u64,
    /// Size of the archive itself.
    pub archive_bytes: u64,
}

/// Recursively collect every regular file under `origin`.
///
/// The walk visits each directory's entries sorted by name, so the captured
/// order is stable across runs and platforms. Symlinks and other special
/// entries are skipped; the format does not preserve them.
pub fn collect_files(origin: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(origin, &mut files)?;
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_into(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

/// Recursive total size of the regular files under `origin`.
///
/// The caller uses this for the 5 GiB precondition
/// ([`format::MAX_ORIGIN_BYTES`]); the writer itself does not enforce it.
pub fn origin_size(origin: &Path) -> Result<u64> {
    let mut total = 0u64;
    for file in collect_files(origin)? {
        total += fs::metadata(&file)?.len();
    }
    Ok(total)
}

/// Path of `file` relative to `origin`, forward-slash separated.
fn relative_path(origin: &Path, file: &Path) -> Result<String> {
    let rel = file.strip_prefix(origin).map_err(|_| {
        KdatError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not under '{}'", file.display(), origin.display()),
        ))
    })?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    KdatError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("file name '{}' is not valid UTF-8", rel.display()),
                    ))
                })?;
                parts.push(part);
            }
            _ => {
                return Err(KdatError::path_traversal(rel.display().to_string()));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Compress the directory tree at `origin` into the archive file `target`.
///
/// Path-level preconditions (origin exists and is a non-empty directory of
/// at most 5 GiB, target does not exist, target parent writable) are the
/// caller's job. `on_file` is invoked once per packed file with its
/// relative path, in the captured order.
pub fn compress_dir<F>(
    origin: &Path,
    target: &Path,
    profile: &CompressionProfile,
    mut on_file: F,
) -> Result<ArchiveStats>
where
    F: FnMut(&str),
{
    let files = collect_files(origin)?;
    if files.is_empty() {
        return Err(KdatError::NoFiles {
            path: origin.display().to_string(),
        });
    }
    let file_count = u32::try_from(files.len())
        .ok()
        .filter(|&count| count <= MAX_FILE_COUNT)
        .ok_or_else(|| KdatError::ImplausibleFileCount {
            count: files.len().min(u32::MAX as usize) as u32,
        })?;

    let mut out = BufWriter::new(File::create(target)?);
    format::write_header(&mut out, file_count)?;

    let mut stats = ArchiveStats {
        files: file_count,
        // header: magic + version digits + file count
        archive_bytes: 10,
        ..Default::default()
    };

    for file in &files {
        let rel = relative_path(origin, file)?;
        let raw = fs::read(file)?;
        let encoded = encode_file(&raw, profile)?;

        match encoded.storage {
            Storage::Compressed => {
                stats.compressed += 1;
                debug!(
                    "[COMPRESS] '{rel}': {} < {} bytes",
                    encoded.stored_size(),
                    encoded.original_size
                );
            }
            Storage::Raw if encoded.original_size == 0 => {
                stats.empty += 1;
                debug!("[EMPTY] '{rel}'");
            }
            Storage::Raw => {
                stats.raw += 1;
                debug!("[RAW] '{rel}': stored unchanged at {} bytes", encoded.original_size);
            }
        }

        let meta = RecordMeta {
            path: rel.clone(),
            storage: encoded.storage,
            original_size: encoded.original_size,
            stored_size: encoded.stored_size(),
        };
        meta.write(&mut out)?;
        out.write_all(&encoded.payload)?;

        stats.original_bytes += encoded.original_size;
        // pathLen + path + method + original + stored + payload
        stats.archive_bytes += 4 + rel.len() as u64 + 1 + 8 + 8 + encoded.stored_size();
        on_file(&rel);
    }

    out.flush()?;
    Ok(stats)
}
