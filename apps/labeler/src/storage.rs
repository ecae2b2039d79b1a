//! On-disk artifacts: atomic whole-file JSON writes and self-healing cache reads.
//!
//! Writes go to a temp file in the destination directory and are renamed into
//! place, so a crash mid-write never leaves a truncated artifact behind.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of reading a cache file.
#[derive(Debug, PartialEq)]
pub enum CacheRead<T> {
    Hit(T),
    Missing,
    /// The file did not parse and has been deleted.
    Corrupt { reason: String },
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<(), StorageError>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush().map_err(|e| StorageError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

/// Writes `value` as pretty JSON, replacing `path` atomically. Creates parent directories.
pub fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(writer, value).map_err(|source| StorageError::Serialize {
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Writes one compact JSON document per line, replacing `path` atomically.
pub fn write_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StorageError> {
    write_atomic(path, |writer| {
        for item in items {
            serde_json::to_writer(&mut *writer, item).map_err(|source| {
                StorageError::Serialize {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            writer
                .write_all(b"\n")
                .map_err(|e| StorageError::io(path, e))?;
        }
        Ok(())
    })
}

/// Reads a JSON cache file. A file that fails to parse is deleted and reported
/// as `Corrupt`; a file removed concurrently counts as already deleted.
pub fn read_cache<T: DeserializeOwned>(path: &Path) -> Result<CacheRead<T>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CacheRead::Missing),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(CacheRead::Hit(value)),
        Err(parse_err) => {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io(path, e)),
            }
            Ok(CacheRead::Corrupt {
                reason: parse_err.to_string(),
            })
        }
    }
}
