// src/files.rs

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::compress::{self, Format, StreamInfo};
use crate::error::HuffError;

pub const HUFF_EXT: &str = ".huff";
pub const UNHUFF_EXT: &str = ".unhuff";
const TEMP_EXT: &str = ".tmp"; // For atomic writes

/// Failures of the file layer, kept apart from codec errors.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("{} is not a .huff file", .path.display())]
    WrongSuffix { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Codec(#[from] HuffError),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> HostError + '_ {
    move |source| HostError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `notes.txt` -> `notes.txt.huff`, and `notes.txt.unhuff` -> `notes.txt.huff`.
pub fn compressed_path(input: &Path) -> PathBuf {
    let mut name: OsString = match input.to_str().and_then(|s| s.strip_suffix(UNHUFF_EXT)) {
        Some(stem) if !stem.is_empty() => stem.into(),
        _ => input.as_os_str().to_owned(),
    };
    name.push(HUFF_EXT);
    PathBuf::from(name)
}

/// `notes.txt.huff` -> `notes.txt.unhuff`. Anything without the suffix is refused.
pub fn decompressed_path(input: &Path) -> Result<PathBuf, HostError> {
    match input.to_str().and_then(|s| s.strip_suffix(HUFF_EXT)) {
        Some(stem) if !stem.is_empty() => Ok(PathBuf::from(format!("{stem}{UNHUFF_EXT}"))),
        _ => Err(HostError::WrongSuffix {
            path: input.to_path_buf(),
        }),
    }
}

/// Writes through a temporary sibling and renames it into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), HostError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_EXT);
    let temp_path = PathBuf::from(temp);

    fs::write(&temp_path, data).map_err(io_err(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io_err(path))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub output: PathBuf,
    pub bytes_read: usize,
    pub bytes_written: usize,
}

pub fn compress_file(
    input: &Path,
    output: Option<&Path>,
    format: Format,
) -> Result<FileReport, HostError> {
    let data = fs::read(input).map_err(io_err(input))?;
    let compressed = compress::compress_with(&data, format)?;
    let output = output.map_or_else(|| compressed_path(input), Path::to_path_buf);

    write_atomic(&output, &compressed)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        written = compressed.len(),
        "file compressed"
    );
    Ok(FileReport {
        output,
        bytes_read: data.len(),
        bytes_written: compressed.len(),
    })
}

pub fn decompress_file(input: &Path, output: Option<&Path>) -> Result<FileReport, HostError> {
    // refuse anything without the suffix before reading it
    let default_output = decompressed_path(input)?;
    let data = fs::read(input).map_err(io_err(input))?;
    let restored = compress::decompress(&data)?;
    let output = output.map_or(default_output, Path::to_path_buf);

    write_atomic(&output, &restored)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        written = restored.len(),
        "file decompressed"
    );
    Ok(FileReport {
        output,
        bytes_read: data.len(),
        bytes_written: restored.len(),
    })
}

/// Layout of a compressed file plus the size and SHA-256 of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub info: StreamInfo,
    pub compressed_len: usize,
    pub original_len: usize,
    pub sha256: String,
}

pub fn inspect_file(input: &Path) -> Result<FileSummary, HostError> {
    let data = fs::read(input).map_err(io_err(input))?;
    let info = compress::inspect(&data)?;
    let restored = compress::decompress(&data)?;
    Ok(FileSummary {
        info,
        compressed_len: data.len(),
        original_len: restored.len(),
        sha256: format!("{:x}", Sha256::digest(&restored)),
    })
}

/// Format bytes into human-readable string (e.g. 1024 -> "1.00 KB")
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}
