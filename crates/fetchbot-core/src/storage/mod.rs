//! Disk side of a job: temp-file staging beside the destination, and
//! collision-free placement of the finished file.
//!
//! The temp file lives in the destination's directory so the final move is a
//! same-filesystem rename.

mod place;

pub use place::{free_path, place, PlacementLock};

use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// Prefix of staged temp files (`.fetchbot-XXXXXX.part`).
pub const TEMP_PREFIX: &str = ".fetchbot-";
/// Suffix of staged temp files.
pub const TEMP_SUFFIX: &str = ".part";

/// Create the destination's parent directory if needed and open a temp file in it.
pub fn stage_temp(destination: &Path) -> std::io::Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        tracing::debug!(dir = %dir.display(), "created destination directory");
    }
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
}

/// Apply POSIX mode bits to a placed file.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Mode bits are not supported here; the request is logged and ignored.
#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    tracing::debug!(path = %path.display(), mode, "file permissions not supported on this platform");
    Ok(())
}
