//! Whole-file rewrites.
//!
//! Files are never patched in place. New content goes to a temporary file in
//! the target's directory, is synced, and is then renamed over the target so
//! a crash leaves either the old or the new content.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `contents`.
///
/// `mode` sets Unix permission bits on the new file before it becomes
/// visible; it is ignored on other platforms.
pub fn write_atomic(path: &Path, contents: &[u8], mode: Option<u32>) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
