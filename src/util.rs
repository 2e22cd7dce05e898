use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Write `contents` to `path` without ever exposing a half-written file:
/// the bytes go to a `.tmp` sibling which is renamed over the target.
pub fn atomic_write(path: &Path, contents: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(e, parent))?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, contents).map_err(|e| Error::io_at(e, &tmp))?;
    fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io_at(e, &tmp))?;
    fs::rename(&tmp, path).map_err(|e| Error::io_at(e, path))?;

    Ok(())
}

/// Sibling `<name>.tmp` path used for staged writes.
pub fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/dir/file.toml");

        atomic_write(&target, "key = 1\n", 0o644).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "key = 1\n");
        assert!(!tmp_path(&target).exists());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("file");
        fs::write(&target, "old").unwrap();

        atomic_write(&target, "new", 0o644).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }
}
