//! Per-invocation scratch directories for staging untrusted scripts.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::Result;

/// Ephemeral, call-local filesystem location.
///
/// The directory name carries a timestamp plus a random suffix so that
/// concurrent invocations sharing a filesystem cannot collide. Removed
/// (best effort) when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh scratch directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(format!("diagen_{}", unique_suffix()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write script text to an unpredictably named file inside the
    /// scratch directory and return its path.
    pub fn write_script(&self, code: &str) -> Result<PathBuf> {
        let script_path = self.path.join(format!("diagram_{}.py", unique_suffix()));
        std::fs::write(&script_path, code)?;
        Ok(script_path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// `{timestamp}_{uuid8}` suffix used for scratch names and storage keys.
pub(crate) fn unique_suffix() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{timestamp}_{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_created_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let path;
        {
            let scratch = ScratchDir::create(root.path()).unwrap();
            path = scratch.path().to_path_buf();
            assert!(path.is_dir());
            assert!(path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("diagen_"));
        }
        assert!(!path.exists(), "scratch dir should be removed on drop");
    }

    #[test]
    fn test_concurrent_names_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchDir::create(root.path()).unwrap();
        let b = ScratchDir::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_write_script() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).unwrap();
        let script_path = scratch.write_script("x = 1\n").unwrap();
        assert!(script_path.starts_with(scratch.path()));
        assert_eq!(std::fs::read_to_string(&script_path).unwrap(), "x = 1\n");
    }
}
