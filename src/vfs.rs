//! Filesystem collaborator: the handful of operations the bank needs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// One immediate child of a directory.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// The filesystem surface the bank depends on.
///
/// The bank interprets the directory layout itself; implementations are
/// plain pass-throughs to whatever actually stores the bytes.
pub trait Vfs {
    fn exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    /// Immediate children with their directory flag. Order is unspecified.
    fn list_children(&self, path: &Path) -> Result<Vec<DirEntry>>;

    fn read_all(&self, path: &Path) -> Result<Vec<u8>>;

    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn create_directory(&self, path: &Path) -> Result<()>;
}

/// `Vfs` backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskFs;

impl Vfs for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_children(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let dir = fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?;
        let mut entries = Vec::new();
        for entry in dir {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", path.display()))?;
            let is_dir = entry.file_type().map(|ty| ty.is_dir()).unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_reports_names_and_directory_flags() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fs = DiskFs;

        fs.create_directory(&dir.path().join("sub"))?;
        fs.write_all(&dir.path().join("file.bin"), b"abc")?;

        let mut entries = fs.list_children(dir.path())?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "file.bin");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir);
        Ok(())
    }

    #[test]
    fn read_write_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fs = DiskFs;
        let path = dir.path().join("blob");

        assert!(!fs.exists(&path));
        fs.write_all(&path, &[1, 2, 3])?;
        assert!(fs.exists(&path));
        assert!(!fs.is_directory(&path));
        assert_eq!(fs.read_all(&path)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn missing_paths_error_with_context() {
        let fs = DiskFs;
        let missing = Path::new("/nonexistent/assetbank-test");
        assert!(fs.read_all(missing).is_err());
        assert!(fs.list_children(missing).is_err());
    }
}
