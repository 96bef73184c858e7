//! Filesystem access used to locate and read description files.
//!
//! The engine never touches `std::fs` directly; it goes through [`FileSystem`] so that
//! workspaces can live in memory during tests.

use std::cell::RefCell;
use std::path::{Component, Path, PathBuf};

use fxhash::FxHashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),
    #[error("{}: {message}", path.display())]
    Other { path: PathBuf, message: String },
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

pub type FsResult<T> = Result<T, FsError>;

pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> FsResult<String>;

    /// Makes `path` absolute without requiring it to exist.
    fn absolute(&self, path: &Path) -> FsResult<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> FsResult<String> {
        std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            _ => FsError::Other {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })
    }

    fn absolute(&self, path: &Path) -> FsResult<PathBuf> {
        std::path::absolute(path)
            .map(|p| normalize(&p))
            .map_err(|e| FsError::Other {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// In-memory filesystem rooted at `/`. Counts reads per path.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RefCell<FxHashMap<PathBuf, String>>,
    reads: RefCell<FxHashMap<PathBuf, usize>>,
}

impl MemoryFs {
    pub fn new() -> MemoryFs {
        MemoryFs::default()
    }

    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> MemoryFs {
        self.add_file(path, contents);
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = normalize(&Path::new("/").join(path));
        self.files.borrow_mut().insert(path, contents.into());
    }

    /// How many times `path` has been read.
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        let path = normalize(&Path::new("/").join(path));
        self.reads.borrow().get(&path).copied().unwrap_or(0)
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> FsResult<String> {
        let path = normalize(&Path::new("/").join(path));
        *self.reads.borrow_mut().entry(path.clone()).or_default() += 1;

        self.files
            .borrow()
            .get(&path)
            .cloned()
            .ok_or(FsError::NotFound(path))
    }

    fn absolute(&self, path: &Path) -> FsResult<PathBuf> {
        Ok(normalize(&Path::new("/").join(path)))
    }
}

/// Lexically resolves `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut ret = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            other => ret.push(other.as_os_str()),
        }
    }
    ret
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use super::{normalize, FileSystem, FsError, MemoryFs, RealFs};

    #[test]
    fn memory_fs_reads() {
        let fs = MemoryFs::new().with_file("ws/BUILD", "x = 1\n");

        assert_eq!(
            fs.read_to_string(Path::new("/ws/BUILD")).as_deref(),
            Ok("x = 1\n")
        );
        assert_eq!(
            fs.read_to_string(Path::new("/ws/./sub/../BUILD")).as_deref(),
            Ok("x = 1\n")
        );
        assert_eq!(fs.read_count("ws/BUILD"), 2);

        let missing = fs.read_to_string(Path::new("/ws/WORKSPACE"));
        assert_eq!(missing, Err(FsError::NotFound(PathBuf::from("/ws/WORKSPACE"))));
        assert!(missing.unwrap_err().is_not_found());
    }

    #[test]
    fn normalizes() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(
            MemoryFs::new().absolute(Path::new("a/b")),
            Ok(PathBuf::from("/a/b"))
        );
    }

    #[test]
    fn real_fs_distinguishes_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("BUILD");
        std::fs::write(&file, "cc_library(name = 'a')\n").unwrap();

        assert_eq!(
            RealFs.read_to_string(&file).as_deref(),
            Ok("cc_library(name = 'a')\n")
        );
        assert!(RealFs
            .read_to_string(&dir.path().join("missing"))
            .unwrap_err()
            .is_not_found());
    }
}
