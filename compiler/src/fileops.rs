//! The pluggable file-system collaborator.
//!
//! All pipeline I/O is funneled through [`FileOps`] so callers can swap
//! the real file system for an in-memory one and run the whole pipeline
//! hermetically. [`OsFileOps`] is the default; [`MemFileOps`] is the
//! in-memory implementation used throughout the test suites.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata for an existence/readability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
}

pub trait FileOps {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn read_file_info(&self, path: &Path) -> io::Result<FileInfo>;
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Sharing a collaborator is useful when the caller wants to keep a
/// handle for inspecting writes after compilation.
impl<T: FileOps> FileOps for std::rc::Rc<T> {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn read_file_info(&self, path: &Path) -> io::Result<FileInfo> {
        (**self).read_file_info(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write_file(path, data)
    }
}

/// The real file system.
pub struct OsFileOps;

impl FileOps for OsFileOps {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_file_info(&self, path: &Path) -> io::Result<FileInfo> {
        let meta = std::fs::metadata(path)?;
        Ok(FileInfo { size: meta.len() })
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }
}

/// An in-memory file system for hermetic tests. Reads come from the map
/// given at construction; writes are recorded and can be inspected.
pub struct MemFileOps {
    files: HashMap<PathBuf, Vec<u8>>,
    written: RefCell<Vec<(PathBuf, Vec<u8>)>>,
}

impl MemFileOps {
    pub fn new() -> MemFileOps {
        MemFileOps {
            files: HashMap::new(),
            written: RefCell::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> MemFileOps {
        self.files.insert(path.into(), data.into());
        self
    }

    /// Everything written so far, in write order.
    pub fn written(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.written.borrow().clone()
    }
}

impl Default for MemFileOps {
    fn default() -> Self {
        MemFileOps::new()
    }
}

impl FileOps for MemFileOps {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn read_file_info(&self, path: &Path) -> io::Result<FileInfo> {
        self.files
            .get(path)
            .map(|data| FileInfo {
                size: data.len() as u64,
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), data.to_vec()));
        Ok(())
    }
}
