//! Filesystem abstraction for the reader.
//! Backed by the SD card on the device and by [`MockFileSystem`](crate::MockFileSystem) on the host.

use std::sync::{Arc, Mutex};

/// A file entry in the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub is_directory: bool,
}

/// Filesystem error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSystemError {
    NotFound,
    PermissionDenied,
    IoError(String),
    NotSupported,
}

impl core::fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FileSystemError::NotFound => write!(f, "File not found"),
            FileSystemError::PermissionDenied => write!(f, "Permission denied"),
            FileSystemError::IoError(msg) => write!(f, "IO error: {}", msg),
            FileSystemError::NotSupported => write!(f, "Operation not supported"),
        }
    }
}

impl std::error::Error for FileSystemError {}

/// Trait for filesystem operations
///
/// Paths are absolute and `/`-separated, rooted at the storage medium.
pub trait FileSystem {
    /// List entries of a directory, in storage order.
    fn list_files(&mut self, path: &str) -> Result<Vec<FileInfo>, FileSystemError>;

    /// Read entire file as UTF-8 text.
    fn read_file(&mut self, path: &str) -> Result<String, FileSystemError>;

    /// Read entire file as raw bytes.
    fn read_file_bytes(&mut self, path: &str) -> Result<Vec<u8>, FileSystemError>;

    /// Create or truncate `path` and write `data` to it.
    ///
    /// The parent directory must already exist.
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), FileSystemError>;

    /// Create `path` and any missing parents. Existing directories are fine.
    fn create_dir_all(&mut self, path: &str) -> Result<(), FileSystemError>;

    /// Check if file exists
    fn exists(&mut self, path: &str) -> bool;

    /// Get file info
    fn file_info(&mut self, path: &str) -> Result<FileInfo, FileSystemError>;
}

/// Filesystem handle shared between the input loop and render threads.
pub type SharedFileSystem = Arc<Mutex<dyn FileSystem + Send>>;

/// Wrap a filesystem so screens and render threads can share it.
pub fn shared<F: FileSystem + Send + 'static>(fs: F) -> SharedFileSystem {
    Arc::new(Mutex::new(fs))
}

/// Get filename without path
pub fn basename(path: &str) -> &str {
    path.rfind('/').map(|i| &path[i + 1..]).unwrap_or(path)
}

/// Get parent directory
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Join paths
pub fn join_path(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Case-insensitive extension check, `ext` given without the dot.
pub fn has_extension(name: &str, ext: &str) -> bool {
    match name.rfind('.') {
        Some(dot) => name[dot + 1..].eq_ignore_ascii_case(ext),
        None => false,
    }
}
