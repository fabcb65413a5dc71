//! In-memory filesystem for host tests and the scenario harness.

use std::collections::BTreeMap;

use crate::filesystem::{basename, dirname, join_path, FileInfo, FileSystem, FileSystemError};

#[derive(Clone)]
enum MockEntry {
    File { content: Vec<u8> },
    Directory { children: Vec<String> },
}

/// Mock filesystem keyed by absolute path.
///
/// Writes can be made to fail with [`MockFileSystem::fail_writes`] to exercise
/// storage error paths.
pub struct MockFileSystem {
    files: BTreeMap<String, MockEntry>,
    fail_writes: bool,
    writes: usize,
}

impl MockFileSystem {
    /// Create a filesystem holding only the root directory.
    pub fn new() -> Self {
        let mut fs = Self::empty();
        fs.add_directory("/");
        fs
    }

    /// Create a filesystem without even a root directory.
    pub fn empty() -> Self {
        Self {
            files: BTreeMap::new(),
            fail_writes: false,
            writes: 0,
        }
    }

    /// Add a file to the mock filesystem
    pub fn add_file(&mut self, path: &str, content: impl AsRef<[u8]>) {
        self.files.insert(
            path.to_string(),
            MockEntry::File {
                content: content.as_ref().to_vec(),
            },
        );
        self.link_to_parent(path);
    }

    /// Add a directory to the mock filesystem
    pub fn add_directory(&mut self, path: &str) {
        if matches!(self.files.get(path), Some(MockEntry::Directory { .. })) {
            return;
        }
        self.files.insert(
            path.to_string(),
            MockEntry::Directory {
                children: Vec::new(),
            },
        );
        if path != "/" {
            self.link_to_parent(path);
        }
    }

    /// Make every subsequent write return an IO error.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        match self.files.get(path) {
            Some(MockEntry::File { content }) => Some(content.as_slice()),
            _ => None,
        }
    }

    fn link_to_parent(&mut self, path: &str) {
        let parent = dirname(path);
        if let Some(MockEntry::Directory { children }) = self.files.get_mut(parent) {
            let name = basename(path).to_string();
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn list_files(&mut self, path: &str) -> Result<Vec<FileInfo>, FileSystemError> {
        match self.files.get(path) {
            Some(MockEntry::Directory { children }) => {
                let mut files = Vec::new();
                for child_name in children {
                    let child_path = join_path(path, child_name);
                    if let Some(entry) = self.files.get(&child_path) {
                        let (size, is_directory) = match entry {
                            MockEntry::File { content } => (content.len() as u64, false),
                            MockEntry::Directory { .. } => (0, true),
                        };
                        files.push(FileInfo {
                            name: child_name.clone(),
                            size,
                            is_directory,
                        });
                    }
                }
                Ok(files)
            }
            Some(MockEntry::File { .. }) => {
                Err(FileSystemError::IoError("Not a directory".to_string()))
            }
            None => Err(FileSystemError::NotFound),
        }
    }

    fn read_file(&mut self, path: &str) -> Result<String, FileSystemError> {
        let bytes = self.read_file_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| FileSystemError::IoError("Invalid UTF-8".to_string()))
    }

    fn read_file_bytes(&mut self, path: &str) -> Result<Vec<u8>, FileSystemError> {
        match self.files.get(path) {
            Some(MockEntry::File { content }) => Ok(content.clone()),
            Some(MockEntry::Directory { .. }) => {
                Err(FileSystemError::IoError("Is a directory".to_string()))
            }
            None => Err(FileSystemError::NotFound),
        }
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), FileSystemError> {
        if self.fail_writes {
            return Err(FileSystemError::IoError("Write rejected".to_string()));
        }
        match self.files.get(dirname(path)) {
            Some(MockEntry::Directory { .. }) => {}
            _ => return Err(FileSystemError::NotFound),
        }
        if let Some(MockEntry::Directory { .. }) = self.files.get(path) {
            return Err(FileSystemError::IoError("Is a directory".to_string()));
        }
        self.add_file(path, data);
        self.writes += 1;
        Ok(())
    }

    fn create_dir_all(&mut self, path: &str) -> Result<(), FileSystemError> {
        if self.fail_writes {
            return Err(FileSystemError::IoError("Write rejected".to_string()));
        }
        let mut current = String::new();
        self.add_directory("/");
        for part in path.split('/').filter(|part| !part.is_empty()) {
            current.push('/');
            current.push_str(part);
            if let Some(MockEntry::File { .. }) = self.files.get(&current) {
                return Err(FileSystemError::IoError("Not a directory".to_string()));
            }
            self.add_directory(&current);
        }
        Ok(())
    }

    fn exists(&mut self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn file_info(&mut self, path: &str) -> Result<FileInfo, FileSystemError> {
        let name = basename(path).to_string();

        match self.files.get(path) {
            Some(MockEntry::File { content }) => Ok(FileInfo {
                name,
                size: content.len() as u64,
                is_directory: false,
            }),
            Some(MockEntry::Directory { .. }) => Ok(FileInfo {
                name,
                size: 0,
                is_directory: true,
            }),
            None => Err(FileSystemError::NotFound),
        }
    }
}
