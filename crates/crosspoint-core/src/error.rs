//! Reader error types.

use crate::filesystem::FileSystemError;

/// Recoverable failures on the reading path.
///
/// None of these stop the process. They end the current render pass and are
/// shown to the reader as text at most.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// Document or chapter missing or unreadable.
    ContentUnavailable(String),
    /// The book store could not build the page cache for a chapter.
    CacheBuild { spine_index: usize },
    /// Storage read/write failure.
    Storage(FileSystemError),
    /// The display rejected a draw or flush.
    Display,
    /// A background render thread could not be started.
    TaskSpawn(String),
}

impl core::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReaderError::ContentUnavailable(what) => write!(f, "Content unavailable: {}", what),
            ReaderError::CacheBuild { spine_index } => {
                write!(f, "Failed to build page cache for spine item {}", spine_index)
            }
            ReaderError::Storage(err) => write!(f, "Storage error: {}", err),
            ReaderError::Display => write!(f, "Display error"),
            ReaderError::TaskSpawn(msg) => write!(f, "Failed to start render task: {}", msg),
        }
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReaderError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FileSystemError> for ReaderError {
    fn from(err: FileSystemError) -> Self {
        match err {
            FileSystemError::NotFound => ReaderError::ContentUnavailable(err.to_string()),
            other => ReaderError::Storage(other),
        }
    }
}
