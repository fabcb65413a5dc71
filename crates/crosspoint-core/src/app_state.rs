//! Device-wide state that survives deep sleep.
//!
//! `<cache root>/state.bin`: version byte, little-endian `u16` length, then the
//! UTF-8 path of the open document. Length zero means nothing is open.

use crate::filesystem::{join_path, FileSystem, FileSystemError};

pub const STATE_FILE: &str = "state.bin";
const STATE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub open_document: Option<String>,
}

impl AppState {
    pub fn encode(&self) -> Vec<u8> {
        let path = self.open_document.as_deref().unwrap_or("");
        let len = path.len().min(u16::MAX as usize);
        let mut bytes = Vec::with_capacity(3 + len);
        bytes.push(STATE_VERSION);
        bytes.extend_from_slice(&(len as u16).to_le_bytes());
        bytes.extend_from_slice(&path.as_bytes()[..len]);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&version, rest) = bytes.split_first()?;
        if version != STATE_VERSION || rest.len() < 2 {
            return None;
        }
        let len = u16::from_le_bytes([rest[0], rest[1]]) as usize;
        let path = rest.get(2..2 + len)?;
        let path = core::str::from_utf8(path).ok()?;
        Some(Self {
            open_document: (!path.is_empty()).then(|| path.to_string()),
        })
    }

    /// Load the saved state, falling back to the default on any problem.
    pub fn load(fs: &mut dyn FileSystem, cache_root: &str) -> Self {
        let path = join_path(cache_root, STATE_FILE);
        match fs.read_file_bytes(&path) {
            Ok(bytes) => Self::decode(&bytes).unwrap_or_else(|| {
                log::warn!("[STATE] Ignoring corrupt {}", path);
                Self::default()
            }),
            Err(FileSystemError::NotFound) => Self::default(),
            Err(err) => {
                log::warn!("[STATE] Could not read {}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn save(&self, fs: &mut dyn FileSystem, cache_root: &str) -> Result<(), FileSystemError> {
        if !fs.exists(cache_root) {
            fs.create_dir_all(cache_root)?;
        }
        fs.write_file(&join_path(cache_root, STATE_FILE), &self.encode())
    }
}
