//! Reading position persisted per document.
//!
//! Stored as `<document cache root>/progress.bin`: four bytes, spine index then
//! page number, each a little-endian `u16`.

use crate::filesystem::{join_path, FileSystem, FileSystemError};

pub const PROGRESS_FILE: &str = "progress.bin";
const RECORD_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistedProgress {
    pub spine_index: u16,
    pub page_number: u16,
}

impl PersistedProgress {
    pub fn new(spine_index: u16, page_number: u16) -> Self {
        Self {
            spine_index,
            page_number,
        }
    }

    pub fn to_bytes(self) -> [u8; RECORD_LEN] {
        let spine = self.spine_index.to_le_bytes();
        let page = self.page_number.to_le_bytes();
        [spine[0], spine[1], page[0], page[1]]
    }

    /// Decode a record. Anything but exactly four bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != RECORD_LEN {
            return None;
        }
        Some(Self {
            spine_index: u16::from_le_bytes([bytes[0], bytes[1]]),
            page_number: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }

    pub fn path(cache_root: &str) -> String {
        join_path(cache_root, PROGRESS_FILE)
    }

    /// Read the record for the document cached under `cache_root`.
    ///
    /// A missing or malformed file means "start of document" and yields `None`.
    pub fn load(fs: &mut dyn FileSystem, cache_root: &str) -> Option<Self> {
        let path = Self::path(cache_root);
        match fs.read_file_bytes(&path) {
            Ok(bytes) => {
                let progress = Self::from_bytes(&bytes);
                if progress.is_none() {
                    log::warn!("[READER] Ignoring malformed {} ({} bytes)", path, bytes.len());
                }
                progress
            }
            Err(FileSystemError::NotFound) => None,
            Err(err) => {
                log::warn!("[READER] Could not read {}: {}", path, err);
                None
            }
        }
    }

    pub fn save(&self, fs: &mut dyn FileSystem, cache_root: &str) -> Result<(), FileSystemError> {
        if !fs.exists(cache_root) {
            fs.create_dir_all(cache_root)?;
        }
        fs.write_file(&Self::path(cache_root), &self.to_bytes())
    }
}
