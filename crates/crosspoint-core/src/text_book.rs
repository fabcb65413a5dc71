//! Plain-text book store.
//!
//! A `.txt` file is one document. Form feeds (`\x0C`) split it into spine
//! items; a file without any is a single chapter. Each chapter is paginated
//! once for the current page geometry and the page boundaries are cached at
//! `<document cache root>/sections/<spine index>.bin`.
//!
//! The whole file is held in one buffer; chapters and pages are byte ranges
//! into it. Files above [`MAX_DOCUMENT_BYTES`] are refused.

use std::sync::Arc;

use crate::book::{BookStore, Document, Section, TocEntry};
use crate::display::{DisplayDevice, FontRole, FontStyle, TextShaper};
use crate::error::ReaderError;
use crate::filesystem::{has_extension, join_path, FileSystemError, SharedFileSystem};
use crate::layout::layout_text_box;
use crate::render_task::lock_unpoisoned;
use crate::renderer::Renderer;

pub const TEXT_EXTENSION: &str = "txt";
const CHAPTER_BREAK: char = '\x0C';
const SECTIONS_DIR: &str = "sections";
/// Largest `.txt` that is loaded into memory.
pub const MAX_DOCUMENT_BYTES: u64 = 512 * 1024;

pub struct TextBookStore {
    fs: SharedFileSystem,
}

impl TextBookStore {
    pub fn new(fs: SharedFileSystem) -> Self {
        Self { fs }
    }
}

impl BookStore for TextBookStore {
    type Doc = TextDocument;

    fn is_document(name: &str) -> bool {
        has_extension(name, TEXT_EXTENSION)
    }

    fn exists(&mut self, path: &str) -> bool {
        lock_unpoisoned(&self.fs).exists(path)
    }

    fn open(&mut self, path: &str, cache_root: &str) -> Result<TextDocument, ReaderError> {
        let cache_root = document_cache_root(cache_root, path);
        let unavailable = |err: FileSystemError| ReaderError::ContentUnavailable(format!("{}: {}", path, err));
        let mut text = {
            let mut fs = lock_unpoisoned(&self.fs);
            let size = fs.file_info(path).map_err(unavailable)?.size;
            if size > MAX_DOCUMENT_BYTES {
                log::warn!("[BOOK] {} is {} bytes, limit {}", path, size, MAX_DOCUMENT_BYTES);
                return Err(ReaderError::ContentUnavailable(format!(
                    "{} is too large ({} bytes)",
                    path, size
                )));
            }
            let text = fs.read_file(path).map_err(unavailable)?;
            if let Err(err) = fs.create_dir_all(&cache_root) {
                log::warn!("[BOOK] Could not create cache dir {}: {}", cache_root, err);
            }
            text
        };

        text.retain(|ch| ch != '\r');
        let chapters = chapter_ranges(&text);
        log::info!("[BOOK] Opened {} ({} chapters)", path, chapters.len());

        Ok(TextDocument {
            path: path.to_string(),
            body: Arc::new(TextBody { text, chapters }),
            cache_root,
            fs: Arc::clone(&self.fs),
        })
    }
}

/// File contents and the byte range of each chapter in them.
struct TextBody {
    text: String,
    chapters: Vec<(usize, usize)>,
}

impl TextBody {
    fn chapter(&self, index: usize) -> Option<&str> {
        let &(start, end) = self.chapters.get(index)?;
        self.text.get(start..end)
    }
}

pub struct TextDocument {
    path: String,
    body: Arc<TextBody>,
    cache_root: String,
    fs: SharedFileSystem,
}

impl Document for TextDocument {
    type Section = TextSection;

    fn path(&self) -> &str {
        &self.path
    }

    fn spine_count(&self) -> usize {
        self.body.chapters.len()
    }

    fn spine_item_path(&self, index: usize) -> Option<String> {
        (index < self.body.chapters.len()).then(|| format!("{}#{}", self.path, index))
    }

    fn toc_entry_for_spine(&self, index: usize) -> TocEntry {
        let title = self
            .body
            .chapter(index)
            .and_then(|chapter| chapter.lines().map(str::trim).find(|line| !line.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chapter {}", index + 1));
        TocEntry { title }
    }

    fn cache_root(&self) -> &str {
        &self.cache_root
    }

    fn section(&self, spine_index: usize) -> Result<TextSection, ReaderError> {
        if spine_index >= self.body.chapters.len() {
            return Err(ReaderError::ContentUnavailable(format!(
                "{} has no spine item {}",
                self.path, spine_index
            )));
        }
        Ok(TextSection {
            spine_index,
            body: Arc::clone(&self.body),
            cache_path: join_path(
                &join_path(&self.cache_root, SECTIONS_DIR),
                &format!("{}.bin", spine_index),
            ),
            fs: Arc::clone(&self.fs),
            pages: Vec::new(),
        })
    }
}

pub struct TextSection {
    spine_index: usize,
    body: Arc<TextBody>,
    cache_path: String,
    fs: SharedFileSystem,
    /// Byte range of each page in the chapter text.
    pages: Vec<(usize, usize)>,
}

impl TextSection {
    fn text(&self) -> &str {
        self.body.chapter(self.spine_index).unwrap_or("")
    }

    fn pages_valid(&self, pages: &[(usize, usize)]) -> bool {
        let text = self.text();
        !pages.is_empty()
            && pages.iter().all(|&(start, end)| {
                start <= end
                    && end <= text.len()
                    && text.is_char_boundary(start)
                    && text.is_char_boundary(end)
            })
    }
}

impl Section for TextSection {
    fn spine_index(&self) -> usize {
        self.spine_index
    }

    fn has_cache(&mut self) -> bool {
        if !self.pages.is_empty() {
            return true;
        }
        let bytes = match lock_unpoisoned(&self.fs).read_file_bytes(&self.cache_path) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        match decode_pages(&bytes) {
            Some(pages) if self.pages_valid(&pages) => {
                self.pages = pages;
                true
            }
            _ => {
                log::warn!("[BOOK] Discarding stale page cache {}", self.cache_path);
                false
            }
        }
    }

    fn build_cache<D, S>(&mut self, renderer: &Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
    {
        let pages = paginate(
            self.text(),
            renderer.page_width(),
            renderer.page_height(),
            renderer.line_height(FontRole::Reader),
            |s| renderer.text_width(s, FontRole::Reader, FontStyle::Regular),
        )
        .ok_or(ReaderError::CacheBuild {
            spine_index: self.spine_index,
        })?;

        let sections_dir = crate::filesystem::dirname(&self.cache_path).to_string();
        {
            let mut fs = lock_unpoisoned(&self.fs);
            fs.create_dir_all(&sections_dir)
                .and_then(|_| fs.write_file(&self.cache_path, &encode_pages(&pages)))
                .map_err(|err| {
                    log::warn!("[BOOK] Writing {} failed: {}", self.cache_path, err);
                    ReaderError::CacheBuild {
                        spine_index: self.spine_index,
                    }
                })?;
        }

        log::info!(
            "[BOOK] Indexed spine item {} into {} pages",
            self.spine_index,
            pages.len()
        );
        self.pages = pages;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page<D, S>(&mut self, page: usize, renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
    {
        let &(start, end) = self.pages.get(page).ok_or_else(|| {
            ReaderError::ContentUnavailable(format!(
                "page {} of spine item {}",
                page, self.spine_index
            ))
        })?;
        let text = self.text().get(start..end).ok_or_else(|| {
            ReaderError::ContentUnavailable(format!("spine item {} text", self.spine_index))
        })?;
        renderer.draw_page_text(text)?;
        Ok(())
    }
}

/// Chapter byte ranges, dropping blank ones. Never returns an empty list.
fn chapter_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut chapters = Vec::new();
    let mut start = 0;
    for piece in text.split(CHAPTER_BREAK) {
        let end = start + piece.len();
        let body = piece.trim_start_matches('\n');
        if !body.trim().is_empty() {
            chapters.push((end - body.len(), end));
        }
        start = end + CHAPTER_BREAK.len_utf8();
    }
    if chapters.is_empty() {
        chapters.push((0, 0));
    }
    chapters
}

/// Page byte ranges for `text`. `None` when the page box cannot hold a line.
fn paginate<F>(text: &str, width: u32, height: u32, line_height: u32, measure: F) -> Option<Vec<(usize, usize)>>
where
    F: Fn(&str) -> u32,
{
    let mut pages = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let layout = layout_text_box(&text[start..], width, height, line_height, &measure);
        if layout.consumed == 0 {
            return None;
        }
        pages.push((start, start + layout.consumed));
        start += layout.consumed;
    }
    if pages.is_empty() {
        pages.push((0, 0));
    }
    Some(pages)
}

fn encode_pages(pages: &[(usize, usize)]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4 + pages.len() * 8);
    bytes.extend_from_slice(&(pages.len() as u32).to_le_bytes());
    for &(start, end) in pages {
        bytes.extend_from_slice(&(start as u32).to_le_bytes());
        bytes.extend_from_slice(&(end as u32).to_le_bytes());
    }
    bytes
}

fn decode_pages(bytes: &[u8]) -> Option<Vec<(usize, usize)>> {
    let read_u32 = |at: usize| -> Option<usize> {
        let word = bytes.get(at..at + 4)?;
        Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]) as usize)
    };
    let count = read_u32(0)?;
    if count.checked_mul(8).and_then(|n| n.checked_add(4)) != Some(bytes.len()) {
        return None;
    }
    (0..count)
        .map(|i| Some((read_u32(4 + i * 8)?, read_u32(8 + i * 8)?)))
        .collect()
}

fn document_cache_root(cache_root: &str, path: &str) -> String {
    join_path(cache_root, &format!("txt_{:08x}", fnv1a(path.as_bytes())))
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MonoShaper;
    use crate::filesystem::{self, FileSystem};
    use crate::mock_filesystem::MockFileSystem;
    use crate::test_display::TestDisplay;
    use std::sync::Mutex;

    fn store_with(path: &str, text: &str) -> (TextBookStore, Arc<Mutex<MockFileSystem>>) {
        let mut fs = MockFileSystem::new();
        fs.add_directory("/books");
        fs.add_file(path, text);
        let fs = Arc::new(Mutex::new(fs));
        let shared: SharedFileSystem = fs.clone();
        (TextBookStore::new(shared), fs)
    }

    fn renderer() -> Renderer<TestDisplay, MonoShaper> {
        Renderer::new(TestDisplay::default_size(), MonoShaper)
    }

    #[test]
    fn only_txt_files_are_documents() {
        assert!(TextBookStore::is_document("a.txt"));
        assert!(TextBookStore::is_document("A.TXT"));
        assert!(!TextBookStore::is_document("a.epub"));
    }

    #[test]
    fn form_feeds_split_chapters_and_name_them() {
        let (mut store, _) = store_with(
            "/books/book.txt",
            "Chapter One\nIt begins.\x0C\n\n  Chapter Two  \nMore.\x0C\x0C   \n",
        );
        let doc = store.open("/books/book.txt", "/.crosspoint").unwrap();
        assert_eq!(doc.spine_count(), 2);
        assert_eq!(doc.toc_entry_for_spine(0).title, "Chapter One");
        assert_eq!(doc.toc_entry_for_spine(1).title, "Chapter Two");
        assert_eq!(doc.toc_entry_for_spine(5).title, "Chapter 6");
        assert_eq!(doc.spine_item_path(1).as_deref(), Some("/books/book.txt#1"));
        assert_eq!(doc.spine_item_path(2), None);
        assert!(doc.cache_root().starts_with("/.crosspoint/txt_"));
    }

    #[test]
    fn chapters_are_ranges_into_the_file_text() {
        let (mut store, _) = store_with("/books/crlf.txt", "One\r\nline\r\n\x0C\r\nTwo\r\n");
        let doc = store.open("/books/crlf.txt", "/.crosspoint").unwrap();
        assert_eq!(doc.body.text, "One\nline\n\x0C\nTwo\n");
        assert_eq!(doc.body.chapters, vec![(0, 9), (11, 15)]);
        assert_eq!(doc.section(1).unwrap().text(), "Two\n");
        assert_eq!(doc.toc_entry_for_spine(0).title, "One");
    }

    #[test]
    fn oversized_file_is_refused() {
        let limit = MAX_DOCUMENT_BYTES as usize;
        let (mut store, _) = store_with("/books/huge.txt", &"a".repeat(limit + 1));
        assert!(matches!(
            store.open("/books/huge.txt", "/.crosspoint"),
            Err(ReaderError::ContentUnavailable(_))
        ));

        let (mut store, _) = store_with("/books/fits.txt", &"a".repeat(limit));
        assert!(store.open("/books/fits.txt", "/.crosspoint").is_ok());
    }

    #[test]
    fn corrupt_page_counts_are_rejected() {
        assert_eq!(decode_pages(&u32::MAX.to_le_bytes()), None);
        let mut truncated = encode_pages(&[(0, 4), (4, 8)]);
        truncated.pop();
        assert_eq!(decode_pages(&truncated), None);
        assert_eq!(
            decode_pages(&encode_pages(&[(0, 4), (4, 8)])),
            Some(vec![(0, 4), (4, 8)])
        );
    }

    #[test]
    fn empty_file_is_one_empty_page() {
        let (mut store, _) = store_with("/books/empty.txt", "");
        let doc = store.open("/books/empty.txt", "/.crosspoint").unwrap();
        assert_eq!(doc.spine_count(), 1);
        let mut section = doc.section(0).unwrap();
        section.build_cache(&renderer()).unwrap();
        assert_eq!(section.page_count(), 1);
    }

    #[test]
    fn missing_document_is_content_unavailable() {
        let (mut store, _) = store_with("/books/a.txt", "x");
        assert!(matches!(
            store.open("/books/missing.txt", "/.crosspoint"),
            Err(ReaderError::ContentUnavailable(_))
        ));
    }

    #[test]
    fn cache_is_built_once_and_reused() {
        let text = "line\n".repeat(200);
        let (mut store, fs) = store_with("/books/long.txt", &text);
        let doc = store.open("/books/long.txt", "/.crosspoint").unwrap();

        let mut section = doc.section(0).unwrap();
        assert!(!section.has_cache());
        section.build_cache(&renderer()).unwrap();
        // 759 px page / 18 px lines = 42 lines per page
        assert_eq!(section.page_count(), 5);

        let cache_file = format!("{}/sections/0.bin", doc.cache_root());
        assert!(fs.lock().unwrap().exists(&cache_file));

        let mut reopened = doc.section(0).unwrap();
        assert!(reopened.has_cache());
        assert_eq!(reopened.page_count(), 5);
    }

    #[test]
    fn stale_cache_is_rejected() {
        let (mut store, fs) = store_with("/books/short.txt", "tiny");
        let doc = store.open("/books/short.txt", "/.crosspoint").unwrap();
        let sections = format!("{}/sections", doc.cache_root());
        {
            let mut fs = fs.lock().unwrap();
            fs.create_dir_all(&sections).unwrap();
            fs.write_file(
                &filesystem::join_path(&sections, "0.bin"),
                &encode_pages(&[(0, 400)]),
            )
            .unwrap();
        }
        assert!(!doc.section(0).unwrap().has_cache());
    }

    #[test]
    fn cache_write_failure_is_a_build_failure() {
        let (mut store, fs) = store_with("/books/a.txt", "text");
        let doc = store.open("/books/a.txt", "/.crosspoint").unwrap();
        fs.lock().unwrap().fail_writes(true);

        let mut section = doc.section(0).unwrap();
        assert_eq!(
            section.build_cache(&renderer()),
            Err(ReaderError::CacheBuild { spine_index: 0 })
        );
    }

    #[test]
    fn pages_cover_chapter_without_gaps() {
        let text = "Call me Ishmael. Some years ago, never mind how long precisely. ".repeat(80);
        let pages = paginate(&text, 200, 100, 18, |s| s.chars().count() as u32 * 9).unwrap();
        assert!(pages.len() > 1);
        assert_eq!(pages[0].0, 0);
        assert_eq!(pages.last().unwrap().1, text.len());
        for pair in pages.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn page_box_too_short_fails() {
        assert_eq!(paginate("abc", 100, 5, 18, |s| s.len() as u32), None);
    }

    #[test]
    fn rendering_draws_page_text() {
        let (mut store, _) = store_with("/books/a.txt", "Hello reader");
        let doc = store.open("/books/a.txt", "/.crosspoint").unwrap();
        let mut renderer = renderer();
        let mut section = doc.section(0).unwrap();
        section.build_cache(&renderer).unwrap();
        section.render_page(0, &mut renderer).unwrap();
        assert!(renderer.display().black_pixel_count() > 0);
        assert!(matches!(
            section.render_page(1, &mut renderer),
            Err(ReaderError::ContentUnavailable(_))
        ));
    }

    #[test]
    fn fnv_hash_is_stable() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    }
}
