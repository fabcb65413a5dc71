//! Reading cursor and chapter materialization.
//!
//! The controller is in one of two states:
//!
//! * **no section**: initially and after any chapter change. The next render
//!   clamps the spine index, builds the section (indexing it first if the book
//!   store has no page cache) and resolves the pending page.
//! * **has section**: page turns move within `[0, page_count)`. Turning past
//!   either end drops the section and moves one spine item, landing on the
//!   first page going forward or the last page going backward.
//!
//! A chapter skip drops the section and moves one spine item regardless of
//! the current page, always landing on the first page.

use crate::book::{Document, Section};
use crate::display::{DisplayDevice, TextShaper};
use crate::error::ReaderError;
use crate::filesystem::{FileSystem, FileSystemError};
use crate::progress::PersistedProgress;
use crate::renderer::Renderer;

/// Page to land on once the next section is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget {
    First,
    Last,
    Page(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// What a navigation input did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Moved within the current section.
    Page,
    /// Left the section across a chapter boundary.
    ChapterBoundary,
    /// Long-press jump to the neighbouring chapter.
    ChapterSkip,
    /// No section is loaded; nothing moved.
    NoSection,
}

struct ActiveSection<S> {
    section: S,
    current_page: usize,
}

pub struct PaginationController<Doc: Document> {
    document: Doc,
    /// Signed so a backward move from the first chapter can go below zero
    /// until the next render clamps it.
    spine_index: i32,
    pending_page: PageTarget,
    active: Option<ActiveSection<Doc::Section>>,
}

impl<Doc: Document> PaginationController<Doc> {
    pub fn new(document: Doc) -> Self {
        Self {
            document,
            spine_index: 0,
            pending_page: PageTarget::First,
            active: None,
        }
    }

    pub fn document(&self) -> &Doc {
        &self.document
    }

    pub fn spine_index(&self) -> i32 {
        self.spine_index
    }

    pub fn pending_page(&self) -> PageTarget {
        self.pending_page
    }

    pub fn has_section(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_page(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.current_page)
    }

    pub fn page_count(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.section.page_count())
    }

    /// Move within the loaded section, clamped to its last page.
    ///
    /// Returns `false` when no section is loaded.
    pub fn set_current_page(&mut self, page: usize) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.current_page = page.min(active.section.page_count().saturating_sub(1));
                true
            }
            None => false,
        }
    }

    /// `(spine index, page)` once a section is loaded.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.active
            .as_ref()
            .map(|active| (active.section.spine_index(), active.current_page))
    }

    /// Seed the cursor from a saved position. Only valid before the first render.
    pub fn seed(&mut self, progress: PersistedProgress) {
        self.spine_index = i32::from(progress.spine_index);
        self.pending_page = PageTarget::Page(usize::from(progress.page_number));
        self.active = None;
    }

    /// Seed from the document's `progress.bin` if there is one.
    pub fn load_progress(&mut self, fs: &mut dyn FileSystem) -> bool {
        match PersistedProgress::load(fs, self.document.cache_root()) {
            Some(progress) => {
                log::info!(
                    "[READER] Resuming at spine {} page {}",
                    progress.spine_index,
                    progress.page_number
                );
                self.seed(progress);
                true
            }
            None => false,
        }
    }

    pub fn next_page(&mut self) -> Navigation {
        let Some(active) = self.active.as_mut() else {
            return Navigation::NoSection;
        };
        if active.current_page + 1 < active.section.page_count() {
            active.current_page += 1;
            Navigation::Page
        } else {
            self.change_spine(Direction::Forward, PageTarget::First);
            Navigation::ChapterBoundary
        }
    }

    pub fn previous_page(&mut self) -> Navigation {
        let Some(active) = self.active.as_mut() else {
            return Navigation::NoSection;
        };
        if active.current_page > 0 {
            active.current_page -= 1;
            Navigation::Page
        } else {
            self.change_spine(Direction::Backward, PageTarget::Last);
            Navigation::ChapterBoundary
        }
    }

    /// Jump one spine item in `direction`, landing on its first page.
    pub fn skip_chapter(&mut self, direction: Direction) -> Navigation {
        if self.active.is_none() {
            return Navigation::NoSection;
        }
        self.change_spine(direction, PageTarget::First);
        Navigation::ChapterSkip
    }

    fn change_spine(&mut self, direction: Direction, landing: PageTarget) {
        self.active = None;
        self.pending_page = landing;
        self.spine_index += match direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        log::debug!(
            "[READER] Spine -> {} ({:?})",
            self.spine_index,
            self.pending_page
        );
    }

    /// Make sure a section for the current spine index is loaded.
    ///
    /// `on_indexing` runs right before a missing page cache is built so the
    /// caller can show a banner. On failure the controller stays without a
    /// section and the cursor is unchanged.
    pub fn ensure_section<D, S, F>(
        &mut self,
        renderer: &mut Renderer<D, S>,
        on_indexing: F,
    ) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
        F: FnOnce(&mut Renderer<D, S>) -> Result<(), ReaderError>,
    {
        let spine_count = self.document.spine_count();
        if spine_count == 0 {
            return Err(ReaderError::ContentUnavailable(format!(
                "{} has no chapters",
                self.document.path()
            )));
        }
        if self.spine_index < 0 || self.spine_index as usize >= spine_count {
            log::warn!(
                "[READER] Spine index {} out of range 0..{}, resetting to 0",
                self.spine_index,
                spine_count
            );
            self.spine_index = 0;
        }
        if self.active.is_some() {
            return Ok(());
        }

        let spine_index = self.spine_index as usize;
        log::info!(
            "[READER] Loading spine item {} ({})",
            spine_index,
            self.document
                .spine_item_path(spine_index)
                .as_deref()
                .unwrap_or("?")
        );
        let mut section = self.document.section(spine_index)?;
        if !section.has_cache() {
            log::info!("[READER] Indexing spine item {}", spine_index);
            on_indexing(renderer)?;
            section.build_cache(renderer).map_err(|err| {
                log::error!("[READER] Indexing spine item {} failed: {}", spine_index, err);
                ReaderError::CacheBuild { spine_index }
            })?;
        }

        let page_count = section.page_count();
        if page_count == 0 {
            return Err(ReaderError::ContentUnavailable(format!(
                "spine item {} has no pages",
                spine_index
            )));
        }
        let current_page = match self.pending_page {
            PageTarget::First => 0,
            PageTarget::Last => page_count - 1,
            PageTarget::Page(page) => page.min(page_count - 1),
        };
        self.active = Some(ActiveSection {
            section,
            current_page,
        });
        Ok(())
    }

    /// Draw the current page. Requires a loaded section.
    pub fn render_current_page<D, S>(&mut self, renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
    {
        let active = self.active.as_mut().ok_or_else(|| {
            ReaderError::ContentUnavailable("no section loaded".to_string())
        })?;
        active.section.render_page(active.current_page, renderer)
    }

    /// Write the loaded position to `progress.bin`. No-op without a section.
    pub fn save_progress(&self, fs: &mut dyn FileSystem) -> Result<(), FileSystemError> {
        let Some((spine_index, page)) = self.position() else {
            return Ok(());
        };
        let progress = PersistedProgress::new(
            u16::try_from(spine_index).unwrap_or(u16::MAX),
            u16::try_from(page).unwrap_or(u16::MAX),
        );
        progress.save(fs, self.document.cache_root())
    }
}
