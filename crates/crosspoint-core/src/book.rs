//! Book store contract.
//!
//! A book store opens documents, exposes their spine (ordered chapters) and
//! table of contents, and materializes one chapter at a time as a paginated
//! [`Section`] backed by an on-disk page cache.

use crate::display::{DisplayDevice, TextShaper};
use crate::error::ReaderError;
use crate::renderer::Renderer;

/// Table of contents entry for a spine item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TocEntry {
    pub title: String,
}

pub trait BookStore: Send {
    type Doc: Document;

    /// Whether a directory entry name is a document this store can open.
    fn is_document(name: &str) -> bool;

    fn exists(&mut self, path: &str) -> bool;

    /// Open `path`, keeping caches and progress under `cache_root`.
    fn open(&mut self, path: &str, cache_root: &str) -> Result<Self::Doc, ReaderError>;
}

pub trait Document: Send + 'static {
    type Section: Section;

    fn path(&self) -> &str;

    fn spine_count(&self) -> usize;

    fn spine_item_path(&self, index: usize) -> Option<String>;

    fn toc_entry_for_spine(&self, index: usize) -> TocEntry;

    /// Directory holding this document's caches and `progress.bin`.
    fn cache_root(&self) -> &str;

    /// Construct the section for a spine item. Cheap; nothing is paginated yet.
    fn section(&self, spine_index: usize) -> Result<Self::Section, ReaderError>;
}

pub trait Section: Send + 'static {
    fn spine_index(&self) -> usize;

    /// Whether a usable page cache already exists.
    fn has_cache(&mut self) -> bool;

    /// Paginate the chapter for the renderer's page geometry and persist it.
    fn build_cache<D, S>(&mut self, renderer: &Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper;

    /// Number of pages. Only meaningful once a cache exists.
    fn page_count(&self) -> usize;

    /// Draw `page` into the renderer's frame. Does not flush.
    fn render_page<D, S>(&mut self, page: usize, renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper;
}
