//! Whole-session reading flows against an in-memory book with fixed chapter sizes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crosspoint_core::screens::ActiveScreen;
use crosspoint_core::test_display::{Flush, TestDisplay};
use crosspoint_core::{
    BookStore, Button, Document, DisplayDevice, FixedBattery, InputEvent, MockFileSystem,
    MonoShaper, ReaderError, Renderer, ScreenKind, Section, Session, SessionConfig,
    SharedFileSystem, TextShaper, TocEntry,
};

const WAIT: Duration = Duration::from_secs(5);

/// Book whose chapters have a fixed number of pages.
struct PagedStore {
    chapters: Vec<usize>,
}

struct PagedBook {
    path: String,
    chapters: Vec<usize>,
}

struct PagedSection {
    spine_index: usize,
    pages: usize,
}

impl BookStore for PagedStore {
    type Doc = PagedBook;

    fn is_document(name: &str) -> bool {
        name.ends_with(".book")
    }

    fn exists(&mut self, _path: &str) -> bool {
        true
    }

    fn open(&mut self, path: &str, _cache_root: &str) -> Result<PagedBook, ReaderError> {
        Ok(PagedBook {
            path: path.to_string(),
            chapters: self.chapters.clone(),
        })
    }
}

impl Document for PagedBook {
    type Section = PagedSection;

    fn path(&self) -> &str {
        &self.path
    }

    fn spine_count(&self) -> usize {
        self.chapters.len()
    }

    fn spine_item_path(&self, index: usize) -> Option<String> {
        (index < self.chapters.len()).then(|| format!("ch{}", index))
    }

    fn toc_entry_for_spine(&self, index: usize) -> TocEntry {
        TocEntry {
            title: format!("Part {}", index + 1),
        }
    }

    fn cache_root(&self) -> &str {
        "/.crosspoint/paged"
    }

    fn section(&self, spine_index: usize) -> Result<PagedSection, ReaderError> {
        let pages = self
            .chapters
            .get(spine_index)
            .copied()
            .ok_or_else(|| ReaderError::ContentUnavailable("no such chapter".into()))?;
        Ok(PagedSection { spine_index, pages })
    }
}

impl Section for PagedSection {
    fn spine_index(&self) -> usize {
        self.spine_index
    }

    fn has_cache(&mut self) -> bool {
        true
    }

    fn build_cache<D, S>(&mut self, _renderer: &Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
    {
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page<D, S>(&mut self, page: usize, renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice,
        S: TextShaper,
    {
        renderer.draw_page_text(&format!("Part {} page {}", self.spine_index + 1, page + 1))?;
        Ok(())
    }
}

type PagedSession = Session<TestDisplay, MonoShaper, PagedStore>;

fn session(chapters: &[usize]) -> PagedSession {
    let mut storage = MockFileSystem::new();
    storage.add_file("/novel.book", "");
    let fs: SharedFileSystem = Arc::new(Mutex::new(storage));
    let mut config = SessionConfig::default()
        .with_render_stack_bytes(512 * 1024)
        .without_sleep_delay();
    config.render_tick = Duration::from_millis(1);

    Session::new(
        config,
        Renderer::new(TestDisplay::default_size(), MonoShaper).into_shared(),
        fs,
        Arc::new(FixedBattery(90)),
        PagedStore {
            chapters: chapters.to_vec(),
        },
    )
}

fn reader_position(session: &PagedSession) -> Option<(usize, usize)> {
    let reader = session.active_screen().and_then(ActiveScreen::as_reader)?;
    assert!(reader.wait_until_idle(WAIT));
    reader.position()
}

fn input(session: &mut PagedSession, event: InputEvent) -> Option<(usize, usize)> {
    session.poll_once(event);
    reader_position(session)
}

fn reader_flushes(session: &PagedSession, count: usize) -> Vec<Flush> {
    let renderer = session.renderer();
    let renderer = renderer.lock().unwrap();
    let flushes = renderer.display().flushes();
    flushes[flushes.len() - count..].to_vec()
}

#[test]
fn paging_through_three_chapters_wraps_to_start() {
    let mut session = session(&[5, 5, 5]);
    session.start();
    session.open_document("/novel.book");
    assert_eq!(session.active_kind(), Some(ScreenKind::Reader));

    // Input 1 is the initial render
    assert_eq!(reader_position(&session), Some((0, 0)));

    for press in 1..=15usize {
        let expected = ((press / 5) % 3, press % 5);
        assert_eq!(
            input(&mut session, InputEvent::press(Button::Right)),
            Some(expected),
            "after next press {}",
            press
        );
    }

    let flushes = reader_flushes(&session, 16);
    let mut expected = vec![Flush::Partial; 16];
    expected[0] = Flush::Full;
    expected[10] = Flush::Full;
    assert_eq!(flushes, expected);
}

#[test]
fn backward_from_first_page_lands_on_last_page_of_first_chapter() {
    let mut session = session(&[3, 4]);
    session.start();
    session.open_document("/novel.book");
    assert_eq!(reader_position(&session), Some((0, 0)));

    // Spine goes to -1, the next render resets it to 0 and keeps the Last target
    assert_eq!(input(&mut session, InputEvent::press(Button::Left)), Some((0, 2)));
    assert_eq!(input(&mut session, InputEvent::press(Button::VolumeUp)), Some((0, 1)));
}

#[test]
fn chapter_skip_ignores_current_page() {
    let mut session = session(&[4, 4, 4]);
    session.start();
    session.open_document("/novel.book");
    reader_position(&session);

    input(&mut session, InputEvent::press(Button::Right));
    input(&mut session, InputEvent::press(Button::Right));
    assert_eq!(
        input(&mut session, InputEvent::hold(Button::VolumeDown, 800)),
        Some((1, 0))
    );
    assert_eq!(
        input(&mut session, InputEvent::hold(Button::Left, 800)),
        Some((0, 0))
    );
}

#[test]
fn reopening_resumes_saved_page() {
    let mut session = session(&[5, 5]);
    session.start();
    session.open_document("/novel.book");
    reader_position(&session);
    for _ in 0..7 {
        input(&mut session, InputEvent::press(Button::VolumeDown));
    }
    assert_eq!(reader_position(&session), Some((1, 2)));

    session.poll_once(InputEvent::press(Button::Back));
    assert_eq!(session.active_kind(), Some(ScreenKind::FileSelection));
    session.open_document("/novel.book");
    assert_eq!(reader_position(&session), Some((1, 2)));
}
