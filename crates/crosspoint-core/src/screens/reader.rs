//! Reading screen.
//!
//! Input only moves the cursor and raises a render request; the render task
//! materializes chapters, draws the page with its status bar, flushes with the
//! refresh policy and persists progress.
//!
//! Turns inside the loaded section go through [`PageCursor`] and never wait
//! for a running pass. Only chapter boundaries and skips take the navigation
//! lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_graphics::pixelcolor::BinaryColor;

use super::status_bar::{draw_indexing_banner, draw_status_bar, StatusLine};
use super::{Screen, ScreenAction, ScreenContext, ScreenKind};
use crate::book::Document;
use crate::display::{DisplayDevice, FontRole, FontStyle, RefreshMode, TextShaper};
use crate::error::ReaderError;
use crate::input::{Button, InputEvent};
use crate::pagination::{Direction, Navigation, PaginationController};
use crate::refresh::RefreshScheduler;
use crate::render_task::{lock_unpoisoned, RenderTask};
use crate::renderer::{Renderer, MARGIN_TOP};

const UNAVAILABLE_TEXT: &str = "Unable to load chapter";

/// Page within the loaded section, readable without the navigation lock.
///
/// `page_count` is zero while no section is published. The render task only
/// writes the cursor while it is zero; input only writes it while it is not.
#[derive(Debug, Default)]
pub struct PageCursor {
    page: AtomicUsize,
    page_count: AtomicUsize,
}

impl PageCursor {
    pub fn page(&self) -> usize {
        self.page.load(Ordering::SeqCst)
    }

    pub fn page_count(&self) -> usize {
        self.page_count.load(Ordering::SeqCst)
    }

    /// Move one page inside the section. `None` when the move crosses a
    /// chapter boundary and needs the controller.
    pub fn step(&self, direction: Direction) -> Option<Navigation> {
        let page_count = self.page_count();
        if page_count == 0 {
            return Some(Navigation::NoSection);
        }
        let page = self.page();
        let next = match direction {
            Direction::Forward => page.checked_add(1).filter(|next| *next < page_count),
            Direction::Backward => page.checked_sub(1),
        }?;
        self.page.store(next, Ordering::SeqCst);
        Some(Navigation::Page)
    }

    fn publish(&self, page: usize, page_count: usize) {
        self.page.store(page, Ordering::SeqCst);
        self.page_count.store(page_count, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.page_count.store(0, Ordering::SeqCst);
    }
}

/// State shared between input handling and the render task.
pub struct ReaderNav<Doc: Document> {
    pub controller: PaginationController<Doc>,
    pub refresh: RefreshScheduler,
    pub cursor: Arc<PageCursor>,
}

impl<Doc: Document> ReaderNav<Doc> {
    /// Bring the controller up to the input-side cursor.
    fn sync_cursor(&mut self) {
        if self.cursor.page_count() > 0 {
            self.controller.set_current_page(self.cursor.page());
        }
    }

    /// Expose a freshly loaded section to input.
    fn publish_section(&self) {
        if self.cursor.page_count() > 0 {
            return;
        }
        if let (Some(page), Some(page_count)) =
            (self.controller.current_page(), self.controller.page_count())
        {
            self.cursor.publish(page, page_count);
        }
    }

    /// Boundary crossing or chapter skip, run under the navigation lock.
    fn cross(&mut self, skip: bool, direction: Direction) -> Navigation {
        self.sync_cursor();
        let outcome = match (skip, direction) {
            (true, direction) => self.controller.skip_chapter(direction),
            (false, Direction::Forward) => self.controller.next_page(),
            (false, Direction::Backward) => self.controller.previous_page(),
        };
        if !self.controller.has_section() {
            self.cursor.clear();
        }
        outcome
    }
}

pub struct ReaderScreen<Doc: Document> {
    pending: Option<PaginationController<Doc>>,
    task: Option<RenderTask<ReaderNav<Doc>>>,
    cursor: Arc<PageCursor>,
    skip_chapter_ms: u32,
}

impl<Doc: Document> ReaderScreen<Doc> {
    pub fn new(document: Doc) -> Self {
        Self {
            pending: Some(PaginationController::new(document)),
            task: None,
            cursor: Arc::new(PageCursor::default()),
            skip_chapter_ms: crate::config::SKIP_CHAPTER_MS,
        }
    }

    /// `(spine index, page)` of the loaded section.
    pub fn position(&self) -> Option<(usize, usize)> {
        match &self.task {
            Some(task) => task.with_state(|nav| nav.controller.position()),
            None => self.pending.as_ref().and_then(PaginationController::position),
        }
    }

    pub fn spine_index(&self) -> i32 {
        match &self.task {
            Some(task) => task.with_state(|nav| nav.controller.spine_index()),
            None => self
                .pending
                .as_ref()
                .map_or(0, PaginationController::spine_index),
        }
    }

    pub fn document_path(&self) -> Option<String> {
        match &self.task {
            Some(task) => Some(task.with_state(|nav| nav.controller.document().path().to_string())),
            None => self.pending.as_ref().map(|c| c.document().path().to_string()),
        }
    }

    /// Wait until the last requested page has been drawn.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.task
            .as_ref()
            .map_or(true, |task| task.wait_until_idle(timeout))
    }

    fn navigate(&self, input: InputEvent) -> Option<Navigation> {
        let direction = match input.button {
            Button::Left | Button::VolumeUp => Direction::Backward,
            Button::Right | Button::VolumeDown => Direction::Forward,
            _ => return None,
        };
        let skip = input.press_duration_ms > self.skip_chapter_ms;
        let task = self.task.as_ref()?;
        let in_section = if skip { None } else { self.cursor.step(direction) };
        let outcome = match in_section {
            Some(outcome) => outcome,
            None => task.with_state(|nav| nav.cross(skip, direction)),
        };
        task.request_render();
        Some(outcome)
    }
}

impl<Doc: Document> Screen for ReaderScreen<Doc> {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Reader
    }

    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        let Some(mut controller) = self.pending.take() else {
            return Ok(());
        };
        controller.load_progress(&mut *lock_unpoisoned(&ctx.fs));
        self.skip_chapter_ms = ctx.config.skip_chapter_ms;

        let nav = ReaderNav {
            controller,
            refresh: RefreshScheduler::new(ctx.config.pages_per_full_refresh),
            cursor: Arc::clone(&self.cursor),
        };
        let render_ctx = ctx.clone();
        let task = RenderTask::spawn(
            "reader_render",
            Arc::new(Mutex::new(nav)),
            ctx.config.render_tick,
            ctx.config.render_stack_bytes,
            move |nav: &mut ReaderNav<Doc>| render_pass(nav, &render_ctx),
        )?;
        task.request_render();
        self.task = Some(task);
        Ok(())
    }

    fn on_exit(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop();
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> ScreenAction {
        if input.button == Button::Back {
            return ScreenAction::GoHome;
        }
        if let Some(outcome) = self.navigate(input) {
            log::debug!("[READER] {:?} -> {:?}", input.button, outcome);
        }
        ScreenAction::None
    }
}

fn render_pass<Doc, D, S>(nav: &mut ReaderNav<Doc>, ctx: &ScreenContext<D, S>)
where
    Doc: Document,
    D: DisplayDevice + Send + 'static,
    S: TextShaper + 'static,
{
    nav.sync_cursor();
    let mut renderer = lock_unpoisoned(&ctx.renderer);
    let drawn = draw_current_page(nav, &mut renderer, ctx.battery.percentage());
    nav.publish_section();
    match drawn {
        Ok(()) => {
            let mut fs = lock_unpoisoned(&ctx.fs);
            if let Err(err) = nav.controller.save_progress(&mut *fs) {
                log::warn!("[READER] Failed to persist progress: {}", err);
            }
        }
        Err(ReaderError::CacheBuild { spine_index }) => {
            log::error!("[READER] No pages for spine item {}", spine_index);
        }
        Err(ReaderError::ContentUnavailable(reason)) => {
            log::error!("[READER] {}", reason);
            if let Err(err) = draw_unavailable(&mut renderer) {
                log::error!("[READER] {}", err);
            }
        }
        Err(err) => log::error!("[READER] Render failed: {}", err),
    }
}

fn draw_current_page<Doc, D, S>(
    nav: &mut ReaderNav<Doc>,
    renderer: &mut Renderer<D, S>,
    battery_percent: u8,
) -> Result<(), ReaderError>
where
    Doc: Document,
    D: DisplayDevice,
    S: TextShaper,
{
    nav.controller.ensure_section(renderer, draw_indexing_banner)?;

    renderer.clear()?;
    nav.controller.render_current_page(renderer)?;

    if let (Some((spine_index, page)), Some(page_count)) =
        (nav.controller.position(), nav.controller.page_count())
    {
        let title = nav.controller.document().toc_entry_for_spine(spine_index).title;
        draw_status_bar(
            renderer,
            &StatusLine {
                page,
                page_count,
                battery_percent,
                title: &title,
            },
        )?;
    }
    renderer.flush(nav.refresh.next_mode())
}

fn draw_unavailable<D, S>(renderer: &mut Renderer<D, S>) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    let top = MARGIN_TOP as i32
        + (renderer.page_height() as i32 - renderer.line_height(FontRole::Ui) as i32) / 2;
    renderer.clear()?;
    renderer.draw_centered_text(top, UNAVAILABLE_TEXT, FontRole::Ui, FontStyle::Regular, BinaryColor::On)?;
    renderer.flush(RefreshMode::Partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_filesystem::MockFileSystem;
    use crate::pagination::tests::FakeDocument;
    use crate::progress::PersistedProgress;
    use crate::screens::test_support::context;
    use crate::test_display::Flush;

    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn settle(screen: &ReaderScreen<FakeDocument>) {
        assert!(screen.wait_until_idle(WAIT));
    }

    fn press(screen: &mut ReaderScreen<FakeDocument>, button: Button) {
        screen.handle_input(InputEvent::press(button));
        settle(screen);
    }

    #[test]
    fn entering_renders_first_page_with_full_refresh() {
        let (ctx, fs) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[3, 3]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);
        assert_eq!(screen.position(), Some((0, 0)));
        screen.on_exit();

        let renderer = ctx.renderer.lock().unwrap();
        assert_eq!(renderer.display().last_flush(), Some(Flush::Full));
        // Status bar strip is drawn
        assert!(renderer.display().black_pixel_count_in(0, 776, 480, 800) > 0);
        let saved = fs.lock().unwrap().contents("/.crosspoint/fake/progress.bin").map(<[u8]>::to_vec);
        assert_eq!(saved, Some(PersistedProgress::new(0, 0).to_bytes().to_vec()));
    }

    #[test]
    fn page_turns_use_partial_refresh_and_persist() {
        let (ctx, fs) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[3, 3]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);

        press(&mut screen, Button::Right);
        assert_eq!(screen.position(), Some((0, 1)));
        press(&mut screen, Button::VolumeDown);
        press(&mut screen, Button::VolumeDown);
        assert_eq!(screen.position(), Some((1, 0)));
        press(&mut screen, Button::Left);
        assert_eq!(screen.position(), Some((0, 2)));
        screen.on_exit();

        assert_eq!(
            ctx.renderer.lock().unwrap().display().last_flush(),
            Some(Flush::Partial)
        );
        let saved = fs.lock().unwrap().contents("/.crosspoint/fake/progress.bin").map(<[u8]>::to_vec);
        assert_eq!(saved, Some(PersistedProgress::new(0, 2).to_bytes().to_vec()));
    }

    #[test]
    fn cursor_steps_inside_section_only() {
        let cursor = PageCursor::default();
        assert_eq!(cursor.step(Direction::Forward), Some(Navigation::NoSection));

        cursor.publish(0, 2);
        assert_eq!(cursor.step(Direction::Backward), None);
        assert_eq!(cursor.step(Direction::Forward), Some(Navigation::Page));
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.step(Direction::Forward), None);
        assert_eq!(cursor.page(), 1);

        cursor.clear();
        assert_eq!(cursor.step(Direction::Backward), Some(Navigation::NoSection));
    }

    #[test]
    fn page_turn_does_not_wait_for_running_render() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut document = FakeDocument::new(&[5]);
        document.render_delay = Duration::from_millis(800);
        let mut screen = ReaderScreen::new(document);
        screen.on_enter(&ctx).unwrap();
        settle(&screen);

        screen.handle_input(InputEvent::press(Button::Right));
        thread::sleep(Duration::from_millis(100));
        let started = Instant::now();
        screen.handle_input(InputEvent::press(Button::Right));
        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_millis(200),
            "page turn blocked for {:?}",
            elapsed
        );

        settle(&screen);
        assert_eq!(screen.position(), Some((0, 2)));
        screen.on_exit();
    }

    #[test]
    fn reading_continues_when_progress_cannot_be_saved() {
        let (ctx, fs) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[3, 2]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);
        fs.lock().unwrap().fail_writes(true);

        press(&mut screen, Button::Right);
        assert_eq!(screen.position(), Some((0, 1)));
        assert_eq!(
            ctx.renderer.lock().unwrap().display().last_flush(),
            Some(Flush::Partial)
        );
        press(&mut screen, Button::Right);
        press(&mut screen, Button::Right);
        assert_eq!(screen.position(), Some((1, 0)));
        screen.on_exit();

        let renderer = ctx.renderer.lock().unwrap();
        assert_eq!(renderer.display().last_flush(), Some(Flush::Partial));
        let saved = fs.lock().unwrap().contents("/.crosspoint/fake/progress.bin").map(<[u8]>::to_vec);
        assert_eq!(saved, Some(PersistedProgress::new(0, 0).to_bytes().to_vec()));
    }

    #[test]
    fn long_press_skips_chapter() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[4, 4, 4]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);

        press(&mut screen, Button::Right);
        screen.handle_input(InputEvent::hold(Button::VolumeDown, 701));
        settle(&screen);
        assert_eq!(screen.position(), Some((1, 0)));

        // Exactly at the threshold is still a page turn
        screen.handle_input(InputEvent::hold(Button::Right, 700));
        settle(&screen);
        assert_eq!(screen.position(), Some((1, 1)));
        screen.on_exit();
    }

    #[test]
    fn resumes_from_saved_progress() {
        let mut storage = MockFileSystem::new();
        storage.add_directory("/.crosspoint");
        storage.add_directory("/.crosspoint/fake");
        storage.add_file(
            "/.crosspoint/fake/progress.bin",
            PersistedProgress::new(2, 1).to_bytes(),
        );
        let (ctx, _) = context(storage);
        let mut screen = ReaderScreen::new(FakeDocument::new(&[2, 2, 3]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);
        assert_eq!(screen.position(), Some((2, 1)));
        screen.on_exit();
    }

    #[test]
    fn back_goes_home() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[1]));
        screen.on_enter(&ctx).unwrap();
        assert_eq!(
            screen.handle_input(InputEvent::press(Button::Back)),
            ScreenAction::GoHome
        );
        assert_eq!(
            screen.handle_input(InputEvent::press(Button::Confirm)),
            ScreenAction::None
        );
        screen.on_exit();
    }

    #[test]
    fn empty_document_shows_unavailable_message() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut screen = ReaderScreen::new(FakeDocument::new(&[]));
        screen.on_enter(&ctx).unwrap();
        settle(&screen);
        screen.on_exit();

        let renderer = ctx.renderer.lock().unwrap();
        assert_eq!(renderer.display().last_flush(), Some(Flush::Partial));
        assert!(renderer.display().black_pixel_count_in(0, 380, 480, 400) > 0);
    }

    #[test]
    fn failed_indexing_leaves_banner() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut document = FakeDocument::new(&[2]);
        document.cached = false;
        document.fail_build = true;
        let mut screen = ReaderScreen::new(document);
        screen.on_enter(&ctx).unwrap();
        settle(&screen);

        press(&mut screen, Button::Right);
        assert_eq!(screen.position(), None);
        screen.on_exit();

        let renderer = ctx.renderer.lock().unwrap();
        assert!(matches!(
            renderer.display().last_flush(),
            Some(Flush::Region { y: 61, .. })
        ));
    }
}
