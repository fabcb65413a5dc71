//! Library browser.

use std::sync::{Arc, Mutex};

use embedded_graphics::pixelcolor::BinaryColor;

use super::{Screen, ScreenAction, ScreenContext, ScreenKind};
use crate::display::{DisplayDevice, FontRole, FontStyle, RefreshMode, TextShaper};
use crate::error::ReaderError;
use crate::filesystem::{dirname, join_path, FileSystem, SharedFileSystem};
use crate::input::{Button, InputEvent};
use crate::render_task::{lock_unpoisoned, RenderTask};
use crate::renderer::{Renderer, MARGIN_LEFT, MARGIN_TOP};

const TITLE: &str = "CrossPoint Reader";
const EMPTY_TEXT: &str = "No documents found";
const LIST_TOP: i32 = 50;
const ROW_HEIGHT: i32 = 30;
const TEXT_INDENT: i32 = 10;

/// One visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub is_directory: bool,
}

impl ListEntry {
    fn label(&self) -> String {
        if self.is_directory {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Directory being browsed and the highlighted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub base_path: String,
    pub entries: Vec<ListEntry>,
    pub selected: usize,
}

impl Listing {
    fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            entries: Vec::new(),
            selected: 0,
        }
    }

    /// Reload entries for `base_path`, resetting the selection.
    fn load(&mut self, fs: &mut dyn FileSystem, is_document: fn(&str) -> bool) {
        self.selected = 0;
        self.entries = match fs.list_files(&self.base_path) {
            Ok(files) => files
                .into_iter()
                .filter(|file| !file.name.starts_with('.'))
                .filter(|file| file.is_directory || is_document(&file.name))
                .map(|file| ListEntry {
                    name: file.name,
                    is_directory: file.is_directory,
                })
                .collect(),
            Err(err) => {
                log::warn!("[FS] Cannot list {}: {}", self.base_path, err);
                Vec::new()
            }
        };
        self.entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        log::info!("[FS] {} entries in {}", self.entries.len(), self.base_path);
    }

    fn select_next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1) % self.entries.len();
        }
    }

    fn select_previous(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + self.entries.len() - 1) % self.entries.len();
        }
    }

    pub fn selected_entry(&self) -> Option<&ListEntry> {
        self.entries.get(self.selected)
    }
}

struct Browser {
    fs: SharedFileSystem,
    library_root: String,
    task: RenderTask<Listing>,
}

pub struct FileSelectionScreen {
    is_document: fn(&str) -> bool,
    browser: Option<Browser>,
}

impl FileSelectionScreen {
    /// `is_document` decides which files are listed next to directories.
    pub fn new(is_document: fn(&str) -> bool) -> Self {
        Self {
            is_document,
            browser: None,
        }
    }

    /// Snapshot of the listing, once entered.
    pub fn listing(&self) -> Option<Listing> {
        self.browser
            .as_ref()
            .map(|browser| browser.task.with_state(|listing| listing.clone()))
    }

    /// Wait for pending redraws to land.
    pub fn wait_until_idle(&self, timeout: std::time::Duration) -> bool {
        self.browser
            .as_ref()
            .map_or(true, |browser| browser.task.wait_until_idle(timeout))
    }

    fn open_directory(&self, browser: &Browser, path: String) {
        let is_document = self.is_document;
        browser.task.with_state(|listing| {
            listing.base_path = path;
            listing.load(&mut *lock_unpoisoned(&browser.fs), is_document);
        });
        browser.task.request_render();
    }
}

impl Screen for FileSelectionScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::FileSelection
    }

    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        if self.browser.is_some() {
            return Ok(());
        }
        let mut listing = Listing::new(&ctx.config.library_root);
        listing.load(&mut *lock_unpoisoned(&ctx.fs), self.is_document);

        let renderer = ctx.renderer.clone();
        let task = RenderTask::spawn(
            "file_selection_render",
            Arc::new(Mutex::new(listing)),
            ctx.config.render_tick,
            ctx.config.render_stack_bytes,
            move |listing: &mut Listing| {
                let mut renderer = lock_unpoisoned(&renderer);
                if let Err(err) = draw_listing(&mut renderer, listing) {
                    log::error!("[SCREEN] File list render failed: {}", err);
                }
            },
        )?;
        task.request_render();

        self.browser = Some(Browser {
            fs: ctx.fs.clone(),
            library_root: ctx.config.library_root.clone(),
            task,
        });
        Ok(())
    }

    fn on_exit(&mut self) {
        if let Some(browser) = self.browser.take() {
            browser.task.stop();
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> ScreenAction {
        let Some(browser) = self.browser.as_ref() else {
            return ScreenAction::None;
        };

        match input.button {
            Button::VolumeDown | Button::Right => {
                browser.task.with_state(Listing::select_next);
                browser.task.request_render();
            }
            Button::VolumeUp | Button::Left => {
                browser.task.with_state(Listing::select_previous);
                browser.task.request_render();
            }
            Button::Confirm => {
                let target = browser.task.with_state(|listing| {
                    listing
                        .selected_entry()
                        .map(|entry| (join_path(&listing.base_path, &entry.name), entry.is_directory))
                });
                match target {
                    Some((path, true)) => self.open_directory(browser, path),
                    Some((path, false)) => return ScreenAction::OpenDocument(path),
                    None => {}
                }
            }
            Button::Back => {
                let parent = browser.task.with_state(|listing| {
                    (listing.base_path != browser.library_root)
                        .then(|| dirname(&listing.base_path).to_string())
                });
                if let Some(parent) = parent {
                    self.open_directory(browser, parent);
                }
            }
            _ => {}
        }
        ScreenAction::None
    }
}

/// Rows that fit below the title.
fn rows_per_screen<D, S>(renderer: &Renderer<D, S>) -> usize
where
    D: DisplayDevice,
    S: TextShaper,
{
    ((renderer.page_height() as i32 - LIST_TOP) / ROW_HEIGHT).max(1) as usize
}

fn draw_listing<D, S>(renderer: &mut Renderer<D, S>, listing: &Listing) -> Result<(), ReaderError>
where
    D: DisplayDevice,
    S: TextShaper,
{
    let left = MARGIN_LEFT as i32;
    let top = MARGIN_TOP as i32;

    renderer.clear()?;
    renderer.draw_centered_text(top, TITLE, FontRole::Ui, FontStyle::Bold, BinaryColor::On)?;

    if listing.entries.is_empty() {
        renderer.draw_text(
            left + TEXT_INDENT,
            top + LIST_TOP,
            EMPTY_TEXT,
            FontRole::Ui,
            FontStyle::Regular,
            BinaryColor::On,
        )?;
        return renderer.flush(RefreshMode::Partial);
    }

    let rows = rows_per_screen(renderer);
    let first = listing.selected / rows * rows;
    let row_width = renderer.page_width().saturating_sub(1);
    for (row, entry) in listing.entries.iter().skip(first).take(rows).enumerate() {
        let y = top + LIST_TOP + row as i32 * ROW_HEIGHT;
        let selected = first + row == listing.selected;
        if selected {
            renderer.fill_rect(left, y + 2, row_width, ROW_HEIGHT as u32, BinaryColor::On)?;
        }
        let color = if selected { BinaryColor::Off } else { BinaryColor::On };
        renderer.draw_text(
            left + TEXT_INDENT,
            y,
            &entry.label(),
            FontRole::Ui,
            FontStyle::Regular,
            color,
        )?;
    }
    renderer.flush(RefreshMode::Partial)
}
