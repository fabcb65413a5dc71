//! The four fixed screens and what they share.
//!
//! Screens never switch themselves; input handlers return a [`ScreenAction`]
//! and the session performs the transition from the polling loop.

mod boot_logo;
mod file_selection;
mod message;
mod reader;
mod status_bar;

use std::sync::Arc;

pub use boot_logo::BootLogoScreen;
pub use file_selection::{FileSelectionScreen, Listing};
pub use message::FullScreenMessageScreen;
pub use reader::{PageCursor, ReaderNav, ReaderScreen};

use crate::battery::SharedBattery;
use crate::book::Document;
use crate::config::SessionConfig;
use crate::display::{DisplayDevice, TextShaper};
use crate::error::ReaderError;
use crate::filesystem::SharedFileSystem;
use crate::input::InputEvent;
use crate::renderer::SharedRenderer;

/// Transition requested by a screen's input handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAction {
    None,
    /// Back to the file browser.
    GoHome,
    /// Open the document at this path.
    OpenDocument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    BootLogo,
    FileSelection,
    Reader,
    Message,
}

/// Everything a screen may touch while entered.
pub struct ScreenContext<D, S> {
    pub renderer: SharedRenderer<D, S>,
    pub fs: SharedFileSystem,
    pub battery: SharedBattery,
    pub config: SessionConfig,
}

impl<D, S> Clone for ScreenContext<D, S> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            fs: Arc::clone(&self.fs),
            battery: Arc::clone(&self.battery),
            config: self.config.clone(),
        }
    }
}

/// Lifecycle shared by all screens.
pub trait Screen {
    fn kind(&self) -> ScreenKind;

    /// Draw the initial state or start the render task.
    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static;

    /// Stop background work. Must return only once nothing touches the screen's state.
    fn on_exit(&mut self) {}

    fn handle_input(&mut self, _input: InputEvent) -> ScreenAction {
        ScreenAction::None
    }
}

/// The closed set of screens.
pub enum ActiveScreen<Doc: Document> {
    BootLogo(BootLogoScreen),
    FileSelection(FileSelectionScreen),
    Reader(ReaderScreen<Doc>),
    Message(FullScreenMessageScreen),
}

impl<Doc: Document> ActiveScreen<Doc> {
    pub fn as_reader(&self) -> Option<&ReaderScreen<Doc>> {
        match self {
            ActiveScreen::Reader(reader) => Some(reader),
            _ => None,
        }
    }

    pub fn as_file_selection(&self) -> Option<&FileSelectionScreen> {
        match self {
            ActiveScreen::FileSelection(files) => Some(files),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&FullScreenMessageScreen> {
        match self {
            ActiveScreen::Message(message) => Some(message),
            _ => None,
        }
    }
}

impl<Doc: Document> Screen for ActiveScreen<Doc> {
    fn kind(&self) -> ScreenKind {
        match self {
            ActiveScreen::BootLogo(screen) => screen.kind(),
            ActiveScreen::FileSelection(screen) => screen.kind(),
            ActiveScreen::Reader(screen) => screen.kind(),
            ActiveScreen::Message(screen) => screen.kind(),
        }
    }

    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        match self {
            ActiveScreen::BootLogo(screen) => screen.on_enter(ctx),
            ActiveScreen::FileSelection(screen) => screen.on_enter(ctx),
            ActiveScreen::Reader(screen) => screen.on_enter(ctx),
            ActiveScreen::Message(screen) => screen.on_enter(ctx),
        }
    }

    fn on_exit(&mut self) {
        match self {
            ActiveScreen::BootLogo(screen) => screen.on_exit(),
            ActiveScreen::FileSelection(screen) => screen.on_exit(),
            ActiveScreen::Reader(screen) => screen.on_exit(),
            ActiveScreen::Message(screen) => screen.on_exit(),
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> ScreenAction {
        match self {
            ActiveScreen::BootLogo(screen) => screen.handle_input(input),
            ActiveScreen::FileSelection(screen) => screen.handle_input(input),
            ActiveScreen::Reader(screen) => screen.handle_input(input),
            ActiveScreen::Message(screen) => screen.handle_input(input),
        }
    }
}
