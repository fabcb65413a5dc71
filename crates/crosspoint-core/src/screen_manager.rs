//! Owns the single active screen.

use crate::book::Document;
use crate::display::{DisplayDevice, TextShaper};
use crate::input::InputEvent;
use crate::screens::{ActiveScreen, Screen, ScreenAction, ScreenContext, ScreenKind};

/// Exactly one screen is active at a time once the first one is entered.
///
/// Switching always exits the outgoing screen (stopping its render task)
/// before the incoming one is entered.
pub struct ScreenManager<Doc: Document> {
    active: Option<ActiveScreen<Doc>>,
}

impl<Doc: Document> Default for ScreenManager<Doc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Doc: Document> ScreenManager<Doc> {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Replace the active screen with `screen` and enter it.
    ///
    /// An entry failure is logged; the screen stays installed so input and
    /// sleep keep working.
    pub fn enter<D, S>(&mut self, mut screen: ActiveScreen<Doc>, ctx: &ScreenContext<D, S>)
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        self.exit_active();
        log::info!("[SCREEN] Entering {:?}", screen.kind());
        if let Err(err) = screen.on_enter(ctx) {
            log::error!("[SCREEN] {:?} failed to enter: {}", screen.kind(), err);
        }
        self.active = Some(screen);
    }

    /// Exit and drop the active screen, if any.
    pub fn exit_active(&mut self) {
        if let Some(mut screen) = self.active.take() {
            log::debug!("[SCREEN] Exiting {:?}", screen.kind());
            screen.on_exit();
        }
    }

    pub fn dispatch(&mut self, input: InputEvent) -> ScreenAction {
        match self.active.as_mut() {
            Some(screen) => screen.handle_input(input),
            None => ScreenAction::None,
        }
    }

    pub fn active_kind(&self) -> Option<ScreenKind> {
        self.active.as_ref().map(Screen::kind)
    }

    pub fn active(&self) -> Option<&ActiveScreen<Doc>> {
        self.active.as_ref()
    }
}
