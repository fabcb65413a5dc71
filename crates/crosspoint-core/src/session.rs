//! Top-level reader session.
//!
//! One owned context drives everything from a polling loop: it enters screens,
//! applies the transitions they request, persists which document is open and
//! runs the sleep sequence.

use std::sync::Arc;

use crate::app_state::AppState;
use crate::battery::SharedBattery;
use crate::book::BookStore;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::display::{DisplayDevice, FontStyle, RefreshMode, TextShaper};
use crate::filesystem::SharedFileSystem;
use crate::input::{Button, InputEvent, InputSource};
use crate::power::{PowerController, PowerInterface, PowerState, WakeDecision, WakeReason};
use crate::render_task::lock_unpoisoned;
use crate::renderer::SharedRenderer;
use crate::screen_manager::ScreenManager;
use crate::screens::{
    ActiveScreen, BootLogoScreen, FileSelectionScreen, FullScreenMessageScreen, ReaderScreen,
    ScreenAction, ScreenContext, ScreenKind,
};

const LOADING_TEXT: &str = "Loading...";
const LOAD_FAILED_TEXT: &str = "Failed to load document";
const SLEEPING_TEXT: &str = "Sleeping";

/// What the main loop should do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// A long power press; run the sleep sequence.
    Sleep,
}

pub struct Session<D, S, B: BookStore> {
    ctx: ScreenContext<D, S>,
    store: B,
    screens: ScreenManager<B::Doc>,
    power: PowerController,
    app_state: AppState,
}

impl<D, S, B> Session<D, S, B>
where
    D: DisplayDevice + Send + 'static,
    S: TextShaper + 'static,
    B: BookStore,
{
    pub fn new(
        config: SessionConfig,
        renderer: SharedRenderer<D, S>,
        fs: SharedFileSystem,
        battery: SharedBattery,
        store: B,
    ) -> Self {
        let power = PowerController::new(&config);
        Self {
            ctx: ScreenContext {
                renderer,
                fs,
                battery,
                config,
            },
            store,
            screens: ScreenManager::new(),
            power,
            app_state: AppState::default(),
        }
    }

    /// Full boot sequence after reset or wake.
    ///
    /// A wake from deep sleep that is not confirmed by a power hold goes
    /// straight back to sleep and never returns.
    pub fn boot<I, C, P>(&mut self, wake: WakeReason, input: &mut I, clock: &C, power: &mut P)
    where
        I: InputSource,
        C: Clock,
        P: PowerInterface,
    {
        if wake == WakeReason::PowerButton
            && self.power.confirm_wake(input, clock) == WakeDecision::Resuspend
        {
            self.power.mark_suspended();
            power.arm_wake_interrupt();
            power.enter_suspend();
        }
        self.start();
        self.wait_for_no_button(input, clock);
    }

    /// Show the logo, then reopen the last document or fall back to the library.
    pub fn start(&mut self) {
        log::info!("[STATE] Starting session");
        self.enter(ActiveScreen::BootLogo(BootLogoScreen::new()));

        self.app_state = AppState::load(&mut *lock_unpoisoned(&self.ctx.fs), &self.ctx.config.cache_root);
        if let Some(path) = self.app_state.open_document.clone() {
            if self.resume_document(&path) {
                return;
            }
        }
        self.go_home();
    }

    fn resume_document(&mut self, path: &str) -> bool {
        if !self.store.exists(path) {
            log::warn!("[STATE] Last document {} is gone", path);
            return false;
        }
        match self.store.open(path, &self.ctx.config.cache_root) {
            Ok(document) => {
                log::info!("[STATE] Resuming {}", path);
                self.enter(ActiveScreen::Reader(ReaderScreen::new(document)));
                true
            }
            Err(err) => {
                log::warn!("[STATE] Cannot reopen {}: {}", path, err);
                false
            }
        }
    }

    /// Block until every button is released, dropping the release edge.
    pub fn wait_for_no_button<I, C>(&self, input: &mut I, clock: &C)
    where
        I: InputSource,
        C: Clock,
    {
        while input.held().is_some() {
            clock.sleep_ms(self.ctx.config.input_poll_ms);
        }
        let _ = input.poll();
    }

    /// Handle one polled input.
    pub fn poll_once(&mut self, input: InputEvent) -> LoopControl {
        if input.button == Button::None {
            return LoopControl::Continue;
        }
        if self.power.should_sleep(&input) {
            log::info!("[POWER] Power held {}ms, going to sleep", input.press_duration_ms);
            return LoopControl::Sleep;
        }

        match self.screens.dispatch(input) {
            ScreenAction::None => {}
            ScreenAction::GoHome => self.go_home(),
            ScreenAction::OpenDocument(path) => self.open_document(&path),
        }
        LoopControl::Continue
    }

    /// Open `path` in the reader, showing progress and failure messages.
    pub fn open_document(&mut self, path: &str) {
        self.enter(ActiveScreen::Message(FullScreenMessageScreen::plain(LOADING_TEXT)));

        match self.store.open(path, &self.ctx.config.cache_root) {
            Ok(document) => {
                self.app_state.open_document = Some(path.to_string());
                let saved = self
                    .app_state
                    .save(&mut *lock_unpoisoned(&self.ctx.fs), &self.ctx.config.cache_root);
                if let Err(err) = saved {
                    log::warn!("[STATE] Could not save app state: {}", err);
                }
                self.enter(ActiveScreen::Reader(ReaderScreen::new(document)));
            }
            Err(err) => {
                log::error!("[BOOK] Failed to open {}: {}", path, err);
                self.enter(ActiveScreen::Message(FullScreenMessageScreen::new(
                    LOAD_FAILED_TEXT,
                    FontStyle::Regular,
                    false,
                    RefreshMode::Full,
                )));
            }
        }
    }

    pub fn go_home(&mut self) {
        self.enter(ActiveScreen::FileSelection(FileSelectionScreen::new(B::is_document)));
    }

    /// Everything short of cutting power: tear down the screen, show the
    /// sleep screen, arm the wake source and put the panel to sleep.
    pub fn prepare_sleep<C, P>(&mut self, clock: &C, power: &mut P)
    where
        C: Clock,
        P: PowerInterface,
    {
        self.power.begin_sleep();
        self.screens.exit_active();
        self.enter(ActiveScreen::Message(FullScreenMessageScreen::new(
            SLEEPING_TEXT,
            FontStyle::Bold,
            true,
            RefreshMode::Full,
        )));
        log::info!("[POWER] Entering deep sleep");
        clock.sleep_ms(self.ctx.config.sleep_flush_ms);

        power.arm_wake_interrupt();
        if let Err(err) = lock_unpoisoned(&self.ctx.renderer).hibernate() {
            log::error!("[POWER] Display hibernate failed: {}", err);
        }
        self.power.mark_suspended();
    }

    /// The main loop. Only leaves through deep sleep.
    pub fn run<I, C, P>(mut self, input: &mut I, clock: &C, power: &mut P) -> !
    where
        I: InputSource,
        C: Clock,
        P: PowerInterface,
    {
        loop {
            if self.poll_once(input.poll()) == LoopControl::Sleep {
                self.prepare_sleep(clock, power);
                power.enter_suspend();
            }
            clock.sleep_ms(self.ctx.config.input_poll_ms);
        }
    }

    fn enter(&mut self, screen: ActiveScreen<B::Doc>) {
        self.screens.enter(screen, &self.ctx);
    }

    pub fn active_kind(&self) -> Option<ScreenKind> {
        self.screens.active_kind()
    }

    pub fn active_screen(&self) -> Option<&ActiveScreen<B::Doc>> {
        self.screens.active()
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    pub fn renderer(&self) -> SharedRenderer<D, S> {
        Arc::clone(&self.ctx.renderer)
    }

    pub fn file_system(&self) -> SharedFileSystem {
        Arc::clone(&self.ctx.fs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::FixedBattery;
    use crate::display::MonoShaper;
    use crate::mock_filesystem::MockFileSystem;
    use crate::power::tests::{ManualClock, ScriptedInput};
    use crate::renderer::Renderer;
    use crate::screens::test_support::HOST_STACK_BYTES;
    use crate::test_display::{Flush, TestDisplay};
    use crate::text_book::TextBookStore;
    use std::sync::Mutex;
    use std::time::Duration;

    type TestSession = Session<TestDisplay, MonoShaper, TextBookStore>;

    #[derive(Default)]
    struct FakePower {
        armed: usize,
    }

    impl PowerInterface for FakePower {
        fn arm_wake_interrupt(&mut self) {
            self.armed += 1;
        }

        fn enter_suspend(&mut self) -> ! {
            panic!("suspended");
        }
    }

    fn session(fs: MockFileSystem) -> (TestSession, Arc<Mutex<MockFileSystem>>) {
        let fs = Arc::new(Mutex::new(fs));
        let shared: SharedFileSystem = fs.clone();
        let config = SessionConfig::default()
            .with_render_stack_bytes(HOST_STACK_BYTES)
            .without_sleep_delay();
        let session = Session::new(
            config,
            Renderer::new(TestDisplay::default_size(), MonoShaper).into_shared(),
            shared.clone(),
            Arc::new(FixedBattery(64)),
            TextBookStore::new(shared),
        );
        (session, fs)
    }

    fn library() -> MockFileSystem {
        let mut fs = MockFileSystem::new();
        fs.add_file("/moby.txt", "Call me Ishmael.\x0CLoomings");
        fs
    }

    fn press(session: &mut TestSession, button: Button) -> LoopControl {
        session.poll_once(InputEvent::press(button))
    }

    #[test]
    fn fresh_start_lands_in_library() {
        let (mut session, _) = session(library());
        session.start();
        assert_eq!(session.active_kind(), Some(ScreenKind::FileSelection));
        assert_eq!(session.app_state().open_document, None);
    }

    #[test]
    fn opening_a_document_remembers_it() {
        let (mut session, fs) = session(library());
        session.start();
        assert_eq!(press(&mut session, Button::Confirm), LoopControl::Continue);
        assert_eq!(session.active_kind(), Some(ScreenKind::Reader));
        assert_eq!(session.app_state().open_document.as_deref(), Some("/moby.txt"));

        let state = fs.lock().unwrap().contents("/.crosspoint/state.bin").map(<[u8]>::to_vec);
        let state = AppState::decode(&state.unwrap()).unwrap();
        assert_eq!(state.open_document.as_deref(), Some("/moby.txt"));
    }

    #[test]
    fn restart_resumes_last_document() {
        let (mut first, fs) = session(library());
        first.start();
        press(&mut first, Button::Confirm);
        drop(first);

        let storage = std::mem::take(&mut *fs.lock().unwrap());
        let (mut second, _) = session(storage);
        second.start();
        assert_eq!(second.active_kind(), Some(ScreenKind::Reader));
        let reader = second.active_screen().and_then(ActiveScreen::as_reader).unwrap();
        assert_eq!(reader.document_path().as_deref(), Some("/moby.txt"));
    }

    #[test]
    fn missing_last_document_falls_back_to_library() {
        let mut storage = library();
        storage.add_directory("/.crosspoint");
        let state = AppState {
            open_document: Some("/gone.txt".to_string()),
        };
        storage.add_file("/.crosspoint/state.bin", state.encode());

        let (mut session, _) = session(storage);
        session.start();
        assert_eq!(session.active_kind(), Some(ScreenKind::FileSelection));
    }

    #[test]
    fn failed_open_shows_message() {
        let (mut session, _) = session(library());
        session.start();
        session.open_document("/missing.txt");
        assert_eq!(session.active_kind(), Some(ScreenKind::Message));
        let message = session.active_screen().and_then(ActiveScreen::as_message).unwrap();
        assert_eq!(message.text(), "Failed to load document");
    }

    #[test]
    fn back_from_reader_returns_home() {
        let (mut session, _) = session(library());
        session.start();
        press(&mut session, Button::Confirm);
        press(&mut session, Button::Back);
        assert_eq!(session.active_kind(), Some(ScreenKind::FileSelection));
    }

    #[test]
    fn long_power_press_requests_sleep() {
        let (mut session, _) = session(library());
        session.start();
        assert_eq!(session.poll_once(InputEvent::NONE), LoopControl::Continue);
        assert_eq!(
            session.poll_once(InputEvent::hold(Button::Power, 900)),
            LoopControl::Continue
        );
        assert_eq!(
            session.poll_once(InputEvent::hold(Button::Power, 1500)),
            LoopControl::Sleep
        );
        assert_eq!(session.power_state(), PowerState::ConfirmingSleep);
    }

    #[test]
    fn sleep_sequence_shows_screen_and_hibernates() {
        let (mut session, _) = session(library());
        session.start();
        press(&mut session, Button::Confirm);

        let mut power = FakePower::default();
        session.prepare_sleep(&ManualClock::new(), &mut power);

        assert_eq!(power.armed, 1);
        assert_eq!(session.power_state(), PowerState::Suspended);
        assert_eq!(session.active_kind(), Some(ScreenKind::Message));
        let renderer = session.renderer();
        let renderer = renderer.lock().unwrap();
        assert!(renderer.display().is_hibernated());
        assert_eq!(renderer.display().last_flush(), Some(Flush::Full));
    }

    #[test]
    fn confirmed_wake_boots_after_release() {
        let (mut session, _) = session(library());
        let mut input = ScriptedInput::default();
        input.holds = (0..=20).map(|i| Some((Button::Power, i * 50))).collect();
        // Still held after confirmation, then released
        input.holds.push_back(Some((Button::Power, 1100)));
        input.events.push_back(InputEvent::hold(Button::Power, 1150));

        let mut power = FakePower::default();
        session.boot(WakeReason::PowerButton, &mut input, &ManualClock::new(), &mut power);
        assert_eq!(session.active_kind(), Some(ScreenKind::FileSelection));
        assert_eq!(power.armed, 0);
        // The release edge was consumed, not treated as a sleep request
        assert!(input.events.is_empty());
    }

    #[test]
    #[should_panic(expected = "suspended")]
    fn unconfirmed_wake_goes_back_to_sleep() {
        let (mut session, _) = session(library());
        let mut input = ScriptedInput::default();
        let mut power = FakePower::default();
        session.boot(WakeReason::PowerButton, &mut input, &ManualClock::new(), &mut power);
    }

    #[test]
    fn file_list_renders_after_start() {
        let (mut session, _) = session(library());
        session.start();
        let files = session.active_screen().and_then(ActiveScreen::as_file_selection).unwrap();
        assert!(files.wait_until_idle(Duration::from_secs(5)));
        let renderer = session.renderer();
        let renderer = renderer.lock().unwrap();
        assert_eq!(renderer.display().last_flush(), Some(Flush::Partial));
    }
}
