//! Host-side scenario test harness for scripted reader sessions.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crosspoint_core::screens::ActiveScreen;
use crosspoint_core::test_display::{Flush, TestDisplay};
use crosspoint_core::{
    Button, FixedBattery, InputEvent, LoopControl, MockFileSystem, MonoShaper, Renderer,
    ScreenKind, Session, SessionConfig, SharedFileSystem, TextBookStore,
};
use embedded_graphics::pixelcolor::BinaryColor;
use image::GrayImage;

/// Set to a directory to have [`ScenarioHarness::capture`] write PNGs there.
pub const CAPTURE_DIR_ENV: &str = "SCENARIO_CAPTURE_DIR";

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const HOST_RENDER_STACK: usize = 512 * 1024;

pub type HarnessSession = Session<TestDisplay, MonoShaper, TextBookStore>;

/// Couples a session, its mock filesystem and the test display.
pub struct ScenarioHarness {
    session: HarnessSession,
    fs: Arc<Mutex<MockFileSystem>>,
}

impl ScenarioHarness {
    /// Harness over `fs` with device timings, a fast render tick and no sleep delay.
    pub fn new(fs: MockFileSystem) -> Self {
        let mut config = SessionConfig::default()
            .with_render_stack_bytes(HOST_RENDER_STACK)
            .without_sleep_delay();
        config.render_tick = Duration::from_millis(1);
        Self::with_config(fs, config, 100)
    }

    pub fn with_config(fs: MockFileSystem, config: SessionConfig, battery_percent: u8) -> Self {
        let fs = Arc::new(Mutex::new(fs));
        let shared: SharedFileSystem = fs.clone();
        let session = Session::new(
            config,
            Renderer::new(TestDisplay::default_size(), MonoShaper).into_shared(),
            shared.clone(),
            Arc::new(FixedBattery(battery_percent)),
            TextBookStore::new(shared),
        );
        Self { session, fs }
    }

    /// Run the boot flow and wait for the first screen to draw.
    pub fn start(&mut self) {
        self.session.start();
        self.settle();
    }

    /// Simulate a short press and wait for the resulting redraw.
    pub fn press(&mut self, button: Button) -> LoopControl {
        self.send(InputEvent::press(button))
    }

    /// Simulate a press released after `duration_ms`.
    pub fn hold(&mut self, button: Button, duration_ms: u32) -> LoopControl {
        self.send(InputEvent::hold(button, duration_ms))
    }

    fn send(&mut self, event: InputEvent) -> LoopControl {
        let control = self.session.poll_once(event);
        self.settle();
        control
    }

    /// Block until the active screen's render task has drawn everything requested.
    pub fn settle(&self) {
        let idle = match self.session.active_screen() {
            Some(ActiveScreen::Reader(reader)) => reader.wait_until_idle(SETTLE_TIMEOUT),
            Some(ActiveScreen::FileSelection(files)) => files.wait_until_idle(SETTLE_TIMEOUT),
            _ => true,
        };
        assert!(idle, "render task did not settle");
    }

    pub fn session(&self) -> &HarnessSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut HarnessSession {
        &mut self.session
    }

    pub fn screen(&self) -> Option<ScreenKind> {
        self.session.active_kind()
    }

    /// `(spine index, page)` while reading.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.session
            .active_screen()
            .and_then(ActiveScreen::as_reader)
            .and_then(|reader| reader.position())
    }

    /// Names listed by the file browser, in display order.
    pub fn listed_names(&self) -> Vec<String> {
        self.session
            .active_screen()
            .and_then(ActiveScreen::as_file_selection)
            .and_then(|files| files.listing())
            .map(|listing| listing.entries.into_iter().map(|entry| entry.name).collect())
            .unwrap_or_default()
    }

    /// Run `f` against the display framebuffer.
    pub fn with_display<R>(&self, f: impl FnOnce(&TestDisplay) -> R) -> R {
        let renderer = self.session.renderer();
        let guard = renderer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(guard.display())
    }

    pub fn flushes(&self) -> Vec<Flush> {
        self.with_display(|display| display.flushes().to_vec())
    }

    pub fn black_pixel_count(&self) -> usize {
        self.with_display(TestDisplay::black_pixel_count)
    }

    /// Access the mock filesystem for setup and assertions.
    pub fn with_fs<R>(&self, f: impl FnOnce(&mut MockFileSystem) -> R) -> R {
        let mut guard = self.fs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Tear the session down and hand back its storage, as a reboot would.
    pub fn into_storage(self) -> MockFileSystem {
        let Self { session, fs } = self;
        drop(session);
        let mut guard = fs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Save the current framebuffer to a PNG (white = Off, black = On).
    pub fn save_screenshot_png(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let image = self.with_display(|display| {
            let (width, height) = display.dimensions();
            let data = display
                .pixels()
                .iter()
                .map(|pixel| match pixel {
                    BinaryColor::On => 0u8,
                    BinaryColor::Off => 255u8,
                })
                .collect();
            GrayImage::from_raw(width, height, data)
        });
        let image = image.ok_or_else(|| "framebuffer size mismatch".to_string())?;
        image.save(path).map_err(|e| e.to_string())
    }

    /// Save a screenshot named `name` when [`CAPTURE_DIR_ENV`] is set.
    pub fn capture(&self, name: &str) {
        let Ok(dir) = std::env::var(CAPTURE_DIR_ENV) else {
            return;
        };
        let path = Path::new(&dir).join(format!("{}.png", name));
        if let Err(err) = self.save_screenshot_png(&path) {
            log::warn!("[SCREEN] Screenshot {} failed: {}", path.display(), err);
        }
    }
}
