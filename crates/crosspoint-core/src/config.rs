//! Session tunables.
//!
//! Every timing threshold and path the session uses lives here so the firmware
//! and host harness can share one set of defaults.

use core::time::Duration;

/// Pages rendered between two full refreshes.
pub const PAGES_PER_FULL_REFRESH: u32 = 10;
/// Hold duration after which a page-turn press becomes a chapter skip.
pub const SKIP_CHAPTER_MS: u32 = 700;
/// Continuous power hold required to finish waking up.
pub const POWER_BUTTON_WAKEUP_MS: u32 = 1000;
/// Time allowed after wake-up for the power hold to start.
pub const WAKE_GRACE_MS: u32 = 1000;
/// Power hold after which the device goes to sleep.
pub const POWER_BUTTON_SLEEP_MS: u32 = 1000;
/// Delay between showing the sleep screen and cutting power.
pub const SLEEP_FLUSH_MS: u32 = 1000;
pub const RENDER_TICK_MS: u64 = 10;
pub const INPUT_POLL_MS: u32 = 50;
/// Stack for each background render thread. Layout and file I/O both run on it.
pub const RENDER_TASK_STACK_BYTES: usize = 32 * 1024;
pub const CACHE_ROOT: &str = "/.crosspoint";
pub const LIBRARY_ROOT: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub pages_per_full_refresh: u32,
    pub skip_chapter_ms: u32,
    pub wake_hold_ms: u32,
    pub wake_grace_ms: u32,
    pub sleep_hold_ms: u32,
    pub sleep_flush_ms: u32,
    pub render_tick: Duration,
    pub input_poll_ms: u32,
    pub render_stack_bytes: usize,
    pub cache_root: String,
    pub library_root: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pages_per_full_refresh: PAGES_PER_FULL_REFRESH,
            skip_chapter_ms: SKIP_CHAPTER_MS,
            wake_hold_ms: POWER_BUTTON_WAKEUP_MS,
            wake_grace_ms: WAKE_GRACE_MS,
            sleep_hold_ms: POWER_BUTTON_SLEEP_MS,
            sleep_flush_ms: SLEEP_FLUSH_MS,
            render_tick: Duration::from_millis(RENDER_TICK_MS),
            input_poll_ms: INPUT_POLL_MS,
            render_stack_bytes: RENDER_TASK_STACK_BYTES,
            cache_root: CACHE_ROOT.to_string(),
            library_root: LIBRARY_ROOT.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_library_root(mut self, root: impl Into<String>) -> Self {
        self.library_root = root.into();
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<String>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Host threads need more headroom than the device's render task.
    pub fn with_render_stack_bytes(mut self, bytes: usize) -> Self {
        self.render_stack_bytes = bytes;
        self
    }

    /// Skip the sleep-screen grace delay. Host harnesses use this.
    pub fn without_sleep_delay(mut self) -> Self {
        self.sleep_flush_ms = 0;
        self
    }
}
