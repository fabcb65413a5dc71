//! Full vs partial refresh policy.
//!
//! Partial updates are fast but leave ghosting on the e-ink panel. Every
//! `period` pages the reader pays for one full refresh to clear it.

use crate::config::PAGES_PER_FULL_REFRESH;
use crate::display::RefreshMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshScheduler {
    period: u32,
    pages_until_full_refresh: u32,
}

impl RefreshScheduler {
    /// A scheduler whose first request is a full refresh.
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            pages_until_full_refresh: 0,
        }
    }

    /// Decide the mode for the next page and update the countdown.
    ///
    /// Full when the countdown is at or below one, which also resets it to the
    /// period. Otherwise the countdown is decremented.
    pub fn should_full_refresh(&mut self) -> bool {
        if self.pages_until_full_refresh <= 1 {
            self.pages_until_full_refresh = self.period;
            true
        } else {
            self.pages_until_full_refresh -= 1;
            false
        }
    }

    pub fn next_mode(&mut self) -> RefreshMode {
        if self.should_full_refresh() {
            RefreshMode::Full
        } else {
            RefreshMode::Partial
        }
    }

    pub fn pages_until_full_refresh(&self) -> u32 {
        self.pages_until_full_refresh
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(PAGES_PER_FULL_REFRESH)
    }
}
