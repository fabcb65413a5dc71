//! Wake confirmation and sleep entry.
//!
//! A press of the power button wakes the chip from deep sleep, but the device
//! only finishes booting if the button is held long enough. During normal use a
//! long power press puts it back to sleep. Sleeping is a full teardown: nothing
//! resumes afterwards, the next boot restores from persisted state.

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::input::{Button, InputEvent, InputSource};

/// Hardware hooks for deep sleep.
pub trait PowerInterface {
    /// Arm the power button as the wake-up source.
    fn arm_wake_interrupt(&mut self);

    /// Enter deep sleep. Never returns; the chip resets on wake.
    fn enter_suspend(&mut self) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Power-on or reset, nothing to confirm.
    ColdBoot,
    /// Woken from deep sleep by the power button.
    PowerButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Awake,
    ConfirmingWake,
    ConfirmingSleep,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeDecision {
    /// Hold confirmed, continue booting.
    Boot,
    /// Accidental press, go straight back to sleep.
    Resuspend,
}

pub struct PowerController {
    state: PowerState,
    wake_hold_ms: u32,
    wake_grace_ms: u32,
    sleep_hold_ms: u32,
    poll_ms: u32,
}

impl PowerController {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: PowerState::Awake,
            wake_hold_ms: config.wake_hold_ms,
            wake_grace_ms: config.wake_grace_ms,
            sleep_hold_ms: config.sleep_hold_ms,
            poll_ms: config.input_poll_ms,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Decide whether a wake from deep sleep was intentional.
    ///
    /// The power button must be seen held within the grace window and kept
    /// held for the full confirmation time. Releasing early, or never pressing
    /// within the window, means resuspend.
    pub fn confirm_wake<I, C>(&mut self, input: &mut I, clock: &C) -> WakeDecision
    where
        I: InputSource,
        C: Clock,
    {
        self.state = PowerState::ConfirmingWake;
        let started = clock.now_ms();
        let mut power_seen = false;

        loop {
            match input.held() {
                Some((Button::Power, held_ms)) => {
                    power_seen = true;
                    if held_ms >= self.wake_hold_ms {
                        log::info!("[POWER] Wake confirmed after {}ms hold", held_ms);
                        self.state = PowerState::Awake;
                        return WakeDecision::Boot;
                    }
                }
                _ if power_seen => {
                    log::info!("[POWER] Power released before wake confirmation");
                    return WakeDecision::Resuspend;
                }
                _ => {
                    if clock.now_ms().saturating_sub(started) >= u64::from(self.wake_grace_ms) {
                        log::info!("[POWER] No power hold after wake");
                        return WakeDecision::Resuspend;
                    }
                }
            }
            clock.sleep_ms(self.poll_ms);
        }
    }

    /// Whether `event` is a power press long enough to go to sleep.
    ///
    /// Moves to `ConfirmingSleep` when it is.
    pub fn should_sleep(&mut self, event: &InputEvent) -> bool {
        if event.button == Button::Power && event.press_duration_ms > self.sleep_hold_ms {
            self.begin_sleep();
            true
        } else {
            false
        }
    }

    pub fn begin_sleep(&mut self) {
        self.state = PowerState::ConfirmingSleep;
    }

    pub fn mark_suspended(&mut self) {
        self.state = PowerState::Suspended;
    }
}
