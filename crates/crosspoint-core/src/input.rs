//! Button input abstraction.

/// Physical device buttons (directly maps to hardware)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    /// No button activity this tick.
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Back,
    // GPIO3 (digital, active LOW)
    Power,
    // Side keys on the second ADC ladder
    VolumeUp,
    VolumeDown,
}

/// One poll tick worth of input.
///
/// Only the latest event matters; nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    pub button: Button,
    pub press_duration_ms: u32,
}

impl InputEvent {
    pub const NONE: InputEvent = InputEvent {
        button: Button::None,
        press_duration_ms: 0,
    };

    /// A short tap of `button`.
    pub const fn press(button: Button) -> Self {
        Self {
            button,
            press_duration_ms: 0,
        }
    }

    /// A press of `button` that was held for `duration_ms` before release.
    pub const fn hold(button: Button, duration_ms: u32) -> Self {
        Self {
            button,
            press_duration_ms: duration_ms,
        }
    }

    pub fn is_none(&self) -> bool {
        self.button == Button::None
    }
}

/// Source of button events. Polled by the main loop, never pushed.
pub trait InputSource {
    /// The most recent release edge, or [`InputEvent::NONE`].
    fn poll(&mut self) -> InputEvent;

    /// The button currently held down and how long it has been held.
    fn held(&mut self) -> Option<(Button, u32)>;
}

/// Turns per-tick button samples into release edges and hold durations.
///
/// Hardware drivers sample whichever button is down and feed it here; only
/// the latest release is kept.
#[derive(Debug, Default)]
pub struct PressTracker {
    down: Option<(Button, u64)>,
    released: InputEvent,
}

impl PressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the button seen at `now_ms`, or `None` when nothing is pressed.
    pub fn update(&mut self, sample: Option<Button>, now_ms: u64) {
        let sample = sample.filter(|button| *button != Button::None);
        if let (Some((button, _)), Some(seen)) = (self.down, sample) {
            if button == seen {
                return;
            }
        }
        if let Some((button, since)) = self.down.take() {
            self.released = InputEvent::hold(button, elapsed_ms(since, now_ms));
        }
        self.down = sample.map(|button| (button, now_ms));
    }

    /// The most recent release, consumed.
    pub fn take_release(&mut self) -> InputEvent {
        core::mem::replace(&mut self.released, InputEvent::NONE)
    }

    pub fn held(&self, now_ms: u64) -> Option<(Button, u32)> {
        self.down
            .map(|(button, since)| (button, elapsed_ms(since, now_ms)))
    }
}

fn elapsed_ms(since: u64, now_ms: u64) -> u32 {
    u32::try_from(now_ms.saturating_sub(since)).unwrap_or(u32::MAX)
}
