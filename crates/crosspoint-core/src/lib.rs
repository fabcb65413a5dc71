//! Session core for the CrossPoint e-ink reader.
//!
//! Owns the active screen, the per-screen background render loop, the reading
//! cursor inside a multi-chapter document, the full/partial refresh policy,
//! progress persistence and plain-text layout. Hardware is reached only through
//! the traits in [`display`], [`input`], [`power`], [`battery`] and
//! [`filesystem`], so the whole core runs on a desktop host under test.

#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::unreachable,
        clippy::unwrap_used
    )
)]

pub mod app_state;
pub mod battery;
pub mod book;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod filesystem;
pub mod input;
pub mod layout;
pub mod mock_filesystem;
pub mod pagination;
pub mod power;
pub mod progress;
pub mod refresh;
pub mod render_task;
pub mod renderer;
pub mod screen_manager;
pub mod screens;
pub mod session;
pub mod test_display;
pub mod text_book;

pub use app_state::AppState;
pub use battery::{BatteryGauge, FixedBattery, SharedBattery};
pub use book::{BookStore, Document, Section, TocEntry};
pub use clock::{Clock, SystemClock};
pub use config::SessionConfig;
pub use display::{DisplayDevice, FontRole, FontStyle, MonoShaper, RefreshMode, TextShaper};
pub use error::ReaderError;
pub use filesystem::{FileInfo, FileSystem, FileSystemError, SharedFileSystem};
pub use input::{Button, InputEvent, InputSource, PressTracker};
pub use mock_filesystem::MockFileSystem;
pub use pagination::{Navigation, PageTarget, PaginationController};
pub use power::{PowerController, PowerInterface, PowerState, WakeDecision, WakeReason};
pub use progress::PersistedProgress;
pub use refresh::RefreshScheduler;
pub use render_task::{RenderRequest, RenderTask};
pub use renderer::{Renderer, SharedRenderer};
pub use screen_manager::ScreenManager;
pub use screens::{ScreenAction, ScreenContext, ScreenKind};
pub use session::{LoopControl, Session};
pub use text_book::TextBookStore;

/// Portrait panel width of the Xteink X4.
pub const DISPLAY_WIDTH: u32 = 480;
/// Portrait panel height of the Xteink X4.
pub const DISPLAY_HEIGHT: u32 = 800;
