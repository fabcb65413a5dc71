use embedded_graphics::pixelcolor::BinaryColor;

use super::{Screen, ScreenContext, ScreenKind};
use crate::display::{DisplayDevice, FontRole, FontStyle, RefreshMode, TextShaper};
use crate::error::ReaderError;
use crate::render_task::lock_unpoisoned;
use crate::renderer::MARGIN_TOP;

/// A single centered line of text, drawn once on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullScreenMessageScreen {
    text: String,
    style: FontStyle,
    invert: bool,
    refresh: RefreshMode,
}

impl FullScreenMessageScreen {
    pub fn new(text: impl Into<String>, style: FontStyle, invert: bool, refresh: RefreshMode) -> Self {
        Self {
            text: text.into(),
            style,
            invert,
            refresh,
        }
    }

    /// Regular weight, black on white, partial refresh.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, FontStyle::Regular, false, RefreshMode::Partial)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Screen for FullScreenMessageScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Message
    }

    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        let (background, foreground) = if self.invert {
            (BinaryColor::On, BinaryColor::Off)
        } else {
            (BinaryColor::Off, BinaryColor::On)
        };

        let mut renderer = lock_unpoisoned(&ctx.renderer);
        let (width, height) = (renderer.width(), renderer.height());
        let top = MARGIN_TOP as i32
            + (renderer.page_height() as i32 - renderer.line_height(FontRole::Ui) as i32) / 2;

        renderer.fill_rect(0, 0, width, height, background)?;
        renderer.draw_centered_text(top, &self.text, FontRole::Ui, self.style, foreground)?;
        renderer.flush(self.refresh)?;
        log::info!("[SCREEN] Message: {}", self.text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_filesystem::MockFileSystem;
    use crate::screens::test_support::context;
    use crate::test_display::Flush;

    #[test]
    fn inverted_message_fills_panel_black() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut screen = FullScreenMessageScreen::new("Sleeping", FontStyle::Bold, true, RefreshMode::Full);
        screen.on_enter(&ctx).unwrap();

        let renderer = ctx.renderer.lock().unwrap();
        let display = renderer.display();
        assert_eq!(display.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(display.pixel(479, 799), Some(BinaryColor::On));
        assert!(display.black_pixel_count() < 480 * 800);
        assert_eq!(display.last_flush(), Some(Flush::Full));
    }

    #[test]
    fn plain_message_is_centered_and_partial() {
        let (ctx, _) = context(MockFileSystem::new());
        let mut screen = FullScreenMessageScreen::plain("Loading...");
        screen.on_enter(&ctx).unwrap();

        let renderer = ctx.renderer.lock().unwrap();
        let display = renderer.display();
        assert!(display.black_pixel_count() > 0);
        assert_eq!(display.black_pixel_count_in(0, 0, 480, 370), 0);
        assert_eq!(display.black_pixel_count_in(0, 410, 480, 800), 0);
        assert_eq!(display.last_flush(), Some(Flush::Partial));
    }
}
