use embedded_graphics::pixelcolor::BinaryColor;

use super::{Screen, ScreenContext, ScreenKind};
use crate::display::{DisplayDevice, FontRole, FontStyle, RefreshMode, TextShaper};
use crate::error::ReaderError;
use crate::render_task::lock_unpoisoned;

const LOGO_SIZE: u32 = 128;
const LOGO_BYTES: usize = (LOGO_SIZE * LOGO_SIZE / 8) as usize;
const BAR_WIDTH: u32 = 25;
const BAR_START: u32 = (LOGO_SIZE - BAR_WIDTH) / 2;
const BAR_INSET: u32 = 16;
const PRODUCT_NAME: &str = "CrossPoint";

/// Framed cross mark, 128x128, packed one bit per pixel.
const LOGO: [u8; LOGO_BYTES] = logo_bitmap();

const fn on_frame(x: u32, y: u32, inset: u32) -> bool {
    let far = LOGO_SIZE - 1 - inset;
    let along_x = x >= inset && x <= far;
    let along_y = y >= inset && y <= far;
    (along_x && (y == inset || y == far)) || (along_y && (x == inset || x == far))
}

const fn on_bar(across: u32, along: u32) -> bool {
    across >= BAR_START
        && across < BAR_START + BAR_WIDTH
        && along >= BAR_INSET
        && along < LOGO_SIZE - BAR_INSET
}

const fn logo_bitmap() -> [u8; LOGO_BYTES] {
    let mut bits = [0u8; LOGO_BYTES];
    let mut y = 0;
    while y < LOGO_SIZE {
        let mut x = 0;
        while x < LOGO_SIZE {
            if on_frame(x, y, 0) || on_frame(x, y, 4) || on_bar(x, y) || on_bar(y, x) {
                bits[((y * LOGO_SIZE + x) / 8) as usize] |= 0x80u8 >> (x % 8);
            }
            x += 1;
        }
        y += 1;
    }
    bits
}

/// Logo shown while the session restores state.
#[derive(Debug, Default)]
pub struct BootLogoScreen;

impl BootLogoScreen {
    pub fn new() -> Self {
        Self
    }
}

impl Screen for BootLogoScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::BootLogo
    }

    fn on_enter<D, S>(&mut self, ctx: &ScreenContext<D, S>) -> Result<(), ReaderError>
    where
        D: DisplayDevice + Send + 'static,
        S: TextShaper + 'static,
    {
        let mut renderer = lock_unpoisoned(&ctx.renderer);
        let x = (renderer.width() as i32 - LOGO_SIZE as i32) / 2;
        let y = (renderer.height() as i32 - LOGO_SIZE as i32) / 2;

        renderer.clear()?;
        renderer.draw_image(x, y, LOGO_SIZE, &LOGO)?;

        renderer.draw_centered_text(
            y + LOGO_SIZE as i32 + 24,
            PRODUCT_NAME,
            FontRole::Ui,
            FontStyle::Bold,
            BinaryColor::On,
        )?;
        renderer.flush(RefreshMode::Full)?;
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
    fn logo_is_centered_with_full_refresh() {
        let (ctx, _) = context(MockFileSystem::new());
        BootLogoScreen::new().on_enter(&ctx).unwrap();

        let renderer = ctx.renderer.lock().unwrap();
        let display = renderer.display();
        // Outer frame corners at (176, 336) and (303, 463)
        assert_eq!(display.pixel(176, 336), Some(BinaryColor::On));
        assert_eq!(display.pixel(303, 463), Some(BinaryColor::On));
        // Gap between the two frames, then the cross centre
        assert_eq!(display.pixel(178, 338), Some(BinaryColor::Off));
        assert_eq!(display.pixel(180, 340), Some(BinaryColor::On));
        assert_eq!(display.pixel(240, 400), Some(BinaryColor::On));
        assert_eq!(display.pixel(190, 350), Some(BinaryColor::Off));
        assert_eq!(display.black_pixel_count_in(0, 0, 480, 336), 0);
        assert_eq!(display.black_pixel_count_in(0, 336, 176, 464), 0);
        assert_eq!(display.last_flush(), Some(Flush::Full));
    }
}
