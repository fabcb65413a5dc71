//! Drawing facade used by every screen.
//!
//! Wraps a [`DisplayDevice`] and a [`TextShaper`] and works in portrait panel
//! coordinates. Book pages are laid out inside fixed margins.

use std::sync::{Arc, Mutex};

use embedded_graphics::{
    image::{Image, ImageRaw},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
};

use crate::display::{DisplayDevice, FontRole, FontStyle, RefreshMode, TextShaper};
use crate::error::ReaderError;
use crate::layout::layout_text_box;

pub const MARGIN_TOP: u32 = 11;
pub const MARGIN_BOTTOM: u32 = 30;
pub const MARGIN_LEFT: u32 = 10;
pub const MARGIN_RIGHT: u32 = 10;

/// Renderer shared between the input loop and render threads.
pub type SharedRenderer<D, S> = Arc<Mutex<Renderer<D, S>>>;

pub struct Renderer<D, S> {
    display: D,
    shaper: S,
}

impl<D, S> Renderer<D, S>
where
    D: DisplayDevice,
    S: TextShaper,
{
    pub fn new(display: D, shaper: S) -> Self {
        Self { display, shaper }
    }

    pub fn into_shared(self) -> SharedRenderer<D, S> {
        Arc::new(Mutex::new(self))
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn width(&self) -> u32 {
        self.display.size().width
    }

    pub fn height(&self) -> u32 {
        self.display.size().height
    }

    /// Width of the book text area.
    pub fn page_width(&self) -> u32 {
        self.width().saturating_sub(MARGIN_LEFT + MARGIN_RIGHT)
    }

    /// Height of the book text area.
    pub fn page_height(&self) -> u32 {
        self.height().saturating_sub(MARGIN_TOP + MARGIN_BOTTOM)
    }

    pub fn text_width(&self, text: &str, role: FontRole, style: FontStyle) -> u32 {
        self.shaper.text_width(text, role, style)
    }

    pub fn line_height(&self, role: FontRole) -> u32 {
        self.shaper.line_height(role)
    }

    /// Fill the frame with white.
    pub fn clear(&mut self) -> Result<(), ReaderError> {
        self.display
            .clear(BinaryColor::Off)
            .map_err(|_| ReaderError::Display)
    }

    pub fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        role: FontRole,
        style: FontStyle,
        color: BinaryColor,
    ) -> Result<(), ReaderError> {
        self.shaper
            .draw_text(&mut self.display, Point::new(x, y), text, role, style, color)
            .map_err(|_| ReaderError::Display)
    }

    /// Draw `text` horizontally centered on the panel with its top at `y`.
    pub fn draw_centered_text(
        &mut self,
        y: i32,
        text: &str,
        role: FontRole,
        style: FontStyle,
        color: BinaryColor,
    ) -> Result<(), ReaderError> {
        let text_width = self.text_width(text, role, style) as i32;
        let x = (self.width() as i32 - text_width) / 2;
        self.draw_text(x, y, text, role, style, color)
    }

    pub fn draw_line(
        &mut self,
        from: (i32, i32),
        to: (i32, i32),
        color: BinaryColor,
    ) -> Result<(), ReaderError> {
        Line::new(Point::new(from.0, from.1), Point::new(to.0, to.1))
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(&mut self.display)
            .map_err(|_| ReaderError::Display)
    }

    /// One pixel outline.
    pub fn draw_rect(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: BinaryColor,
    ) -> Result<(), ReaderError> {
        Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(&mut self.display)
            .map_err(|_| ReaderError::Display)
    }

    pub fn fill_rect(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: BinaryColor,
    ) -> Result<(), ReaderError> {
        Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut self.display)
            .map_err(|_| ReaderError::Display)
    }

    /// Draw a packed 1-bit bitmap, most significant bit first, set bits black.
    ///
    /// Rows are `width` pixels padded to whole bytes.
    pub fn draw_image(&mut self, x: i32, y: i32, width: u32, bytes: &[u8]) -> Result<(), ReaderError> {
        if width == 0 || bytes.is_empty() {
            return Ok(());
        }
        let raw = ImageRaw::<BinaryColor>::new(bytes, width);
        Image::new(&raw, Point::new(x, y))
            .draw(&mut self.display)
            .map_err(|_| ReaderError::Display)
    }

    /// Lay `text` out in the given box and draw it. Returns the bytes placed.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_box(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        text: &str,
        role: FontRole,
        style: FontStyle,
    ) -> Result<usize, ReaderError> {
        let shaper = &self.shaper;
        let layout = layout_text_box(text, width, height, shaper.line_height(role), |s| {
            shaper.text_width(s, role, style)
        });
        for line in &layout.lines {
            self.shaper
                .draw_text(
                    &mut self.display,
                    Point::new(x, y + line.y as i32),
                    line.text,
                    role,
                    style,
                    BinaryColor::On,
                )
                .map_err(|_| ReaderError::Display)?;
        }
        Ok(layout.consumed)
    }

    /// Draw book text inside the page margins.
    pub fn draw_page_text(&mut self, text: &str) -> Result<usize, ReaderError> {
        let (width, height) = (self.page_width(), self.page_height());
        self.draw_text_box(
            MARGIN_LEFT as i32,
            MARGIN_TOP as i32,
            width,
            height,
            text,
            FontRole::Reader,
            FontStyle::Regular,
        )
    }

    pub fn flush(&mut self, mode: RefreshMode) -> Result<(), ReaderError> {
        self.display.flush(mode).map_err(|_| ReaderError::Display)
    }

    pub fn flush_region(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), ReaderError> {
        self.display
            .flush_region(x, y, width, height)
            .map_err(|_| ReaderError::Display)
    }

    pub fn hibernate(&mut self) -> Result<(), ReaderError> {
        self.display.hibernate().map_err(|_| ReaderError::Display)
    }
}
