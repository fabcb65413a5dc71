//! Display device and text shaping contracts.
//!
//! Pixels go through `embedded-graphics`, so every draw primitive (text, lines,
//! rectangles, circles, raw bitmaps) works against any [`DisplayDevice`]. The
//! device adds the e-ink specific flush operations on top.

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X13, FONT_6X13_BOLD, FONT_9X18, FONT_9X18_BOLD},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};

/// E-ink update mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Slow, flashes the panel, clears ghosting.
    Full,
    /// Fast, accumulates ghosting.
    Partial,
}

/// A monochrome panel with an off-screen frame that is pushed on flush.
pub trait DisplayDevice: DrawTarget<Color = BinaryColor> + OriginDimensions {
    /// Push the whole frame to the panel.
    fn flush(&mut self, mode: RefreshMode) -> Result<(), Self::Error>;

    /// Push only the given window of the frame with a partial update.
    fn flush_region(&mut self, x: u32, y: u32, width: u32, height: u32)
        -> Result<(), Self::Error>;

    /// Put the panel controller into its lowest power state.
    fn hibernate(&mut self) -> Result<(), Self::Error>;
}

/// Which font a piece of text is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    /// Body text of the book.
    Reader,
    /// Titles, menus and messages.
    Ui,
    /// Status bar.
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
}

/// Glyph metrics and drawing.
pub trait TextShaper: Send {
    /// Rendered width of `text` in pixels.
    fn text_width(&self, text: &str, role: FontRole, style: FontStyle) -> u32;

    /// Vertical advance between two lines.
    fn line_height(&self, role: FontRole) -> u32;

    /// Draw `text` with its top-left corner at `top_left`.
    fn draw_text<D>(
        &self,
        target: &mut D,
        top_left: Point,
        text: &str,
        role: FontRole,
        style: FontStyle,
        color: BinaryColor,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>;
}

/// Shaper over the built-in `embedded-graphics` ASCII mono fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoShaper;

impl MonoShaper {
    fn font(role: FontRole, style: FontStyle) -> &'static MonoFont<'static> {
        match (role, style) {
            (FontRole::Reader, FontStyle::Regular) => &FONT_9X18,
            (FontRole::Reader, FontStyle::Bold) => &FONT_9X18_BOLD,
            (FontRole::Ui, _) => &FONT_10X20,
            (FontRole::Small, FontStyle::Regular) => &FONT_6X13,
            (FontRole::Small, FontStyle::Bold) => &FONT_6X13_BOLD,
        }
    }
}

impl TextShaper for MonoShaper {
    fn text_width(&self, text: &str, role: FontRole, style: FontStyle) -> u32 {
        let font = Self::font(role, style);
        let count = text.chars().count() as u32;
        if count == 0 {
            return 0;
        }
        count * font.character_size.width + (count - 1) * font.character_spacing
    }

    fn line_height(&self, role: FontRole) -> u32 {
        Self::font(role, FontStyle::Regular).character_size.height
    }

    fn draw_text<D>(
        &self,
        target: &mut D,
        top_left: Point,
        text: &str,
        role: FontRole,
        style: FontStyle,
        color: BinaryColor,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let text_style = MonoTextStyle::new(Self::font(role, style), color);
        Text::with_baseline(text, top_left, text_style, Baseline::Top).draw(target)?;
        Ok(())
    }
}
