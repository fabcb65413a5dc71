//! Test display that allows pixel overdraw.
//!
//! `MockDisplay` from embedded-graphics panics when a pixel is drawn twice,
//! which doesn't work for screens that clear backgrounds then draw on top.
//! This framebuffer also records every flush so tests can check refresh modes.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

use crate::display::{DisplayDevice, RefreshMode};

/// A flush the display received, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    Full,
    Partial,
    Region {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Simple framebuffer display for tests that allows overdraw.
pub struct TestDisplay {
    pixels: Vec<BinaryColor>,
    width: u32,
    height: u32,
    flushes: Vec<Flush>,
    hibernated: bool,
}

impl TestDisplay {
    /// Create a new test display with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![BinaryColor::Off; (width * height) as usize],
            width,
            height,
            flushes: Vec::new(),
            hibernated: false,
        }
    }

    /// Create a display matching the Xteink X4 dimensions (480x800).
    pub fn default_size() -> Self {
        Self::new(crate::DISPLAY_WIDTH, crate::DISPLAY_HEIGHT)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[BinaryColor] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn black_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|p| **p == BinaryColor::On).count()
    }

    /// Black pixels inside the half-open window `[x0, x1) x [y0, y1)`.
    pub fn black_pixel_count_in(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> usize {
        let mut count = 0;
        for y in y0.max(0)..y1.min(self.height as i32) {
            for x in x0.max(0)..x1.min(self.width as i32) {
                if self.pixels[(y as u32 * self.width + x as u32) as usize] == BinaryColor::On {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn flushes(&self) -> &[Flush] {
        &self.flushes
    }

    pub fn last_flush(&self) -> Option<Flush> {
        self.flushes.last().copied()
    }

    pub fn is_hibernated(&self) -> bool {
        self.hibernated
    }
}

impl DrawTarget for TestDisplay {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0
                && coord.y >= 0
                && (coord.x as u32) < self.width
                && (coord.y as u32) < self.height
            {
                let idx = (coord.y as u32 * self.width + coord.x as u32) as usize;
                self.pixels[idx] = color;
            }
        }
        Ok(())
    }
}

impl OriginDimensions for TestDisplay {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DisplayDevice for TestDisplay {
    fn flush(&mut self, mode: RefreshMode) -> Result<(), Self::Error> {
        self.flushes.push(match mode {
            RefreshMode::Full => Flush::Full,
            RefreshMode::Partial => Flush::Partial,
        });
        self.hibernated = false;
        Ok(())
    }

    fn flush_region(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), Self::Error> {
        self.flushes.push(Flush::Region {
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn hibernate(&mut self) -> Result<(), Self::Error> {
        self.hibernated = true;
        Ok(())
    }
}
