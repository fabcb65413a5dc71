//! SSD1677 e-paper panel behind a portrait frame buffer.
//!
//! The controller is driven in its native 800x480 landscape orientation over
//! `embedded-hal` SPI; drawing happens in 480x800 portrait and is rotated
//! while writing into the buffer.

use core::fmt::Debug;

use crosspoint_core::{DisplayDevice, RefreshMode, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

mod command {
    pub const DRIVER_OUTPUT_CONTROL: u8 = 0x01;
    pub const BOOSTER_SOFT_START: u8 = 0x0C;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SOFT_RESET: u8 = 0x12;
    pub const TEMP_SENSOR_CONTROL: u8 = 0x18;
    pub const MASTER_ACTIVATION: u8 = 0x20;
    pub const DISPLAY_UPDATE_CTRL1: u8 = 0x21;
    pub const DISPLAY_UPDATE_CTRL2: u8 = 0x22;
    pub const WRITE_RAM_BW: u8 = 0x24;
    pub const WRITE_RAM_RED: u8 = 0x26;
    pub const WRITE_VCOM: u8 = 0x2C;
    pub const BORDER_WAVEFORM: u8 = 0x3C;
    pub const SET_RAM_X_RANGE: u8 = 0x44;
    pub const SET_RAM_Y_RANGE: u8 = 0x45;
    pub const SET_RAM_X_COUNTER: u8 = 0x4E;
    pub const SET_RAM_Y_COUNTER: u8 = 0x4F;

    /// Compare RED (previous frame) against BW for partial updates.
    pub const CTRL1_NORMAL: u8 = 0x00;
    /// Treat RED as empty, used for full refreshes.
    pub const CTRL1_BYPASS_RED: u8 = 0x40;

    pub const CTRL2_POWER_ON: u8 = 0xC0;
    pub const CTRL2_POWER_OFF: u8 = 0x03;
    pub const CTRL2_FULL: u8 = 0x34;
    pub const CTRL2_PARTIAL: u8 = 0xD4;
}

use command::*;

const NATIVE_WIDTH: u32 = DISPLAY_HEIGHT;
const NATIVE_HEIGHT: u32 = DISPLAY_WIDTH;
const NATIVE_WIDTH_BYTES: usize = (NATIVE_WIDTH / 8) as usize;
const BUFFER_SIZE: usize = NATIVE_WIDTH_BYTES * NATIVE_HEIGHT as usize;

/// X increment, Y decrement; the gates are wired in reverse.
const DATA_ENTRY_X_INC_Y_DEC: u8 = 0x01;
const BUSY_TIMEOUT_MS: u32 = 30_000;

#[derive(Debug)]
pub enum PanelError<SpiErr, PinErr> {
    Spi(SpiErr),
    Pin(PinErr),
    Timeout,
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for PanelError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PanelError::Spi(e) => write!(f, "SPI error: {e:?}"),
            PanelError::Pin(e) => write!(f, "Pin error: {e:?}"),
            PanelError::Timeout => write!(f, "Timeout waiting for display"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> std::error::Error for PanelError<SpiErr, PinErr> {}

/// Pixel window in native controller coordinates, X byte aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Window {
    const FULL: Window = Window {
        x: 0,
        y: 0,
        width: NATIVE_WIDTH,
        height: NATIVE_HEIGHT,
    };

    /// Native window covering the portrait rectangle, clipped to the panel.
    fn from_portrait(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        let right = x.saturating_add(width).min(DISPLAY_WIDTH);
        let bottom = y.saturating_add(height).min(DISPLAY_HEIGHT);
        if x >= right || y >= bottom {
            return None;
        }
        // Portrait rows run along native X, portrait columns along native Y reversed.
        let native_left = y / 8 * 8;
        let native_right = bottom.div_ceil(8) * 8;
        let native_top = NATIVE_HEIGHT - right;
        let native_bottom = NATIVE_HEIGHT - x;
        Some(Self {
            x: native_left,
            y: native_top,
            width: native_right - native_left,
            height: native_bottom - native_top,
        })
    }
}

pub struct Panel<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
    frame: Vec<u8>,
    powered: bool,
}

impl<SPI, DC, RST, BUSY, DELAY, PinErr> Panel<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    DELAY: DelayNs,
    PinErr: Debug,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: DELAY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            frame: vec![0xFF; BUFFER_SIZE],
            powered: false,
        }
    }

    /// Hardware reset, soft reset and controller setup.
    pub fn reset(&mut self) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.rst.set_low().map_err(PanelError::Pin)?;
        self.delay.delay_ms(10);
        self.rst.set_high().map_err(PanelError::Pin)?;
        self.delay.delay_ms(10);

        self.command(SOFT_RESET, &[])?;
        self.busy_wait()?;

        self.command(TEMP_SENSOR_CONTROL, &[0x80])?;
        self.command(BOOSTER_SOFT_START, &[0xAE, 0xC7, 0xC3, 0xC0, 0x40])?;
        let last_gate = NATIVE_HEIGHT - 1;
        self.command(
            DRIVER_OUTPUT_CONTROL,
            &[(last_gate % 256) as u8, (last_gate / 256) as u8, 0x02],
        )?;
        self.command(BORDER_WAVEFORM, &[0x01])?;
        self.command(WRITE_VCOM, &[0x3C])?;
        self.powered = false;
        log::info!("[SCREEN] Panel reset");
        Ok(())
    }

    fn command(&mut self, cmd: u8, data: &[u8]) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.dc.set_low().map_err(PanelError::Pin)?;
        self.spi.write(&[cmd]).map_err(PanelError::Spi)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(PanelError::Pin)?;
            self.spi.write(data).map_err(PanelError::Spi)?;
        }
        Ok(())
    }

    fn busy_wait(&mut self) -> Result<(), PanelError<SPI::Error, PinErr>> {
        let mut waited_ms = 0u32;
        while self.busy.is_high().map_err(PanelError::Pin)? {
            self.delay.delay_ms(1);
            waited_ms += 1;
            if waited_ms >= BUSY_TIMEOUT_MS {
                return Err(PanelError::Timeout);
            }
        }
        Ok(())
    }

    fn set_ram_window(&mut self, window: Window) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.command(DATA_ENTRY_MODE, &[DATA_ENTRY_X_INC_Y_DEC])?;

        let x_end = window.x + window.width - 1;
        self.command(
            SET_RAM_X_RANGE,
            &[
                (window.x % 256) as u8,
                (window.x / 256) as u8,
                (x_end % 256) as u8,
                (x_end / 256) as u8,
            ],
        )?;

        // Buffer row 0 is the last gate.
        let y_start = NATIVE_HEIGHT - 1 - window.y;
        let y_end = y_start + 1 - window.height;
        self.command(
            SET_RAM_Y_RANGE,
            &[
                (y_start % 256) as u8,
                (y_start / 256) as u8,
                (y_end % 256) as u8,
                (y_end / 256) as u8,
            ],
        )?;

        self.command(SET_RAM_X_COUNTER, &[(window.x % 256) as u8, (window.x / 256) as u8])?;
        self.command(SET_RAM_Y_COUNTER, &[(y_start % 256) as u8, (y_start / 256) as u8])
    }

    fn write_window(&mut self, ram: u8, window: Window) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.set_ram_window(window)?;
        if window == Window::FULL {
            self.dc.set_low().map_err(PanelError::Pin)?;
            self.spi.write(&[ram]).map_err(PanelError::Spi)?;
            self.dc.set_high().map_err(PanelError::Pin)?;
            return self.spi.write(&self.frame).map_err(PanelError::Spi);
        }

        let first_byte = (window.x / 8) as usize;
        let row_bytes = (window.width / 8) as usize;
        let mut region = Vec::with_capacity(row_bytes * window.height as usize);
        for row in window.y..window.y + window.height {
            let start = row as usize * NATIVE_WIDTH_BYTES + first_byte;
            region.extend_from_slice(&self.frame[start..start + row_bytes]);
        }
        self.command(ram, &region)
    }

    fn activate(&mut self, ctrl1: u8, ctrl2: u8) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.command(DISPLAY_UPDATE_CTRL1, &[ctrl1])?;
        let mut mode = ctrl2;
        if !self.powered {
            mode |= CTRL2_POWER_ON;
        }
        self.command(DISPLAY_UPDATE_CTRL2, &[mode])?;
        self.command(MASTER_ACTIVATION, &[])?;
        self.busy_wait()?;
        self.powered = true;
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode, window: Window) -> Result<(), PanelError<SPI::Error, PinErr>> {
        self.write_window(WRITE_RAM_BW, window)?;
        match mode {
            RefreshMode::Full => {
                self.write_window(WRITE_RAM_RED, window)?;
                self.activate(CTRL1_BYPASS_RED, CTRL2_FULL)
            }
            RefreshMode::Partial => {
                self.activate(CTRL1_NORMAL, CTRL2_PARTIAL)?;
                // RED holds the previous frame for the next partial compare.
                self.write_window(WRITE_RAM_RED, window)
            }
        }
    }

    fn deep_sleep(&mut self) -> Result<(), PanelError<SPI::Error, PinErr>> {
        if self.powered {
            self.command(DISPLAY_UPDATE_CTRL1, &[CTRL1_BYPASS_RED])?;
            self.command(DISPLAY_UPDATE_CTRL2, &[CTRL2_POWER_OFF])?;
            self.command(MASTER_ACTIVATION, &[])?;
            self.busy_wait()?;
            self.powered = false;
        }
        self.command(DEEP_SLEEP, &[0x01])
    }

    fn log_failure<T>(
        result: Result<T, PanelError<SPI::Error, PinErr>>,
        what: &str,
    ) -> Result<T, PanelError<SPI::Error, PinErr>> {
        if let Err(err) = &result {
            log::error!("[SCREEN] {} failed: {}", what, err);
        }
        result
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return;
        }
        let native_x = y;
        let native_y = (DISPLAY_WIDTH - 1) - x;
        let byte_index = native_y as usize * NATIVE_WIDTH_BYTES + native_x as usize / 8;
        let bit = 1u8 << (7 - native_x % 8);

        if color == BinaryColor::On {
            self.frame[byte_index] &= !bit;
        } else {
            self.frame[byte_index] |= bit;
        }
    }
}

impl<SPI, DC, RST, BUSY, DELAY, PinErr> DrawTarget for Panel<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    DELAY: DelayNs,
    PinErr: Debug,
{
    type Color = BinaryColor;
    type Error = PanelError<SPI::Error, PinErr>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: BinaryColor) -> Result<(), Self::Error> {
        let fill_byte = if color == BinaryColor::On { 0x00 } else { 0xFF };
        self.frame.fill(fill_byte);
        Ok(())
    }
}

impl<SPI, DC, RST, BUSY, DELAY> OriginDimensions for Panel<SPI, DC, RST, BUSY, DELAY> {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl<SPI, DC, RST, BUSY, DELAY, PinErr> DisplayDevice for Panel<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    DELAY: DelayNs,
    PinErr: Debug,
{
    fn flush(&mut self, mode: RefreshMode) -> Result<(), Self::Error> {
        let result = self.refresh(mode, Window::FULL);
        Self::log_failure(result, "Flush")
    }

    fn flush_region(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), Self::Error> {
        let Some(window) = Window::from_portrait(x, y, width, height) else {
            return Ok(());
        };
        let result = self.refresh(RefreshMode::Partial, window);
        Self::log_failure(result, "Region flush")
    }

    fn hibernate(&mut self) -> Result<(), Self::Error> {
        let result = self.deep_sleep();
        Self::log_failure(result, "Hibernate")
    }
}
