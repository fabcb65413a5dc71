mod battery;
mod input;
mod panel;
mod power;
mod sdcard;

use std::sync::Arc;

use esp_idf_svc::hal::{
    delay::FreeRtos,
    gpio::{PinDriver, Pull},
    peripherals::Peripherals,
    spi::{config::Config, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
    units::Hertz,
};
use esp_idf_svc::sys::{self, EspError};

use crosspoint_core::filesystem::shared;
use crosspoint_core::{MonoShaper, Renderer, Session, SessionConfig, SharedFileSystem, SystemClock, TextBookStore};

use battery::AdcBattery;
use input::ButtonInput;
use panel::Panel;
use power::DeepSleep;
use sdcard::{NoCard, SdCardFs};

/// The session loop, screen entry and library listing run on the main task.
/// Chapter layout runs on the reader render thread (`RENDER_TASK_STACK_BYTES`).
const REQUIRED_MAIN_STACK: u32 = 80 * 1024;
const DISPLAY_SPI_HZ: u32 = 40_000_000;

fn log_heap(label: &str) {
    let free_heap = unsafe { sys::esp_get_free_heap_size() };
    let min_free = unsafe { sys::esp_get_minimum_free_heap_size() };
    log::info!("[HEAP] {}: free={} bytes min_free={} bytes", label, free_heap, min_free);
}

fn main() -> Result<(), EspError> {
    sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let configured_stack = sys::CONFIG_ESP_MAIN_TASK_STACK_SIZE;
    if configured_stack < REQUIRED_MAIN_STACK {
        log::warn!(
            "Main stack too small: {} bytes (need >= {}). Check sdkconfig.defaults",
            configured_stack,
            REQUIRED_MAIN_STACK
        );
    }

    let wake = power::wake_reason();
    log::info!("[POWER] Booting, wake reason {:?}", wake);
    log_heap("startup");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let mut power_btn = PinDriver::input(pins.gpio3)?;
    power_btn.set_pull(Pull::Up)?;
    let mut input = ButtonInput::new(power_btn);

    let spi = SpiDriver::new(
        peripherals.spi2,
        pins.gpio8,
        pins.gpio10,
        Some(pins.gpio7),
        &SpiDriverConfig::default(),
    )?;
    let spi_host = spi.host();
    let display_config = Config::default()
        .baudrate(Hertz(DISPLAY_SPI_HZ))
        .data_mode(embedded_hal::spi::Mode {
            polarity: embedded_hal::spi::Polarity::IdleLow,
            phase: embedded_hal::spi::Phase::CaptureOnFirstTransition,
        });
    let display_spi = SpiDeviceDriver::new(spi, Some(pins.gpio21), &display_config)?;

    let dc = PinDriver::output(pins.gpio4)?;
    let rst = PinDriver::output(pins.gpio5)?;
    let busy = PinDriver::input(pins.gpio6)?;
    let mut panel = Panel::new(display_spi, dc, rst, busy, FreeRtos);
    if let Err(err) = panel.reset() {
        log::error!("[SCREEN] Panel reset failed: {}", err);
    }

    // The reader stays usable without a card; the library just shows empty.
    let fs: SharedFileSystem = match SdCardFs::mount(spi_host, pins.gpio12) {
        Ok(card) => shared(card),
        Err(err) => {
            log::warn!("[FS] {}", err);
            shared(NoCard)
        }
    };

    let battery = AdcBattery::new();
    log::info!("[POWER] Battery at {}mV", battery.millivolts());

    let mut session = Session::new(
        SessionConfig::default(),
        Renderer::new(panel, MonoShaper).into_shared(),
        fs.clone(),
        Arc::new(battery),
        TextBookStore::new(fs),
    );
    log_heap("session_ready");

    let clock = SystemClock::new();
    let mut sleep = DeepSleep;
    session.boot(wake, &mut input, &clock, &mut sleep);
    session.run(&mut input, &clock, &mut sleep)
}
