use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sys;

use crosspoint_core::{PowerInterface, WakeReason};

/// Power button, active low.
const POWER_BUTTON_GPIO: u32 = 3;

/// Deep sleep with the power button as the only wake source.
pub struct DeepSleep;

impl PowerInterface for DeepSleep {
    fn arm_wake_interrupt(&mut self) {
        let err = unsafe {
            sys::esp_deep_sleep_enable_gpio_wakeup(
                1u64 << POWER_BUTTON_GPIO,
                sys::esp_deepsleep_gpio_wake_up_mode_t_ESP_GPIO_WAKEUP_GPIO_LOW,
            )
        };
        if err != sys::ESP_OK {
            log::error!("[POWER] Failed to arm GPIO{} wake-up: {}", POWER_BUTTON_GPIO, err);
        }
    }

    fn enter_suspend(&mut self) -> ! {
        log::info!("[POWER] Deep sleep");
        unsafe { sys::esp_deep_sleep_start() };
        #[allow(unreachable_code)]
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
}

pub fn wake_reason() -> WakeReason {
    let cause = unsafe { sys::esp_sleep_get_wakeup_cause() };
    if cause == sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO {
        WakeReason::PowerButton
    } else {
        WakeReason::ColdBoot
    }
}
