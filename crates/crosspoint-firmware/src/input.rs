use esp_idf_svc::hal::gpio::{Gpio3, Input, PinDriver};
use esp_idf_svc::sys;

use crosspoint_core::{Button, Clock, InputEvent, InputSource, PressTracker, SystemClock};

const ADC_NO_BUTTON: i32 = 3800;
const ADC_RANGES_1: [i32; 5] = [3800, 3100, 2090, 750, i32::MIN];
const ADC_RANGES_2: [i32; 3] = [3800, 1120, i32::MIN];
const ADC_WIDTH_BIT_12: u32 = 3;
const ADC_ATTEN_DB_11: u32 = 3;

const LADDER_1: [Button; 4] = [Button::Back, Button::Confirm, Button::Left, Button::Right];
const LADDER_2: [Button; 2] = [Button::VolumeUp, Button::VolumeDown];

pub fn init_adc() {
    unsafe {
        sys::adc1_config_width(ADC_WIDTH_BIT_12);
        sys::adc1_config_channel_atten(sys::adc_channel_t_ADC_CHANNEL_1, ADC_ATTEN_DB_11);
        sys::adc1_config_channel_atten(sys::adc_channel_t_ADC_CHANNEL_2, ADC_ATTEN_DB_11);
    }
}

pub fn read_adc(channel: sys::adc_channel_t) -> i32 {
    unsafe { sys::adc1_get_raw(channel) as i32 }
}

fn ladder_button(adc_value: i32, ranges: &[i32], buttons: &[Button]) -> Option<Button> {
    buttons
        .iter()
        .enumerate()
        .find(|(i, _)| ranges[i + 1] < adc_value && adc_value <= ranges[*i])
        .map(|(_, button)| *button)
}

/// Front and side keys on two resistor ladders plus the power button.
pub struct ButtonInput<'d> {
    power_btn: PinDriver<'d, Gpio3, Input>,
    tracker: PressTracker,
    clock: SystemClock,
}

impl<'d> ButtonInput<'d> {
    pub fn new(power_btn: PinDriver<'d, Gpio3, Input>) -> Self {
        init_adc();
        Self {
            power_btn,
            tracker: PressTracker::new(),
            clock: SystemClock::new(),
        }
    }

    /// Power wins over the ladders; the first ladder wins over the second.
    fn read_button(&mut self) -> Option<Button> {
        if self.power_btn.is_low() {
            return Some(Button::Power);
        }

        let adc1_value = read_adc(sys::adc_channel_t_ADC_CHANNEL_1);
        let adc2_value = read_adc(sys::adc_channel_t_ADC_CHANNEL_2);
        if adc1_value < ADC_NO_BUTTON || adc2_value < ADC_NO_BUTTON {
            log::trace!("[INPUT] ADC1: {}, ADC2: {}", adc1_value, adc2_value);
        }

        ladder_button(adc1_value, &ADC_RANGES_1, &LADDER_1)
            .or_else(|| ladder_button(adc2_value, &ADC_RANGES_2, &LADDER_2))
    }

    fn sample(&mut self) {
        let button = self.read_button();
        self.tracker.update(button, self.clock.now_ms());
    }
}

impl InputSource for ButtonInput<'_> {
    fn poll(&mut self) -> InputEvent {
        self.sample();
        self.tracker.take_release()
    }

    fn held(&mut self) -> Option<(Button, u32)> {
        self.sample();
        self.tracker.held(self.clock.now_ms())
    }
}
