use esp_idf_svc::sys;

use crosspoint_core::battery::percentage_from_millivolts;
use crosspoint_core::BatteryGauge;

use crate::input::read_adc;

/// GPIO0 sits behind a 2:1 divider from the cell.
const BATTERY_ADC_CHANNEL: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_0;
const ADC_ATTEN_DB_11: u32 = 3;
const ADC_MAX_RAW: u32 = 4095;
/// Approximate full-scale input at 11 dB attenuation.
const ADC_FULL_SCALE_MV: u32 = 2500;
const DIVIDER_RATIO: u32 = 2;
const SAMPLES: u32 = 8;

pub struct AdcBattery;

impl AdcBattery {
    /// Expects [`crate::input::init_adc`] to have set the ADC width already.
    pub fn new() -> Self {
        unsafe {
            sys::adc1_config_channel_atten(BATTERY_ADC_CHANNEL, ADC_ATTEN_DB_11);
        }
        Self
    }

    pub fn millivolts(&self) -> u32 {
        let total: u32 = (0..SAMPLES)
            .map(|_| read_adc(BATTERY_ADC_CHANNEL).clamp(0, ADC_MAX_RAW as i32) as u32)
            .sum();
        let raw = total / SAMPLES;
        raw * ADC_FULL_SCALE_MV / ADC_MAX_RAW * DIVIDER_RATIO
    }
}

impl BatteryGauge for AdcBattery {
    fn percentage(&self) -> u8 {
        percentage_from_millivolts(self.millivolts())
    }
}
