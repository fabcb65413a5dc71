//! Battery level reporting for the status bar.

use std::sync::Arc;

// Linear Li-ion approximation: 4200mV = 100%, 3000mV = 0%.
const VBAT_FULL_MV: u32 = 4200;
const VBAT_EMPTY_MV: u32 = 3000;

pub trait BatteryGauge: Send + Sync {
    /// Charge level, 0..=100.
    fn percentage(&self) -> u8;
}

pub type SharedBattery = Arc<dyn BatteryGauge>;

/// Cell voltage to charge percentage.
pub fn percentage_from_millivolts(battery_mv: u32) -> u8 {
    if battery_mv >= VBAT_FULL_MV {
        100
    } else if battery_mv <= VBAT_EMPTY_MV {
        0
    } else {
        ((battery_mv - VBAT_EMPTY_MV) * 100 / (VBAT_FULL_MV - VBAT_EMPTY_MV)) as u8
    }
}

/// Gauge that always reports the same level. Used on the host.
#[derive(Debug, Clone, Copy)]
pub struct FixedBattery(pub u8);

impl BatteryGauge for FixedBattery {
    fn percentage(&self) -> u8 {
        self.0.min(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_curve_is_clamped() {
        assert_eq!(percentage_from_millivolts(4300), 100);
        assert_eq!(percentage_from_millivolts(4200), 100);
        assert_eq!(percentage_from_millivolts(3600), 50);
        assert_eq!(percentage_from_millivolts(3000), 0);
        assert_eq!(percentage_from_millivolts(2500), 0);
    }

    #[test]
    fn fixed_gauge_caps_at_full() {
        assert_eq!(FixedBattery(150).percentage(), 100);
        assert_eq!(FixedBattery(42).percentage(), 42);
    }
}
