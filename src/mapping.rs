use libm::roundf;

use crate::config::MappingConfig;

/// Frequency for a frequency-input voltage. Never below `min_hz`.
pub fn target_frequency_hz(volts: f32, mapping: &MappingConfig) -> f32 {
    let hz = (volts / mapping.setpoint_volts) * mapping.hz_at_setpoint;
    hz.max(mapping.min_hz)
}

/// Duty fraction for an amplitude-input voltage, within `0.0..=1.0`.
pub fn target_duty(volts: f32, mapping: &MappingConfig) -> f32 {
    ((volts / mapping.setpoint_volts) * mapping.duty_at_setpoint).clamp(0.0, 1.0)
}

/// Reload and compare values for one PWM counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmRegisters {
    /// Counter reload value; the counter runs `period + 1` clocks.
    pub period: u32,
    /// Count at which the output goes inactive.
    pub compare: u32,
}

impl PwmRegisters {
    /// `period = round(clock / hz) - 1`, `compare = round((period + 1) * duty)`.
    pub fn derive(target_hz: f32, target_duty: f32, timer_clock_hz: u32) -> Self {
        let counts = roundf(timer_clock_hz as f32 / target_hz) as u32;
        let period = counts.saturating_sub(1);
        let compare = roundf((period as f32 + 1.0) * target_duty) as u32;
        Self { period, compare }
    }
}
