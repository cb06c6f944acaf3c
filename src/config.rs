use embassy_time::Duration;

/// Raw codes kept per channel for the running average.
pub const SAMPLES_PER_AVERAGE: usize = 8;

/// Longest wait for the averaging lock before degrading.
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(10);

pub const SAMPLE_PERIOD: Duration = Duration::from_millis(10);
pub const CONTROL_PERIOD: Duration = Duration::from_millis(20);
pub const LED_PERIOD: Duration = Duration::from_millis(500);
pub const DIAGNOSTICS_PERIOD: Duration = Duration::from_secs(1);

/// Converter scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConfig {
    pub reference_volts: f32,
    pub resolution_bits: u8,
}

impl AdcConfig {
    pub const fn new(reference_volts: f32, resolution_bits: u8) -> Self {
        Self {
            reference_volts,
            resolution_bits,
        }
    }

    /// Largest code the converter emits, `2^bits - 1`. Saturates at
    /// `u32::MAX` for 32 bits and wider.
    pub const fn max_code(&self) -> u32 {
        match 1u32.checked_shl(self.resolution_bits as u32) {
            Some(span) => span - 1,
            None => u32::MAX,
        }
    }
}

/// Linear voltage-to-output mapping. Both outputs scale with
/// `volts / setpoint_volts`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingConfig {
    pub setpoint_volts: f32,
    pub hz_at_setpoint: f32,
    pub duty_at_setpoint: f32,
    /// Frequency floor, keeps the period division finite.
    pub min_hz: f32,
}

impl MappingConfig {
    pub const fn new(
        setpoint_volts: f32,
        hz_at_setpoint: f32,
        duty_at_setpoint: f32,
        min_hz: f32,
    ) -> Self {
        Self {
            setpoint_volts,
            hz_at_setpoint,
            duty_at_setpoint,
            min_hz,
        }
    }
}

/// 12-bit converter on a 3.3 V reference.
pub const ADC_12BIT_3V3: AdcConfig = AdcConfig::new(3.3, 12);

/// 2.0 V on the frequency input gives 10 kHz; 2.0 V on the amplitude input
/// gives a duty of 2.0 / 3.3.
pub const REFERENCE_MAPPING: MappingConfig = MappingConfig::new(2.0, 10_000.0, 2.0 / 3.3, 100.0);

/// Everything the controller needs to turn averages into registers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConfig {
    pub adc: AdcConfig,
    pub mapping: MappingConfig,
    /// Counter clock after the PWM divider.
    pub timer_clock_hz: u32,
}

impl ControlConfig {
    pub const fn new(adc: AdcConfig, mapping: MappingConfig, timer_clock_hz: u32) -> Self {
        Self {
            adc,
            mapping,
            timer_clock_hz,
        }
    }

    pub const fn reference(timer_clock_hz: u32) -> Self {
        Self::new(ADC_12BIT_3V3, REFERENCE_MAPPING, timer_clock_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_code_follows_resolution() {
        assert_eq!(ADC_12BIT_3V3.max_code(), 4095);
        assert_eq!(AdcConfig::new(3.3, 16).max_code(), 65_535);
        assert_eq!(AdcConfig::new(3.3, 0).max_code(), 0);
    }

    #[test]
    fn max_code_saturates_for_wide_resolutions() {
        assert_eq!(AdcConfig::new(3.3, 31).max_code(), 0x7fff_ffff);
        assert_eq!(AdcConfig::new(3.3, 32).max_code(), u32::MAX);
        assert_eq!(AdcConfig::new(3.3, 255).max_code(), u32::MAX);
    }
}
