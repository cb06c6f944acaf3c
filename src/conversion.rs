use crate::config::AdcConfig;

/// Scale a raw converter code to volts. Codes above `max_code` are not
/// clamped and give voltages above the reference.
pub fn raw_to_volts(raw: u16, adc: &AdcConfig) -> f32 {
    adc.reference_volts * raw as f32 / adc.max_code() as f32
}
