use crate::mapping::PwmRegisters;

/// Write-only destination for the PWM reload/compare pair.
///
/// Writes go straight to the counter with no lock and no handshake with the
/// counter's own reload. The counter may run one cycle with the new period
/// and the old compare value (or the reverse).
pub trait PwmSink {
    fn write(&mut self, registers: PwmRegisters);
}

impl<P: PwmSink + ?Sized> PwmSink for &mut P {
    fn write(&mut self, registers: PwmRegisters) {
        (**self).write(registers)
    }
}

/// Narrow a register value to a 16-bit counter, saturating.
pub fn saturate_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
