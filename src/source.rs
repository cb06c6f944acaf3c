use core::sync::atomic::{AtomicU16, Ordering};

/// One of the two analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Drives the PWM duty cycle.
    Amplitude,
    /// Drives the PWM frequency.
    Frequency,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Amplitude, Channel::Frequency];

    /// Slot of this channel in the register pair and in the averaging rings.
    pub const fn index(self) -> usize {
        match self {
            Channel::Amplitude => 0,
            Channel::Frequency => 1,
        }
    }
}

/// Raw codes of both channels taken together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub amplitude: u16,
    pub frequency: u16,
}

impl Frame {
    pub const fn new(amplitude: u16, frequency: u16) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    pub const fn get(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Amplitude => self.amplitude,
            Channel::Frequency => self.frequency,
        }
    }
}

/// Read side of the converter output, handed to the sampler at construction.
pub trait SampleSource {
    /// Copy both channels out. The copy is not preempted by other tasks but
    /// may still straddle a converter update, so the two codes can come from
    /// neighbouring conversion cycles.
    fn snapshot(&self) -> Frame;
}

impl<S: SampleSource + ?Sized> SampleSource for &S {
    fn snapshot(&self) -> Frame {
        (**self).snapshot()
    }
}

/// Two-slot register pair continuously overwritten by the converter.
///
/// Each slot is stored on its own; nothing orders the pair. The converter is
/// the only writer and never waits for readers.
pub struct SampleRegisters {
    slots: [AtomicU16; 2],
}

impl SampleRegisters {
    pub const fn new() -> Self {
        Self {
            slots: [AtomicU16::new(0), AtomicU16::new(0)],
        }
    }

    /// Converter side: overwrite the latest code of `channel`.
    pub fn publish(&self, channel: Channel, code: u16) {
        self.slots[channel.index()].store(code, Ordering::Relaxed);
    }
}

impl Default for SampleRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SampleRegisters {
    fn snapshot(&self) -> Frame {
        critical_section::with(|_| {
            let [amplitude, frequency] =
                Channel::ALL.map(|channel| self.slots[channel.index()].load(Ordering::Relaxed));
            Frame::new(amplitude, frequency)
        })
    }
}
