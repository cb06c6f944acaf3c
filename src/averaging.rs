use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Duration};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::{AdcConfig, LOCK_TIMEOUT, SAMPLES_PER_AVERAGE};
use crate::conversion::raw_to_volts;
use crate::source::{Channel, Frame};

/// Result of an average query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Average {
    /// Floor mean of all slots of the channel.
    Fresh(u16),
    /// The lock was not granted within the timeout.
    Stale,
}

impl Average {
    /// Degraded reading: a stale average counts as zero.
    pub const fn raw_or_zero(self) -> u16 {
        match self {
            Average::Fresh(raw) => raw,
            Average::Stale => 0,
        }
    }

    pub const fn is_stale(self) -> bool {
        matches!(self, Average::Stale)
    }
}

/// Last `N` codes of both channels. One cursor indexes both rings so a
/// frame always lands in the same slot of each.
pub(crate) struct Rings<const N: usize> {
    slots: [[u16; N]; 2],
    cursor: usize,
}

impl<const N: usize> Rings<N> {
    const fn new() -> Self {
        assert!(N > 0, "averaging rings need at least one slot");
        Self {
            slots: [[0; N]; 2],
            cursor: 0,
        }
    }

    fn push(&mut self, frame: Frame) {
        for channel in Channel::ALL {
            self.slots[channel.index()][self.cursor] = frame.get(channel);
        }
        self.cursor = (self.cursor + 1) % N;
    }

    fn mean(&self, channel: Channel) -> u16 {
        let acc: u32 = self.slots[channel.index()]
            .iter()
            .map(|&raw| raw as u32)
            .sum();
        (acc / N as u32) as u16
    }
}

/// Running averages of both channels behind a single lock.
///
/// Every access waits at most `lock_timeout` for the lock. A write that
/// misses it is dropped, a read that misses it is [`Average::Stale`].
/// Starts zero-filled, so the first `N - 1` averages read low.
pub struct AveragingBuffers<M: RawMutex, const N: usize = SAMPLES_PER_AVERAGE> {
    rings: Mutex<M, Rings<N>>,
    lock_timeout: Duration,
    dropped: AtomicU32,
    stale: AtomicU32,
}

/// Buffers shared between executors of different priority.
pub type SharedBuffers = AveragingBuffers<CriticalSectionRawMutex, SAMPLES_PER_AVERAGE>;

impl<M: RawMutex, const N: usize> AveragingBuffers<M, N> {
    pub const fn new() -> Self {
        Self::with_lock_timeout(LOCK_TIMEOUT)
    }

    pub const fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            rings: Mutex::new(Rings::new()),
            lock_timeout,
            dropped: AtomicU32::new(0),
            stale: AtomicU32::new(0),
        }
    }

    /// Store one frame and advance the shared cursor.
    ///
    /// Returns `false` when the lock was busy and the frame was dropped.
    pub async fn insert(&self, frame: Frame) -> bool {
        match with_timeout(self.lock_timeout, self.rings.lock()).await {
            Ok(mut rings) => {
                rings.push(frame);
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Floor mean of the last `N` codes of `channel`.
    pub async fn average(&self, channel: Channel) -> Average {
        match with_timeout(self.lock_timeout, self.rings.lock()).await {
            Ok(rings) => Average::Fresh(rings.mean(channel)),
            Err(_) => {
                self.stale.fetch_add(1, Ordering::Relaxed);
                Average::Stale
            }
        }
    }

    /// Average of `channel` in volts, 0.0 when the lock was busy.
    pub async fn average_volts(&self, channel: Channel, adc: &AdcConfig) -> f32 {
        raw_to_volts(self.average(channel).await.raw_or_zero(), adc)
    }

    /// Frames dropped on lock timeout since boot.
    pub fn dropped_samples(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Average queries that timed out since boot.
    pub fn stale_reads(&self) -> u32 {
        self.stale.load(Ordering::Relaxed)
    }

    /// Hold the lock from a test to starve other callers.
    #[cfg(test)]
    pub(crate) async fn hold_lock(&self) -> embassy_sync::mutex::MutexGuard<'_, M, Rings<N>> {
        self.rings.lock().await
    }
}

impl<M: RawMutex, const N: usize> Default for AveragingBuffers<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
