use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};

use crate::averaging::AveragingBuffers;
use crate::config::SAMPLE_PERIOD;
use crate::source::SampleSource;

/// Moves converter snapshots into the averaging buffers at a fixed cadence.
pub struct Sampler<'a, S: SampleSource, M: RawMutex, const N: usize> {
    source: S,
    buffers: &'a AveragingBuffers<M, N>,
    period: Duration,
}

impl<'a, S: SampleSource, M: RawMutex, const N: usize> Sampler<'a, S, M, N> {
    pub fn new(source: S, buffers: &'a AveragingBuffers<M, N>) -> Self {
        Self::with_period(source, buffers, SAMPLE_PERIOD)
    }

    pub fn with_period(source: S, buffers: &'a AveragingBuffers<M, N>, period: Duration) -> Self {
        Self {
            source,
            buffers,
            period,
        }
    }

    /// One cycle: snapshot, then insert. `false` if the frame was dropped.
    pub async fn sample_once(&self) -> bool {
        let frame = self.source.snapshot();
        self.buffers.insert(frame).await
    }

    /// Sample on an absolute schedule forever. A dropped frame is skipped and
    /// the next deadline is kept.
    pub async fn run(&self) -> ! {
        let mut ticker = Ticker::every(self.period);
        loop {
            ticker.next().await;
            if !self.sample_once().await {
                #[cfg(feature = "defmt")]
                defmt::debug!("sample dropped, averaging lock busy");
            }
        }
    }
}
