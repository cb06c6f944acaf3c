use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};

use crate::averaging::{Average, AveragingBuffers};
use crate::config::{ControlConfig, CONTROL_PERIOD};
use crate::conversion::raw_to_volts;
use crate::mapping::{target_duty, target_frequency_hz, PwmRegisters};
use crate::pwm::PwmSink;
use crate::source::Channel;

/// What one control cycle read and wrote.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutput {
    pub amplitude: Average,
    pub frequency: Average,
    pub target_hz: f32,
    pub target_duty: f32,
    pub registers: PwmRegisters,
}

/// Open-loop follower: frequency input sets the PWM frequency, amplitude
/// input sets the duty cycle.
pub struct Controller<'a, P: PwmSink, M: RawMutex, const N: usize> {
    buffers: &'a AveragingBuffers<M, N>,
    sink: P,
    config: ControlConfig,
    period: Duration,
}

impl<'a, P: PwmSink, M: RawMutex, const N: usize> Controller<'a, P, M, N> {
    pub fn new(buffers: &'a AveragingBuffers<M, N>, sink: P, config: ControlConfig) -> Self {
        Self::with_period(buffers, sink, config, CONTROL_PERIOD)
    }

    pub fn with_period(
        buffers: &'a AveragingBuffers<M, N>,
        sink: P,
        config: ControlConfig,
        period: Duration,
    ) -> Self {
        Self {
            buffers,
            sink,
            config,
            period,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Read both averages, map them and write one register pair.
    ///
    /// A stale average is taken as 0 V, which pins the output to the
    /// frequency floor or to zero duty for that cycle.
    pub async fn update(&mut self) -> ControlOutput {
        let amplitude = self.buffers.average(Channel::Amplitude).await;
        let frequency = self.buffers.average(Channel::Frequency).await;

        let amplitude_volts = raw_to_volts(amplitude.raw_or_zero(), &self.config.adc);
        let frequency_volts = raw_to_volts(frequency.raw_or_zero(), &self.config.adc);

        let target_hz = target_frequency_hz(frequency_volts, &self.config.mapping);
        let target_duty = target_duty(amplitude_volts, &self.config.mapping);
        let registers = PwmRegisters::derive(target_hz, target_duty, self.config.timer_clock_hz);

        self.sink.write(registers);

        ControlOutput {
            amplitude,
            frequency,
            target_hz,
            target_duty,
            registers,
        }
    }

    /// Update on an absolute schedule forever.
    pub async fn run(&mut self) -> ! {
        let mut ticker = Ticker::every(self.period);
        loop {
            ticker.next().await;
            let out = self.update().await;
            if out.amplitude.is_stale() || out.frequency.is_stale() {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "stale average (amp stale={}, freq stale={})",
                    out.amplitude.is_stale(),
                    out.frequency.is_stale()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Sampler;
    use crate::source::{Frame, SampleRegisters};
    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::Timer;
    use std::vec::Vec;

    type Buffers = AveragingBuffers<CriticalSectionRawMutex, 8>;

    const CLOCK_HZ: u32 = 5_000_000;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<PwmRegisters>,
    }

    impl PwmSink for Recorder {
        fn write(&mut self, registers: PwmRegisters) {
            self.writes.push(registers);
        }
    }

    fn fill(buffers: &Buffers, frame: Frame) {
        block_on(async {
            for _ in 0..8 {
                assert!(buffers.insert(frame).await);
            }
        });
    }

    #[test]
    fn setpoint_inputs_give_reference_output() {
        let buffers = Buffers::new();
        fill(&buffers, Frame::new(2481, 2481));
        let mut ctrl = Controller::new(&buffers, Recorder::default(), ControlConfig::reference(CLOCK_HZ));

        let out = block_on(ctrl.update());

        assert_eq!(out.amplitude, Average::Fresh(2481));
        assert_eq!(out.frequency, Average::Fresh(2481));
        assert!((out.target_hz - 10_000.0).abs() < 10.0, "hz {}", out.target_hz);
        assert!((out.target_duty - 0.606).abs() < 1e-3, "duty {}", out.target_duty);

        let expected_period = libm::roundf(CLOCK_HZ as f32 / out.target_hz) as u32 - 1;
        let expected_compare = libm::roundf((expected_period + 1) as f32 * out.target_duty) as u32;
        assert_eq!(out.registers.period, expected_period);
        assert_eq!(out.registers.compare, expected_compare);
        assert_eq!(out.registers, PwmRegisters { period: 499, compare: 303 });
        assert_eq!(ctrl.sink().writes.as_slice(), &[out.registers]);
    }

    #[test]
    fn zero_inputs_hit_floor_and_zero_duty() {
        let buffers = Buffers::new();
        let mut ctrl = Controller::new(&buffers, Recorder::default(), ControlConfig::reference(CLOCK_HZ));

        let out = block_on(ctrl.update());

        assert_eq!(out.target_hz, 100.0);
        assert_eq!(out.target_duty, 0.0);
        assert_eq!(out.registers, PwmRegisters { period: 49_999, compare: 0 });
    }

    #[test]
    fn full_scale_amplitude_saturates_duty() {
        let buffers = Buffers::new();
        fill(&buffers, Frame::new(4095, 2481));
        let mut ctrl = Controller::new(&buffers, Recorder::default(), ControlConfig::reference(CLOCK_HZ));

        let out = block_on(ctrl.update());

        assert_eq!(out.target_duty, 1.0);
        assert_eq!(out.registers.compare, out.registers.period + 1);
    }

    #[test]
    fn stale_averages_degrade_to_zero_volts() {
        let buffers = Buffers::with_lock_timeout(Duration::from_millis(3));
        fill(&buffers, Frame::new(2481, 2481));
        let mut ctrl = Controller::new(&buffers, Recorder::default(), ControlConfig::reference(CLOCK_HZ));

        let out = block_on(async {
            let _guard = buffers.hold_lock().await;
            ctrl.update().await
        });

        assert_eq!(out.amplitude, Average::Stale);
        assert_eq!(out.frequency, Average::Stale);
        assert_eq!(out.target_hz, 100.0);
        assert_eq!(out.target_duty, 0.0);
        // the register pair is still written
        assert_eq!(ctrl.sink().writes.len(), 1);
    }

    #[test]
    fn each_update_writes_one_fresh_pair() {
        let buffers = Buffers::new();
        let mut ctrl = Controller::new(&buffers, Recorder::default(), ControlConfig::reference(CLOCK_HZ));

        fill(&buffers, Frame::new(1240, 1240));
        let first = block_on(ctrl.update());
        fill(&buffers, Frame::new(2481, 2481));
        let second = block_on(ctrl.update());

        assert!(second.target_hz > first.target_hz);
        assert!(second.target_duty > first.target_duty);
        assert_eq!(ctrl.sink().writes.as_slice(), &[first.registers, second.registers]);
    }

    #[test]
    fn sampler_and_controller_pipeline() {
        let regs = SampleRegisters::new();
        regs.publish(Channel::Amplitude, 2481);
        regs.publish(Channel::Frequency, 2481);

        let buffers = Buffers::new();
        let sampler = Sampler::with_period(&regs, &buffers, Duration::from_millis(2));
        let mut ctrl = Controller::with_period(
            &buffers,
            Recorder::default(),
            ControlConfig::reference(CLOCK_HZ),
            Duration::from_millis(4),
        );

        block_on(select(
            select(sampler.run(), ctrl.run()),
            Timer::after(Duration::from_millis(60)),
        ));

        let writes = &ctrl.sink().writes;
        assert!(writes.len() >= 5, "only {} writes", writes.len());
        // once the rings are full the output settles on the setpoint pair
        assert_eq!(writes.last(), Some(&PwmRegisters { period: 499, compare: 303 }));
        // zero-filled rings only ever read at or below the setpoint
        assert!(writes.iter().all(|r| r.period >= 499));
    }
}
