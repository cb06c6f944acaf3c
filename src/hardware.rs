use defmt::info;
use embassy_rp::adc::{self, Adc, Async, Channel as AdcChannel};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::pwm::{Config, Pwm};
use embassy_rp::Peripherals;
use fixed::types::extra::U4;
use fixed::FixedU16;

use analog_follower::mapping::PwmRegisters;
use analog_follower::pwm::{saturate_u16, PwmSink};

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

// 125 MHz / 25 = 5 MHz counter clock, so a 100 Hz period (49_999) still fits in 16 bits.
pub const PWM_CLOCK_DIVIDER: u8 = 25;

pub struct Hardware {
    pub adc: Adc<'static, Async>,
    /// GPIO26 = amplitude, GPIO27 = frequency, in `Channel::index` order.
    pub inputs: [AdcChannel<'static>; 2],
    pub pwm: PwmOutput,
    pub led: Output<'static>,
}

pub fn init(p: Peripherals) -> Hardware {
    let led = Output::new(p.PIN_25, Level::Low);

    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let inputs = [
        AdcChannel::new_pin(p.PIN_26, Pull::None),
        AdcChannel::new_pin(p.PIN_27, Pull::None),
    ];

    let mut c = Config::default();
    c.divider = FixedU16::<U4>::from_num(PWM_CLOCK_DIVIDER);
    c.phase_correct = false;
    c.compare_a = 0; // output idles low until the first control cycle

    let timer_clock_hz = embassy_rp::clocks::clk_sys_freq() / PWM_CLOCK_DIVIDER as u32;
    info!("PWM divider: {}", PWM_CLOCK_DIVIDER);
    info!("PWM timer clock: {} Hz", timer_clock_hz);

    // Slice 0 channel A -> GPIO0
    let pwm = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_0, c.clone());

    Hardware {
        adc,
        inputs,
        pwm: PwmOutput {
            pwm,
            config: c,
            timer_clock_hz,
        },
        led,
    }
}

/// PWM slice 0, channel A. `top` is the reload value, `compare_a` the pulse width.
pub struct PwmOutput {
    pwm: Pwm<'static>,
    config: Config,
    timer_clock_hz: u32,
}

impl PwmOutput {
    pub fn timer_clock_hz(&self) -> u32 {
        self.timer_clock_hz
    }
}

impl PwmSink for PwmOutput {
    // No lock here: the counter keeps running and may pick up `top` and
    // `compare_a` on different wraps.
    fn write(&mut self, registers: PwmRegisters) {
        self.config.top = saturate_u16(registers.period);
        self.config.compare_a = saturate_u16(registers.compare);
        self.pwm.set_config(&self.config);
    }
}
