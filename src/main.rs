#![no_std]
#![no_main]

use cortex_m::singleton;
use cortex_m_rt::{exception, ExceptionFrame};
use defmt::*;
use embassy_executor::{InterruptExecutor, SpawnError, Spawner};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::Peripherals;

use {defmt_rtt as _, panic_probe as _};

use analog_follower::{ControlConfig, Controller, SampleRegisters, Sampler, SharedBuffers};

mod hardware;
mod tasks;

use tasks::{conversion_task, controller_task, diagnostics_task, led_task, sampler_task};

// Sampler > controller > everything on the thread executor.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MED: InterruptExecutor = InterruptExecutor::new();

/// Written by the conversion task only.
static SAMPLE_REGISTERS: SampleRegisters = SampleRegisters::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[interrupt]
unsafe fn SWI_IRQ_0() {
    EXECUTOR_MED.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p: Peripherals = embassy_rp::init(Default::default());
    let hw = hardware::init(p);

    let buffers: &'static SharedBuffers = match singleton!(: SharedBuffers = SharedBuffers::new()) {
        Some(buffers) => buffers,
        None => fatal("averaging buffers"),
    };

    let timer_clock_hz = hw.pwm.timer_clock_hz();
    let sampler = Sampler::new(&SAMPLE_REGISTERS, buffers);
    let controller = Controller::new(buffers, hw.pwm, ControlConfig::reference(timer_clock_hz));

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawn_or_halt("sampler", high.spawn(sampler_task(sampler)));

    interrupt::SWI_IRQ_0.set_priority(Priority::P3);
    let med = EXECUTOR_MED.start(interrupt::SWI_IRQ_0);
    spawn_or_halt("controller", med.spawn(controller_task(controller)));

    spawn_or_halt(
        "conversion",
        spawner.spawn(conversion_task(hw.adc, hw.inputs, &SAMPLE_REGISTERS)),
    );
    spawn_or_halt("led", spawner.spawn(led_task(hw.led)));
    spawn_or_halt("diagnostics", spawner.spawn(diagnostics_task(buffers)));

    info!("Analog follower started");
}

fn spawn_or_halt(name: &str, spawned: Result<(), SpawnError>) {
    if spawned.is_err() {
        fatal(name);
    }
}

/// Nothing can run safely without the shared buffers or one of the tasks:
/// stop every executor and idle where a debugger can find us.
fn fatal(what: &str) -> ! {
    error!("Cannot start {}, halting", what);
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[exception]
unsafe fn HardFault(_frame: &ExceptionFrame) -> ! {
    loop {
        cortex_m::asm::nop();
    }
}
