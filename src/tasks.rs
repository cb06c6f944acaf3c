use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::adc::{Adc, Async, Channel as AdcChannel};
use embassy_rp::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Ticker, Timer};

use analog_follower::config::{ADC_12BIT_3V3, DIAGNOSTICS_PERIOD, LED_PERIOD, SAMPLES_PER_AVERAGE};
use analog_follower::{Channel, Controller, SampleRegisters, Sampler, SharedBuffers};

use crate::hardware::PwmOutput;

pub type FirmwareSampler =
    Sampler<'static, &'static SampleRegisters, CriticalSectionRawMutex, SAMPLES_PER_AVERAGE>;
pub type FirmwareController =
    Controller<'static, PwmOutput, CriticalSectionRawMutex, SAMPLES_PER_AVERAGE>;

const CONVERSION_ERROR_LOG_EVERY: u32 = 1000;

/// Free-running converter: amplitude then frequency, forever, publishing each
/// code as soon as it is ready. Stands in for a circular ADC DMA channel.
#[embassy_executor::task]
pub async fn conversion_task(
    mut adc: Adc<'static, Async>,
    mut inputs: [AdcChannel<'static>; 2],
    registers: &'static SampleRegisters,
) {
    let mut errors: u32 = 0;
    loop {
        for (channel, input) in Channel::ALL.into_iter().zip(inputs.iter_mut()) {
            match adc.read(input).await {
                Ok(code) => registers.publish(channel, code),
                Err(_e) => {
                    // slot keeps its previous code
                    errors = errors.wrapping_add(1);
                    if errors % CONVERSION_ERROR_LOG_EVERY == 1 {
                        warn!("ADC error on {} ({} total)", channel, errors);
                    }
                }
            }
        }
        yield_now().await;
    }
}

#[embassy_executor::task]
pub async fn sampler_task(sampler: FirmwareSampler) {
    info!("Sampler running");
    sampler.run().await
}

#[embassy_executor::task]
pub async fn controller_task(mut controller: FirmwareController) {
    info!(
        "Controller running, timer clock {} Hz",
        controller.config().timer_clock_hz
    );
    controller.run().await
}

#[embassy_executor::task]
pub async fn led_task(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after(LED_PERIOD).await;
    }
}

/// Logs both averages through the volts getter once a second.
#[embassy_executor::task]
pub async fn diagnostics_task(buffers: &'static SharedBuffers) {
    let mut ticker = Ticker::every(DIAGNOSTICS_PERIOD);
    loop {
        ticker.next().await;
        let amplitude_v = buffers.average_volts(Channel::Amplitude, &ADC_12BIT_3V3).await;
        let frequency_v = buffers.average_volts(Channel::Frequency, &ADC_12BIT_3V3).await;
        info!(
            "Amplitude = {} V, Frequency = {} V (dropped {}, stale {})",
            amplitude_v,
            frequency_v,
            buffers.dropped_samples(),
            buffers.stale_reads()
        );
    }
}
