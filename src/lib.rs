//! Analog-follower PWM controller.
//!
//! Two analog inputs are sampled continuously into a register pair, averaged
//! over the last few samples under one lock, and mapped open-loop to the
//! frequency and duty cycle of a PWM output:
//!
//! converter → [`SampleRegisters`] → [`Sampler`] → [`AveragingBuffers`]
//! → [`Controller`] → [`PwmSink`]
//!
//! Everything here is target independent; the RP2040 wiring lives in the
//! firmware binary.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod averaging;
pub mod config;
pub mod controller;
pub mod conversion;
pub mod mapping;
pub mod pwm;
pub mod sampler;
pub mod source;

pub use averaging::{Average, AveragingBuffers, SharedBuffers};
pub use config::{AdcConfig, ControlConfig, MappingConfig};
pub use controller::{ControlOutput, Controller};
pub use mapping::PwmRegisters;
pub use pwm::PwmSink;
pub use sampler::Sampler;
pub use source::{Channel, Frame, SampleRegisters, SampleSource};
