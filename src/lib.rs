//! Glitch-free multi-line software PWM from one two-compare hardware timer.
//!
//! A single counting timer with two compare units is enough to modulate any
//! number of GPIO lines: one compare marks the period boundary (all active
//! lines go high), the other is re-armed within the period at each "lines
//! off" threshold. This crate is that engine: it turns per-line duty
//! requests into a compact event schedule and hands schedules from the
//! foreground task to the interrupt side without ever tearing an in-progress
//! waveform.
//!
//! The engine owns no hardware. It is generic over a [`CompareTimer`] and
//! four [`OutputPort`] handles ([`hal`]); firmware implements those over the
//! real registers, and host tests run against the simulated versions in
//! [`sim`].
//!
//! # Glossary
//!
//! - **Duty cycle:** fraction of a period a line is driven high, always a
//!   tick count here.
//! - **Period boundary:** the instant the timer wraps and a new cycle begins
//!   for all lines simultaneously.
//! - **Schedule:** one period's worth of events, a single
//!   [`HighEvent`](schedule::HighEvent) at tick 0 plus ascending
//!   [`LowEvent`](schedule::LowEvent)s.
//! - **Handoff:** the staged copy of schedule/timing adopted by the
//!   interrupt side at a period boundary, so reconfiguration never tears the
//!   active waveform.

#![cfg_attr(not(test), no_std)]

mod error;
pub mod hal;
pub mod handoff;
pub mod line;
pub mod schedule;
pub mod sim;
mod soft_pwm;
pub mod timing;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
pub use crate::hal::{CompareTimer, OutputPort, PORT_COUNT};
pub use crate::soft_pwm::{PwmShared, SoftPwm};
