//! Crate-wide error type.
//!
//! Almost nothing here fails: the engine clamps out-of-range requests
//! silently (and observably, via the realized-value queries on
//! [`SoftPwm`](crate::SoftPwm)). Only API misuse at initialization time is
//! reported as an error.

use derive_more::{Display, Error};

/// Error type for `pwm-envoy` operations.
#[derive(Debug, Display, Error, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The shared cell already holds an interrupt core.
    ///
    /// [`SoftPwm::init`](crate::SoftPwm::init) may be called at most once per
    /// [`PwmShared`](crate::PwmShared).
    #[display("shared PWM cell is already bound to an engine")]
    AlreadyBound,

    /// The system clock rate is below 1 MHz.
    ///
    /// Tick conversion works in whole MHz, so slower clocks cannot be
    /// represented.
    #[display("clock rate must be at least 1 MHz")]
    InvalidClockRate,
}

/// Result type alias using this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
