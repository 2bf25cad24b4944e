//! Hardware capability traits consumed by the PWM engine.
//!
//! The engine never touches registers directly. It is generic over one
//! [`CompareTimer`] handle and [`PORT_COUNT`] [`OutputPort`] handles injected
//! at [`SoftPwm::init`](crate::SoftPwm::init). Firmware implements these over
//! the real timer/port registers; host tests use the simulated versions in
//! [`sim`](crate::sim).

use crate::timing::Divider;

/// Number of physical 8-bit ports the engine can drive.
///
/// Event masks carry one byte per port, matching the target's port-register
/// memory layout, so all lines sharing a threshold toggle with single
/// read-modify-write stores.
pub const PORT_COUNT: usize = 4;

/// A counting hardware timer with two independent compare units.
///
/// The *period* compare defines the waveform period; reaching it must invoke
/// [`PwmShared::on_period_compare`](crate::PwmShared::on_period_compare). The
/// *event* compare is reprogrammed within each period to the next "lines off"
/// threshold; reaching it must invoke
/// [`PwmShared::on_event_compare`](crate::PwmShared::on_event_compare).
pub trait CompareTimer {
    /// Reset the counter to zero.
    fn reset_counter(&mut self);

    /// Program the period compare unit.
    fn set_period_compare(&mut self, ticks: u16);

    /// Program the next-event compare unit.
    fn set_event_compare(&mut self, ticks: u16);

    /// Feed the counter from the clock through `divider`.
    fn enable(&mut self, divider: Divider);

    /// Disconnect the counter from the clock, halting all timing.
    fn disable(&mut self);
}

/// One physical 8-bit output port.
///
/// Mask writes must be single read-modify-write stores on the real register
/// (`reg |= mask`, `reg &= !mask`) so that grouped lines switch together.
pub trait OutputPort {
    /// Configure `bit` as an output.
    fn make_output(&mut self, bit: u8);

    /// Drive every bit in `mask` high, leaving the rest untouched.
    fn set_bits(&mut self, mask: u8);

    /// Drive every bit in `mask` low, leaving the rest untouched.
    fn clear_bits(&mut self, mask: u8);
}
