//! Registry of the GPIO lines the engine drives.

use crate::hal::PORT_COUNT;

/// One configured output line and its current duty setting.
///
/// Index into the registry is the line's public identity: it is how callers
/// address the line in [`SoftPwm::set_phase`](crate::SoftPwm::set_phase).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line {
    /// Physical port index, `0..PORT_COUNT`.
    pub port: u8,
    /// Bit within the port, `0..8`.
    pub bit: u8,
    /// Requested on-time in microseconds, kept so duties survive a divider
    /// change.
    pub duty_us: u32,
    /// On-time converted to ticks at the current divider.
    pub duty_ticks: u16,
}

impl Line {
    /// Bind a `(port, bit)` pair with duty initialized to 0 (off), or `None`
    /// if the pair does not name a real port bit.
    ///
    /// Invalid pairs are dropped silently by the caller, consistent with the
    /// startup-time clamping everywhere else: binding runs once before any
    /// context that could recover from an error exists.
    #[must_use]
    pub fn bound(port: u8, bit: u8) -> Option<Self> {
        if usize::from(port) >= PORT_COUNT || bit >= 8 {
            return None;
        }
        Some(Self {
            port,
            bit,
            duty_us: 0,
            duty_ticks: 0,
        })
    }

    /// Single-bit mask of this line within its port register.
    #[must_use]
    pub const fn bit_mask(&self) -> u8 {
        1 << self.bit
    }
}
