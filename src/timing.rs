//! Conversion of requested durations into timer ticks.
//!
//! All requests arrive as integer microseconds and leave as 16-bit tick
//! counts at a chosen clock [`Divider`]. Out-of-range requests are clamped,
//! never rejected; the realized values can be read back through
//! [`SoftPwm`](crate::SoftPwm).

/// Largest representable tick count; also the sentinel threshold that is
/// unreachable within any period.
pub const TICKS_MAX: u16 = u16::MAX;

/// Tick counts are rounded down to this granularity.
///
/// Coarser phase steps keep a compare match from landing closer to the next
/// one than the handlers can service. Tuned for clocks in the 8-20 MHz range
/// with dividers of 8 and up; a divider of 1 at those clocks would want a
/// coarser mask (0xFF80), and 64 and up could run finer (0xFFFE).
pub const TICK_GRANULARITY_MASK: u16 = 0xFFF0;

/// Clock divider feeding the timer counter, from the fixed hardware set.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Divider {
    /// Undivided clock.
    Div1,
    /// Clock / 8.
    Div8,
    /// Clock / 64.
    Div64,
    /// Clock / 256.
    Div256,
    /// Clock / 1024.
    Div1024,
}

impl Divider {
    /// All dividers, ascending. Selection walks this list front to back.
    pub const ALL: [Self; 5] = [
        Self::Div1,
        Self::Div8,
        Self::Div64,
        Self::Div256,
        Self::Div1024,
    ];

    /// Numeric division ratio.
    #[must_use]
    pub const fn ratio(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div8 => 8,
            Self::Div64 => 64,
            Self::Div256 => 256,
            Self::Div1024 => 1024,
        }
    }

    /// Longest period (µs) that still fits the 16-bit tick range at this
    /// divider and clock.
    const fn max_period_us(self, clock_mhz: u32) -> u32 {
        ((self.ratio() as u64 * TICKS_MAX as u64) / clock_mhz as u64) as u32
    }
}

/// Timer configuration realized from a period request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Period length in timer ticks at `divider`.
    pub period_ticks: u16,
    /// Clock divider the ticks are counted at.
    pub divider: Divider,
}

impl TimingConfig {
    /// Choose the smallest divider whose tick range covers `period_us`, and
    /// convert the period to ticks at it.
    ///
    /// If even the largest divider cannot cover the request, the period is
    /// clamped to the longest one achievable there; callers observe the
    /// clamp through [`Self::realized_period_us`].
    #[must_use]
    pub fn for_period(period_us: u32, clock_hz: u32) -> Self {
        let clock_mhz = (clock_hz / 1_000_000).max(1);
        let divider = Divider::ALL
            .iter()
            .copied()
            .find(|divider| period_us < divider.max_period_us(clock_mhz))
            .unwrap_or(Divider::Div1024);
        let period_us = period_us.min(divider.max_period_us(clock_mhz));
        Self {
            period_ticks: micros_to_ticks(period_us, clock_hz, divider),
            divider,
        }
    }

    /// The period this configuration actually produces, in microseconds.
    #[must_use]
    pub const fn realized_period_us(self, clock_hz: u32) -> u32 {
        let clock_mhz = if clock_hz >= 1_000_000 {
            clock_hz / 1_000_000
        } else {
            1
        };
        ((self.period_ticks as u64 * self.divider.ratio() as u64) / clock_mhz as u64) as u32
    }
}

/// Convert a duration to timer ticks at the given divider.
///
/// Saturates at [`TICKS_MAX`], then rounds down by
/// [`TICK_GRANULARITY_MASK`].
#[must_use]
pub fn micros_to_ticks(us: u32, clock_hz: u32, divider: Divider) -> u16 {
    let clock_mhz = u64::from((clock_hz / 1_000_000).max(1));
    let ticks = (clock_mhz * u64::from(us)) / u64::from(divider.ratio());
    let ticks = ticks.min(u64::from(TICKS_MAX)) as u16;
    ticks & TICK_GRANULARITY_MASK
}
