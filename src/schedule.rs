//! The per-period event schedule and the pure function that builds it.
//!
//! A period's waveform is reduced to one [`HighEvent`] (all active lines go
//! high at tick 0) and an ascending run of [`LowEvent`]s (each clears every
//! line whose duty expires at that tick). Lines sharing a duty collapse into
//! one event, so the interrupt side does at most one pass over four port
//! registers per distinct duty value.

use crate::hal::PORT_COUNT;
use crate::line::Line;
use crate::timing::TICKS_MAX;
use heapless::Vec;

/// One bit mask per physical port, in port order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortMasks(pub [u8; PORT_COUNT]);

impl PortMasks {
    /// Masks with no bits set.
    pub const EMPTY: Self = Self([0; PORT_COUNT]);

    /// Add `bit_mask` to the mask for `port`.
    pub fn insert(&mut self, port: u8, bit_mask: u8) {
        if let Some(mask) = self.0.get_mut(usize::from(port)) {
            *mask |= bit_mask;
        }
    }

    /// The mask for one port (0 for an out-of-range index).
    #[must_use]
    pub fn port(&self, port: usize) -> u8 {
        self.0.get(port).copied().unwrap_or(0)
    }

    /// Whether any bit is set on any port.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; PORT_COUNT]
    }

    /// Whether the bit for `(port, bit_mask)` is present.
    #[must_use]
    pub fn contains(&self, port: u8, bit_mask: u8) -> bool {
        self.port(usize::from(port)) & bit_mask != 0
    }
}

/// The single "lines on" event at the start of every period.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HighEvent {
    /// Bits to set, per port. Lines with zero duty are excluded.
    pub set: PortMasks,
}

/// A "lines off" event at one tick threshold within the period.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LowEvent {
    /// Timer count at which the event fires.
    pub threshold: u16,
    /// Bits to clear, per port.
    pub clear: PortMasks,
}

impl LowEvent {
    /// Padding for unused slots: an empty event at a threshold no period
    /// reaches, so the interrupt side always has a next compare value to
    /// load.
    pub const SENTINEL: Self = Self {
        threshold: TICKS_MAX,
        clear: PortMasks::EMPTY,
    };
}

/// Everything needed to reproduce one period on all configured lines.
///
/// Two instances exist at runtime: the *active* one owned by the interrupt
/// side and the *staged* one in the [`Handoff`](crate::handoff::Handoff).
/// Adoption is a by-value copy, keeping the interrupt walk free of pointer
/// juggling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Schedule<const N: usize> {
    /// The period-start event.
    pub high: HighEvent,
    /// Low events sorted ascending by threshold, sentinel-padded.
    pub low: [LowEvent; N],
}

impl<const N: usize> Schedule<N> {
    /// Schedule that drives nothing: empty high event, all sentinels.
    pub const IDLE: Self = Self {
        high: HighEvent {
            set: PortMasks::EMPTY,
        },
        low: [LowEvent::SENTINEL; N],
    };

    /// The low event at `cursor`, or the sentinel once the real events are
    /// exhausted.
    #[must_use]
    pub fn low_event(&self, cursor: usize) -> LowEvent {
        self.low.get(cursor).copied().unwrap_or(LowEvent::SENTINEL)
    }

    /// Build the schedule for the given line duties. Deterministic and pure;
    /// runs in the foreground, never in a handler.
    ///
    /// - Lines with zero duty contribute to no event at all.
    /// - Lines whose duty reaches `period_ticks` are *always on*: set at the
    ///   period start and never cleared, since their threshold could not
    ///   fire before the period compare resets the cycle.
    /// - Equal duties collapse into a single low event (they must switch off
    ///   in the same register write).
    #[must_use]
    pub fn rebuild(lines: &[Line], period_ticks: u16) -> Self {
        let mut by_duty: Vec<(u16, u8, u8), N> = Vec::new();
        for line in lines.iter().take(N) {
            let _ = by_duty.push((line.duty_ticks, line.port, line.bit_mask()));
        }
        // Ties collapse into one event below, so unstable order among equal
        // duties cannot show in the output.
        by_duty.sort_unstable_by_key(|&(duty, _, _)| duty);

        let mut schedule = Self::IDLE;
        let mut open_threshold: Option<u16> = None;
        let mut next_slot: usize = 0;
        for &(duty, port, bit_mask) in &by_duty {
            if duty == 0 {
                continue;
            }
            schedule.high.set.insert(port, bit_mask);
            if duty >= period_ticks {
                continue;
            }
            if open_threshold != Some(duty) {
                if let Some(event) = schedule.low.get_mut(next_slot) {
                    *event = LowEvent {
                        threshold: duty,
                        clear: PortMasks::EMPTY,
                    };
                }
                open_threshold = Some(duty);
                next_slot = next_slot.saturating_add(1);
            }
            if let Some(event) = schedule.low.get_mut(next_slot.saturating_sub(1)) {
                event.clear.insert(port, bit_mask);
            }
        }
        schedule
    }
}
