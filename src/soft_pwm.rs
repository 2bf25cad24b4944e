//! The engine: shared interrupt core plus the foreground control half.
//!
//! [`PwmShared`] is the cell the application places in a `static`; its two
//! methods are the compare-interrupt entry points. [`SoftPwm`] is the
//! foreground configuration handle created by [`SoftPwm::init`]. The two
//! halves meet only in the [`Handoff`], so a handler is never delayed by
//! more than the bounded copy of one staged publication.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

use crate::error::{Error, Result};
use crate::hal::{CompareTimer, OutputPort, PORT_COUNT};
use crate::handoff::Handoff;
use crate::line::Line;
use crate::schedule::{PortMasks, Schedule};
use crate::timing::{Divider, TICKS_MAX, TimingConfig, micros_to_ticks};

/// Interrupt-owned state: the hardware handles, the active schedule, and the
/// low-event cursor. Lives inside [`PwmShared`] and is touched only with
/// interrupts masked.
struct IsrCore<T, P, const N: usize> {
    timer: T,
    ports: [P; PORT_COUNT],
    active: Schedule<N>,
    timing: TimingConfig,
    cursor: usize,
}

impl<T: CompareTimer, P: OutputPort, const N: usize> IsrCore<T, P, N> {
    /// Period-boundary work: restart the cycle, adopt any completed staged
    /// publication, arm the first low event, drive the high event.
    fn period_boundary(&mut self, handoff: &Handoff<N>) {
        self.timer.reset_counter();

        if let Some(staged) = handoff.take() {
            if let Some(schedule) = staged.schedule {
                self.active = schedule;
            }
            if let Some(timing) = staged.timing {
                if timing.divider != self.timing.divider {
                    self.timer.enable(timing.divider);
                }
                self.timer.set_period_compare(timing.period_ticks);
                self.timing = timing;
            }
        }

        self.cursor = 0;
        self.timer
            .set_event_compare(self.active.low_event(0).threshold);

        // Ports are written in the same ascending order every period (and in
        // the low events), so instruction-timing skew between ports stays a
        // constant offset instead of phase jitter.
        for (index, port) in self.ports.iter_mut().enumerate() {
            port.set_bits(self.active.high.set.port(index));
        }
    }

    /// Next-event work: clear the current event's lines, arm the next.
    fn event_boundary(&mut self) {
        let event = self.active.low_event(self.cursor);
        for (index, port) in self.ports.iter_mut().enumerate() {
            port.clear_bits(event.clear.port(index));
        }
        self.cursor = self.cursor.saturating_add(1);
        self.timer
            .set_event_compare(self.active.low_event(self.cursor).threshold);
    }

    /// Resume counting from a clean period.
    fn resume(&mut self) {
        self.timer.reset_counter();
        self.timer.enable(self.timing.divider);
    }

    /// Halt the clock and force the given lines low.
    fn halt(&mut self, lines_low: &PortMasks) {
        self.timer.disable();
        for (index, port) in self.ports.iter_mut().enumerate() {
            port.clear_bits(lines_low.port(index));
        }
    }
}

/// Shared cell holding the interrupt core; place one in a `static` and call
/// its two compare entry points from the matching interrupt handlers.
///
/// On a host there are no interrupts: a test harness calls the entry points
/// itself as an explicit time source (see [`SimBoard`](crate::sim::SimBoard)).
///
/// # Example
///
/// ```rust
/// use pwm_envoy::sim::SimBoard;
/// use pwm_envoy::{PwmShared, SoftPwm};
///
/// let board = SimBoard::new();
/// let shared: PwmShared<_, _, 4> = PwmShared::new();
/// let mut pwm = SoftPwm::init(
///     &shared,
///     board.timer_handle(),
///     board.port_handles(),
///     &[(0, 0), (0, 1)],
///     1_024,     // period, µs
///     8_000_000, // clock, Hz
/// )?;
///
/// pwm.set_phase(0, 256);
/// let samples = board.run_period(&shared);
/// assert_eq!(samples[0].1 & 0b01, 0b01); // line 0 high at the period start
/// # Ok::<(), pwm_envoy::Error>(())
/// ```
pub struct PwmShared<T, P, const N: usize> {
    core: Mutex<RefCell<Option<IsrCore<T, P, N>>>>,
    handoff: Handoff<N>,
}

impl<T, P, const N: usize> PwmShared<T, P, N> {
    /// An empty cell; [`SoftPwm::init`] binds the engine into it.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            core: Mutex::new(RefCell::new(None)),
            handoff: Handoff::new(),
        }
    }
}

impl<T, P, const N: usize> Default for PwmShared<T, P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CompareTimer, P: OutputPort, const N: usize> PwmShared<T, P, N> {
    /// Period-boundary compare handler. Fires exactly once per period.
    pub fn on_period_compare(&self) {
        critical_section::with(|cs| {
            if let Some(core) = self.core.borrow_ref_mut(cs).as_mut() {
                core.period_boundary(&self.handoff);
            }
        });
    }

    /// Next-event compare handler. Fires 0..N times per period, at the
    /// ascending low-event thresholds.
    pub fn on_event_compare(&self) {
        critical_section::with(|cs| {
            if let Some(core) = self.core.borrow_ref_mut(cs).as_mut() {
                core.event_boundary();
            }
        });
    }

    /// Whether a staged reconfiguration is waiting for the next period
    /// boundary. Diagnostic; the swap itself is automatic.
    #[must_use]
    pub fn reconfiguration_pending(&self) -> bool {
        self.handoff.is_pending()
    }

    pub(crate) fn handoff(&self) -> &Handoff<N> {
        &self.handoff
    }

    fn install(&self, core: IsrCore<T, P, N>) -> Result<()> {
        critical_section::with(|cs| {
            let mut slot = self.core.borrow_ref_mut(cs);
            if slot.is_some() {
                return Err(Error::AlreadyBound);
            }
            *slot = Some(core);
            Ok(())
        })
    }

    /// Run `f` on the core with both handlers masked.
    fn with_core<R>(&self, f: impl FnOnce(&mut IsrCore<T, P, N>) -> R) -> Option<R> {
        critical_section::with(|cs| self.core.borrow_ref_mut(cs).as_mut().map(f))
    }
}

/// Foreground control half of the engine: duty and period requests, start
/// and stop, and the realized-value queries.
///
/// All requests clamp silently rather than fail; the queries expose what was
/// actually realized. Changes take effect at the next period boundary, so a
/// query can run up to one period ahead of the waveform.
///
/// See [`PwmShared`] for a complete example.
pub struct SoftPwm<'a, T, P, const N: usize> {
    shared: &'a PwmShared<T, P, N>,
    lines: Vec<Line, N>,
    timing: TimingConfig,
    clock_hz: u32,
}

impl<'a, T: CompareTimer, P: OutputPort, const N: usize> SoftPwm<'a, T, P, N> {
    /// Bind GPIO lines, compute initial timing, install the interrupt core,
    /// and start the timer.
    ///
    /// Lines beyond the capacity `N`, and pairs that do not name a real port
    /// bit, are dropped silently; every accepted line starts at duty 0
    /// (off) and is marked as an output.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyBound`] if `shared` already holds an engine;
    /// [`Error::InvalidClockRate`] if `clock_hz` is below 1 MHz.
    pub fn init(
        shared: &'a PwmShared<T, P, N>,
        timer: T,
        mut ports: [P; PORT_COUNT],
        lines: &[(u8, u8)],
        period_us: u32,
        clock_hz: u32,
    ) -> Result<Self> {
        if clock_hz < 1_000_000 {
            return Err(Error::InvalidClockRate);
        }

        let mut registry: Vec<Line, N> = Vec::new();
        for &(port, bit) in lines {
            if registry.is_full() {
                break;
            }
            if let Some(line) = Line::bound(port, bit) {
                if let Some(handle) = ports.get_mut(usize::from(line.port)) {
                    handle.make_output(line.bit);
                }
                let _ = registry.push(line);
            }
        }

        let timing = TimingConfig::for_period(period_us, clock_hz);
        let mut core = IsrCore {
            timer,
            ports,
            active: Schedule::IDLE,
            timing,
            cursor: 0,
        };
        core.timer.set_period_compare(timing.period_ticks);
        core.timer.set_event_compare(TICKS_MAX);
        core.timer.reset_counter();
        core.timer.enable(timing.divider);
        shared.install(core)?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "soft-pwm: {} lines, period {} ticks at {}",
            registry.len(),
            timing.period_ticks,
            timing.divider
        );

        Ok(Self {
            shared,
            lines: registry,
            timing,
            clock_hz,
        })
    }

    /// Request a new on-time for one line.
    ///
    /// An out-of-range `index` is a no-op. A duty whose realized tick count
    /// equals the line's current one is a no-op too: nothing is rebuilt and
    /// nothing is staged. Otherwise the whole schedule is rebuilt on
    /// foreground memory and staged for the next period boundary.
    pub fn set_phase(&mut self, index: usize, duty_us: u32) {
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        let duty_ticks = micros_to_ticks(duty_us, self.clock_hz, self.timing.divider);
        if line.duty_ticks == duty_ticks {
            // Same realized ticks; remember the request for future divider
            // changes, but skip the rebuild.
            line.duty_us = duty_us;
            return;
        }
        line.duty_us = duty_us;
        line.duty_ticks = duty_ticks;

        #[cfg(feature = "defmt")]
        defmt::trace!("soft-pwm: line {} -> {} ticks", index, duty_ticks);

        let schedule = Schedule::rebuild(&self.lines, self.timing.period_ticks);
        self.shared.handoff().stage_schedule(schedule);
    }

    /// Request a new period.
    ///
    /// The divider is reselected for the new period; an unattainable request
    /// clamps to the longest period the largest divider covers. Every
    /// line's duty is re-derived from its requested on-time at the new
    /// timing, and schedule and timing are staged together so both switch
    /// at the same period boundary. A request realizing the current timing
    /// is a no-op.
    pub fn set_period(&mut self, period_us: u32) {
        let timing = TimingConfig::for_period(period_us, self.clock_hz);
        if timing == self.timing {
            return;
        }
        self.timing = timing;
        for line in &mut self.lines {
            line.duty_ticks = micros_to_ticks(line.duty_us, self.clock_hz, timing.divider);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "soft-pwm: period -> {} ticks at {}",
            timing.period_ticks,
            timing.divider
        );

        let schedule = Schedule::rebuild(&self.lines, timing.period_ticks);
        self.shared.handoff().stage_both(schedule, timing);
    }

    /// Resume timing from a clean period after [`stop`](Self::stop).
    pub fn start(&self) {
        #[cfg(feature = "defmt")]
        defmt::info!("soft-pwm: start");
        self.shared.with_core(|core| core.resume());
    }

    /// Halt all timing and drive every configured line low.
    ///
    /// The only path that touches pins outside the handlers and `init`; it
    /// runs with both handlers masked so it cannot race them.
    pub fn stop(&self) {
        #[cfg(feature = "defmt")]
        defmt::info!("soft-pwm: stop");
        let mut lines_low = PortMasks::EMPTY;
        for line in &self.lines {
            lines_low.insert(line.port, line.bit_mask());
        }
        self.shared.with_core(|core| core.halt(&lines_low));
    }

    /// Number of lines actually bound (after any truncation).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Realized period in ticks.
    #[must_use]
    pub const fn period_ticks(&self) -> u16 {
        self.timing.period_ticks
    }

    /// Clock divider in effect.
    #[must_use]
    pub const fn divider(&self) -> Divider {
        self.timing.divider
    }

    /// The period actually produced, in microseconds, after clamping and
    /// granularity rounding.
    #[must_use]
    pub const fn realized_period_us(&self) -> u32 {
        self.timing.realized_period_us(self.clock_hz)
    }

    /// Realized duty of one line in ticks, clamped to the period ("always
    /// on"), or `None` for an out-of-range index.
    #[must_use]
    pub fn duty_ticks(&self, index: usize) -> Option<u16> {
        self.lines
            .get(index)
            .map(|line| line.duty_ticks.min(self.timing.period_ticks))
    }
}
