//! Simulated timer and ports for host-side tests and bring-up.
//!
//! The register blocks are owned outside the engine and shared into the
//! handles by reference, so a test can hand the engine its
//! [`SimTimer`]/[`SimPort`] handles and still observe every compare value
//! and pin level. There are no real interrupts on the host: the test harness
//! is the time source and calls the two compare entry points itself,
//! typically via [`SimBoard::run_period`].

use core::cell::Cell;

use crate::hal::{CompareTimer, OutputPort, PORT_COUNT};
use crate::soft_pwm::PwmShared;
use crate::timing::Divider;

/// Register block behind a [`SimTimer`].
#[derive(Debug, Default)]
pub struct SimTimerRegs {
    /// Programmed period compare value.
    pub period_compare: Cell<u16>,
    /// Programmed next-event compare value.
    pub event_compare: Cell<u16>,
    /// Divider the counter runs at, `None` while halted.
    pub divider: Cell<Option<Divider>>,
    /// Number of counter resets observed.
    pub resets: Cell<u32>,
}

impl SimTimerRegs {
    /// Fresh block with everything zeroed and the clock halted.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period_compare: Cell::new(0),
            event_compare: Cell::new(0),
            divider: Cell::new(None),
            resets: Cell::new(0),
        }
    }

    /// Whether the counter is being clocked.
    #[must_use]
    pub fn running(&self) -> bool {
        self.divider.get().is_some()
    }
}

/// [`CompareTimer`] over a shared [`SimTimerRegs`].
#[derive(Clone, Copy, Debug)]
pub struct SimTimer<'a> {
    regs: &'a SimTimerRegs,
}

impl<'a> SimTimer<'a> {
    /// Handle over the given register block.
    #[must_use]
    pub const fn new(regs: &'a SimTimerRegs) -> Self {
        Self { regs }
    }
}

impl CompareTimer for SimTimer<'_> {
    fn reset_counter(&mut self) {
        self.regs.resets.set(self.regs.resets.get().wrapping_add(1));
    }

    fn set_period_compare(&mut self, ticks: u16) {
        self.regs.period_compare.set(ticks);
    }

    fn set_event_compare(&mut self, ticks: u16) {
        self.regs.event_compare.set(ticks);
    }

    fn enable(&mut self, divider: Divider) {
        self.regs.divider.set(Some(divider));
    }

    fn disable(&mut self) {
        self.regs.divider.set(None);
    }
}

/// Pin state behind a [`SimPort`].
#[derive(Debug, Default)]
pub struct SimPortPins {
    /// Output level of each pin.
    pub level: Cell<u8>,
    /// Direction of each pin, 1 = output.
    pub direction: Cell<u8>,
}

impl SimPortPins {
    /// Fresh port with all pins low and configured as inputs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: Cell::new(0),
            direction: Cell::new(0),
        }
    }
}

/// [`OutputPort`] over a shared [`SimPortPins`].
#[derive(Clone, Copy, Debug)]
pub struct SimPort<'a> {
    pins: &'a SimPortPins,
}

impl<'a> SimPort<'a> {
    /// Handle over the given pin state.
    #[must_use]
    pub const fn new(pins: &'a SimPortPins) -> Self {
        Self { pins }
    }
}

impl OutputPort for SimPort<'_> {
    fn make_output(&mut self, bit: u8) {
        self.pins
            .direction
            .set(self.pins.direction.get() | (1 << bit));
    }

    fn set_bits(&mut self, mask: u8) {
        self.pins.level.set(self.pins.level.get() | mask);
    }

    fn clear_bits(&mut self, mask: u8) {
        self.pins.level.set(self.pins.level.get() & !mask);
    }
}

/// A full simulated target: one timer and [`PORT_COUNT`] ports.
#[derive(Debug, Default)]
pub struct SimBoard {
    /// The timer register block.
    pub timer: SimTimerRegs,
    /// Pin state per port.
    pub ports: [SimPortPins; PORT_COUNT],
}

impl SimBoard {
    /// Fresh board, everything halted and low.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timer: SimTimerRegs::new(),
            ports: [
                SimPortPins::new(),
                SimPortPins::new(),
                SimPortPins::new(),
                SimPortPins::new(),
            ],
        }
    }

    /// Timer handle to hand to the engine.
    #[must_use]
    pub const fn timer_handle(&self) -> SimTimer<'_> {
        SimTimer::new(&self.timer)
    }

    /// Port handles to hand to the engine, in port order.
    #[must_use]
    pub const fn port_handles(&self) -> [SimPort<'_>; PORT_COUNT] {
        [
            SimPort::new(&self.ports[0]),
            SimPort::new(&self.ports[1]),
            SimPort::new(&self.ports[2]),
            SimPort::new(&self.ports[3]),
        ]
    }

    /// Current level of one port.
    #[must_use]
    pub fn level(&self, port: usize) -> u8 {
        self.ports.get(port).map_or(0, |pins| pins.level.get())
    }

    /// Play one full period against `shared` as the explicit time source.
    ///
    /// Fires the period-boundary handler, then every event compare that
    /// falls before the period compare, and records the port-0 level after
    /// each step as `(tick, level)` samples. The period-start sample is at
    /// tick 0.
    pub fn run_period<const N: usize>(
        &self,
        shared: &PwmShared<SimTimer<'_>, SimPort<'_>, N>,
    ) -> heapless::Vec<(u16, u8), 16> {
        let mut samples = heapless::Vec::new();
        if !self.timer.running() {
            return samples;
        }
        shared.on_period_compare();
        let _ = samples.push((0, self.level(0)));
        loop {
            let next = self.timer.event_compare.get();
            if next >= self.timer.period_compare.get() {
                break;
            }
            shared.on_event_compare();
            let _ = samples.push((next, self.level(0)));
        }
        samples
    }
}
