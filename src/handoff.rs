//! Staged-to-active handoff between the foreground task and the handlers.
//!
//! Single producer (the foreground configuration path), single consumer (the
//! period-boundary handler). The producer rebuilds on its own memory, then
//! publishes finished values here inside one short critical section; the
//! consumer adopts them only at a period boundary. Restaging before the
//! previous publication is consumed replaces it wholesale: last-write-wins,
//! never queued, never torn.

use core::cell::RefCell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::schedule::Schedule;
use crate::timing::TimingConfig;

/// A complete staged publication, drained as a unit at a period boundary.
#[derive(Clone, Copy, Debug)]
pub struct Staged<const N: usize> {
    /// Replacement schedule, if one was staged.
    pub schedule: Option<Schedule<N>>,
    /// Replacement timing, if one was staged.
    pub timing: Option<TimingConfig>,
}

impl<const N: usize> Staged<N> {
    const EMPTY: Self = Self {
        schedule: None,
        timing: None,
    };
}

/// The staging cell itself.
///
/// `pending` is raised only after the staged values are complete, and the
/// copy in [`take`](Self::take) runs with interrupts masked, so the consumer
/// can never observe a partial publication.
pub struct Handoff<const N: usize> {
    staged: Mutex<RefCell<Staged<N>>>,
    pending: AtomicBool,
}

impl<const N: usize> Handoff<N> {
    /// An empty cell with nothing staged.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            staged: Mutex::new(RefCell::new(Staged::EMPTY)),
            pending: AtomicBool::new(false),
        }
    }

    /// Stage a replacement schedule.
    pub fn stage_schedule(&self, schedule: Schedule<N>) {
        critical_section::with(|cs| {
            self.staged.borrow_ref_mut(cs).schedule = Some(schedule);
            self.pending.store(true, Ordering::Release);
        });
    }

    /// Stage schedule and timing together, switching at the same boundary.
    pub fn stage_both(&self, schedule: Schedule<N>, timing: TimingConfig) {
        critical_section::with(|cs| {
            let mut staged = self.staged.borrow_ref_mut(cs);
            staged.schedule = Some(schedule);
            staged.timing = Some(timing);
            self.pending.store(true, Ordering::Release);
        });
    }

    /// Drain the staged publication, or `None` when nothing is pending.
    ///
    /// Called by the period-boundary handler only, so swaps happen at most
    /// once per period.
    pub fn take(&self) -> Option<Staged<N>> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        critical_section::with(|cs| {
            self.pending.store(false, Ordering::Release);
            let mut staged = self.staged.borrow_ref_mut(cs);
            Some(core::mem::replace(&mut *staged, Staged::EMPTY))
        })
    }

    /// Whether a publication is waiting for the next period boundary.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl<const N: usize> Default for Handoff<N> {
    fn default() -> Self {
        Self::new()
    }
}
