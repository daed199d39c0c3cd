//! # Tick Source
//!
//! Software side of the periodic timer. SysTick fires every tick; this
//! counts the running thread's quantum down and raises a switch request
//! when it runs out. The request is only a flag: the actual switch happens
//! later, in PendSV.
//!
//! Raising a request while one is already pending changes nothing, in the
//! same way that setting PENDSVSET twice yields one PendSV.

/// Quantum countdown plus the pending switch request.
pub struct TickSource {
    /// Ticks per quantum. Zero while unconfigured.
    quantum: u32,

    /// Ticks left in the running thread's quantum.
    remaining: u32,

    /// Ticks since the timer was configured.
    ticks: u64,

    /// A switch has been requested and not yet serviced.
    pending: bool,
}

impl TickSource {
    pub const fn new() -> Self {
        Self {
            quantum: 0,
            remaining: 0,
            ticks: 0,
            pending: false,
        }
    }

    /// Arm the countdown with `quantum` ticks per thread.
    pub fn configure(&mut self, quantum: u32) {
        self.quantum = quantum;
        self.remaining = quantum;
        self.ticks = 0;
        self.pending = false;
    }

    /// Account one timer tick.
    ///
    /// Returns `true` when this tick raised a new switch request. A tick
    /// that expires the quantum while a request is still pending returns
    /// `false`.
    pub fn on_tick(&mut self) -> bool {
        self.ticks = self.ticks.wrapping_add(1);
        if self.quantum == 0 {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return false;
        }

        self.remaining = self.quantum;
        let raised = !self.pending;
        self.pending = true;
        raised
    }

    /// Consume the pending request, if any.
    pub fn take_pending(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    /// A switch request is waiting for PendSV.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Ticks per quantum.
    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    /// Ticks since the last `configure`.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
