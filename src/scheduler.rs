//! # Scheduler
//!
//! The kernel's whole mutable state in one owned object: the TCB pool, the
//! ready ring, the tick source and the launch state machine.
//!
//! ## Lifecycle
//!
//! ```text
//!   Unstarted ──launch(quantum)──► Launched ──start()──► Running
//!      │                                                   │
//!      └─ add_threads() (any number of times)              └─ on_tick() / switch_context()
//! ```
//!
//! ## Scheduling Policy
//!
//! Strict round-robin in registration order. Every thread runs for exactly
//! one quantum, then the next one in the ring takes over. There are no
//! priorities and no blocking, so no thread can be skipped or starved.
//!
//! ## Context Switch Protocol
//!
//! 1. SysTick calls [`Scheduler::on_tick`]. When the quantum expires it
//!    returns `true` and the port pends PendSV.
//! 2. PendSV pushes R4–R11 and calls [`Scheduler::switch_context`] with the
//!    resulting stack pointer. The pointer is stored in the current TCB,
//!    the ring advances, and the next thread's stack pointer comes back.
//! 3. PendSV pops R4–R11 from the new stack and returns into the thread.
//!
//! `switch_context` must not be re-entered. On Cortex-M this holds because
//! PendSV runs at the lowest priority with interrupts masked, so only one
//! instance can ever be active.

use log::{debug, info, warn};

use crate::config::{MAX_THREADS, STACK_SIZE};
use crate::error::{KernelError, Result};
use crate::frame;
use crate::ring::ReadyRing;
use crate::thread::{ThreadControlBlock, ThreadEntry};
use crate::tick::TickSource;

/// Launch state of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// Threads may be registered.
    Unstarted,
    /// The tick source is configured; the first thread has not run yet.
    Launched,
    /// Threads are being scheduled. Never left.
    Running,
}

/// Scheduler state for up to `N` threads with `STACK`-byte stacks.
pub struct Scheduler<const N: usize = MAX_THREADS, const STACK: usize = STACK_SIZE> {
    threads: [ThreadControlBlock<STACK>; N],
    ring: ReadyRing<N>,
    tick: TickSource,
    state: KernelState,
}

impl<const N: usize, const STACK: usize> Scheduler<N, STACK> {
    pub const fn new() -> Self {
        Self {
            threads: [const { ThreadControlBlock::EMPTY }; N],
            ring: ReadyRing::new(),
            tick: TickSource::new(),
            state: KernelState::Unstarted,
        }
    }

    /// Register the threads to schedule, in ring order.
    ///
    /// Each entry gets the next pool slot and a freshly built initial
    /// frame. Calling this again before launch replaces the previous set.
    ///
    /// # Errors
    /// - `NoThreads` / `TooManyThreads` if `entries` is empty or larger than
    ///   the pool
    /// - `StackTooSmall` if a thread stack cannot hold its first frame
    /// - `InvalidState` once the kernel has been launched
    ///
    /// On error nothing is changed.
    pub fn add_threads(&mut self, entries: &[ThreadEntry]) -> Result<()> {
        if let Err(err) = self.check_registration(entries) {
            warn!("thread registration rejected: {}", err);
            return Err(err);
        }

        for tcb in self.threads.iter_mut() {
            tcb.clear();
        }
        for (id, (tcb, &entry)) in self.threads.iter_mut().zip(entries).enumerate() {
            tcb.init(entry);
            debug!(
                "thread {}: entry {:#010x}, sp {:p}",
                id,
                frame::code_address(entry),
                tcb.stack_pointer()
            );
        }
        self.ring.link(entries.len());

        info!("registered {} of {} threads", entries.len(), N);
        Ok(())
    }

    /// [`Self::add_threads`] reporting `1` on success and `0` on failure.
    pub fn add_threads_status(&mut self, entries: &[ThreadEntry]) -> u8 {
        match self.add_threads(entries) {
            Ok(()) => 1,
            Err(_) => 0,
        }
    }

    fn check_registration(&self, entries: &[ThreadEntry]) -> Result<()> {
        self.expect_state(KernelState::Unstarted)?;
        if entries.is_empty() {
            return Err(KernelError::NoThreads);
        }
        if entries.len() > N {
            return Err(KernelError::TooManyThreads {
                requested: entries.len(),
                capacity: N,
            });
        }
        ThreadControlBlock::<STACK>::check_stack()
    }

    /// Arm the tick source with `quantum` ticks per thread.
    ///
    /// # Errors
    /// - `ZeroQuantum` if `quantum` is 0
    /// - `EmptyReadyRing` if no threads were registered
    /// - `InvalidState` if already launched
    pub fn launch(&mut self, quantum: u32) -> Result<()> {
        self.expect_state(KernelState::Unstarted)?;
        if quantum == 0 {
            return Err(KernelError::ZeroQuantum);
        }
        if self.ring.is_empty() {
            return Err(KernelError::EmptyReadyRing);
        }

        self.tick.configure(quantum);
        self.state = KernelState::Launched;
        info!("kernel launched: {} threads, quantum {} ticks", self.ring.len(), quantum);
        Ok(())
    }

    /// Make the first registered thread current and return the stack
    /// pointer its frame is restored from.
    pub fn start(&mut self) -> Result<*mut u32> {
        self.expect_state(KernelState::Launched)?;
        if self.ring.is_empty() {
            return Err(KernelError::EmptyReadyRing);
        }

        self.state = KernelState::Running;
        let first = self.ring.current();
        let tcb = &mut self.threads[first];
        tcb.record_dispatch();
        info!("scheduler running, entering thread {}", first);
        Ok(tcb.stack_pointer())
    }

    /// Timer tick. Returns `true` if a context switch must be pended.
    ///
    /// Called from the SysTick handler. Ticks before the scheduler runs
    /// are ignored.
    pub fn on_tick(&mut self) -> bool {
        if self.state != KernelState::Running {
            return false;
        }
        self.threads[self.ring.current()].record_tick();
        self.tick.on_tick()
    }

    /// The context switch transition, called from PendSV.
    ///
    /// `saved_sp` addresses the complete frame of the interrupted thread.
    /// Returns the stack pointer of the frame to restore. Without a
    /// pending switch request this is `saved_sp` itself and nothing moves.
    ///
    /// # Panics
    /// If the scheduler is not running, or `saved_sp` lies outside the
    /// current thread's stack. Both leave the kernel unable to continue.
    pub fn switch_context(&mut self, saved_sp: *mut u32) -> *mut u32 {
        if self.state != KernelState::Running {
            panic!("context switch while kernel is {:?}", self.state);
        }
        if !self.tick.take_pending() {
            return saved_sp;
        }

        let current = self.ring.current();
        if !self.threads[current].save_stack_pointer(saved_sp) {
            panic!("thread {} saved its frame outside its stack", current);
        }

        let next = self.ring.advance();
        let tcb = &mut self.threads[next];
        tcb.record_dispatch();
        tcb.stack_pointer()
    }

    fn expect_state(&self, expected: KernelState) -> Result<()> {
        if self.state != expected {
            return Err(KernelError::InvalidState {
                expected,
                found: self.state,
            });
        }
        Ok(())
    }

    /// Current launch state.
    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Pool index of the current thread.
    pub fn current(&self) -> usize {
        self.ring.current()
    }

    /// Number of registered threads.
    pub fn thread_count(&self) -> usize {
        self.ring.len()
    }

    /// Size of the TCB pool.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Registered thread at pool index `id`.
    pub fn thread(&self, id: usize) -> Option<&ThreadControlBlock<STACK>> {
        self.threads[..self.ring.len()].get(id)
    }

    /// Round-robin order of the registered threads.
    pub fn ring(&self) -> &ReadyRing<N> {
        &self.ring
    }

    /// Ticks counted since launch.
    pub fn tick_count(&self) -> u64 {
        self.tick.ticks()
    }

    /// Ticks per thread, zero before launch.
    pub fn quantum(&self) -> u32 {
        self.tick.quantum()
    }

    /// A switch was requested and PendSV has not serviced it yet.
    pub fn switch_pending(&self) -> bool {
        self.tick.is_pending()
    }
}
