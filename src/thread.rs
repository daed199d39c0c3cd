//! # Thread Control Block
//!
//! Per-thread kernel state. Each TCB owns its stack inline, so the pool
//! in the scheduler is the only memory a thread ever uses — no heap, no
//! aliasing between threads.
//!
//! The saved stack pointer is stored as a byte offset into the TCB's own
//! stack rather than as a raw pointer. The pool can therefore be moved
//! before launch, and a pointer coming back from the trap is checked to
//! really lie inside the stack it claims to belong to.

use crate::config::{MIN_WORKING_STACK, STACK_PAINT};
use crate::error::{KernelError, Result};
use crate::frame::{self, SavedFrame, FRAME_BYTES};

/// Thread entry routine. Takes nothing and never returns.
pub type ThreadEntry = extern "C" fn() -> !;

/// Thread stack memory. Aligned to 8 bytes as required by ARM AAPCS.
#[repr(C, align(8))]
pub struct Stack<const SIZE: usize>([u8; SIZE]);

impl<const SIZE: usize> Stack<SIZE> {
    pub const fn new() -> Self {
        Self([0; SIZE])
    }

    fn paint(&mut self) {
        for word in self.0.chunks_exact_mut(4) {
            word.copy_from_slice(&STACK_PAINT.to_ne_bytes());
        }
    }

    /// Offset of the initial top of stack (full-descending, 8-byte aligned).
    const fn top() -> usize {
        SIZE & !0x07
    }
}

/// Thread Control Block (TCB).
pub struct ThreadControlBlock<const STACK: usize> {
    /// Saved stack pointer, as a byte offset into `stack`. Always addresses
    /// a complete `SavedFrame` while the thread is not running.
    sp: usize,

    entry: Option<ThreadEntry>,

    /// Slot holds a registered thread.
    live: bool,

    /// Number of times the thread was switched in.
    dispatches: u32,

    /// Ticks that fired while the thread was running.
    run_ticks: u32,

    stack: Stack<STACK>,
}

impl<const STACK: usize> ThreadControlBlock<STACK> {
    /// An unregistered slot.
    pub const EMPTY: Self = Self {
        sp: 0,
        entry: None,
        live: false,
        dispatches: 0,
        run_ticks: 0,
        stack: Stack::new(),
    };

    /// Smallest stack a thread may be given: one frame plus working room.
    pub const REQUIRED_STACK: usize = FRAME_BYTES + MIN_WORKING_STACK;

    /// Reject stack sizes that cannot hold a frame and a working stack.
    pub const fn check_stack() -> Result<()> {
        if Stack::<STACK>::top() < Self::REQUIRED_STACK {
            return Err(KernelError::StackTooSmall {
                size: STACK,
                required: Self::REQUIRED_STACK,
            });
        }
        Ok(())
    }

    /// Bind `entry` to this slot and build its initial frame.
    ///
    /// The whole stack is painted first, then the frame that enters
    /// `entry` is placed at the top. The caller must have validated the
    /// stack size with [`Self::check_stack`].
    pub(crate) fn init(&mut self, entry: ThreadEntry) {
        debug_assert!(Self::check_stack().is_ok());

        self.stack.paint();
        self.sp = Stack::<STACK>::top() - FRAME_BYTES;
        unsafe {
            frame::write_frame(self.stack_pointer(), &SavedFrame::initial(entry));
        }

        self.entry = Some(entry);
        self.live = true;
        self.dispatches = 0;
        self.run_ticks = 0;
    }

    /// Return the slot to its unregistered state.
    pub(crate) fn clear(&mut self) {
        self.sp = 0;
        self.entry = None;
        self.live = false;
        self.dispatches = 0;
        self.run_ticks = 0;
    }

    /// Absolute address of the saved frame.
    pub fn stack_pointer(&mut self) -> *mut u32 {
        self.stack.0.as_mut_ptr().wrapping_add(self.sp).cast()
    }

    /// Record the stack pointer the trap saved this thread's frame at.
    ///
    /// Returns `false` and leaves the TCB unchanged if `sp` does not
    /// address a whole frame inside this thread's stack.
    pub(crate) fn save_stack_pointer(&mut self, sp: *mut u32) -> bool {
        let offset = (sp as usize).wrapping_sub(self.stack.0.as_ptr() as usize);
        let fits = offset.checked_add(FRAME_BYTES).is_some_and(|end| end <= STACK);
        if offset % 4 != 0 || !fits {
            return false;
        }
        self.sp = offset;
        true
    }

    /// Copy of the frame the thread will resume from.
    pub fn saved_frame(&self) -> SavedFrame {
        unsafe { frame::read_frame(self.stack.0.as_ptr().add(self.sp).cast()) }
    }

    /// Deepest stack use observed, in bytes.
    ///
    /// Counts the painted words still untouched at the bottom of the stack.
    pub fn stack_high_water(&self) -> usize {
        let untouched = self
            .stack
            .0
            .chunks_exact(4)
            .take_while(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]) == STACK_PAINT)
            .count();
        STACK - untouched * 4
    }

    /// Entry routine, `None` for a free slot.
    pub fn entry(&self) -> Option<ThreadEntry> {
        self.entry
    }

    /// Slot holds a registered thread.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Times the thread was switched in.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    /// Ticks that fired while the thread was running.
    pub fn run_ticks(&self) -> u32 {
        self.run_ticks
    }

    pub(crate) fn record_dispatch(&mut self) {
        self.dispatches = self.dispatches.wrapping_add(1);
    }

    pub(crate) fn record_tick(&mut self) {
        self.run_ticks = self.run_ticks.wrapping_add(1);
    }
}
