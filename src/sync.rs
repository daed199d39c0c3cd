//! # Kernel State Cell
//!
//! Holder for the kernel's single `Scheduler`. Thread-mode code reaches it
//! through a critical section; the SysTick and PendSV handlers reach it
//! directly, relying on interrupt priorities for exclusion.

use core::cell::UnsafeCell;

use cortex_m::interrupt;

pub struct KernelCell<T>(UnsafeCell<T>);

// Safety: every access either masks interrupts or happens in a handler
// that cannot be preempted by another accessor.
unsafe impl<T: Send> Sync for KernelCell<T> {}

impl<T> KernelCell<T> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Run `f` on the contents with interrupts disabled.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        interrupt::free(|_cs| f(unsafe { &mut *self.0.get() }))
    }

    /// Access from exception context.
    ///
    /// # Safety
    /// Caller must be a handler no other accessor can preempt or be
    /// preempted by while the reference lives.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn trap_access(&self) -> &mut T {
        &mut *self.0.get()
    }
}
