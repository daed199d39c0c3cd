//! # Saved Register Frame
//!
//! The exact register image a suspended thread leaves on its own stack.
//! The stack frame builder writes one of these for every new thread and the
//! PendSV handler produces one on every preemption, so both must agree on
//! a single layout: this module is that layout.
//!
//! ## Layout (low address first, 16 words)
//!
//! ```text
//! saved stack pointer ─► R4  R5  R6  R7  R8  R9  R10 R11   ← pushed by PendSV
//!                        R0  R1  R2  R3  R12 LR  PC  xPSR  ← pushed by hardware
//! ```
//!
//! The hardware half is what the Cortex-M4 stacks automatically on
//! exception entry (no FPU context). Restoring a thread pops the software
//! half explicitly and lets the exception return pop the hardware half.

use core::mem::{offset_of, size_of};
use core::ptr;

use static_assertions::const_assert_eq;

use crate::thread::ThreadEntry;

/// Number of 32-bit words in one saved frame.
pub const FRAME_WORDS: usize = 16;

/// Size of one saved frame in bytes.
pub const FRAME_BYTES: usize = FRAME_WORDS * 4;

/// xPSR with only the Thumb state bit set. Clearing it on exception
/// return would fault the core.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// Registers PendSV saves by hand.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
}

/// Registers the core stacks on exception entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// A complete saved context, as found at a suspended thread's stack pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedFrame {
    pub software: SoftwareFrame,
    pub hardware: HardwareFrame,
}

const_assert_eq!(size_of::<SoftwareFrame>(), 8 * 4);
const_assert_eq!(size_of::<HardwareFrame>(), 8 * 4);
const_assert_eq!(size_of::<SavedFrame>(), FRAME_BYTES);
const_assert_eq!(offset_of!(SavedFrame, software), 0);
const_assert_eq!(offset_of!(SavedFrame, hardware), 8 * 4);
const_assert_eq!(offset_of!(HardwareFrame, pc), 6 * 4);

impl SavedFrame {
    /// Frame that "returns" into `entry` the first time it is restored.
    ///
    /// General-purpose registers start at zero. LR holds [`thread_exit`] so a
    /// thread body that falls off its end parks the core instead of jumping
    /// to garbage.
    pub fn initial(entry: ThreadEntry) -> Self {
        Self {
            software: SoftwareFrame::default(),
            hardware: HardwareFrame {
                lr: exit_address(),
                pc: code_address(entry),
                xpsr: INITIAL_XPSR,
                ..HardwareFrame::default()
            },
        }
    }
}

/// Address of a thread entry as it must appear in a stacked PC.
///
/// Thumb function pointers carry bit 0; an exception return requires it
/// clear.
#[inline]
pub fn code_address(entry: ThreadEntry) -> u32 {
    (entry as *const () as usize as u32) & !1
}

/// Address of the sentinel placed in every initial LR.
#[inline]
pub fn exit_address() -> u32 {
    thread_exit as *const () as usize as u32
}

/// Landing pad for a thread that returns. Thread entries are typed as
/// never returning, so reaching this means the frame was corrupted.
pub extern "C" fn thread_exit() -> ! {
    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}

/// Store `frame` at `sp`.
///
/// # Safety
/// `sp` must be 4-byte aligned and valid for `FRAME_BYTES` of writes.
#[inline]
pub unsafe fn write_frame(sp: *mut u32, frame: &SavedFrame) {
    ptr::write(sp.cast::<SavedFrame>(), *frame);
}

/// Load the frame stored at `sp`.
///
/// # Safety
/// `sp` must be 4-byte aligned and valid for `FRAME_BYTES` of reads.
#[inline]
pub unsafe fn read_frame(sp: *const u32) -> SavedFrame {
    ptr::read(sp.cast::<SavedFrame>())
}
