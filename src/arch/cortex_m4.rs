//! # Cortex-M4 Port Layer
//!
//! ## Context Switch Mechanism
//!
//! Threads run in Thread mode on the PSP; the kernel and all handlers use
//! the MSP. On exception entry the core stacks R0–R3, R12, LR, PC and xPSR
//! onto the PSP. PendSV pushes R4–R11 below them, which completes a
//! [`SavedFrame`](crate::frame::SavedFrame), hands the PSP to
//! [`Scheduler::switch_context`](crate::scheduler::Scheduler::switch_context)
//! and pops the frame of whichever thread comes back.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: `SYSTICK_PRIORITY` — only requests a switch
//! - PendSV: `PENDSV_PRIORITY` (lowest) — performs it, with interrupts
//!   masked, after every other handler has finished

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m_rt::exception;
use static_assertions::const_assert;

use crate::config::{PENDSV_PRIORITY, SYSTEM_CLOCK_HZ, SYSTICK_PRIORITY, TICK_HZ};
use crate::kernel::SCHEDULER;

const SYSTICK_RELOAD: u32 = SYSTEM_CLOCK_HZ / TICK_HZ - 1;

// SysTick's reload register is 24 bits wide
const_assert!(SYSTICK_RELOAD <= 0x00FF_FFFF);

// ---------------------------------------------------------------------------
// Tick source
// ---------------------------------------------------------------------------

/// Start SysTick at `TICK_HZ` from the core clock.
///
/// The timer period is one tick, not one quantum. `TickSource` counts the
/// quantum down in software, so one SysTick setting serves every quantum
/// and the tick count stays a time base. The cost is `quantum - 1` extra
/// SysTick interrupts per switch.
pub fn configure_systick(syst: &mut SYST) {
    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(SYSTICK_RELOAD);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

/// PendSV at the lowest priority, SysTick just above it.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    unsafe {
        scb.set_priority(SystemHandler::PendSV, PENDSV_PRIORITY);
        scb.set_priority(SystemHandler::SysTick, SYSTICK_PRIORITY);
    }
}

/// Pend PendSV. Pending it again before it runs has no further effect.
#[inline]
pub fn request_switch() {
    SCB::set_pendsv();
}

#[exception]
fn SysTick() {
    // PendSV masks interrupts for its whole body, so this never observes
    // a half-finished switch.
    let scheduler = unsafe { SCHEDULER.trap_access() };
    if scheduler.on_tick() {
        request_switch();
    }
}

// ---------------------------------------------------------------------------
// Context switch
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the context switch.
///
/// # Safety
/// Entered only by the NVIC, from Thread mode on the PSP.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {switch}",             // r0 = switch_context(r0)
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "cpsie i",
        // Return to Thread mode on the PSP, no FPU frame
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        switch = sym pendsv_switch,
    );
}

unsafe extern "C" fn pendsv_switch(saved_sp: *mut u32) -> *mut u32 {
    SCHEDULER.trap_access().switch_context(saved_sp)
}

// ---------------------------------------------------------------------------
// First thread
// ---------------------------------------------------------------------------

/// Switch Thread mode to the PSP and enter the thread whose initial frame
/// is at `sp`. Never returns.
///
/// # Safety
/// Interrupts must be disabled and `sp` must address a frame built by
/// `SavedFrame::initial`. Call once.
pub unsafe fn start_first_thread(sp: *mut u32) -> ! {
    asm!(
        "adds r0, #32",            // R4-R11 start out zero, skip them
        "msr psp, r0",
        "movs r0, #2",             // CONTROL.SPSEL = PSP
        "msr control, r0",
        "isb",
        "pop {{r0-r3, r12}}",
        "pop {{r4, r5, r6}}",      // LR, PC, xPSR
        "mov lr, r4",              // returning lands in thread_exit
        "orr r5, r5, #1",          // Thumb bit for bx
        "cpsie i",
        "bx r5",
        in("r0") sp,
        options(noreturn)
    );
}
