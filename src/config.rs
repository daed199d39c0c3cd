//! # RingOS Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time — no dynamic allocation.

/// Default number of thread slots in the TCB pool.
///
/// `Scheduler` takes its capacity as a const generic parameter; this is the
/// value used by the global kernel instance.
pub const MAX_THREADS: usize = 4;

/// Per-thread stack size in bytes. Must hold one saved frame
/// (`FRAME_BYTES`) plus `MIN_WORKING_STACK`.
pub const STACK_SIZE: usize = 1024;

/// Bytes a thread must have available beyond its initial saved frame.
pub const MIN_WORKING_STACK: usize = 128;

/// SysTick frequency in Hz. One tick is the unit of the scheduling quantum.
pub const TICK_HZ: u32 = 1000;

/// Quantum used by the demo firmware, in ticks.
pub const DEFAULT_QUANTUM: u32 = 10;

/// System clock frequency in Hz (STM32F4 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Fill pattern written over every stack at registration. Words still
/// holding it were never touched by the thread.
pub const STACK_PAINT: u32 = 0xAAAA_AAAA;

/// PendSV priority: the lowest, so a context switch never preempts an ISR.
pub const PENDSV_PRIORITY: u8 = 0xFF;

/// SysTick priority: one level above PendSV (4 implemented priority bits).
pub const SYSTICK_PRIORITY: u8 = 0xE0;
