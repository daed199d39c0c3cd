//! # RingOS — Round-Robin Kernel
//!
//! A minimal preemptive, round-robin real-time kernel for single-core
//! ARM Cortex-M4 microcontrollers.
//!
//! ## Overview
//!
//! A fixed set of threads is registered once, before scheduling starts.
//! A periodic timer then slices the CPU between them in registration
//! order: every thread gets exactly one quantum out of every N, where N is
//! the number of threads. Threads never block, yield or exit.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Threads                  │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │     add_threads() · launch() · launch_scheduler()      │
//! ├────────────────────────────────────────────────────────┤
//! │                Scheduler (scheduler.rs)                 │
//! │   add_threads · launch · start · on_tick · switch     │
//! ├──────────────┬──────────────────┬──────────────────────┤
//! │ TCB Pool     │ Ready Ring       │ Tick Source          │
//! │ thread.rs    │ ring.rs          │ tick.rs              │
//! ├──────────────┴──────────────────┴──────────────────────┤
//! │           Saved Register Frame (frame.rs)               │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    PendSV · SysTick · Priorities · First Thread        │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: All state lives in one statically allocated `Scheduler`
//! - **Fixed-size TCB pool**: capacity is a const generic, `MAX_THREADS` by default
//! - **Per-thread stack**: `[u8; STACK_SIZE]` inline in each TCB
//! - **Single mutator**: once running, only PendSV changes scheduler state
//!
//! Everything above the arch port is plain `core` code and is unit-tested
//! on the host.

#![no_std]

pub mod config;
pub mod error;
pub mod frame;
pub mod ring;
pub mod scheduler;
pub mod thread;
pub mod tick;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod arch;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod kernel;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod sync;

#[cfg(test)]
mod sim;

pub use error::{KernelError, Result};
pub use scheduler::{KernelState, Scheduler};
pub use thread::ThreadEntry;
