//! # Architecture Port
//!
//! Hardware glue between the scheduler core and the processor: timer
//! setup, interrupt priorities, the PendSV context switch and the jump
//! into the first thread. Only the Cortex-M4 port exists.

pub mod cortex_m4;
