//! # Kernel Errors
//!
//! Two classes of failure exist:
//!
//! - **Configuration errors** are detected while registering threads or
//!   launching the kernel. They are returned to the caller, leave committed
//!   state untouched and may be retried before launch.
//! - **Invariant violations** mean the kernel cannot safely continue. The
//!   kernel layer halts on them; once threads are running no error is ever
//!   reported again.

use thiserror::Error;

use crate::scheduler::KernelState;

/// Errors reported by the scheduler core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("no threads given to register")]
    NoThreads,

    #[error("{requested} threads requested but the pool holds {capacity}")]
    TooManyThreads { requested: usize, capacity: usize },

    #[error("thread stack of {size} bytes is smaller than the required {required}")]
    StackTooSmall { size: usize, required: usize },

    #[error("quantum must be at least one tick")]
    ZeroQuantum,

    #[error("kernel is {found:?}, expected {expected:?}")]
    InvalidState {
        expected: KernelState,
        found: KernelState,
    },

    #[error("ready ring is empty")]
    EmptyReadyRing,
}

impl KernelError {
    /// Whether the error is an invariant violation rather than a
    /// recoverable configuration error.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::EmptyReadyRing)
    }

    /// Nonzero status code for callers that only deal in integers.
    pub const fn code(&self) -> u8 {
        match self {
            Self::NoThreads => 1,
            Self::TooManyThreads { .. } => 2,
            Self::StackTooSmall { .. } => 3,
            Self::ZeroQuantum => 4,
            Self::InvalidState { .. } => 5,
            Self::EmptyReadyRing => 6,
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
