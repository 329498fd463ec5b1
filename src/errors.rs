//! Error handling for the scheduling core.
//!
//! Run-queue operations themselves never fail: an absent task is reported
//! through a `bool` return and an empty queue through `None`, and invalid
//! caller requests (such as a double enqueue) are absorbed as no-ops so the
//! run queue's own invariants stay intact. The errors here cover only the
//! dispatcher surface, where a caller can name a processor or policy that
//! does not exist.

use core::fmt;

/// Result type for dispatcher operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors surfaced by the core dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// CPU index outside the configured processor range
    InvalidCpu(usize),
    /// A class with the same policy identifier is already registered
    DuplicatePolicy(u32),
    /// No registered class matches the given policy identifier
    UnknownPolicy(u32),
    /// A class was built for a different number of processors
    CpuCountMismatch {
        /// Processors the dispatcher was created with
        expected: usize,
        /// Processors the rejected class was built for
        got: usize,
    },
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidCpu(cpu) => write!(f, "invalid CPU index: {}", cpu),
            SchedError::DuplicatePolicy(policy) => {
                write!(f, "policy {} is already registered", policy)
            }
            SchedError::UnknownPolicy(policy) => {
                write!(f, "no scheduling class registered for policy {}", policy)
            }
            SchedError::CpuCountMismatch { expected, got } => {
                write!(f, "class built for {} CPUs, dispatcher has {}", got, expected)
            }
        }
    }
}
