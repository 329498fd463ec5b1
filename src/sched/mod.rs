//! Scheduling classes and per-CPU run queues.
//!
//! Provides the scheduling-class contract, the priority run queue that
//! implements it, and the dispatcher that drives registered classes in
//! strict priority order.

pub mod class;
pub mod dispatcher;
pub mod prio;
pub mod runqueue;

pub use class::{CpuId, PolicyId, SchedClass};
pub use dispatcher::CoreDispatcher;
pub use prio::{PrioClass, DEFAULT_RR_INTERVAL, PRIO_POLICY};
pub use runqueue::RunQueue;

/// Default scheduling class type.
pub type DefaultClass = PrioClass;
