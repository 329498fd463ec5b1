#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Pluggable priority scheduling class with per-CPU run queues.
//!
//! This library implements one scheduling class of a multi-class dispatcher:
//! the policy and data structure that decide, for one processor at a time,
//! which runnable task executes next. Lower priority numbers are more urgent
//! (niceness semantics); ties between equal-priority tasks go to the task
//! that has waited longest since it last ran.
//!
//! # Architecture
//!
//! - [`Task`] — per-task scheduling metadata (priority, last-ran timestamp,
//!   queue linkage state), shared by reference counting.
//! - [`RunQueue`] — one per processor; owns the queued-task collection, the
//!   currently-running task and the running count behind a spin guard.
//! - [`SchedClass`] — the fixed operation set the core dispatcher invokes
//!   (enqueue, dequeue, yield, pick-next, tick, ...). [`PrioClass`] is the
//!   concrete lowest-number-first implementation.
//! - [`CoreDispatcher`] — walks the registered classes in strict priority
//!   order and falls through to the next class when one reports no task.
//!
//! # Quick Start
//!
//! ```ignore
//! use sched_class::{CoreDispatcher, PrioClass, Task, TaskId, TickClock, PRIO_POLICY};
//! use alloc::sync::Arc;
//!
//! let mut dispatcher = CoreDispatcher::new(1);
//! dispatcher.register(Arc::new(PrioClass::new(1)))?;
//!
//! let clock = TickClock::new(1000);
//! let task = Task::new(TaskId::new(1), 0);
//! task.set_policy(PRIO_POLICY);
//!
//! dispatcher.enqueue(0, &task)?;
//! let next = dispatcher.pick_next(0, clock.now())?;
//! ```
//!
//! # Concurrency
//!
//! Every run-queue operation runs to completion without blocking: the guard
//! is a spin mutex held only for bounded read-modify-write sequences, never
//! across a call back into the dispatcher. Operations are safe to invoke
//! with interrupts disabled or from the processor's own dispatch path.

pub mod errors;
pub mod sched;
pub mod task;
pub mod time;

#[cfg(test)]
extern crate std;

extern crate alloc;

// Errors
pub use errors::{SchedError, SchedResult};

// Scheduling classes and run queues
pub use sched::{
    CoreDispatcher, CpuId, DefaultClass, PolicyId, PrioClass, RunQueue, SchedClass, PRIO_POLICY,
};

// Tasks
pub use task::{Task, TaskId, TaskRef, TaskState};

// Time
pub use time::{Duration, Instant, TickClock};
