//! Task records: per-task scheduling metadata.
//!
//! A [`Task`] carries only what the scheduling class needs to rank it: the
//! priority, the timestamp of the last time it was granted a processor, and
//! the linkage state that says whether it currently sits in a run queue.
//! Tasks are shared as [`TaskRef`]s; run queues hold non-owning clones and
//! use the state flag as the linkage marker, so no queue-specific fields
//! leak into anything outside this type.

use crate::sched::PolicyId;
use crate::time::Instant;
use alloc::sync::Arc;
use core::num::NonZeroU64;
use portable_atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Shared handle to a task record.
pub type TaskRef = Arc<Task>;

/// Priority assigned when the caller does not specify one.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Unique identifier for tasks. Never zero: id 0 is reserved and aliases
/// id 1, so callers allocating ids must start at 1 and never reuse a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// Create a task ID.
    ///
    /// The reserved id 0 is mapped to 1, so `TaskId::new(0)` and
    /// `TaskId::new(1)` name the same task. Uniqueness is the caller's
    /// contract; the run queue identifies tasks by this value.
    pub fn new(id: u64) -> Self {
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    /// Raw ID value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a task stands relative to its scheduling class.
///
/// `Queued` if and only if the task is linked in a run queue; `Running` if
/// and only if it is some run queue's current task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Not managed by any scheduling class
    Unowned = 0,
    /// Linked in a run queue, waiting for a processor
    Queued = 1,
    /// Currently granted a processor
    Running = 2,
}

/// Per-task scheduling metadata.
///
/// All fields are atomics so the record can be read without the run-queue
/// guard; transitions that must stay consistent with queue membership are
/// only performed by the run queue while its guard is held.
pub struct Task {
    id: TaskId,
    /// Lower value = more urgent (niceness semantics)
    priority: AtomicI32,
    /// Stamped exactly when the task transitions into Running
    last_ran: AtomicU64,
    state: AtomicU8,
    /// Home processor, maintained by the owning class
    cpu: AtomicUsize,
    /// Scheduling policy the task currently belongs to
    policy: AtomicU32,
}

impl Task {
    /// Create a task record with the given priority, initially unowned.
    pub fn new(id: TaskId, priority: i32) -> TaskRef {
        Arc::new(Self {
            id,
            priority: AtomicI32::new(priority),
            last_ran: AtomicU64::new(Instant::ZERO.as_nanos()),
            state: AtomicU8::new(TaskState::Unowned as u8),
            cpu: AtomicUsize::new(0),
            policy: AtomicU32::new(PolicyId::NONE.get()),
        })
    }

    /// The task's unique identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current priority; lower is more urgent.
    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Apply an external priority change. The owning class is told through
    /// its `prio_changed` operation; the queue itself is not reordered
    /// because ranking happens at pick time.
    pub fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Release);
    }

    /// When this task last transitioned into Running.
    pub fn last_ran(&self) -> Instant {
        Instant::from_nanos(self.last_ran.load(Ordering::Acquire))
    }

    /// Stamp the last-ran timestamp. Called by the run queue when the task
    /// is installed as current.
    pub fn stamp_last_ran(&self, now: Instant) {
        self.last_ran.store(now.as_nanos(), Ordering::Release);
    }

    /// Current linkage state.
    pub fn state(&self) -> TaskState {
        match self.state.load(Ordering::Acquire) {
            1 => TaskState::Queued,
            2 => TaskState::Running,
            _ => TaskState::Unowned,
        }
    }

    /// Set the linkage state. Driven by run queues under their guard.
    pub fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether the task is queued or running.
    pub fn is_runnable(&self) -> bool {
        matches!(self.state(), TaskState::Queued | TaskState::Running)
    }

    /// Home processor.
    pub fn cpu(&self) -> usize {
        self.cpu.load(Ordering::Acquire)
    }

    /// Record the processor the task is associated with.
    pub fn set_cpu(&self, cpu: usize) {
        self.cpu.store(cpu, Ordering::Release);
    }

    /// Policy identifier of the class this task belongs to.
    pub fn policy(&self) -> PolicyId {
        PolicyId::new(self.policy.load(Ordering::Acquire))
    }

    /// Record a policy change. The class-switch handshake itself goes
    /// through the dispatcher's `switch_policy`.
    pub fn set_policy(&self, policy: PolicyId) {
        self.policy.store(policy.get(), Ordering::Release);
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority())
            .field("last_ran", &self.last_ran())
            .field("state", &self.state())
            .field("cpu", &self.cpu())
            .field("policy", &self.policy())
            .finish()
    }
}
