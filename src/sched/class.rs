//! The scheduling-class contract consumed by the core dispatcher.

use crate::task::TaskRef;
use crate::time::{Duration, Instant};

/// CPU identifier type. Processor identity is always an explicit parameter,
/// never ambient state.
pub type CpuId = usize;

/// Stable small integer distinguishing one scheduling class from another.
///
/// This is the value a process-level "set scheduling policy" call carries;
/// the core accepts any task presented to it regardless of how the policy
/// was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyId(u32);

impl PolicyId {
    /// Placeholder for tasks not yet owned by any class.
    pub const NONE: PolicyId = PolicyId(0);

    /// Create a policy identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation set every scheduling class exposes to the core dispatcher.
///
/// The dispatcher holds one implementor per active class, ordered by class
/// priority, and calls into whichever class currently owns the processor.
/// Every operation must run to completion without blocking: it may execute
/// with interrupts disabled or inside the processor's own dispatch path.
pub trait SchedClass: Send + Sync {
    /// The policy identifier of this class.
    fn policy(&self) -> PolicyId;

    /// Number of processors this class was built for.
    fn nr_cpus(&self) -> usize;

    /// Insert a runnable task into the given processor's run queue.
    ///
    /// A task that is already linked or already running there is left
    /// untouched; a double enqueue never corrupts the accounting.
    fn enqueue_task(&self, cpu: CpuId, task: &TaskRef);

    /// Remove a task from the given processor's run queue.
    ///
    /// # Returns
    ///
    /// `false` if the task was not linked — already absent, not an error.
    fn dequeue_task(&self, cpu: CpuId, task: &TaskRef) -> bool;

    /// The current task voluntarily gives up the processor. It is re-queued
    /// with its last-ran timestamp untouched, so it will not be re-selected
    /// before one full scan of equal-priority tasks.
    fn yield_task(&self, cpu: CpuId);

    /// Select the next task to run on the given processor.
    ///
    /// The winner is removed from the queue, installed as the current task
    /// and stamped with `now` as its last-ran time.
    ///
    /// # Returns
    ///
    /// `None` if this class has no runnable task — the dispatcher's signal
    /// to fall through to the next-lower-priority class.
    fn pick_next_task(&self, cpu: CpuId, now: Instant) -> Option<TaskRef>;

    /// The given task stops being the current task. If it is still runnable
    /// it goes back into the queue; `next` is the task about to run, which
    /// may belong to a different class.
    fn put_prev_task(&self, cpu: CpuId, task: &TaskRef, next: Option<&TaskRef>);

    /// Install a task as the current task without a selection scan. Used
    /// when the task is known to be the sole candidate.
    fn set_next_task(&self, cpu: CpuId, task: &TaskRef, now: Instant);

    /// Periodic timer-driven reconsideration of the running task.
    ///
    /// With `queued` set, the running task is compared against the best
    /// queued task; if the queued task strictly dominates, the run queue is
    /// marked for rescheduling and the dispatcher effects the preemption
    /// through `put_prev_task`/`pick_next_task`.
    fn task_tick(&self, cpu: CpuId, task: &TaskRef, queued: bool);

    /// A sleeping task became runnable.
    fn task_woken(&self, cpu: CpuId, task: &TaskRef) {
        self.enqueue_task(cpu, task);
    }

    /// Nominal time slice of this class. A fixed configured duration, not
    /// derived from the task; consumed by external introspection tools.
    fn get_rr_interval(&self, task: &TaskRef) -> Duration;

    /// An external priority change was applied to the task.
    ///
    /// The default is a no-op: ranking happens at pick time, so the queue
    /// position does not need fixing up.
    fn prio_changed(&self, cpu: CpuId, task: &TaskRef, old_prio: i32) {
        let _ = (cpu, task, old_prio);
    }

    /// A task enters this class from another one. Enqueued as waiting, or
    /// installed as the current task if it arrives already running.
    fn switched_to(&self, cpu: CpuId, task: &TaskRef, now: Instant);

    /// Choose which processor's run queue should receive the task.
    ///
    /// Without load balancing the answer is the processor the task is
    /// already associated with; `cpu` is the caller's hint.
    fn select_task_rq(&self, task: &TaskRef, cpu: CpuId) -> CpuId {
        let _ = task;
        cpu
    }

    /// Decide whether a newly-woken task should preempt the running one.
    ///
    /// # Returns
    ///
    /// `true` when the woken task would win a selection scan against the
    /// current task; the run queue is then marked for rescheduling.
    fn wakeup_preempt(&self, cpu: CpuId, curr: &TaskRef, woken: &TaskRef) -> bool;

    /// The task presently running on the given processor, if this class
    /// owns one. Used by the dispatcher to route wakeup preemption checks.
    fn current_task(&self, cpu: CpuId) -> Option<TaskRef>;

    /// Whether the given processor has been marked for rescheduling.
    fn needs_resched(&self, cpu: CpuId) -> bool;

    /// Consume the reschedule mark for the given processor.
    ///
    /// # Returns
    ///
    /// The mark's previous value.
    fn take_need_resched(&self, cpu: CpuId) -> bool;
}
