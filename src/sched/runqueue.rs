//! Per-CPU run queue and the task selection algorithm.
//!
//! One [`RunQueue`] exists per processor. It owns the queued-task
//! collection, the currently-running task and the running count behind a
//! spin guard. The guard is held for every read-modify-write of that state
//! and for nothing else; critical sections are bounded and allocation-free
//! once the queue has grown to its working capacity, so operations are safe
//! in interrupt context.
//!
//! Invariants at every guard-release boundary:
//! - `nr_running == queue.len() + (1 if current is Some)`
//! - no task is linked twice, or linked while also being current
//! - `current` was installed by `pick_next`/`set_next` or retained across
//!   a tick

use crate::task::{TaskRef, TaskState};
use crate::time::Instant;
use alloc::collections::VecDeque;
use log::{debug, trace};
use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

/// Queue slots reserved at initialization so steady-state enqueues do not
/// allocate under the guard.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Selection rank: lower priority number wins, ties go to the task that has
/// waited longest since it last ran. Remaining ties fall back to queue
/// order, which makes selection deterministic.
pub(crate) fn rank(task: &TaskRef) -> (i32, u64) {
    (task.priority(), task.last_ran().as_nanos())
}

struct RunQueueInner {
    queue: VecDeque<TaskRef>,
    current: Option<TaskRef>,
    nr_running: usize,
}

impl RunQueueInner {
    fn position(&self, task: &TaskRef) -> Option<usize> {
        self.queue.iter().position(|t| t.id() == task.id())
    }

    fn is_current(&self, task: &TaskRef) -> bool {
        self.current.as_ref().map_or(false, |c| c.id() == task.id())
    }

    /// Index of the lowest-ranked queued task. Equal ranks keep the earlier
    /// queue position.
    fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, (i32, u64))> = None;
        for (idx, task) in self.queue.iter().enumerate() {
            let r = rank(task);
            match best {
                Some((_, best_rank)) if best_rank <= r => {}
                _ => best = Some((idx, r)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Move the current task, if any, back into the queue.
    fn requeue_current(&mut self) {
        if let Some(prev) = self.current.take() {
            prev.set_state(TaskState::Queued);
            self.queue.push_back(prev);
        }
    }
}

/// Per-processor run queue for one scheduling class.
pub struct RunQueue {
    inner: Mutex<RunQueueInner>,
    /// Set when the running task should be reconsidered; consumed by the
    /// dispatcher outside the guard.
    need_resched: AtomicBool,
}

impl RunQueue {
    /// Create an empty run queue with the default capacity. One call per
    /// processor at bring-up.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an empty run queue reserving `capacity` queue slots.
    pub fn with_capacity(capacity: usize) -> Self {
        debug!("runqueue: initialized (capacity {})", capacity);
        Self {
            inner: Mutex::new(RunQueueInner {
                queue: VecDeque::with_capacity(capacity),
                current: None,
                nr_running: 0,
            }),
            need_resched: AtomicBool::new(false),
        }
    }

    /// Insert a task if it is not already linked and not current.
    ///
    /// A double enqueue is absorbed as a no-op; the accounting never
    /// drifts even when the caller's request was invalid.
    pub fn enqueue(&self, task: &TaskRef) {
        let mut rq = self.inner.lock();
        if rq.is_current(task) || rq.position(task).is_some() {
            return;
        }
        task.set_state(TaskState::Queued);
        rq.queue.push_back(task.clone());
        rq.nr_running += 1;
    }

    /// Remove a task from the queue, or unlink it from the current slot.
    ///
    /// Returns `false` if the task was not linked at all; callers treat
    /// that as "already absent", and the call is idempotent.
    pub fn dequeue(&self, task: &TaskRef) -> bool {
        let mut rq = self.inner.lock();
        if rq.is_current(task) {
            rq.current = None;
            rq.nr_running -= 1;
            task.set_state(TaskState::Unowned);
            return true;
        }
        match rq.position(task) {
            Some(idx) => {
                rq.queue.remove(idx);
                rq.nr_running -= 1;
                task.set_state(TaskState::Unowned);
                true
            }
            None => false,
        }
    }

    /// Select and install the next task to run.
    ///
    /// The lowest-ranked queued task is removed from the queue, becomes the
    /// current task, and has its last-ran timestamp stamped with `now`.
    /// Returns `None` when the queue is empty. If a current task is still
    /// installed because the caller skipped `put_prev`, it is re-queued
    /// first so the accounting stays intact.
    pub fn pick_next(&self, now: Instant) -> Option<TaskRef> {
        let mut rq = self.inner.lock();
        rq.requeue_current();

        let idx = rq.best_index()?;
        let task = rq.queue.remove(idx)?;
        task.set_state(TaskState::Running);
        task.stamp_last_ran(now);
        rq.current = Some(task.clone());
        drop(rq);

        self.need_resched.store(false, Ordering::Release);
        trace!("runqueue: picked task {} (prio {})", task.id(), task.priority());
        Some(task)
    }

    /// The given task stops being current.
    ///
    /// If it is still runnable it goes back into the queue; a task that was
    /// already unlinked for exit or a class switch is simply released.
    pub fn put_prev(&self, task: &TaskRef) {
        let mut rq = self.inner.lock();
        if !rq.is_current(task) {
            return;
        }
        let prev = match rq.current.take() {
            Some(prev) => prev,
            None => return,
        };
        if prev.state() == TaskState::Running {
            prev.set_state(TaskState::Queued);
            rq.queue.push_back(prev);
        } else {
            // Unlinked out from under us (exit path); drop our claim.
            rq.nr_running -= 1;
        }
    }

    /// The current task voluntarily yields the processor.
    ///
    /// It is re-queued with its last-ran timestamp untouched, so it cannot
    /// beat an equal-priority task that has waited longer.
    pub fn yield_task(&self) {
        let mut rq = self.inner.lock();
        rq.requeue_current();
    }

    /// Install a task as current without a selection scan.
    ///
    /// Removes the task from the queue if it was linked; a previous current
    /// task is re-queued. The last-ran timestamp is stamped with `now`.
    pub fn set_next(&self, task: &TaskRef, now: Instant) {
        let mut rq = self.inner.lock();
        if rq.is_current(task) {
            task.stamp_last_ran(now);
            return;
        }
        rq.requeue_current();
        match rq.position(task) {
            Some(idx) => {
                rq.queue.remove(idx);
            }
            // Entering directly as current, e.g. a task switching classes
            // while it runs.
            None => rq.nr_running += 1,
        }
        task.set_state(TaskState::Running);
        task.stamp_last_ran(now);
        rq.current = Some(task.clone());
    }

    /// Periodic reconsideration of the running task.
    ///
    /// With `queued` set, the best queued task is compared against the
    /// running one; strict domination (lower priority number, or equal with
    /// an older last-ran) marks the queue for rescheduling. The preemption
    /// itself is effected by the dispatcher through `put_prev`/`pick_next`.
    pub fn task_tick(&self, task: &TaskRef, queued: bool) {
        if !queued {
            return;
        }
        let rq = self.inner.lock();
        let curr = match rq.current.as_ref() {
            Some(curr) if curr.id() == task.id() => curr,
            _ => return,
        };
        let curr_rank = rank(curr);
        if let Some(idx) = rq.best_index() {
            if rank(&rq.queue[idx]) < curr_rank {
                drop(rq);
                self.mark_resched();
                trace!("runqueue: task {} marked for preemption", task.id());
            }
        }
    }

    /// Mark the queue for rescheduling.
    pub fn mark_resched(&self) {
        self.need_resched.store(true, Ordering::Release);
    }

    /// Whether the queue has been marked for rescheduling.
    pub fn needs_resched(&self) -> bool {
        self.need_resched.load(Ordering::Acquire)
    }

    /// Consume the reschedule mark, returning its previous value.
    pub fn take_need_resched(&self) -> bool {
        self.need_resched.swap(false, Ordering::AcqRel)
    }

    /// Tasks owned by this queue, queued plus running.
    pub fn nr_running(&self) -> usize {
        self.inner.lock().nr_running
    }

    /// Tasks waiting in the queue (the current task is not counted).
    pub fn queued_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// The task presently running on this queue's processor, if any.
    pub fn current(&self) -> Option<TaskRef> {
        self.inner.lock().current.clone()
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}
