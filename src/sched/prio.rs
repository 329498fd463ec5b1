//! Lowest-priority-number-first scheduling class.
//!
//! One [`RunQueue`] per processor; every operation of the class contract is
//! a thin adapter onto the run queue for the named CPU. There is no load
//! balancing: a task stays with its home processor unless the caller moves
//! it explicitly.

use super::class::{CpuId, PolicyId, SchedClass};
use super::runqueue::{rank, RunQueue, DEFAULT_QUEUE_CAPACITY};
use crate::task::{TaskRef, TaskState};
use crate::time::{Duration, Instant};
use alloc::boxed::Box;
use alloc::vec::Vec;
use log::debug;

/// Policy identifier of this class.
pub const PRIO_POLICY: PolicyId = PolicyId::new(7);

/// Nominal time slice reported by `get_rr_interval`.
pub const DEFAULT_RR_INTERVAL: Duration = Duration::from_millis(100);

/// Priority scheduling class with per-CPU run queues.
pub struct PrioClass {
    rqs: Box<[RunQueue]>,
    rr_interval: Duration,
}

impl PrioClass {
    /// Create the class for the given number of processors, initializing
    /// one empty run queue per CPU.
    pub fn new(num_cpus: usize) -> Self {
        Self::with_capacity(num_cpus, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create the class reserving `capacity` queue slots per CPU.
    pub fn with_capacity(num_cpus: usize, capacity: usize) -> Self {
        let mut rqs = Vec::with_capacity(num_cpus);
        for _ in 0..num_cpus {
            rqs.push(RunQueue::with_capacity(capacity));
        }
        debug!("prio class: initialized for {} CPUs", num_cpus);
        Self {
            rqs: rqs.into_boxed_slice(),
            rr_interval: DEFAULT_RR_INTERVAL,
        }
    }

    /// Override the nominal time slice.
    pub fn with_rr_interval(mut self, interval: Duration) -> Self {
        self.rr_interval = interval;
        self
    }

    /// The run queue for a processor, if the index is valid.
    pub fn runqueue(&self, cpu: CpuId) -> Option<&RunQueue> {
        self.rqs.get(cpu)
    }
}

impl SchedClass for PrioClass {
    fn policy(&self) -> PolicyId {
        PRIO_POLICY
    }

    fn nr_cpus(&self) -> usize {
        self.rqs.len()
    }

    fn enqueue_task(&self, cpu: CpuId, task: &TaskRef) {
        if let Some(rq) = self.rqs.get(cpu) {
            task.set_cpu(cpu);
            rq.enqueue(task);
        }
    }

    fn dequeue_task(&self, cpu: CpuId, task: &TaskRef) -> bool {
        self.rqs.get(cpu).map_or(false, |rq| rq.dequeue(task))
    }

    fn yield_task(&self, cpu: CpuId) {
        if let Some(rq) = self.rqs.get(cpu) {
            rq.yield_task();
        }
    }

    fn pick_next_task(&self, cpu: CpuId, now: Instant) -> Option<TaskRef> {
        self.rqs.get(cpu)?.pick_next(now)
    }

    fn put_prev_task(&self, cpu: CpuId, task: &TaskRef, _next: Option<&TaskRef>) {
        if let Some(rq) = self.rqs.get(cpu) {
            rq.put_prev(task);
        }
    }

    fn set_next_task(&self, cpu: CpuId, task: &TaskRef, now: Instant) {
        if let Some(rq) = self.rqs.get(cpu) {
            task.set_cpu(cpu);
            rq.set_next(task, now);
        }
    }

    fn task_tick(&self, cpu: CpuId, task: &TaskRef, queued: bool) {
        if let Some(rq) = self.rqs.get(cpu) {
            rq.task_tick(task, queued);
        }
    }

    fn get_rr_interval(&self, _task: &TaskRef) -> Duration {
        self.rr_interval
    }

    fn switched_to(&self, cpu: CpuId, task: &TaskRef, now: Instant) {
        let Some(rq) = self.rqs.get(cpu) else { return };
        debug!("prio class: task {} switched in on cpu {}", task.id(), cpu);
        task.set_policy(PRIO_POLICY);
        if task.state() == TaskState::Running {
            // Arrived while holding the processor: install directly.
            task.set_cpu(cpu);
            rq.set_next(task, now);
        } else {
            task.set_cpu(cpu);
            rq.enqueue(task);
        }
    }

    fn select_task_rq(&self, task: &TaskRef, cpu: CpuId) -> CpuId {
        // No balancing: the task's home processor, or the caller's hint
        // when the home index is out of range.
        let home = task.cpu();
        if home < self.rqs.len() {
            home
        } else {
            cpu
        }
    }

    fn wakeup_preempt(&self, cpu: CpuId, curr: &TaskRef, woken: &TaskRef) -> bool {
        if rank(woken) < rank(curr) {
            if let Some(rq) = self.rqs.get(cpu) {
                rq.mark_resched();
            }
            true
        } else {
            false
        }
    }

    fn current_task(&self, cpu: CpuId) -> Option<TaskRef> {
        self.rqs.get(cpu)?.current()
    }

    fn needs_resched(&self, cpu: CpuId) -> bool {
        self.rqs.get(cpu).map_or(false, RunQueue::needs_resched)
    }

    fn take_need_resched(&self, cpu: CpuId) -> bool {
        self.rqs.get(cpu).map_or(false, RunQueue::take_need_resched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskId};

    fn task(id: u64, priority: i32) -> TaskRef {
        Task::new(TaskId::new(id), priority)
    }

    #[test]
    fn class_reports_its_identity() {
        let class = PrioClass::new(2);
        assert_eq!(class.policy(), PRIO_POLICY);
        assert_eq!(class.nr_cpus(), 2);
        assert_eq!(class.get_rr_interval(&task(1, 0)), DEFAULT_RR_INTERVAL);
    }

    #[test]
    fn default_class_is_the_prio_class() {
        let class = crate::sched::DefaultClass::new(1);
        assert_eq!(class.policy(), PRIO_POLICY);
    }

    #[test]
    fn rr_interval_is_configurable() {
        let class = PrioClass::new(1).with_rr_interval(Duration::from_millis(25));
        assert_eq!(class.get_rr_interval(&task(1, 0)), Duration::from_millis(25));
    }

    #[test]
    fn cpus_schedule_independently() {
        let class = PrioClass::new(2);
        let a = task(1, 5);
        let b = task(2, 1);
        class.enqueue_task(0, &a);
        class.enqueue_task(1, &b);

        let on_zero = class.pick_next_task(0, Instant::from_nanos(10)).unwrap();
        assert_eq!(on_zero.id(), a.id());
        let on_one = class.pick_next_task(1, Instant::from_nanos(10)).unwrap();
        assert_eq!(on_one.id(), b.id());

        // a is still current on CPU 0, so a pick there re-queues and
        // re-selects it; only once it exits is the CPU truly idle.
        assert!(class.dequeue_task(0, &a));
        assert!(class.pick_next_task(0, Instant::from_nanos(20)).is_none());
        // CPU 0's exit did not disturb CPU 1.
        assert_eq!(class.runqueue(1).unwrap().current().unwrap().id(), b.id());
    }

    #[test]
    fn operations_on_invalid_cpu_are_inert() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        class.enqueue_task(9, &a);
        assert!(!class.dequeue_task(9, &a));
        assert!(class.pick_next_task(9, Instant::ZERO).is_none());
        assert!(!class.needs_resched(9));
    }

    #[test]
    fn task_woken_defaults_to_enqueue() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        class.task_woken(0, &a);
        assert_eq!(class.runqueue(0).unwrap().nr_running(), 1);
        let picked = class.pick_next_task(0, Instant::from_nanos(10)).unwrap();
        assert_eq!(picked.id(), a.id());
    }

    #[test]
    fn wakeup_preempt_fires_for_dominating_task() {
        let class = PrioClass::new(1);
        let a = task(1, 10);
        class.enqueue_task(0, &a);
        class.pick_next_task(0, Instant::from_nanos(10)).unwrap();

        let b = task(2, 1);
        assert!(class.wakeup_preempt(0, &a, &b));
        assert!(class.needs_resched(0));
    }

    #[test]
    fn wakeup_preempt_requires_strict_domination() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        let b = task(2, 5);
        // Equal rank: the woken task would not win a selection scan.
        assert!(!class.wakeup_preempt(0, &a, &b));
        assert!(!class.needs_resched(0));

        let worse = task(3, 9);
        assert!(!class.wakeup_preempt(0, &a, &worse));
    }

    #[test]
    fn select_task_rq_returns_home_cpu() {
        let class = PrioClass::new(2);
        let a = task(1, 5);
        class.enqueue_task(1, &a);
        assert_eq!(class.select_task_rq(&a, 0), 1);

        // A home index out of range falls back to the caller's hint.
        a.set_cpu(17);
        assert_eq!(class.select_task_rq(&a, 0), 0);
    }

    #[test]
    fn switched_to_enqueues_waiting_task() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        class.switched_to(0, &a, Instant::from_nanos(10));

        assert_eq!(a.policy(), PRIO_POLICY);
        assert_eq!(a.state(), TaskState::Queued);
        assert_eq!(class.runqueue(0).unwrap().nr_running(), 1);
    }

    #[test]
    fn switched_to_installs_running_task_as_current() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        a.set_state(TaskState::Running);
        class.switched_to(0, &a, Instant::from_nanos(10));

        let rq = class.runqueue(0).unwrap();
        assert_eq!(rq.current().unwrap().id(), a.id());
        assert_eq!(rq.nr_running(), 1);
        assert_eq!(a.last_ran(), Instant::from_nanos(10));
    }

    #[test]
    fn prio_changed_takes_effect_at_next_pick() {
        let class = PrioClass::new(1);
        let a = task(1, 5);
        let b = task(2, 3);
        class.enqueue_task(0, &a);
        class.enqueue_task(0, &b);

        let old = a.priority();
        a.set_priority(1);
        class.prio_changed(0, &a, old);

        let picked = class.pick_next_task(0, Instant::from_nanos(10)).unwrap();
        assert_eq!(picked.id(), a.id());
    }

    #[test]
    fn tick_drives_preemption_through_the_class() {
        let class = PrioClass::new(1);
        let a = task(1, 10);
        class.enqueue_task(0, &a);
        let curr = class.pick_next_task(0, Instant::from_nanos(10)).unwrap();

        let b = task(2, 1);
        class.enqueue_task(0, &b);
        class.task_tick(0, &curr, true);
        assert!(class.needs_resched(0));

        class.put_prev_task(0, &curr, None);
        let next = class.pick_next_task(0, Instant::from_nanos(20)).unwrap();
        assert_eq!(next.id(), b.id());
        assert!(!class.needs_resched(0));
    }
}
