//! Strict-priority driver over the registered scheduling classes.
//!
//! The dispatcher holds the active classes in registration order, which is
//! their priority order: `pick_next` tries each class in turn and falls
//! through when a class reports no runnable task. Task-directed events
//! (enqueue, dequeue, tick, wakeup) are routed by the task's policy
//! identifier.

use super::class::{CpuId, PolicyId, SchedClass};
use crate::errors::{SchedError, SchedResult};
use crate::task::{TaskRef, TaskState};
use crate::time::Instant;
use alloc::sync::Arc;
use alloc::vec::Vec;
use log::debug;

/// Multi-class dispatcher for a fixed set of processors.
pub struct CoreDispatcher {
    /// Registered classes, highest class priority first
    classes: Vec<Arc<dyn SchedClass>>,
    num_cpus: usize,
}

impl CoreDispatcher {
    /// Create a dispatcher for the given number of processors.
    pub fn new(num_cpus: usize) -> Self {
        Self {
            classes: Vec::new(),
            num_cpus,
        }
    }

    /// Number of processors this dispatcher drives.
    pub fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Register a scheduling class. Registration order is class priority
    /// order, highest first.
    pub fn register(&mut self, class: Arc<dyn SchedClass>) -> SchedResult<()> {
        if class.nr_cpus() != self.num_cpus {
            return Err(SchedError::CpuCountMismatch {
                expected: self.num_cpus,
                got: class.nr_cpus(),
            });
        }
        if self.classes.iter().any(|c| c.policy() == class.policy()) {
            return Err(SchedError::DuplicatePolicy(class.policy().get()));
        }
        debug!("dispatcher: registered policy {}", class.policy());
        self.classes.push(class);
        Ok(())
    }

    /// The class registered for the given policy.
    pub fn class_for(&self, policy: PolicyId) -> SchedResult<&Arc<dyn SchedClass>> {
        self.classes
            .iter()
            .find(|c| c.policy() == policy)
            .ok_or(SchedError::UnknownPolicy(policy.get()))
    }

    fn check_cpu(&self, cpu: CpuId) -> SchedResult<()> {
        if cpu < self.num_cpus {
            Ok(())
        } else {
            Err(SchedError::InvalidCpu(cpu))
        }
    }

    /// Enqueue a task with the class its policy names.
    pub fn enqueue(&self, cpu: CpuId, task: &TaskRef) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        self.class_for(task.policy())?.enqueue_task(cpu, task);
        Ok(())
    }

    /// Remove a task from its class's run queue. `Ok(false)` means the
    /// task was already absent.
    pub fn dequeue(&self, cpu: CpuId, task: &TaskRef) -> SchedResult<bool> {
        self.check_cpu(cpu)?;
        Ok(self.class_for(task.policy())?.dequeue_task(cpu, task))
    }

    /// Select the next task for a processor, consulting classes in strict
    /// priority order.
    pub fn pick_next(&self, cpu: CpuId, now: Instant) -> SchedResult<Option<TaskRef>> {
        self.check_cpu(cpu)?;
        for class in &self.classes {
            if let Some(task) = class.pick_next_task(cpu, now) {
                return Ok(Some(task));
            }
        }
        Ok(None)
    }

    /// Hand the running task back to its class before the next pick.
    pub fn put_prev(&self, cpu: CpuId, task: &TaskRef, next: Option<&TaskRef>) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        self.class_for(task.policy())?.put_prev_task(cpu, task, next);
        Ok(())
    }

    /// The running task on the given processor yields voluntarily.
    pub fn yield_current(&self, cpu: CpuId) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        for class in &self.classes {
            if class.current_task(cpu).is_some() {
                class.yield_task(cpu);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Timer tick for the running task, routed to its class.
    pub fn tick(&self, cpu: CpuId, task: &TaskRef, queued: bool) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        self.class_for(task.policy())?.task_tick(cpu, task, queued);
        Ok(())
    }

    /// A sleeping task became runnable. Its class chooses the destination
    /// run queue, enqueues the task there, and reports whether the task
    /// running on that processor should be preempted.
    pub fn wake(&self, task: &TaskRef, cpu_hint: CpuId) -> SchedResult<bool> {
        self.check_cpu(cpu_hint)?;
        let class = self.class_for(task.policy())?;
        let target = class.select_task_rq(task, cpu_hint);
        class.task_woken(target, task);
        match class.current_task(target) {
            Some(curr) => Ok(class.wakeup_preempt(target, &curr, task)),
            None => Ok(false),
        }
    }

    /// Move a task to a different scheduling class.
    ///
    /// The old class drops the task, the new class receives it through its
    /// `switched_to` notification. A task that was running keeps running
    /// as the new class's current task.
    pub fn switch_policy(
        &self,
        task: &TaskRef,
        policy: PolicyId,
        cpu: CpuId,
        now: Instant,
    ) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        let class = self.class_for(policy)?;
        if task.policy() == policy {
            return Ok(());
        }
        let was_running = task.state() == TaskState::Running;
        if let Ok(prev_class) = self.class_for(task.policy()) {
            // The task may sit on a different processor's queue than the
            // one this call names; its home CPU is where it is linked.
            let home = task.cpu();
            let target = if home < self.num_cpus { home } else { cpu };
            if !prev_class.dequeue_task(target, task) {
                debug!(
                    "dispatcher: task {} was not linked under policy {}",
                    task.id(),
                    prev_class.policy()
                );
            }
        }
        if was_running {
            // The dequeue dropped the running mark; restore it so the new
            // class installs the task as current.
            task.set_state(TaskState::Running);
        }
        debug!("dispatcher: task {} moves to policy {}", task.id(), policy);
        class.switched_to(cpu, task, now);
        Ok(())
    }

    /// Apply an external priority change and notify the owning class.
    pub fn set_priority(&self, cpu: CpuId, task: &TaskRef, priority: i32) -> SchedResult<()> {
        self.check_cpu(cpu)?;
        let old = task.priority();
        task.set_priority(priority);
        if let Ok(class) = self.class_for(task.policy()) {
            class.prio_changed(cpu, task, old);
        }
        Ok(())
    }

    /// Whether any class wants the processor rescheduled.
    pub fn needs_resched(&self, cpu: CpuId) -> bool {
        self.classes.iter().any(|c| c.needs_resched(cpu))
    }
}
