//! Fixed-Priority Preemptive Executive
//!
//! The executive advances in discrete ticks. Each `step` performs one tick of
//! processor time: sleeping tasks whose release instant has arrived become
//! ready, the highest-priority ready task is dispatched, and one tick of its
//! execution cost is charged. When a release pays its last cost tick, its
//! workload effect runs and the task computes its next release instant under
//! its delay policy.
//!
//! Priorities are strict and unique, so the dispatch rule is total: at no
//! tick does a ready task wait while a lower-priority task holds the
//! processor. A higher-priority release landing mid-job takes the processor
//! immediately; the preempted job resumes, with its remaining cost intact,
//! once nothing more urgent is eligible.

use core::fmt;

use heapless::Vec;

use crate::queue::RendezvousQueue;
use crate::task::{Priority, Task, TaskId, TaskSpec, TaskState, Tick, MAX_TASKS};
use crate::workload::WorkOutcome;

/// Default kernel memory budget in bytes, shared by stacks and queues.
pub const DEFAULT_BUDGET: usize = 4 * 1024;

// The ready mask handed to trace hooks is one bit per table slot.
const _: () = assert!(MAX_TASKS <= 16);

/// Why the kernel refused to create a task or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The requested stack or queue storage exceeds the remaining budget.
    OutOfMemory,
    /// The task table is at capacity.
    TableFull,
    /// Another task already holds the requested priority.
    DuplicatePriority,
    /// Periods and arrival intervals must be at least one tick.
    InvalidPeriod,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::OutOfMemory => write!(f, "kernel memory budget exhausted"),
            KernelError::TableFull => write!(f, "task table full"),
            KernelError::DuplicatePriority => write!(f, "priority already in use"),
            KernelError::InvalidPeriod => write!(f, "period must be at least one tick"),
        }
    }
}

/// Counters accumulated by the executive since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedStats {
    /// Release instants reached across all tasks.
    pub releases: u64,
    /// Releases that ran to completion.
    pub completions: u64,
    /// Times the processor changed hands.
    pub context_switches: u64,
    /// Context switches that took the processor from an unfinished job.
    pub preemptions: u64,
    /// Completions that landed past their successor's release instant.
    pub overruns: u64,
    /// Ticks with no task eligible to run.
    pub idle_ticks: u64,
}

impl SchedStats {
    pub const fn new() -> Self {
        Self {
            releases: 0,
            completions: 0,
            context_switches: 0,
            preemptions: 0,
            overruns: 0,
            idle_ticks: 0,
        }
    }
}

/// One observable scheduling decision, reported to trace hooks as it happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceEvent {
    /// A sleeping task reached its release instant and became ready.
    Release {
        now: Tick,
        task: TaskId,
        priority: Priority,
    },
    /// The processor changed hands.
    Switch {
        now: Tick,
        from: Option<TaskId>,
        to: TaskId,
    },
    /// An unfinished job lost the processor to a higher-priority release.
    Preempt { now: Tick, of: TaskId, by: TaskId },
    /// A release paid its last cost tick and its workload effect ran.
    Complete {
        now: Tick,
        task: TaskId,
        outcome: WorkOutcome,
        next_release: Tick,
    },
    /// One tick of processor time: who ran, and which table slots were ready.
    Tick {
        now: Tick,
        running: Option<TaskId>,
        ready: u16,
    },
}

/// The tick-stepped fixed-priority executive.
///
/// Holds the task table, the tick counter and the kernel memory budget.
/// Stepping is explicit, so the caller decides how ticks map onto real time:
/// the demo binary paces one tick per millisecond, tests step as fast as
/// they can.
pub struct Scheduler {
    tasks: Vec<Task, MAX_TASKS>,
    now: Tick,
    /// Table index of the job holding the processor, if any.
    running: Option<usize>,
    budget_left: usize,
    stats: SchedStats,
    halted: bool,
}

impl Scheduler {
    /// Executive with the default memory budget.
    pub const fn new() -> Self {
        Self::with_budget(DEFAULT_BUDGET)
    }

    /// Executive with an explicit memory budget in bytes.
    pub const fn with_budget(bytes: usize) -> Self {
        Self {
            tasks: Vec::new(),
            now: 0,
            running: None,
            budget_left: bytes,
            stats: SchedStats::new(),
            halted: false,
        }
    }

    /// Carve `bytes` out of the remaining budget.
    fn reserve(&mut self, bytes: usize) -> Result<(), KernelError> {
        if bytes > self.budget_left {
            return Err(KernelError::OutOfMemory);
        }
        self.budget_left -= bytes;
        Ok(())
    }

    /// Create a rendezvous queue, charging its storage to the kernel budget.
    pub fn create_queue<const N: usize>(&mut self) -> Result<RendezvousQueue<N>, KernelError> {
        self.reserve(RendezvousQueue::<N>::footprint())?;
        log::debug!(
            "queue created: {} slots, {} bytes",
            N,
            RendezvousQueue::<N>::footprint()
        );
        Ok(RendezvousQueue::new())
    }

    /// Register a task, charging its stack to the kernel budget.
    ///
    /// The task enters the table sleeping and is first dispatched once the
    /// tick counter reaches its initial release instant. Fails without side
    /// effects if the period is zero, the priority is taken, the table is
    /// full or the budget cannot cover the stack.
    pub fn create_task(&mut self, spec: TaskSpec) -> Result<TaskId, KernelError> {
        if spec.cadence_ticks() == 0 {
            return Err(KernelError::InvalidPeriod);
        }
        if self.tasks.iter().any(|t| t.spec.priority == spec.priority) {
            return Err(KernelError::DuplicatePriority);
        }
        if self.tasks.is_full() {
            return Err(KernelError::TableFull);
        }
        self.reserve(spec.stack_size)?;
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(Task::new(spec))
            .map_err(|_| KernelError::TableFull)?;
        log::debug!(
            "task {} registered: {} prio {} stack {}B",
            id,
            spec.name,
            spec.priority.get(),
            spec.stack_size
        );
        Ok(id)
    }

    /// Advance one tick, reporting scheduling decisions to `hook`.
    pub fn step_with(&mut self, hook: &mut impl FnMut(TraceEvent)) {
        if self.halted {
            return;
        }
        let now = self.now;

        // Phase 1: move every task whose release instant has arrived to ready.
        for i in 0..self.tasks.len() {
            if self.tasks[i].try_release(now) {
                self.stats.releases += 1;
                let spec = self.tasks[i].spec;
                log::debug!("t={}: {} released", now, spec.name);
                hook(TraceEvent::Release {
                    now,
                    task: TaskId(i),
                    priority: spec.priority,
                });
            }
        }

        // Phase 2: pick the highest-priority ready task.
        let mut ready: u16 = 0;
        let mut pick: Option<usize> = None;
        let mut best = Priority::IDLE;
        for (i, task) in self.tasks.iter().enumerate() {
            if task.state == TaskState::Ready {
                ready |= 1u16 << i;
                if pick.is_none() || task.spec.priority > best {
                    best = task.spec.priority;
                    pick = Some(i);
                }
            }
        }

        let Some(i) = pick else {
            self.running = None;
            self.stats.idle_ticks += 1;
            hook(TraceEvent::Tick {
                now,
                running: None,
                ready,
            });
            self.now = now + 1;
            return;
        };

        // Phase 3: hand over the processor if the pick is not already running.
        if self.running != Some(i) {
            let from = self.running.map(TaskId);
            if let Some(j) = self.running {
                // Still ready means the outgoing job has cost left to pay.
                if self.tasks[j].state == TaskState::Ready {
                    self.stats.preemptions += 1;
                    log::debug!(
                        "t={}: {} preempted by {}",
                        now,
                        self.tasks[j].spec.name,
                        self.tasks[i].spec.name
                    );
                    hook(TraceEvent::Preempt {
                        now,
                        of: TaskId(j),
                        by: TaskId(i),
                    });
                }
            }
            self.stats.context_switches += 1;
            log::trace!("t={}: dispatch {}", now, self.tasks[i].spec.name);
            hook(TraceEvent::Switch {
                now,
                from,
                to: TaskId(i),
            });
            self.running = Some(i);
        }
        hook(TraceEvent::Tick {
            now,
            running: Some(TaskId(i)),
            ready,
        });

        // Phase 4: charge one cost tick; on the last one the workload effect
        // runs and the task computes its next release instant.
        if self.tasks[i].charge_tick() {
            let outcome = self.tasks[i].spec.workload.run();
            let overran = self.tasks[i].finish_release(now);
            let next_release = self.tasks[i].wake_at;
            let name = self.tasks[i].spec.name;
            self.stats.completions += 1;
            if overran {
                self.stats.overruns += 1;
                log::warn!(
                    "t={}: {} finished past its next release instant {}",
                    now,
                    name,
                    next_release
                );
            }
            log::info!("[{}] {}", name, outcome);
            hook(TraceEvent::Complete {
                now,
                task: TaskId(i),
                outcome,
                next_release,
            });
            self.running = None;
        }

        self.now = now + 1;
    }

    /// Advance one tick without tracing.
    pub fn step(&mut self) {
        self.step_with(&mut |_| {});
    }

    /// Run `ticks` ticks and return the accumulated counters.
    pub fn run_for(&mut self, ticks: Tick) -> SchedStats {
        self.run_for_with(ticks, &mut |_| {})
    }

    /// Run `ticks` ticks under a trace hook and return the counters.
    pub fn run_for_with(&mut self, ticks: Tick, hook: &mut impl FnMut(TraceEvent)) -> SchedStats {
        for _ in 0..ticks {
            if self.halted {
                break;
            }
            self.step_with(hook);
        }
        self.stats
    }

    /// Stop dispatching permanently. Subsequent steps do nothing and the
    /// tick counter stays frozen.
    pub fn halt(&mut self) {
        self.halted = true;
        self.running = None;
        log::debug!("t={}: executive halted", self.now);
    }

    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current tick counter.
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Control block for `id`, if registered.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    /// Task holding the processor, if any.
    pub fn running(&self) -> Option<TaskId> {
        self.running.map(TaskId)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub const fn stats(&self) -> SchedStats {
        self.stats
    }

    /// Unreserved bytes left in the kernel budget.
    pub const fn budget_remaining(&self) -> usize {
        self.budget_left
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DelayPolicy;
    use crate::workload::Workload;
    use std::vec::Vec as StdVec;

    fn marker(name: &'static str) -> Workload {
        Workload::Marker(name)
    }

    fn completions_of(trace: &[TraceEvent], task: TaskId) -> StdVec<Tick> {
        trace
            .iter()
            .filter_map(|ev| match ev {
                TraceEvent::Complete { now, task: t, .. } if *t == task => Some(*now),
                _ => None,
            })
            .collect()
    }

    /// No tick may show a ready task outranking the one on the processor.
    fn assert_priority_order(trace: &[TraceEvent], priorities: &[Priority]) {
        for ev in trace {
            if let TraceEvent::Tick {
                now,
                running: Some(id),
                ready,
            } = ev
            {
                let running_priority = priorities[id.index()];
                for (slot, priority) in priorities.iter().enumerate() {
                    if ready & (1u16 << slot) != 0 {
                        assert!(
                            *priority <= running_priority,
                            "t={}: slot {} (prio {}) ready while prio {} ran",
                            now,
                            slot,
                            priority.get(),
                            running_priority.get(),
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_empty_executive_idles() {
        let mut sched = Scheduler::new();
        let stats = sched.run_for(10);
        assert_eq!(sched.now(), 10);
        assert_eq!(stats.idle_ticks, 10);
        assert_eq!(stats.completions, 0);
        assert_eq!(stats.context_switches, 0);
    }

    #[test]
    fn test_single_task_completes_on_period() {
        let mut sched = Scheduler::new();
        let id = sched
            .create_task(TaskSpec::periodic("tick", marker("tick"), 100, Priority(1)))
            .unwrap();

        let mut trace = StdVec::new();
        let stats = sched.run_for_with(301, &mut |ev| trace.push(ev));

        assert_eq!(completions_of(&trace, id), [0, 100, 200, 300]);
        assert_eq!(stats.releases, 4);
        assert_eq!(stats.completions, 4);
        assert_eq!(stats.idle_ticks, 297);
        assert_eq!(stats.preemptions, 0);
    }

    #[test]
    fn test_higher_priority_dispatched_first() {
        let mut sched = Scheduler::new();
        let low = sched
            .create_task(TaskSpec::periodic("low", marker("low"), 100, Priority(1)))
            .unwrap();
        let high = sched
            .create_task(TaskSpec::periodic("high", marker("high"), 100, Priority(2)))
            .unwrap();

        let mut trace = StdVec::new();
        sched.run_for_with(2, &mut |ev| trace.push(ev));

        // Both release at t=0; the higher priority completes first.
        assert_eq!(completions_of(&trace, high), [0]);
        assert_eq!(completions_of(&trace, low), [1]);
    }

    #[test]
    fn test_preemption_mid_job() {
        let mut sched = Scheduler::new();
        let low = sched
            .create_task(
                TaskSpec::periodic("long", marker("long"), 100, Priority(1)).with_cost(10),
            )
            .unwrap();
        let high = sched
            .create_task(TaskSpec::aperiodic("burst", marker("burst"), 3, Priority(9)))
            .unwrap();

        let mut trace = StdVec::new();
        let stats = sched.run_for_with(15, &mut |ev| trace.push(ev));

        // The burst arrives at t=3,6,9,12 and takes the processor each time;
        // the long job pays its ten cost ticks around it and lands at t=13.
        assert_eq!(completions_of(&trace, high), [3, 6, 9, 12]);
        assert_eq!(completions_of(&trace, low), [13]);
        assert_eq!(stats.preemptions, 4);
        assert_eq!(stats.completions, 5);

        assert_priority_order(&trace, &[Priority(1), Priority(9)]);
    }

    #[test]
    fn test_preempted_job_resumes_with_cost_intact() {
        let mut sched = Scheduler::new();
        let low = sched
            .create_task(TaskSpec::periodic("low", marker("low"), 50, Priority(1)).with_cost(4))
            .unwrap();
        sched
            .create_task(TaskSpec::aperiodic("hi", marker("hi"), 2, Priority(5)))
            .unwrap();

        let mut trace = StdVec::new();
        sched.run_for_with(8, &mut |ev| trace.push(ev));

        // low runs t=0,1 then loses t=2 to hi, resumes t=3, loses t=4,
        // and pays its final cost tick at t=5.
        assert_eq!(completions_of(&trace, low), [5]);
    }

    #[test]
    fn test_relative_policy_drifts_by_cost() {
        let mut sched = Scheduler::new();
        let id = sched
            .create_task(
                TaskSpec::periodic("drift", marker("drift"), 100, Priority(1))
                    .with_cost(3)
                    .with_policy(DelayPolicy::Relative),
            )
            .unwrap();

        let mut trace = StdVec::new();
        sched.run_for_with(320, &mut |ev| trace.push(ev));

        // Sleeping starts after completion, so each cycle stretches to
        // period + cost - 1 ticks.
        assert_eq!(completions_of(&trace, id), [2, 104, 206, 308]);
    }

    #[test]
    fn test_absolute_policy_holds_cadence() {
        let mut sched = Scheduler::new();
        let id = sched
            .create_task(
                TaskSpec::periodic("firm", marker("firm"), 100, Priority(1))
                    .with_cost(3)
                    .with_policy(DelayPolicy::Absolute),
            )
            .unwrap();

        let mut trace = StdVec::new();
        sched.run_for_with(320, &mut |ev| trace.push(ev));

        // Release instants advance by exactly one period regardless of cost.
        assert_eq!(completions_of(&trace, id), [2, 102, 202, 302]);
        let releases: StdVec<Tick> = trace
            .iter()
            .filter_map(|ev| match ev {
                TraceEvent::Release { now, .. } => Some(*now),
                _ => None,
            })
            .collect();
        assert_eq!(releases, [0, 100, 200, 300]);
    }

    #[test]
    fn test_absolute_overrun_is_counted() {
        let mut sched = Scheduler::new();
        let id = sched
            .create_task(
                TaskSpec::periodic("swamped", marker("swamped"), 5, Priority(1))
                    .with_cost(8)
                    .with_policy(DelayPolicy::Absolute),
            )
            .unwrap();

        let stats = sched.run_for(20);

        // Cost 8 against period 5: every completion lands past the next
        // nominal instant, so the task re-releases at the very next scan
        // while the release grid keeps its original spacing.
        assert_eq!(stats.completions, 2);
        assert_eq!(stats.overruns, 2);
        assert_eq!(stats.releases, 3);
        assert_eq!(sched.task(id).unwrap().overruns, 2);
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut sched = Scheduler::new();
        let err = sched
            .create_task(TaskSpec::periodic("bad", marker("bad"), 0, Priority(1)))
            .unwrap_err();
        assert_eq!(err, KernelError::InvalidPeriod);
        assert_eq!(sched.task_count(), 0);
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let mut sched = Scheduler::new();
        sched
            .create_task(TaskSpec::periodic("a", marker("a"), 100, Priority(3)))
            .unwrap();
        let err = sched
            .create_task(TaskSpec::periodic("b", marker("b"), 200, Priority(3)))
            .unwrap_err();
        assert_eq!(err, KernelError::DuplicatePriority);
        assert_eq!(sched.task_count(), 1);
    }

    #[test]
    fn test_table_capacity_enforced() {
        let mut sched = Scheduler::with_budget(64 * 1024);
        for n in 0..MAX_TASKS {
            let spec = TaskSpec::periodic("filler", marker("filler"), 100, Priority(n as u8 + 1));
            sched.create_task(spec).unwrap();
        }
        let overflow = TaskSpec::periodic("extra", marker("extra"), 100, Priority(200));
        assert_eq!(sched.create_task(overflow), Err(KernelError::TableFull));
    }

    #[test]
    fn test_budget_exhaustion_rejects_task() {
        let mut sched = Scheduler::with_budget(300);
        sched
            .create_task(TaskSpec::periodic("first", marker("first"), 100, Priority(1)))
            .unwrap();
        // 256 of 300 bytes are spent; a second default stack cannot fit.
        let err = sched
            .create_task(TaskSpec::periodic("second", marker("second"), 100, Priority(2)))
            .unwrap_err();
        assert_eq!(err, KernelError::OutOfMemory);
        assert_eq!(sched.task_count(), 1);
        assert_eq!(sched.budget_remaining(), 44);
    }

    #[test]
    fn test_queue_creation_charges_budget() {
        let mut sched = Scheduler::with_budget(1024);
        let queue: RendezvousQueue<2> = sched.create_queue().unwrap();
        assert_eq!(queue.capacity(), 2);
        assert_eq!(
            sched.budget_remaining(),
            1024 - RendezvousQueue::<2>::footprint()
        );
    }

    #[test]
    fn test_queue_creation_over_budget_fails() {
        let mut sched = Scheduler::with_budget(RendezvousQueue::<4>::footprint() - 1);
        let res: Result<RendezvousQueue<4>, _> = sched.create_queue();
        assert_eq!(res.unwrap_err(), KernelError::OutOfMemory);
    }

    #[test]
    fn test_halt_freezes_executive() {
        let mut sched = Scheduler::new();
        sched
            .create_task(TaskSpec::periodic("tick", marker("tick"), 10, Priority(1)))
            .unwrap();
        sched.run_for(5);
        assert_eq!(sched.now(), 5);

        sched.halt();
        let stats = sched.run_for(100);
        assert!(sched.is_halted());
        assert_eq!(sched.now(), 5);
        assert_eq!(stats.completions, 1);
    }

    #[test]
    fn test_run_is_resumable() {
        let mut split = Scheduler::new();
        let mut whole = Scheduler::new();
        for sched in [&mut split, &mut whole] {
            sched
                .create_task(TaskSpec::periodic("a", marker("a"), 7, Priority(1)).with_cost(2))
                .unwrap();
            sched
                .create_task(TaskSpec::periodic("b", marker("b"), 11, Priority(2)))
                .unwrap();
        }

        split.run_for(100);
        let resumed = split.run_for(100);
        let straight = whole.run_for(200);

        assert_eq!(resumed, straight);
        assert_eq!(split.now(), whole.now());
    }

    #[test]
    fn test_priority_invariant_under_load() {
        let mut sched = Scheduler::new();
        sched
            .create_task(TaskSpec::periodic("p1", marker("p1"), 16, Priority(1)).with_cost(5))
            .unwrap();
        sched
            .create_task(TaskSpec::periodic("p2", marker("p2"), 24, Priority(2)).with_cost(3))
            .unwrap();
        sched
            .create_task(TaskSpec::aperiodic("p3", marker("p3"), 9, Priority(3)))
            .unwrap();

        let mut trace = StdVec::new();
        sched.run_for_with(500, &mut |ev| trace.push(ev));

        assert_priority_order(&trace, &[Priority(1), Priority(2), Priority(3)]);
    }
}
