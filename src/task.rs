//! Task descriptors and the release-compute-sleep cycle
//!
//! A task alternates between two states forever: released (eligible or
//! executing) and suspended (waiting for its next release instant). The
//! control block here owns that bookkeeping; dispatch order is the
//! scheduler's business.

use core::fmt;

use crate::workload::Workload;

/// Logical time, in scheduler ticks.
pub type Tick = u64;

/// Capacity of the executive's task table.
pub const MAX_TASKS: usize = 8;

/// Default stack reservation charged per task, in bytes.
pub const DEFAULT_STACK_SIZE: usize = 256;

/// Default execution cost of one release, in ticks.
pub const DEFAULT_COST: Tick = 1;

/// Static priority. Numerically higher values win the processor.
///
/// Two registered tasks may never share a priority; the executive rejects
/// duplicates so the dispatch order stays a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    /// Rank below every real task; what an empty processor "runs".
    pub const IDLE: Priority = Priority(0);

    /// The raw rank.
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Index of a registered task, handed out at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Position in the executive's task table.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// How a completed release chooses its next wake instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// Sleep for the period measured from completion. Reproduces the
    /// classic delay-from-now call: release instants drift later by the
    /// execution time of every iteration.
    Relative,
    /// Sleep until the nominal release instant plus the period. Drift-free
    /// while the task never overruns its period.
    Absolute,
}

/// Release cadence of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// First release at t = 0, then one release per period.
    Periodic { period: Tick },
    /// Sleeps first: first release at t = interval, then a fixed relative
    /// cadence. Models sporadic work with a fixed inter-arrival assumption.
    Aperiodic { interval: Tick },
}

/// Everything the registrar states about a task, fixed for its lifetime.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub workload: Workload,
    pub kind: TaskKind,
    pub priority: Priority,
    /// Stack budget charged against the executive's memory pool.
    pub stack_size: usize,
    /// Processor ticks one release occupies before its effect lands.
    pub cost: Tick,
    pub policy: DelayPolicy,
}

impl TaskSpec {
    /// Describe a periodic task with default stack, cost, and the legacy
    /// relative-delay policy.
    pub const fn periodic(
        name: &'static str,
        workload: Workload,
        period: Tick,
        priority: Priority,
    ) -> Self {
        Self {
            name,
            workload,
            kind: TaskKind::Periodic { period },
            priority,
            stack_size: DEFAULT_STACK_SIZE,
            cost: DEFAULT_COST,
            policy: DelayPolicy::Relative,
        }
    }

    /// Describe an aperiodic task. Its cadence has no nominal grid, so the
    /// policy is pinned to relative delay.
    pub const fn aperiodic(
        name: &'static str,
        workload: Workload,
        interval: Tick,
        priority: Priority,
    ) -> Self {
        Self {
            name,
            workload,
            kind: TaskKind::Aperiodic { interval },
            priority,
            stack_size: DEFAULT_STACK_SIZE,
            cost: DEFAULT_COST,
            policy: DelayPolicy::Relative,
        }
    }

    /// Override the delay policy (ignored for aperiodic tasks).
    pub const fn with_policy(mut self, policy: DelayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the per-release execution cost.
    pub const fn with_cost(mut self, cost: Tick) -> Self {
        self.cost = cost;
        self
    }

    /// Override the stack reservation.
    pub const fn with_stack(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Nominal spacing between releases, whatever the kind.
    pub const fn cadence_ticks(&self) -> Tick {
        match self.kind {
            TaskKind::Periodic { period } => period,
            TaskKind::Aperiodic { interval } => interval,
        }
    }
}

/// Task execution state. Two states, no terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Released: eligible to run (or running right now).
    Ready,
    /// Suspended until the wake instant.
    Sleeping,
}

/// Control block: one registered task plus its release bookkeeping.
#[derive(Debug, Clone)]
pub struct Task {
    pub spec: TaskSpec,
    pub state: TaskState,
    /// Next (or, while released, current) nominal release instant.
    pub wake_at: Tick,
    /// Nominal instant of the in-flight or most recent release.
    pub release_instant: Tick,
    /// Execution ticks still owed by the in-flight release.
    pub cost_left: Tick,
    pub releases: u64,
    pub overruns: u64,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        let first_wake = match spec.kind {
            TaskKind::Periodic { .. } => 0,
            TaskKind::Aperiodic { interval } => interval,
        };
        Self {
            spec,
            state: TaskState::Sleeping,
            wake_at: first_wake,
            release_instant: first_wake,
            cost_left: 0,
            releases: 0,
            overruns: 0,
        }
    }

    /// Release the task if its wake instant has arrived. Returns whether a
    /// release happened this call.
    pub fn try_release(&mut self, now: Tick) -> bool {
        if self.state == TaskState::Sleeping && now >= self.wake_at {
            self.state = TaskState::Ready;
            self.release_instant = self.wake_at;
            self.cost_left = if self.spec.cost == 0 { 1 } else { self.spec.cost };
            self.releases += 1;
            true
        } else {
            false
        }
    }

    /// Charge one tick of execution. Returns true when the release's cost
    /// is fully paid and its effect should land.
    pub fn charge_tick(&mut self) -> bool {
        self.cost_left -= 1;
        self.cost_left == 0
    }

    /// Complete the release at `now`: compute the next wake instant per the
    /// delay policy and suspend. Returns true if an absolute-policy task
    /// overran (the next instant was already due at completion).
    pub fn finish_release(&mut self, now: Tick) -> bool {
        let (spacing, policy) = match self.spec.kind {
            TaskKind::Periodic { period } => (period, self.spec.policy),
            TaskKind::Aperiodic { interval } => (interval, DelayPolicy::Relative),
        };

        let mut overran = false;
        self.wake_at = match policy {
            DelayPolicy::Relative => now + spacing,
            DelayPolicy::Absolute => {
                let next = self.release_instant + spacing;
                if next <= now {
                    // Missed the grid; re-release immediately but keep the
                    // nominal instants on their original spacing.
                    overran = true;
                }
                next
            }
        };
        if overran {
            self.overruns += 1;
        }
        self.state = TaskState::Sleeping;
        overran
    }
}
