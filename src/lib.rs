//! tempo-rtos: Fixed-Priority Periodic Executive
//!
//! A deterministic re-creation of a small FreeRTOS task set: four periodic
//! worker tasks and one high-priority aperiodic handler over a preemptive,
//! strictly-prioritized executive.
//!
//! - Discrete-time executive: one `step` is one tick, fully deterministic
//! - Static task table and memory budget (no heap, no allocation)
//! - Relative and absolute delay policies, with observable drift
//! - Inert two-slot rendezvous queue, created but never exercised
//! - Trace hooks for asserting scheduling properties offline

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod task;
pub mod workload;

pub use queue::{QueueFull, RendezvousQueue};
pub use registry::{bring_up, demo_task_set, HandoffQueue, TaskSet};
pub use scheduler::{KernelError, SchedStats, Scheduler, TraceEvent};
pub use task::{DelayPolicy, Priority, Task, TaskId, TaskKind, TaskSpec, TaskState, Tick};
pub use workload::{WorkOutcome, Workload};
