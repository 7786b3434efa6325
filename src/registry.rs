//! Canonical Task Set and Bring-Up
//!
//! The demo system is four periodic tasks and one aperiodic handler with
//! strictly ascending priorities, plus a two-slot rendezvous queue that is
//! created up front and deliberately left idle. `bring_up` registers the
//! whole set against an executive: either everything is created and the
//! system runs, or the executive halts and nothing ever dispatches.

use heapless::Vec;

use crate::queue::RendezvousQueue;
use crate::scheduler::{KernelError, Scheduler};
use crate::task::{Priority, TaskId, TaskSpec, Tick, MAX_TASKS};
use crate::workload::{Workload, FAHRENHEIT_INPUT, SEARCH_SPACE, SEARCH_TARGET, WIDE_LHS, WIDE_RHS};

/// Release period of the marker task, in ticks.
pub const TASK1_PERIOD: Tick = 166;
/// Release period of the temperature conversion task.
pub const TASK2_PERIOD: Tick = 170;
/// Release period of the wide-multiply task.
pub const TASK3_PERIOD: Tick = 186;
/// Release period of the binary-search task.
pub const TASK4_PERIOD: Tick = 166;
/// Arrival interval of the aperiodic handler.
pub const APERIODIC_INTERVAL: Tick = 50;

pub const TASK1_PRIORITY: Priority = Priority(1);
pub const TASK2_PRIORITY: Priority = Priority(2);
pub const TASK3_PRIORITY: Priority = Priority(3);
pub const TASK4_PRIORITY: Priority = Priority(4);
/// The aperiodic handler outranks every periodic task.
pub const APERIODIC_PRIORITY: Priority = Priority(5);

/// Slots in the rendezvous queue.
pub const QUEUE_LENGTH: usize = 2;

/// The demo's machine-word rendezvous queue.
pub type HandoffQueue = RendezvousQueue<QUEUE_LENGTH>;

/// The five demo tasks, in registration order.
///
/// Priorities ascend with the index, so the last periodic task wins any
/// simultaneous release and the aperiodic handler preempts them all.
pub fn demo_task_set() -> [TaskSpec; 5] {
    [
        TaskSpec::periodic(
            "TX1",
            Workload::Marker("Working 1"),
            TASK1_PERIOD,
            TASK1_PRIORITY,
        ),
        TaskSpec::periodic(
            "TX2",
            Workload::Convert {
                fahrenheit: FAHRENHEIT_INPUT,
            },
            TASK2_PERIOD,
            TASK2_PRIORITY,
        ),
        TaskSpec::periodic(
            "TX3",
            Workload::Multiply {
                lhs: WIDE_LHS,
                rhs: WIDE_RHS,
            },
            TASK3_PERIOD,
            TASK3_PRIORITY,
        ),
        TaskSpec::periodic(
            "TX4",
            Workload::Search {
                dataset: &SEARCH_SPACE,
                target: SEARCH_TARGET,
            },
            TASK4_PERIOD,
            TASK4_PRIORITY,
        ),
        TaskSpec::aperiodic(
            "Aperiodic",
            Workload::Marker("Aperiodic task 1 finished"),
            APERIODIC_INTERVAL,
            APERIODIC_PRIORITY,
        ),
    ]
}

/// Handles produced by a successful bring-up.
#[derive(Debug)]
pub struct TaskSet {
    /// The rendezvous queue, created before any task.
    pub queue: HandoffQueue,
    /// Task ids in registration order.
    pub ids: Vec<TaskId, MAX_TASKS>,
}

/// Register the queue and every task, or halt the executive.
///
/// Bring-up is all or nothing: on the first failure the executive is halted,
/// so a partially created system never dispatches a single task.
pub fn bring_up(sched: &mut Scheduler, specs: &[TaskSpec]) -> Result<TaskSet, KernelError> {
    match register_all(sched, specs) {
        Ok(set) => {
            log::info!(
                "bring-up complete: {} tasks, queue of {}",
                set.ids.len(),
                QUEUE_LENGTH
            );
            Ok(set)
        }
        Err(err) => {
            log::error!("bring-up failed: {}; executive halted", err);
            sched.halt();
            Err(err)
        }
    }
}

fn register_all(sched: &mut Scheduler, specs: &[TaskSpec]) -> Result<TaskSet, KernelError> {
    // The queue comes first, as the legacy system created it before any task.
    let queue = sched.create_queue::<QUEUE_LENGTH>()?;
    let mut ids = Vec::new();
    for spec in specs {
        let id = sched.create_task(*spec)?;
        ids.push(id).map_err(|_| KernelError::TableFull)?;
    }
    Ok(TaskSet { queue, ids })
}
