//! Hosted demo: the five-task set on a one-millisecond tick.
//!
//! Brings up the canonical task set and steps the executive forever, pacing
//! one tick per millisecond so the console output matches the cadence of the
//! original board. Task output lines arrive through the `log` facade.

use std::thread;
use std::time::Duration;

use log::{Level, LevelFilter, Metadata, Record};

use tempo_rtos::{bring_up, demo_task_set, Scheduler};

/// Prints informational records bare, so task output reads like a console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let mut executive = Scheduler::new();
    // The queue handle must stay alive for the whole run.
    let _set = match bring_up(&mut executive, &demo_task_set()) {
        Ok(set) => set,
        Err(err) => {
            // Startup is all or nothing. A half-built system must not run,
            // and the process blocks instead of exiting.
            eprintln!("bring-up failed: {err}");
            loop {
                thread::park();
            }
        }
    };

    loop {
        executive.step();
        thread::sleep(Duration::from_millis(1));
    }
}
