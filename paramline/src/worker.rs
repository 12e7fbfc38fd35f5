//! The consumer side of the pipeline.
//!
//! A [`ParamWorker`] drains the command queue, validates each `Set` against
//! its parameter's bounds and applies it to the [`ParameterTable`] it owns.
//! It has two states:
//!
//! ```text
//!            Set(valid)    → apply, stay Running
//!            Set(invalid)  → discard, log rejection, stay Running
//!   Running  queue empty   → sleep idle_backoff, stay Running
//!            Stop          → Stopped (terminal)
//! ```
//!
//! Shutdown is requested only through [`Command::Stop`], so it is ordered
//! after every update pushed before it. Nothing queued after `Stop` is ever
//! consumed.
//!
//! [`WorkerHandle::spawn`] runs a worker on its own thread; joining the
//! handle hands back the final table and counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_affinity::CoreId;
use thiserror::Error;

use crate::command::{Command, CommandConsumer};
use crate::config::WorkerConfig;
use crate::param::{ParamId, Parameter};
use crate::registry::ParamValue;
use crate::table::ParameterTable;
use crate::trace::{debug, info, warn};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Terminal: a `Stop` command was processed.
    Stopped,
}

/// Outcome of one [`ParamWorker::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The queue was empty.
    Idle,
    /// A value was validated and written to the table.
    Applied(ParamId),
    /// A value failed validation and was discarded.
    Rejected(ParamId),
    /// The worker is stopped, either just now or earlier.
    Stopped,
}

/// Per-kind counts of applied and rejected updates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    applied: [u64; ParamId::COUNT],
    rejected: [u64; ParamId::COUNT],
}

impl WorkerStats {
    #[must_use]
    pub fn applied(&self, id: ParamId) -> u64 {
        self.applied[id.index()]
    }

    #[must_use]
    pub fn rejected(&self, id: ParamId) -> u64 {
        self.rejected[id.index()]
    }

    #[must_use]
    pub fn total_applied(&self) -> u64 {
        self.applied.iter().sum()
    }

    #[must_use]
    pub fn total_rejected(&self) -> u64 {
        self.rejected.iter().sum()
    }
}

/// Errors from running a worker thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The OS refused to create the thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
    /// The worker thread panicked before it could be joined.
    #[error("worker thread panicked")]
    Panicked,
}

/// What a worker leaves behind once it has stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerReport {
    pub table: ParameterTable,
    pub stats: WorkerStats,
    pub state: WorkerState,
}

/// Queue consumer that owns the parameter table.
///
/// A worker is `Running` from construction until it processes `Stop`.
pub struct ParamWorker {
    commands: CommandConsumer,
    table: ParameterTable,
    /// Written only by the worker itself; others may read it.
    running: Arc<AtomicBool>,
    stats: WorkerStats,
    idle_backoff: Duration,
}

impl ParamWorker {
    #[must_use]
    pub fn new(commands: CommandConsumer, table: ParameterTable, idle_backoff: Duration) -> Self {
        Self {
            commands,
            table,
            running: Arc::new(AtomicBool::new(true)),
            stats: WorkerStats::default(),
            idle_backoff,
        }
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        state_of(&self.running)
    }

    #[must_use]
    pub fn table(&self) -> &ParameterTable {
        &self.table
    }

    #[must_use]
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Processes at most one command without blocking.
    ///
    /// Once stopped, the queue is left untouched.
    pub fn step(&mut self) -> Step {
        if self.state() == WorkerState::Stopped {
            return Step::Stopped;
        }
        match self.commands.try_pop() {
            Some(command) => self.handle(command),
            None => Step::Idle,
        }
    }

    /// Runs until a `Stop` command is processed.
    pub fn run(&mut self) {
        while self.running.load(Ordering::Acquire) {
            if self.step() == Step::Idle {
                thread::sleep(self.idle_backoff);
            }
        }
    }

    #[must_use]
    pub fn into_report(self) -> WorkerReport {
        WorkerReport {
            state: self.state(),
            table: self.table,
            stats: self.stats,
        }
    }

    fn handle(&mut self, command: Command) -> Step {
        match command {
            Command::Set(ParamValue::TemperatureSetpoint(v)) => self.apply(v),
            Command::Set(ParamValue::HighTemperatureAlarm(v)) => self.apply(v),
            Command::Set(ParamValue::FanDutyCycle(v)) => self.apply(v),
            Command::Stop => {
                info!("stop received");
                self.running.store(false, Ordering::Release);
                Step::Stopped
            }
        }
    }

    fn apply<P: Parameter>(&mut self, value: P) -> Step {
        let slot = P::ID.index();
        if value.validate() {
            self.table.set_param(value);
            self.stats.applied[slot] += 1;
            debug!(param = P::NAME, value = value.raw(), "applied");
            Step::Applied(P::ID)
        } else {
            // Only the parameter name goes to the log.
            self.stats.rejected[slot] += 1;
            warn!(param = P::NAME, "rejected out-of-range value");
            Step::Rejected(P::ID)
        }
    }
}

fn state_of(running: &AtomicBool) -> WorkerState {
    if running.load(Ordering::Acquire) {
        WorkerState::Running
    } else {
        WorkerState::Stopped
    }
}

/// Handle to a worker running on its own thread.
pub struct WorkerHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<ParamWorker>,
}

impl WorkerHandle {
    /// Starts a worker thread draining `commands` into `table`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        commands: CommandConsumer,
        table: ParameterTable,
        config: WorkerConfig,
    ) -> Result<Self, WorkerError> {
        info!(
            idle_backoff_us = config.idle_backoff.as_micros() as u64,
            core = ?config.core,
            thread = %config.thread_name,
            "worker starting"
        );

        let mut worker = ParamWorker::new(commands, table, config.idle_backoff);
        let running = Arc::clone(&worker.running);
        let core = config.core;

        let thread = thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || {
                if let Some(id) = core
                    && !pin_to_core(id)
                {
                    warn!(core = id, "failed to pin worker thread");
                }
                info!("worker thread started");
                worker.run();
                info!("worker thread exiting");
                worker
            })
            .map_err(WorkerError::Spawn)?;

        Ok(Self { running, thread })
    }

    /// Current state as last published by the worker thread.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        state_of(&self.running)
    }

    /// Returns `true` once the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker to stop and returns what it left behind.
    ///
    /// Blocks until a `Stop` command reaches the worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Panicked`] if the worker thread panicked.
    pub fn join(self) -> Result<WorkerReport, WorkerError> {
        let worker = self.thread.join().map_err(|_| WorkerError::Panicked)?;
        let report = worker.into_report();
        info!(
            applied = report.stats.total_applied(),
            rejected = report.stats.total_rejected(),
            "worker joined"
        );
        Ok(report)
    }
}

/// Pins the current thread to `core_id`. Returns `false` if the OS refuses.
fn pin_to_core(core_id: usize) -> bool {
    core_affinity::set_for_current(CoreId { id: core_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::COMMAND_QUEUE_CAPACITY;
    use crate::params::{FanDutyCycle, HighTemperatureAlarm, TemperatureSetpoint};
    use crate::spsc;

    fn worker() -> (crate::command::CommandProducer, ParamWorker) {
        let (tx, rx) = spsc::channel::<Command, COMMAND_QUEUE_CAPACITY>();
        let worker = ParamWorker::new(rx, ParameterTable::new(), Duration::from_micros(50));
        (tx, worker)
    }

    #[test]
    fn starts_running_and_idles_on_empty_queue() {
        let (_tx, mut worker) = worker();
        assert_eq!(worker.state(), WorkerState::Running);
        assert_eq!(worker.step(), Step::Idle);
        assert_eq!(worker.state(), WorkerState::Running);
    }

    #[test]
    fn valid_value_is_applied() {
        let (tx, mut worker) = worker();
        tx.try_push(Command::set(HighTemperatureAlarm { threshold: 90.0 })).unwrap();

        assert_eq!(worker.step(), Step::Applied(ParamId::HighTemperatureAlarm));
        assert_eq!(worker.table().get::<HighTemperatureAlarm>().threshold, 90.0);
        assert_eq!(worker.stats().applied(ParamId::HighTemperatureAlarm), 1);
    }

    #[test]
    fn invalid_value_leaves_slot_unchanged() {
        let (tx, mut worker) = worker();
        tx.try_push(Command::set(FanDutyCycle { percent: 45.0 })).unwrap();
        tx.try_push(Command::set(FanDutyCycle { percent: 200.0 })).unwrap();

        assert_eq!(worker.step(), Step::Applied(ParamId::FanDutyCycle));
        assert_eq!(worker.step(), Step::Rejected(ParamId::FanDutyCycle));
        assert_eq!(worker.table().get::<FanDutyCycle>().percent, 45.0);
        assert_eq!(worker.stats().rejected(ParamId::FanDutyCycle), 1);
        assert_eq!(worker.state(), WorkerState::Running);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let (tx, mut worker) = worker();
        for raw in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            tx.try_push(Command::set(TemperatureSetpoint { value: raw })).unwrap();
            assert_eq!(worker.step(), Step::Rejected(ParamId::TemperatureSetpoint));
        }
        assert_eq!(*worker.table(), ParameterTable::new());
        assert_eq!(worker.stats().total_rejected(), 3);
    }

    #[test]
    fn stop_is_terminal_and_leaves_later_commands_queued() {
        let (tx, mut worker) = worker();
        tx.try_push(Command::Stop).unwrap();
        tx.try_push(Command::set(FanDutyCycle { percent: 10.0 })).unwrap();

        assert_eq!(worker.step(), Step::Stopped);
        assert_eq!(worker.state(), WorkerState::Stopped);

        assert_eq!(worker.step(), Step::Stopped);
        assert_eq!(tx.len(), 1);
        assert_eq!(worker.table().get::<FanDutyCycle>(), FanDutyCycle::DEFAULT);
    }

    #[test]
    fn run_returns_after_stop() {
        let (tx, mut worker) = worker();
        tx.try_push(Command::set(TemperatureSetpoint { value: 21.0 })).unwrap();
        tx.try_push(Command::Stop).unwrap();

        worker.run();

        let report = worker.into_report();
        assert_eq!(report.state, WorkerState::Stopped);
        assert_eq!(report.table.get::<TemperatureSetpoint>().value, 21.0);
        assert_eq!(report.stats.total_applied(), 1);
    }

    #[test]
    fn spawned_worker_joins_with_final_table() {
        let (tx, rx) = spsc::channel::<Command, COMMAND_QUEUE_CAPACITY>();
        let handle = WorkerHandle::spawn(
            rx,
            ParameterTable::new(),
            WorkerConfig::default().with_thread_name("paramline-test-worker"),
        )
        .unwrap();

        tx.try_push(Command::set(FanDutyCycle { percent: 30.0 })).unwrap();
        tx.try_push(Command::Stop).unwrap();

        let report = handle.join().unwrap();
        assert_eq!(report.state, WorkerState::Stopped);
        assert_eq!(report.table.get::<FanDutyCycle>().percent, 30.0);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn rejection_is_logged_when_it_happens_by_name_only() {
        use std::io;
        use std::sync::Mutex;

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let (tx, mut worker) = worker();
        tx.try_push(Command::set(FanDutyCycle { percent: 200.0 })).unwrap();
        let step = tracing::subscriber::with_default(subscriber, || worker.step());
        assert_eq!(step, Step::Rejected(ParamId::FanDutyCycle));

        let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("FanDutyCycle"), "{log}");
        assert!(!log.contains("200"), "{log}");
    }

    #[test]
    fn handle_reports_running_until_stop() {
        let (tx, rx) = spsc::channel::<Command, COMMAND_QUEUE_CAPACITY>();
        let handle =
            WorkerHandle::spawn(rx, ParameterTable::new(), WorkerConfig::default()).unwrap();

        assert_eq!(handle.state(), WorkerState::Running);
        assert!(!handle.is_finished());

        tx.try_push(Command::Stop).unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.state, WorkerState::Stopped);
    }
}
