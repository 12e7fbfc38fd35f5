//! Demonstration driver for the parameter pipeline.
//!
//! Prints the default table, spawns the worker, pushes a short script of
//! updates (one of them out of range) from a producer thread, then prints
//! the table the worker leaves behind.
//!
//! # Usage
//!
//! ```sh
//! PARAMLINE_WORKER_CORE=2 RUST_LOG=paramline=debug paramline-demo
//! ```

use std::thread;

use paramline::command::COMMAND_QUEUE_CAPACITY;
use paramline::{
    Command, ConfigError, FanDutyCycle, HighTemperatureAlarm, ParamId, ParameterTable,
    TemperatureSetpoint, WorkerConfig, WorkerError, WorkerHandle, spsc,
};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("failed to spawn producer thread: {0}")]
    SpawnProducer(std::io::Error),
    #[error("producer thread panicked")]
    ProducerPanicked,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("paramline-demo: {e}");
        std::process::exit(1);
    }
}

fn script() -> [Command; 5] {
    [
        Command::set(TemperatureSetpoint { value: 37.5 }),
        Command::set(HighTemperatureAlarm { threshold: 90.0 }),
        Command::set(FanDutyCycle { percent: 45.0 }),
        // Out of range, will be rejected.
        Command::set(FanDutyCycle { percent: 200.0 }),
        Command::Stop,
    ]
}

fn run() -> Result<(), DemoError> {
    paramline::init_tracing();

    let config = WorkerConfig::from_env()?;

    let table = ParameterTable::new();
    println!("Params {{ {table} }}");

    let (producer, consumer) = spsc::channel::<Command, COMMAND_QUEUE_CAPACITY>();
    let worker = WorkerHandle::spawn(consumer, table, config)?;

    let producer_thread = thread::Builder::new()
        .name("paramline-producer".into())
        .spawn(move || {
            for command in script() {
                if let Err(dropped) = producer.try_push(command) {
                    eprintln!("paramline-demo: queue full, dropped {dropped:?}");
                }
            }
        })
        .map_err(DemoError::SpawnProducer)?;

    producer_thread
        .join()
        .map_err(|_| DemoError::ProducerPanicked)?;
    let report = worker.join()?;

    for id in ParamId::ALL {
        let rejected = report.stats.rejected(id);
        if rejected > 0 {
            println!("[Reject] {id} x{rejected}");
        }
    }
    println!("Params {{ {} }}", report.table);
    Ok(())
}
