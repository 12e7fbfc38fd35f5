//! Typed, bounds-checked control parameters applied through a lock-free
//! command queue.
//!
//! A producer builds [`Command`]s and pushes them into an [`spsc`] queue. A
//! single [`worker`] thread drains the queue, validates each value against
//! its [`Parameter`] bounds and applies it to the [`ParameterTable`] it owns.
//! The [`registry`] gives tooling uniform access to every parameter kind by
//! id or name.
//!
//! ```
//! use paramline::{Command, FanDutyCycle, ParameterTable, WorkerConfig, WorkerHandle, spsc};
//! use paramline::command::COMMAND_QUEUE_CAPACITY;
//!
//! let (tx, rx) = spsc::channel::<Command, COMMAND_QUEUE_CAPACITY>();
//! let worker = WorkerHandle::spawn(rx, ParameterTable::new(), WorkerConfig::default())?;
//!
//! tx.try_push(Command::set(FanDutyCycle { percent: 45.0 })).unwrap();
//! tx.try_push(Command::set(FanDutyCycle { percent: 200.0 })).unwrap();
//! tx.try_push(Command::Stop).unwrap();
//!
//! let report = worker.join()?;
//! assert_eq!(report.table.to_string(), "Tset=37.50, HighAlarm=80.00, FanDuty=45.00");
//! # Ok::<(), paramline::WorkerError>(())
//! ```

// Lets the derive macro refer to this crate as ::paramline from inside it.
extern crate self as paramline;

pub mod command;
pub mod config;
pub mod param;
pub mod params;
pub mod registry;
pub mod spsc;
pub mod table;
mod trace;
pub mod worker;

#[doc(inline)]
pub use paramline_derive::Parameter;

pub use command::Command;
pub use config::{ConfigError, WorkerConfig};
pub use param::{InvalidParamId, ParamId, Parameter, ParseError, ValueText};
pub use params::{FanDutyCycle, HighTemperatureAlarm, TemperatureSetpoint};
pub use registry::{Handler, ParamValue, REGISTRY, find_by_id, find_by_name};
pub use table::ParameterTable;
pub use trace::init_tracing;
pub use worker::{WorkerError, WorkerHandle, WorkerReport, WorkerState};
