//! Commands carried from the producer to the worker.
//!
//! Commands travel over an SPSC queue and carry no sequence number; queue
//! order is the only order. `Stop` shares the queue with data so shutdown is
//! ordered after every update pushed before it.

use crate::param::Parameter;
use crate::registry::ParamValue;
use crate::spsc::{Consumer, Producer};

/// Capacity of the producer → worker command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Producer end of the command queue.
pub type CommandProducer = Producer<Command, COMMAND_QUEUE_CAPACITY>;

/// Worker end of the command queue.
pub type CommandConsumer = Consumer<Command, COMMAND_QUEUE_CAPACITY>;

/// A single instruction for the worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Set one parameter. The value is validated by the worker, not here.
    Set(ParamValue),

    /// Stop the worker. Nothing queued after this is consumed.
    Stop,
}

impl Command {
    /// Builds a `Set` command from a concrete parameter value.
    #[must_use]
    pub fn set<P: Parameter>(value: P) -> Self {
        Self::Set(value.into())
    }
}

impl From<ParamValue> for Command {
    fn from(value: ParamValue) -> Self {
        Self::Set(value)
    }
}
