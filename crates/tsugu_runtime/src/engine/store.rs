//! Per-instance store data and the worker protocol.
//!
//! Each instance owns a worker thread holding the engine store. The public
//! handle and the worker speak a strict one-command/one-event protocol over
//! these types; `InstanceState` is the data attached to the engine store so
//! the import trampoline can reach the channel endpoints mid-call.

use std::sync::mpsc::{Receiver, Sender};

use serde::Serialize;

use crate::error::RuntimeError;
use crate::signature::ValueKind;
use crate::value::Value;

/// Record of an in-flight import invocation awaiting a host-supplied result.
#[derive(Debug, Clone, Serialize)]
pub struct ImportCall {
    /// Origin module name of the import.
    pub module: String,
    /// Field name of the import.
    pub field: String,
    /// Arguments the guest passed, in declaration order.
    pub args: Vec<Value>,
    /// Encoded signature of the import.
    pub signature: String,
    /// Kind the resume value converts to; `None` for result-less imports.
    #[serde(skip)]
    pub(crate) result: Option<ValueKind>,
}

/// Host -> worker.
pub(crate) enum Command {
    Invoke { function: String, args: Vec<Value> },
    Resume { value: Value },
    /// Fail the pending import call; the guest call unwinds as a trap.
    Abort,
    Read { offset: u32, length: u32 },
    Write { offset: u32, bytes: Vec<u8> },
}

/// Worker -> host. Every command produces exactly one event; `Suspended` is
/// emitted by the trampoline in place of the invoke's terminal event.
pub(crate) enum Event {
    Ready { has_memory: bool },
    Completed { value: Value },
    Trapped { message: String },
    Failed { error: RuntimeError },
    Suspended { call: ImportCall },
    ReadDone(Result<Vec<u8>, RuntimeError>),
    WriteDone(Result<(), RuntimeError>),
}

/// Data attached to the engine store of one instance.
pub(crate) struct InstanceState {
    pub(crate) commands: Receiver<Command>,
    pub(crate) events: Sender<Event>,
    /// Name of the first memory export, when the module declares one.
    pub(crate) memory_export: Option<String>,
}
