use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use wasmtime::{Instance, Linker, Store, Val};

use super::inspect;
use super::linker::link_hooks;
use super::memory;
use super::module::WasmModule;
use super::store::{Command, Event, ImportCall, InstanceState};
use crate::error::RuntimeError;
use crate::signature::ValueKind;
use crate::value::{blank_val, Value};

/// How a call cycle left the instance: either the exported function returned
/// a value, or the guest called an import and is suspended awaiting
/// [`WasmInstance::resume`].
#[derive(Debug)]
pub enum CallOutcome {
    Completed(Value),
    Suspended(ImportCall),
}

#[derive(Clone, Copy)]
enum CycleState {
    Idle,
    Suspended { result: Option<ValueKind> },
}

/// An instantiated module. The engine store and instance live on a dedicated
/// worker thread; this handle drives it over a command/event channel pair.
/// A suspended import call is a trampoline frame parked on that thread, so
/// at most one import can be outstanding per instance.
///
/// All operations take `&mut self`: cross-thread access is serialized by the
/// borrow rather than an internal lock, and the cycle state field rejects
/// out-of-order `call`/`resume` deterministically.
pub struct WasmInstance {
    module: Arc<WasmModule>,
    commands: Option<Sender<Command>>,
    events: Receiver<Event>,
    state: CycleState,
    has_memory: bool,
    worker: Option<JoinHandle<()>>,
}

impl WasmInstance {
    /// Instantiates the module and links every import to the generic
    /// trampoline. The instance shares the module's compilation context and
    /// must be dropped before it.
    pub fn new(module: Arc<WasmModule>) -> Result<Self, RuntimeError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker_module = Arc::clone(&module);
        let worker = thread::Builder::new()
            .name("tsugu-instance".into())
            .spawn(move || run_worker(worker_module, command_rx, event_tx))
            .map_err(|e| RuntimeError::Engine(format!("failed to spawn instance worker: {e}")))?;

        match event_rx.recv() {
            Ok(Event::Ready { has_memory }) => Ok(Self {
                module,
                commands: Some(command_tx),
                events: event_rx,
                state: CycleState::Idle,
                has_memory,
                worker: Some(worker),
            }),
            Ok(Event::Failed { error }) => {
                drop(command_tx);
                let _ = worker.join();
                Err(error)
            }
            Ok(Event::Suspended { call }) => {
                // A start function reached an import; closing the channel
                // unwinds the parked trampoline and the worker exits.
                drop(command_tx);
                let _ = worker.join();
                Err(RuntimeError::Instantiation(format!(
                    "start function called import {}.{} during instantiation",
                    call.module, call.field
                )))
            }
            Ok(_) | Err(_) => {
                drop(command_tx);
                let _ = worker.join();
                Err(RuntimeError::Engine(
                    "instance worker failed during instantiation".to_string(),
                ))
            }
        }
    }

    /// The module this instance was created from.
    pub fn module(&self) -> &WasmModule {
        &self.module
    }

    /// Whether the module declares a memory export; when `false`, `read` and
    /// `write` are unavailable.
    pub fn has_memory(&self) -> bool {
        self.has_memory
    }

    /// Invokes an exported function. Valid only while no call cycle is in
    /// flight; a suspended instance rejects the call without touching the
    /// pending import.
    pub fn call(&mut self, function: &str, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
        if !matches!(self.state, CycleState::Idle) {
            return Err(RuntimeError::AlreadyRunning);
        }
        let signature = self
            .module
            .export_signature(function)
            .ok_or_else(|| RuntimeError::FunctionNotFound(function.to_string()))?;
        if args.len() != signature.params().len() {
            return Err(RuntimeError::ArityMismatch {
                function: function.to_string(),
                expected: signature.params().len(),
                actual: args.len(),
            });
        }
        for (index, (arg, kind)) in args.iter().zip(signature.params()).enumerate() {
            if arg.kind() != *kind {
                return Err(RuntimeError::ArgumentConversion {
                    index,
                    expected: *kind,
                });
            }
        }
        tracing::debug!("calling export `{function}` with {} args", args.len());
        self.send(Command::Invoke {
            function: function.to_string(),
            args: args.to_vec(),
        })?;
        self.await_outcome()
    }

    /// Completes the pending import call with a host-supplied result and
    /// continues guest execution; the cycle may then complete, trap, or
    /// suspend on the next import, exactly as a fresh `call` would.
    pub fn resume(&mut self, value: Value) -> Result<CallOutcome, RuntimeError> {
        let CycleState::Suspended { result } = self.state else {
            return Err(RuntimeError::NotRunning);
        };
        if let Some(kind) = result {
            if value.kind() != kind {
                // The parked continuation is one-shot: a value that cannot
                // convert means the pending call can never complete. Fail
                // the cycle and keep the instance usable.
                self.state = CycleState::Idle;
                self.send(Command::Abort)?;
                self.drain_aborted_cycle();
                return Err(RuntimeError::ResultConversion(format!(
                    "resume value kind `{}` does not match declared `{kind}`",
                    value.kind()
                )));
            }
        }
        tracing::debug!("resuming pending import with {value}");
        if let Err(e) = self.send(Command::Resume { value }) {
            // Worker is gone; the pending import can never complete.
            self.state = CycleState::Idle;
            return Err(e);
        }
        self.await_outcome()
    }

    /// Copies `length` bytes starting at `offset` out of the instance's
    /// linear memory. Works between calls and while suspended.
    pub fn read(&mut self, offset: u32, length: u32) -> Result<Vec<u8>, RuntimeError> {
        if !self.has_memory {
            return Err(RuntimeError::NoMemory);
        }
        self.send(Command::Read { offset, length })?;
        match self.recv()? {
            Event::ReadDone(reply) => reply,
            _ => Err(RuntimeError::Engine(
                "unexpected event from instance worker".to_string(),
            )),
        }
    }

    /// Writes the whole buffer at `offset`, or nothing on a bounds failure.
    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        if !self.has_memory {
            return Err(RuntimeError::NoMemory);
        }
        self.send(Command::Write {
            offset,
            bytes: bytes.to_vec(),
        })?;
        match self.recv()? {
            Event::WriteDone(reply) => reply,
            _ => Err(RuntimeError::Engine(
                "unexpected event from instance worker".to_string(),
            )),
        }
    }

    fn send(&self, command: Command) -> Result<(), RuntimeError> {
        let sender = self
            .commands
            .as_ref()
            .ok_or_else(|| RuntimeError::Engine("instance is shut down".to_string()))?;
        sender
            .send(command)
            .map_err(|_| RuntimeError::Engine("instance worker terminated".to_string()))
    }

    fn recv(&self) -> Result<Event, RuntimeError> {
        self.events
            .recv()
            .map_err(|_| RuntimeError::Engine("instance worker terminated".to_string()))
    }

    fn await_outcome(&mut self) -> Result<CallOutcome, RuntimeError> {
        match self.recv()? {
            Event::Completed { value } => {
                self.state = CycleState::Idle;
                Ok(CallOutcome::Completed(value))
            }
            Event::Trapped { message } => {
                self.state = CycleState::Idle;
                Err(RuntimeError::Trap(message))
            }
            Event::Failed { error } => {
                self.state = CycleState::Idle;
                Err(error)
            }
            Event::Suspended { call } => {
                self.state = CycleState::Suspended {
                    result: call.result,
                };
                Ok(CallOutcome::Suspended(call))
            }
            Event::Ready { .. } | Event::ReadDone(_) | Event::WriteDone(_) => {
                self.state = CycleState::Idle;
                Err(RuntimeError::Engine(
                    "unexpected event from instance worker".to_string(),
                ))
            }
        }
    }

    /// Consumes the trap produced by an aborted cycle so the channel stays
    /// one-command/one-event aligned.
    fn drain_aborted_cycle(&mut self) {
        loop {
            match self.events.recv() {
                Ok(Event::Trapped { message }) => {
                    tracing::debug!("abandoned cycle unwound: {message}");
                    break;
                }
                Ok(Event::Completed { .. }) | Ok(Event::Failed { .. }) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
}

impl Drop for WasmInstance {
    fn drop(&mut self) {
        // Closing the command channel unblocks the worker wherever it is,
        // including a trampoline parked inside a suspended import.
        drop(self.commands.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(module: Arc<WasmModule>, commands: Receiver<Command>, events: Sender<Event>) {
    let memory_export = module.memory_export().map(str::to_string);
    let state = InstanceState {
        commands,
        events,
        memory_export: memory_export.clone(),
    };
    let mut store = Store::new(&module.engine, state);
    let mut linker = Linker::new(&module.engine);
    if let Err(e) = link_hooks(&mut linker, &module.engine, module.hook_groups()) {
        let _ = store.data().events.send(Event::Failed {
            error: RuntimeError::Instantiation(format!("{e:#}")),
        });
        return;
    }
    let instance = match linker.instantiate(&mut store, &module.module) {
        Ok(instance) => instance,
        Err(e) => {
            let _ = store.data().events.send(Event::Failed {
                error: RuntimeError::Instantiation(format!("{e:#}")),
            });
            return;
        }
    };
    let mem = memory_export
        .as_deref()
        .and_then(|name| instance.get_memory(&mut store, name));
    if store
        .data()
        .events
        .send(Event::Ready {
            has_memory: mem.is_some(),
        })
        .is_err()
    {
        return;
    }

    loop {
        let command = match store.data().commands.recv() {
            Ok(command) => command,
            Err(_) => break,
        };
        let event = match command {
            Command::Invoke { function, args } => invoke(&mut store, &instance, &function, &args),
            Command::Read { offset, length } => Event::ReadDone(match mem {
                Some(mem) => memory::read_bytes(mem.data(&store), offset, length),
                None => Err(RuntimeError::NoMemory),
            }),
            Command::Write { offset, bytes } => Event::WriteDone(match mem {
                Some(mem) => memory::write_bytes(mem.data_mut(&mut store), offset, &bytes),
                None => Err(RuntimeError::NoMemory),
            }),
            // No import is pending when the worker sits in this loop; the
            // handle's state machine prevents these, but reply anyway so the
            // channel stays aligned.
            Command::Resume { .. } | Command::Abort => Event::Failed {
                error: RuntimeError::NotRunning,
            },
        };
        if store.data().events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("instance worker exiting");
}

fn invoke(
    store: &mut Store<InstanceState>,
    instance: &Instance,
    function: &str,
    args: &[Value],
) -> Event {
    let Some(func) = instance.get_func(&mut *store, function) else {
        return Event::Failed {
            error: RuntimeError::FunctionNotFound(function.to_string()),
        };
    };
    let ty = func.ty(&*store);
    let params: Vec<Val> = args.iter().map(|v| v.to_val()).collect();
    let mut results = Vec::with_capacity(ty.results().len());
    for result_ty in ty.results() {
        match inspect::value_kind(&result_ty) {
            Ok(kind) => results.push(blank_val(kind)),
            Err(_) => {
                return Event::Failed {
                    error: RuntimeError::ResultConversion(format!(
                        "function `{function}` declares an unsupported result type"
                    )),
                }
            }
        }
    }
    match func.call(&mut *store, &params, &mut results) {
        Ok(()) => match results.as_slice() {
            [single] => match Value::from_val(single) {
                Some(value) => Event::Completed { value },
                None => Event::Failed {
                    error: RuntimeError::ResultConversion(format!(
                        "function `{function}` returned a reference value"
                    )),
                },
            },
            other => Event::Failed {
                error: RuntimeError::ResultConversion(format!(
                    "function `{function}` returned {} results, expected exactly one",
                    other.len()
                )),
            },
        },
        Err(e) => Event::Trapped {
            message: trap_message(e),
        },
    }
}

/// The engine wraps traps in context layers; the root cause carries the trap
/// text itself, which is preserved verbatim.
fn trap_message(error: anyhow::Error) -> String {
    error.root_cause().to_string()
}
