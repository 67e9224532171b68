//! The generic import trampoline.
//!
//! One instance of [`enter`] backs every function import of every module.
//! When the guest calls an import, the trampoline marshals the engine's
//! tagged argument array through the signature codec, reports the call to
//! the host, and parks on the command channel. The parked frame is the
//! captured continuation: `resume` releases it with the host's result value
//! and the guest continues as if the import had returned normally.
//!
//! While parked, the trampoline also services memory reads and writes, since
//! the engine store is only reachable from this stack.

use anyhow::{anyhow, bail, Result};
use wasmtime::{Caller, Extern, Memory, Val};

use super::memory;
use super::store::{Command, Event, ImportCall, InstanceState};
use crate::error::RuntimeError;
use crate::signature::Signature;
use crate::value::{blank_val, Value};

/// Closure data carried by each import binding.
pub(crate) struct TrampolineData {
    pub(crate) module: String,
    pub(crate) field: String,
    /// Encoded signature of the import.
    pub(crate) signature: String,
}

pub(crate) fn enter(
    data: &TrampolineData,
    caller: &mut Caller<'_, InstanceState>,
    params: &[Val],
    results: &mut [Val],
) -> Result<()> {
    let signature = Signature::decode(&data.signature)
        .map_err(|e| anyhow!("import {}.{}: {e}", data.module, data.field))?;

    // Marshal one argument per parameter kind, in order. A kind with no host
    // representation aborts the call before anything is reported.
    let mut args = Vec::with_capacity(signature.params().len());
    for (index, kind) in signature.params().iter().enumerate() {
        let value = params
            .get(index)
            .and_then(Value::from_val)
            .filter(|v| v.kind() == *kind);
        match value {
            Some(value) => args.push(value),
            None => bail!(
                "import {}.{}: cannot marshal `{kind}` argument {index}",
                data.module,
                data.field
            ),
        }
    }

    tracing::debug!(
        "import {}.{} {} suspended with {} args",
        data.module,
        data.field,
        data.signature,
        args.len()
    );
    let call = ImportCall {
        module: data.module.clone(),
        field: data.field.clone(),
        args,
        signature: data.signature.clone(),
        result: signature.result_kind(),
    };
    caller
        .data()
        .events
        .send(Event::Suspended { call })
        .map_err(|_| anyhow!("host handle dropped"))?;

    loop {
        let command = match caller.data().commands.recv() {
            Ok(command) => command,
            Err(_) => bail!(
                "host handle dropped while import {}.{} was pending",
                data.module,
                data.field
            ),
        };
        match command {
            Command::Resume { value } => {
                fill_results(&signature, value, results)?;
                tracing::debug!("import {}.{} resumed", data.module, data.field);
                return Ok(());
            }
            Command::Abort => {
                tracing::warn!("import {}.{} abandoned by host", data.module, data.field);
                bail!("import {}.{} abandoned by host", data.module, data.field);
            }
            Command::Read { offset, length } => {
                let reply = match lookup_memory(caller) {
                    Some(mem) => memory::read_bytes(mem.data(&*caller), offset, length),
                    None => Err(RuntimeError::NoMemory),
                };
                caller
                    .data()
                    .events
                    .send(Event::ReadDone(reply))
                    .map_err(|_| anyhow!("host handle dropped"))?;
            }
            Command::Write { offset, bytes } => {
                let reply = match lookup_memory(caller) {
                    Some(mem) => memory::write_bytes(mem.data_mut(&mut *caller), offset, &bytes),
                    None => Err(RuntimeError::NoMemory),
                };
                caller
                    .data()
                    .events
                    .send(Event::WriteDone(reply))
                    .map_err(|_| anyhow!("host handle dropped"))?;
            }
            Command::Invoke { function, .. } => bail!(
                "invoke of `{function}` received while import {}.{} was pending",
                data.module,
                data.field
            ),
        }
    }
}

/// Converts the resume value to the import's declared result kind (the last
/// signature character) and writes it into the final result slot; remaining
/// slots are zeroed. Result-less imports accept and discard the value.
fn fill_results(signature: &Signature, value: Value, results: &mut [Val]) -> Result<()> {
    for (slot, kind) in results.iter_mut().zip(signature.results()) {
        *slot = blank_val(*kind);
    }
    if let Some(kind) = signature.result_kind() {
        if value.kind() != kind {
            bail!("resume value kind `{}` does not match declared `{kind}`", value.kind());
        }
        if let Some(last) = results.last_mut() {
            *last = value.to_val();
        }
    }
    Ok(())
}

fn lookup_memory(caller: &mut Caller<'_, InstanceState>) -> Option<Memory> {
    let name = caller.data().memory_export.clone()?;
    caller.get_export(&name).and_then(Extern::into_memory)
}
