use anyhow::Result;
use wasmtime::{Engine, FuncType, Linker};

use super::hooks::HookGroup;
use super::inspect::val_type;
use super::store::InstanceState;
use super::trampoline::{self, TrampolineData};

/// Registers the generic trampoline as the implementation of every function
/// import, group by group. Shadowing is allowed so duplicate (module, field)
/// declarations each register a binding rather than failing.
pub(crate) fn link_hooks(
    linker: &mut Linker<InstanceState>,
    engine: &Engine,
    groups: &[HookGroup],
) -> Result<()> {
    linker.allow_shadowing(true);
    for group in groups {
        for hook in &group.hooks {
            let Some(signature) = hook.function_signature() else {
                // Globals, tables, and memories have no host implementation;
                // instantiation reports them as link failures.
                continue;
            };
            let ty = FuncType::new(
                engine,
                signature.params().iter().copied().map(val_type),
                signature.results().iter().copied().map(val_type),
            );
            let data = TrampolineData {
                module: group.module.clone(),
                field: hook.field.clone(),
                signature: signature.encode(),
            };
            tracing::debug!(
                "binding import {}.{} ({})",
                data.module,
                data.field,
                data.signature
            );
            linker.func_new(&group.module, &hook.field, ty, move |mut caller, params, results| {
                trampoline::enter(&data, &mut caller, params, results)
            })?;
        }
    }
    Ok(())
}
