//! Hook table construction.
//!
//! The engine links host implementations per origin module, so the flat
//! import list is partitioned into one [`HookGroup`] per distinct origin
//! module name before registration. Every function import becomes one
//! generic-trampoline binding; duplicates are kept as independent bindings.

use serde::Serialize;

use super::inspect::{ExternKind, ImportDescriptor};
use crate::signature::Signature;

/// One import bound to the generic trampoline. The encoded signature string
/// is the closure data the trampoline recovers at invocation time.
#[derive(Debug, Clone, Serialize)]
pub struct ImportHook {
    pub field: String,
    pub kind: ExternKind,
    pub signature: Option<Signature>,
}

/// All imports sharing one origin module name, in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct HookGroup {
    pub module: String,
    pub hooks: Vec<ImportHook>,
}

/// Partitions the descriptor list by origin module name. Insertion order is
/// preserved within a group; groups appear in first-seen order.
pub(crate) fn build_hook_groups(imports: &[ImportDescriptor]) -> Vec<HookGroup> {
    let mut groups: Vec<HookGroup> = Vec::new();
    for import in imports {
        let index = match groups.iter().position(|g| g.module == import.module) {
            Some(index) => index,
            None => {
                groups.push(HookGroup {
                    module: import.module.clone(),
                    hooks: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[index].hooks.push(ImportHook {
            field: import.field.clone(),
            kind: import.kind,
            signature: import.signature.clone(),
        });
    }
    for group in &groups {
        tracing::debug!("hook group `{}` with {} imports", group.module, group.hooks.len());
    }
    groups
}

impl ImportHook {
    /// Signature of a function hook; non-function imports carry no signature
    /// and cannot be bound.
    pub(crate) fn function_signature(&self) -> Option<&Signature> {
        match self.kind {
            ExternKind::Func => self.signature.as_ref(),
            _ => None,
        }
    }
}
