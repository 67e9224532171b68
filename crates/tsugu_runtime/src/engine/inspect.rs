//! Import/export classification.
//!
//! Walks a compiled module's declared imports and exports and produces
//! structured descriptors, converting every function type through the
//! signature codec. Non-function externs carry kind information only.

use serde::Serialize;
use wasmtime::{ExternType, HeapType, Module, ValType};

use crate::error::RuntimeError;
use crate::signature::{Signature, ValueKind};

/// Extern kind of an import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternKind {
    Func,
    Global,
    Table,
    Memory,
}

impl std::fmt::Display for ExternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExternKind::Func => "func",
            ExternKind::Global => "global",
            ExternKind::Table => "table",
            ExternKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// One declared import: origin module name, field name, extern kind, and for
/// functions the derived signature.
#[derive(Debug, Clone, Serialize)]
pub struct ImportDescriptor {
    pub module: String,
    pub field: String,
    pub kind: ExternKind,
    pub signature: Option<Signature>,
}

/// One declared export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDescriptor {
    pub name: String,
    pub kind: ExternKind,
    pub signature: Option<Signature>,
}

/// Derives descriptor lists from a compiled module, in declaration order.
pub(crate) fn describe_module(
    module: &Module,
) -> Result<(Vec<ImportDescriptor>, Vec<ExportDescriptor>), RuntimeError> {
    let mut imports = Vec::new();
    for import in module.imports() {
        let (kind, signature) = classify(&import.ty())?;
        imports.push(ImportDescriptor {
            module: import.module().to_string(),
            field: import.name().to_string(),
            kind,
            signature,
        });
    }

    let mut exports = Vec::new();
    for export in module.exports() {
        let (kind, signature) = classify(&export.ty())?;
        exports.push(ExportDescriptor {
            name: export.name().to_string(),
            kind,
            signature,
        });
    }

    tracing::debug!(
        "classified {} imports and {} exports",
        imports.len(),
        exports.len()
    );
    Ok((imports, exports))
}

fn classify(ty: &ExternType) -> Result<(ExternKind, Option<Signature>), RuntimeError> {
    match ty {
        ExternType::Func(func) => {
            let params = func
                .params()
                .map(|p| value_kind(&p))
                .collect::<Result<Vec<_>, _>>()?;
            let results = func
                .results()
                .map(|r| value_kind(&r))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((ExternKind::Func, Some(Signature::new(params, results))))
        }
        ExternType::Global(_) => Ok((ExternKind::Global, None)),
        ExternType::Table(_) => Ok((ExternKind::Table, None)),
        ExternType::Memory(_) => Ok((ExternKind::Memory, None)),
    }
}

pub(crate) fn value_kind(ty: &ValType) -> Result<ValueKind, RuntimeError> {
    match ty {
        ValType::I32 => Ok(ValueKind::I32),
        ValType::I64 => Ok(ValueKind::I64),
        ValType::F32 => Ok(ValueKind::F32),
        ValType::F64 => Ok(ValueKind::F64),
        ValType::V128 => Ok(ValueKind::V128),
        ValType::Ref(ref_ty) => match ref_ty.heap_type() {
            HeapType::Func => Ok(ValueKind::FuncRef),
            HeapType::Extern => Ok(ValueKind::ExternRef),
            other => Err(RuntimeError::Compile(format!(
                "unsupported reference type `{other}` in function signature"
            ))),
        },
    }
}

pub(crate) fn val_type(kind: ValueKind) -> ValType {
    match kind {
        ValueKind::I32 => ValType::I32,
        ValueKind::I64 => ValType::I64,
        ValueKind::F32 => ValType::F32,
        ValueKind::F64 => ValType::F64,
        ValueKind::V128 => ValType::V128,
        ValueKind::ExternRef => ValType::EXTERNREF,
        ValueKind::FuncRef => ValType::FUNCREF,
    }
}
