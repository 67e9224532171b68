use wasmtime::{Engine, Module};

use super::config::RuntimeConfig;
use super::hooks::{self, HookGroup};
use super::inspect::{self, ExportDescriptor, ExternKind, ImportDescriptor};
use crate::error::RuntimeError;
use crate::signature::Signature;

/// A compiled module together with its compilation context and the
/// descriptors derived from its declared imports and exports. Shared
/// read-only by every instance created from it.
pub struct WasmModule {
    pub(crate) engine: Engine,
    pub(crate) module: Module,
    imports: Vec<ImportDescriptor>,
    exports: Vec<ExportDescriptor>,
    hook_groups: Vec<HookGroup>,
}

impl WasmModule {
    /// Compiles a module from binary (or WAT text) with default engine
    /// tuning.
    pub fn load(wasm: impl AsRef<[u8]>) -> Result<Self, RuntimeError> {
        Self::load_with(&RuntimeConfig::default(), wasm)
    }

    pub fn load_with(config: &RuntimeConfig, wasm: impl AsRef<[u8]>) -> Result<Self, RuntimeError> {
        let engine = Engine::new(&config.to_engine_config())
            .map_err(|e| RuntimeError::Engine(format!("{e:#}")))?;
        let module = Module::new(&engine, wasm.as_ref())
            .map_err(|e| RuntimeError::Compile(format!("{e:#}")))?;
        let (imports, exports) = inspect::describe_module(&module)?;
        let hook_groups = hooks::build_hook_groups(&imports);
        Ok(Self {
            engine,
            module,
            imports,
            exports,
            hook_groups,
        })
    }

    /// Declared imports, in declaration order.
    pub fn imports(&self) -> &[ImportDescriptor] {
        &self.imports
    }

    /// Declared exports, in declaration order.
    pub fn exports(&self) -> &[ExportDescriptor] {
        &self.exports
    }

    /// The per-origin-module binding table linked at instantiation time.
    pub fn hook_groups(&self) -> &[HookGroup] {
        &self.hook_groups
    }

    /// Signature of an exported function, or `None` when no function export
    /// has that exact name.
    pub fn export_signature(&self, name: &str) -> Option<&Signature> {
        self.exports
            .iter()
            .find(|e| e.kind == ExternKind::Func && e.name == name)
            .and_then(|e| e.signature.as_ref())
    }

    /// Name of the first memory export, when one is declared.
    pub(crate) fn memory_export(&self) -> Option<&str> {
        self.exports
            .iter()
            .find(|e| e.kind == ExternKind::Memory)
            .map(|e| e.name.as_str())
    }
}
