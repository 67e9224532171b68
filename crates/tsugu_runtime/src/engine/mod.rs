//! Wasmtime-based execution engine for Tsugu.
//!
//! This module keeps the public API small and stable for embedding hosts
//! while splitting the implementation into focused submodules: module
//! loading and inspection, the import hook table, the generic trampoline,
//! and the per-instance call/resume machinery.

mod config;
mod hooks;
mod inspect;
mod instance;
mod linker;
mod memory;
mod module;
mod store;
mod trampoline;

pub use config::RuntimeConfig;
pub use hooks::{HookGroup, ImportHook};
pub use inspect::{ExportDescriptor, ExternKind, ImportDescriptor};
pub use instance::{CallOutcome, WasmInstance};
pub use module::WasmModule;
pub use store::ImportCall;
