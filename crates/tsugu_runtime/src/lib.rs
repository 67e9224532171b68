//! Tsugu relays WebAssembly import calls to the embedding host.
//!
//! A loaded module's declared imports are each bound to one generic
//! trampoline. When guest code calls an import, execution suspends at the
//! call site and [`engine::WasmInstance::call`] returns a
//! [`engine::ImportCall`] describing the invocation; the host services it
//! however it likes and hands the result to [`engine::WasmInstance::resume`],
//! which continues the guest as if the import had returned natively.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tsugu_runtime::engine::{CallOutcome, WasmModule, WasmInstance};
//! use tsugu_runtime::value::Value;
//!
//! # fn main() -> Result<(), tsugu_runtime::RuntimeError> {
//! let module = Arc::new(WasmModule::load(std::fs::read("guest.wasm").unwrap())?);
//! let mut instance = WasmInstance::new(module)?;
//! let mut outcome = instance.call("entry", &[Value::I32(1)])?;
//! while let CallOutcome::Suspended(call) = outcome {
//!     println!("guest called {}.{} with {:?}", call.module, call.field, call.args);
//!     outcome = instance.resume(Value::I32(0))?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
mod error;
pub mod signature;
pub mod value;

pub use error::{RuntimeError, TsuguResult};
