use thiserror::Error;

use crate::signature::ValueKind;

pub type TsuguResult<T> = Result<T, RuntimeError>;

/// Errors reported by the runtime. Every fault during loading, instantiation,
/// a call cycle, or a memory access is returned as a value; nothing here
/// aborts the process.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to compile module: {0}")]
    Compile(String),

    #[error("failed to instantiate module: {0}")]
    Instantiation(String),

    #[error("no exported function named `{0}`")]
    FunctionNotFound(String),

    #[error("function `{function}` takes {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} does not match declared kind {expected}")]
    ArgumentConversion { index: usize, expected: ValueKind },

    #[error("instance is already running")]
    AlreadyRunning,

    #[error("instance is not awaiting a resume")]
    NotRunning,

    #[error("result conversion failed: {0}")]
    ResultConversion(String),

    /// Guest execution raised a runtime fault. The engine's message is
    /// preserved verbatim.
    #[error("wasm trap: {0}")]
    Trap(String),

    #[error("memory access out of bounds")]
    OutOfBounds,

    #[error("instance has no memory export")]
    NoMemory,

    /// Engine-level failure outside the call-cycle taxonomy, such as an
    /// instance whose worker is gone.
    #[error("engine failure: {0}")]
    Engine(String),
}
