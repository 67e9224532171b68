/// Engine tuning applied when a module is loaded. All instances derived from
/// the module share the resulting compilation context.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Attach wasm backtraces to traps.
    pub wasm_backtrace: bool,
    /// Enable the SIMD proposal (v128 values).
    pub wasm_simd: bool,
    /// Enable reference types (externref/funcref in signatures).
    pub wasm_reference_types: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            wasm_backtrace: true,
            wasm_simd: true,
            wasm_reference_types: true,
        }
    }
}

impl RuntimeConfig {
    pub(crate) fn to_engine_config(&self) -> wasmtime::Config {
        let mut config = wasmtime::Config::new();
        config.wasm_backtrace(self.wasm_backtrace);
        config.wasm_simd(self.wasm_simd);
        config.wasm_reference_types(self.wasm_reference_types);
        config
    }
}
