use std::sync::Arc;

use tsugu_runtime::engine::{CallOutcome, ImportCall, WasmInstance, WasmModule};
use tsugu_runtime::value::Value;
use tsugu_runtime::RuntimeError;

fn instantiate(wat_src: &str) -> anyhow::Result<WasmInstance> {
    let wasm = wat::parse_str(wat_src)?;
    let module = Arc::new(WasmModule::load(&wasm)?);
    Ok(WasmInstance::new(module)?)
}

fn expect_completed(outcome: CallOutcome) -> Value {
    match outcome {
        CallOutcome::Completed(value) => value,
        other => panic!("expected a completed call, got {other:?}"),
    }
}

fn expect_suspended(outcome: CallOutcome) -> ImportCall {
    match outcome {
        CallOutcome::Suspended(call) => call,
        other => panic!("expected a suspension, got {other:?}"),
    }
}

const ADD: &str = r#"
(module
  (func (export "add") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.add)
)
"#;

#[test]
fn pure_export_computes() -> anyhow::Result<()> {
    let mut instance = instantiate(ADD)?;
    let result = expect_completed(instance.call("add", &[Value::I32(2), Value::I32(40)])?);
    assert_eq!(result, Value::I32(42));
    Ok(())
}

#[test]
fn import_suspends_then_resume_completes() -> anyhow::Result<()> {
    // `f` doubles its argument, hands it to the host, and adds one to
    // whatever the host replies.
    let mut instance = instantiate(
        r#"
(module
  (import "env" "hostfn" (func $hostfn (param i32) (result i32)))
  (func (export "f") (param i32) (result i32)
    local.get 0
    i32.const 2
    i32.mul
    call $hostfn
    i32.const 1
    i32.add)
)
"#,
    )?;

    let call = expect_suspended(instance.call("f", &[Value::I32(21)])?);
    assert_eq!(call.module, "env");
    assert_eq!(call.field, "hostfn");
    assert_eq!(call.args, vec![Value::I32(42)]);
    assert_eq!(call.signature, "(i)i");

    let result = expect_completed(instance.resume(Value::I32(100))?);
    assert_eq!(result, Value::I32(101));
    Ok(())
}

#[test]
fn call_while_suspended_is_rejected_and_pending_import_survives() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "hostfn" (func $hostfn (param i32) (result i32)))
  (func (export "f") (param i32) (result i32)
    local.get 0
    call $hostfn)
)
"#,
    )?;

    expect_suspended(instance.call("f", &[Value::I32(7)])?);
    assert!(matches!(
        instance.call("f", &[Value::I32(8)]),
        Err(RuntimeError::AlreadyRunning)
    ));

    // The rejected call must not have disturbed the pending import.
    let result = expect_completed(instance.resume(Value::I32(9))?);
    assert_eq!(result, Value::I32(9));
    Ok(())
}

#[test]
fn sequential_imports_resume_into_the_next_suspension() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "first" (func $first (param i32) (result i32)))
  (import "env" "second" (func $second (param i64) (result i64)))
  (func (export "chain") (param i32) (result i64)
    local.get 0
    call $first
    i64.extend_i32_s
    call $second)
)
"#,
    )?;

    let call = expect_suspended(instance.call("chain", &[Value::I32(5)])?);
    assert_eq!(call.field, "first");
    assert_eq!(call.args, vec![Value::I32(5)]);

    let call = expect_suspended(instance.resume(Value::I32(7))?);
    assert_eq!(call.field, "second");
    assert_eq!(call.args, vec![Value::I64(7)]);
    assert_eq!(call.signature, "(I)I");

    let result = expect_completed(instance.resume(Value::I64(-3))?);
    assert_eq!(result, Value::I64(-3));
    Ok(())
}

#[test]
fn missing_function_and_arity_errors() -> anyhow::Result<()> {
    let mut instance = instantiate(ADD)?;
    assert!(matches!(
        instance.call("missing", &[]),
        Err(RuntimeError::FunctionNotFound(name)) if name == "missing"
    ));
    assert!(matches!(
        instance.call("add", &[Value::I32(1)]),
        Err(RuntimeError::ArityMismatch {
            expected: 2,
            actual: 1,
            ..
        })
    ));
    // Errors before the engine is entered leave the instance idle.
    let result = expect_completed(instance.call("add", &[Value::I32(1), Value::I32(2)])?);
    assert_eq!(result, Value::I32(3));
    Ok(())
}

#[test]
fn argument_kind_mismatch_is_rejected() -> anyhow::Result<()> {
    let mut instance = instantiate(ADD)?;
    assert!(matches!(
        instance.call("add", &[Value::I32(1), Value::I64(2)]),
        Err(RuntimeError::ArgumentConversion { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn trap_carries_message_and_instance_returns_to_idle() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (func (export "boom") (result i32)
    unreachable)
  (func (export "ok") (result i32)
    i32.const 1)
)
"#,
    )?;

    match instance.call("boom", &[]) {
        Err(RuntimeError::Trap(message)) => assert!(!message.is_empty()),
        other => panic!("expected a trap, got {other:?}"),
    }
    let result = expect_completed(instance.call("ok", &[])?);
    assert_eq!(result, Value::I32(1));
    Ok(())
}

#[test]
fn resume_without_suspension_is_not_running() -> anyhow::Result<()> {
    let mut instance = instantiate(ADD)?;
    assert!(matches!(
        instance.resume(Value::I32(0)),
        Err(RuntimeError::NotRunning)
    ));
    Ok(())
}

#[test]
fn mismatched_resume_value_abandons_cycle_but_not_instance() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "hostfn" (func $hostfn (param i32) (result i32)))
  (func (export "f") (param i32) (result i32)
    local.get 0
    call $hostfn)
  (func (export "pure") (result i32)
    i32.const 11)
)
"#,
    )?;

    expect_suspended(instance.call("f", &[Value::I32(1)])?);
    assert!(matches!(
        instance.resume(Value::I64(1)),
        Err(RuntimeError::ResultConversion(_))
    ));
    // The abandoned call can never complete, but the instance is idle and
    // usable for fresh calls.
    assert!(matches!(
        instance.resume(Value::I32(1)),
        Err(RuntimeError::NotRunning)
    ));
    let result = expect_completed(instance.call("pure", &[])?);
    assert_eq!(result, Value::I32(11));
    Ok(())
}

#[test]
fn result_less_import_discards_the_resume_value() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "log" (func $log (param i32)))
  (func (export "g") (result i32)
    i32.const 5
    call $log
    i32.const 10)
)
"#,
    )?;

    let call = expect_suspended(instance.call("g", &[])?);
    assert_eq!(call.signature, "(i)");
    assert_eq!(call.args, vec![Value::I32(5)]);
    let result = expect_completed(instance.resume(Value::I32(0))?);
    assert_eq!(result, Value::I32(10));
    Ok(())
}

#[test]
fn dropping_a_suspended_instance_tears_down_cleanly() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "hostfn" (func $hostfn (param i32) (result i32)))
  (func (export "f") (param i32) (result i32)
    local.get 0
    call $hostfn)
)
"#,
    )?;

    expect_suspended(instance.call("f", &[Value::I32(3)])?);
    // The pending import is abandoned; drop must unpark the worker and join
    // it rather than hang.
    drop(instance);
    Ok(())
}

#[test]
fn float_and_wide_integer_values_survive_the_boundary() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (func (export "half") (param f64) (result f64)
    local.get 0
    f64.const 0.5
    f64.mul)
  (func (export "inc64") (param i64) (result i64)
    local.get 0
    i64.const 1
    i64.add)
)
"#,
    )?;

    let result = expect_completed(instance.call("half", &[Value::F64(0.5)])?);
    assert_eq!(result, Value::F64(0.25));
    let result = expect_completed(instance.call("inc64", &[Value::I64(i64::MAX - 1)])?);
    assert_eq!(result, Value::I64(i64::MAX));
    Ok(())
}

#[test]
fn f32_import_round_trip() -> anyhow::Result<()> {
    let mut instance = instantiate(
        r#"
(module
  (import "env" "scale" (func $scale (param f32) (result f32)))
  (func (export "s") (param f32) (result f32)
    local.get 0
    call $scale)
)
"#,
    )?;

    let call = expect_suspended(instance.call("s", &[Value::F32(1.5)])?);
    assert_eq!(call.args, vec![Value::F32(1.5)]);
    assert_eq!(call.signature, "(f)f");
    let result = expect_completed(instance.resume(Value::F32(2.5))?);
    assert_eq!(result, Value::F32(2.5));
    Ok(())
}
