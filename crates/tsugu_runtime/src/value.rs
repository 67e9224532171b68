//! Host-side representation of guest values.

use std::fmt;

use serde::{Deserialize, Serialize};
use wasmtime::Val;

use crate::signature::ValueKind;

/// A value crossing the host/guest boundary. Reference kinds have no host
/// representation; passing one through the boundary is a conversion error at
/// the call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::V128(_) => ValueKind::V128,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn to_val(self) -> Val {
        match self {
            Value::I32(v) => Val::I32(v),
            Value::I64(v) => Val::I64(v),
            Value::F32(v) => Val::F32(v.to_bits()),
            Value::F64(v) => Val::F64(v.to_bits()),
            Value::V128(v) => Val::V128(v.into()),
        }
    }

    /// Converts an engine value back into the host representation. Returns
    /// `None` for reference values.
    pub(crate) fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::I32(v) => Some(Value::I32(*v)),
            Val::I64(v) => Some(Value::I64(*v)),
            Val::F32(bits) => Some(Value::F32(f32::from_bits(*bits))),
            Val::F64(bits) => Some(Value::F64(f64::from_bits(*bits))),
            Val::V128(v) => Some(Value::V128(v.as_u128())),
            _ => None,
        }
    }
}

/// Zero/null engine value for a kind, used to pre-fill result buffers.
pub(crate) fn blank_val(kind: ValueKind) -> Val {
    match kind {
        ValueKind::I32 => Val::I32(0),
        ValueKind::I64 => Val::I64(0),
        ValueKind::F32 => Val::F32(0),
        ValueKind::F64 => Val::F64(0),
        ValueKind::V128 => Val::V128(0u128.into()),
        ValueKind::ExternRef => Val::ExternRef(None),
        ValueKind::FuncRef => Val::FuncRef(None),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::V128(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::I32(-1).kind(), ValueKind::I32);
        assert_eq!(Value::I64(1 << 40).kind(), ValueKind::I64);
        assert_eq!(Value::F32(0.5).kind(), ValueKind::F32);
        assert_eq!(Value::F64(0.25).kind(), ValueKind::F64);
        assert_eq!(Value::V128(3).kind(), ValueKind::V128);
    }

    #[test]
    fn engine_round_trip_preserves_bits() {
        for value in [
            Value::I32(i32::MIN),
            Value::I64(i64::MAX),
            Value::F32(f32::MIN_POSITIVE),
            Value::F64(-0.0),
            Value::V128(u128::MAX),
        ] {
            assert_eq!(Value::from_val(&value.to_val()), Some(value));
        }
    }
}
