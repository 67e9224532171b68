//! Function signature codec.
//!
//! A signature is encoded as `"(" + param kinds + ")" + result kinds`, one
//! character per value kind (for example `"(iI)f"`). The encoded string is
//! the marshaling contract between the import trampoline and the host: both
//! sides walk it character by character, so it must round-trip exactly.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Kinds of WebAssembly values a signature can mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
    ExternRef,
    V128,
    FuncRef,
}

impl ValueKind {
    /// The wire character for this kind.
    pub fn to_char(self) -> char {
        match self {
            ValueKind::I32 => 'i',
            ValueKind::I64 => 'I',
            ValueKind::F32 => 'f',
            ValueKind::F64 => 'F',
            ValueKind::ExternRef => 'R',
            ValueKind::V128 => 'V',
            ValueKind::FuncRef => 'c',
        }
    }

    pub fn from_char(c: char) -> Result<Self, SignatureError> {
        match c {
            'i' => Ok(ValueKind::I32),
            'I' => Ok(ValueKind::I64),
            'f' => Ok(ValueKind::F32),
            'F' => Ok(ValueKind::F64),
            'R' => Ok(ValueKind::ExternRef),
            'V' => Ok(ValueKind::V128),
            'c' => Ok(ValueKind::FuncRef),
            other => Err(SignatureError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::ExternRef => "externref",
            ValueKind::V128 => "v128",
            ValueKind::FuncRef => "funcref",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature must start with `(`")]
    MissingOpen,
    #[error("signature is missing the `)` separator")]
    MissingClose,
    #[error("unknown value kind `{0}` in signature")]
    UnknownKind(char),
}

/// An ordered parameter/result kind sequence describing a function's calling
/// convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ValueKind>,
    results: Vec<ValueKind>,
}

impl Signature {
    pub fn new(params: Vec<ValueKind>, results: Vec<ValueKind>) -> Self {
        Self { params, results }
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    pub fn results(&self) -> &[ValueKind] {
        &self.results
    }

    /// The kind an import's resume value converts to: the last character of
    /// the encoded signature, or `None` when the results are empty.
    pub fn result_kind(&self) -> Option<ValueKind> {
        self.results.last().copied()
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.params.len() + self.results.len() + 2);
        out.push('(');
        for kind in &self.params {
            out.push(kind.to_char());
        }
        out.push(')');
        for kind in &self.results {
            out.push(kind.to_char());
        }
        out
    }

    pub fn decode(encoded: &str) -> Result<Self, SignatureError> {
        let rest = encoded.strip_prefix('(').ok_or(SignatureError::MissingOpen)?;
        let (params, results) = rest.split_once(')').ok_or(SignatureError::MissingClose)?;
        Ok(Self {
            params: params.chars().map(ValueKind::from_char).collect::<Result<_, _>>()?,
            results: results.chars().map(ValueKind::from_char).collect::<Result<_, _>>()?,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Signature::decode(&encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_kind() {
        let sig = Signature::new(
            vec![
                ValueKind::I32,
                ValueKind::I64,
                ValueKind::F32,
                ValueKind::F64,
                ValueKind::ExternRef,
                ValueKind::V128,
                ValueKind::FuncRef,
            ],
            vec![ValueKind::I64],
        );
        let encoded = sig.encode();
        assert_eq!(encoded, "(iIfFRVc)I");
        assert_eq!(Signature::decode(&encoded).unwrap(), sig);
    }

    #[test]
    fn empty_params_and_results() {
        let sig = Signature::new(vec![], vec![]);
        assert_eq!(sig.encode(), "()");
        assert_eq!(Signature::decode("()").unwrap(), sig);
        assert_eq!(sig.result_kind(), None);
    }

    #[test]
    fn result_kind_is_last_character() {
        let sig = Signature::decode("(i)if").unwrap();
        assert_eq!(sig.result_kind(), Some(ValueKind::F32));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Signature::decode("i)i"), Err(SignatureError::MissingOpen));
        assert_eq!(Signature::decode("(ii"), Err(SignatureError::MissingClose));
        assert_eq!(Signature::decode("(x)i"), Err(SignatureError::UnknownKind('x')));
        assert_eq!(Signature::decode("(i)z"), Err(SignatureError::UnknownKind('z')));
    }
}
