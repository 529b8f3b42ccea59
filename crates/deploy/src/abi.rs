//! ABI encoding of constructor and call arguments.

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::Param,
    primitives::{Bytes, keccak256},
};
use serde_json::Value;

use crate::error::ExecutionError;

/// A parsed function signature such as `approve(address,uint256)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    /// Always a [`DynSolType::Tuple`].
    pub params: DynSolType,
}

impl FunctionSignature {
    pub fn parse(signature: &str) -> Result<Self, ExecutionError> {
        let invalid = |reason: String| ExecutionError::Encoding {
            reason: format!("invalid signature `{signature}`: {reason}"),
        };

        let (name, params) = signature
            .split_once('(')
            .ok_or_else(|| invalid("missing parameter list".to_string()))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("bad function name".to_string()));
        }

        let params = DynSolType::parse(&format!("({params}"))
            .map_err(|err| invalid(err.to_string()))?;
        if !matches!(params, DynSolType::Tuple(_)) {
            return Err(invalid("parameters must form a tuple".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Canonical form, e.g. `perform(uint256,bool)`.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.name, self.params.sol_type_name())
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.canonical().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }
}

/// Calldata for calling `signature` with `args`.
pub fn encode_call(signature: &str, args: &[DynSolValue]) -> Result<Bytes, ExecutionError> {
    let signature = FunctionSignature::parse(signature)?;
    let values = DynSolValue::Tuple(args.to_vec());
    ensure_matches(&signature.params, &values, &signature.canonical())?;

    let mut data = signature.selector().to_vec();
    data.extend(values.abi_encode_params());
    Ok(data.into())
}

/// Creation code: `bytecode` followed by the encoded constructor arguments.
pub fn encode_constructor(
    bytecode: &Bytes,
    inputs: &[Param],
    args: &[DynSolValue],
) -> Result<Bytes, ExecutionError> {
    let params = DynSolType::Tuple(resolve_params(inputs)?);
    let values = DynSolValue::Tuple(args.to_vec());
    ensure_matches(&params, &values, "constructor")?;

    let mut data = bytecode.to_vec();
    data.extend(values.abi_encode_params());
    Ok(data.into())
}

/// Coerce loosely typed JSON arguments (as an operator would write them)
/// into values for `inputs`.
pub fn coerce_args(inputs: &[Param], raw: &[Value]) -> Result<Vec<DynSolValue>, ExecutionError> {
    if inputs.len() != raw.len() {
        return Err(ExecutionError::Encoding {
            reason: format!("expected {} arguments, got {}", inputs.len(), raw.len()),
        });
    }

    resolve_params(inputs)?
        .iter()
        .zip(raw)
        .map(|(ty, value)| {
            let text = json_to_sol_literal(value)?;
            ty.coerce_str(&text).map_err(|err| ExecutionError::Encoding {
                reason: format!("cannot read '{text}' as {}: {err}", ty.sol_type_name()),
            })
        })
        .collect()
}

fn resolve_params(inputs: &[Param]) -> Result<Vec<DynSolType>, ExecutionError> {
    inputs
        .iter()
        .map(|param| {
            param.resolve().map_err(|err| ExecutionError::Encoding {
                reason: format!("unsupported parameter `{}`: {err}", param.name),
            })
        })
        .collect()
}

fn ensure_matches(
    params: &DynSolType,
    values: &DynSolValue,
    target: &str,
) -> Result<(), ExecutionError> {
    if params.matches(values) {
        return Ok(());
    }
    Err(ExecutionError::Encoding {
        reason: format!(
            "arguments do not match `{target}`: expected {}, got {}",
            params.sol_type_name(),
            values
                .sol_type_name()
                .map(|name| name.into_owned())
                .unwrap_or_else(|| "untyped values".to_string())
        ),
    })
}

fn json_to_sol_literal(value: &Value) -> Result<String, ExecutionError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(json_to_sol_literal)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", items.join(",")))
        }
        Value::Null | Value::Object(_) => Err(ExecutionError::Encoding {
            reason: format!("unsupported argument {value}"),
        }),
    }
}
