//! Contract ABI reader
//!
//! Reads the function entries of a compiler-emitted ABI and derives 4-byte
//! selectors when the compiler output omits them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use synth_core::{Error, Result};

/// Callable functions of a contract ABI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractAbi {
    /// Functions in ABI order
    pub functions: Vec<AbiFunction>,
}

/// ABI function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiParameter>,
}

/// ABI parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiParameter {
    pub name: String,
    /// Parameter type (e.g., uint256, address, tuple[])
    pub param_type: String,
    /// Components (for tuples and structs)
    pub components: Option<Vec<AbiParameter>>,
}

/// ABI parser
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiParser;

impl AbiParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse ABI entries as emitted in compiler output
    pub fn parse(&self, entries: &[Value]) -> Result<ContractAbi> {
        let mut abi = ContractAbi::default();

        for item in entries {
            // constructor, event, error, fallback and receive entries have no selector
            if item.get("type").and_then(|v| v.as_str()).unwrap_or("function") != "function" {
                continue;
            }

            let name = item
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::parse("Function must have a name"))?
                .to_string();
            let inputs = Self::parse_parameters(item.get("inputs"))?;
            abi.functions.push(AbiFunction { name, inputs });
        }

        Ok(abi)
    }

    fn parse_parameters(value: Option<&Value>) -> Result<Vec<AbiParameter>> {
        let Some(array) = value.and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };

        array
            .iter()
            .map(|param| {
                let param_type = param
                    .get("type")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::parse("Parameter must have a type"))?
                    .to_string();

                let components = if param_type.starts_with("tuple") {
                    Some(Self::parse_parameters(param.get("components"))?)
                } else {
                    None
                };

                Ok(AbiParameter {
                    name: param.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    param_type,
                    components,
                })
            })
            .collect()
    }

    /// Canonical signature used for selector hashing, e.g. `transfer(address,uint256)`
    pub fn canonical_signature(function: &AbiFunction) -> String {
        let types: Vec<String> = function.inputs.iter().map(Self::canonical_type).collect();
        format!("{}({})", function.name, types.join(","))
    }

    /// Convert a parameter type to canonical form, expanding tuples
    fn canonical_type(param: &AbiParameter) -> String {
        match (param.param_type.strip_prefix("tuple"), &param.components) {
            (Some(array_suffix), Some(components)) => {
                let inner: Vec<String> = components.iter().map(Self::canonical_type).collect();
                format!("({}){}", inner.join(","), array_suffix)
            }
            _ => param.param_type.clone(),
        }
    }

    /// Hex selector without `0x`, matching the compiler's `methodIdentifiers`
    pub fn selector(signature: &str) -> String {
        let mut hasher = Keccak256::new();
        hasher.update(signature.as_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash[..4])
    }
}

impl ContractAbi {
    /// Selector table keyed by canonical signature
    pub fn method_identifiers(&self) -> BTreeMap<String, String> {
        self.functions
            .iter()
            .map(|function| {
                let signature = AbiParser::canonical_signature(function);
                let selector = AbiParser::selector(&signature);
                (signature, selector)
            })
            .collect()
    }
}
