//! Compiler output document
//!
//! Typed view of the `solc --standard-json` output and the deployment gas
//! derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use synth_core::{CreationCost, GasEstimates};

/// Base cost of a contract-creation transaction
pub const CREATION_BASE_GAS: u64 = 21_000;

/// Per-byte charge used when the compiler gives no usable estimate
pub const GAS_PER_CODE_BYTE: u64 = 200;

/// Top-level compiler output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOutput {
    /// Diagnostics of every severity
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
    /// source unit -> contract name -> contract output
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, ContractOutput>>,
}

impl CompilerOutput {
    /// Split diagnostics into fatal errors and surfaced warnings.
    ///
    /// `info` diagnostics are dropped.
    pub fn partition_diagnostics(&self) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for diagnostic in &self.errors {
            match diagnostic.severity.as_str() {
                "error" => errors.push(diagnostic.text()),
                "warning" => warnings.push(diagnostic.text()),
                _ => {}
            }
        }

        (errors, warnings)
    }
}

/// One compiler diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// `error`, `warning` or `info`
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    /// e.g. `ParserError`, `TypeError`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<Value>,
}

impl Diagnostic {
    /// Formatted message, falling back to the bare message
    pub fn text(&self) -> String {
        self.formatted_message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.message.clone())
    }
}

/// Output for a single contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm: Option<EvmOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devdoc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdoc: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<Bytecode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_bytecode: Option<Bytecode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_identifiers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_estimates: Option<RawGasEstimates>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
    /// Hex without `0x`
    #[serde(default)]
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_references: Option<Value>,
}

impl Bytecode {
    /// `0x`-prefixed object, or `None` when the object is empty
    pub fn prefixed(&self) -> Option<String> {
        let object = self.object.trim_start_matches("0x");
        (!object.is_empty()).then(|| format!("0x{}", object))
    }
}

/// Gas estimates as the compiler prints them; numbers arrive as strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGasEstimates {
    #[serde(default)]
    pub creation: RawCreationCost,
    #[serde(default)]
    pub external: BTreeMap<String, String>,
    #[serde(default)]
    pub internal: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCreationCost {
    #[serde(default)]
    pub code_deposit_cost: Option<String>,
    #[serde(default)]
    pub execution_cost: Option<String>,
    #[serde(default)]
    pub total_cost: Option<String>,
}

/// Parse a compiler gas figure; `infinite` and garbage count as absent
fn gas_figure(raw: &Option<String>) -> Option<u64> {
    raw.as_deref().and_then(|s| s.trim().parse().ok())
}

impl RawGasEstimates {
    pub fn normalize(&self) -> GasEstimates {
        GasEstimates {
            creation: CreationCost {
                code_deposit_cost: gas_figure(&self.creation.code_deposit_cost),
                execution_cost: gas_figure(&self.creation.execution_cost),
                total_cost: gas_figure(&self.creation.total_cost),
            },
            external: self.external.clone(),
            internal: self.internal.clone(),
        }
    }
}

/// Deployment gas for a contract.
///
/// Uses `codeDepositCost + executionCost` when both are numeric, otherwise
/// `21000 + 200 * bytes` of init code, otherwise zero.
pub fn deployment_gas(estimates: &GasEstimates, bytecode: Option<&str>) -> u64 {
    let creation = &estimates.creation;
    if let (Some(deposit), Some(execution)) = (creation.code_deposit_cost, creation.execution_cost) {
        return deposit.saturating_add(execution);
    }

    match bytecode.map(|code| code.trim_start_matches("0x")) {
        Some(hex) if !hex.is_empty() => {
            let bytes = (hex.len() as u64).div_ceil(2);
            CREATION_BASE_GAS + GAS_PER_CODE_BYTE * bytes
        }
        _ => 0,
    }
}
