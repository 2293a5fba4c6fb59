//! Standard JSON input document
//!
//! Mirrors the `solc --standard-json` input format. Only the fields this
//! crate sets are modelled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use synth_core::config::CompilerSettings;

/// Outputs requested for every contract in every source unit
pub const OUTPUT_SELECTION: [&str; 7] = [
    "abi",
    "evm.bytecode",
    "evm.deployedBytecode",
    "evm.methodIdentifiers",
    "evm.gasEstimates",
    "devdoc",
    "userdoc",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self { enabled: true, runs: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSettings {
    pub optimizer: OptimizerSettings,
    /// file pattern -> contract pattern -> requested outputs
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub evm_version: String,
    pub remappings: Vec<String>,
}

impl InputSettings {
    pub fn from_settings(settings: &CompilerSettings) -> Self {
        let mut contracts = BTreeMap::new();
        contracts.insert(
            "*".to_string(),
            OUTPUT_SELECTION.iter().map(|s| s.to_string()).collect(),
        );
        let mut output_selection = BTreeMap::new();
        output_selection.insert("*".to_string(), contracts);

        Self {
            optimizer: OptimizerSettings {
                enabled: settings.optimizer_enabled,
                runs: settings.optimizer_runs,
            },
            output_selection,
            evm_version: settings.evm_version.clone(),
            remappings: Vec::new(),
        }
    }
}

/// Complete compiler input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerInput {
    pub language: String,
    /// Source units keyed by unit name; the primary unit is `<Name>.sol`
    pub sources: BTreeMap<String, SourceUnit>,
    pub settings: InputSettings,
}

impl CompilerInput {
    /// Input holding a single primary source unit named `<contract_name>.sol`
    pub fn new(contract_name: &str, source: &str, settings: &CompilerSettings) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            primary_unit_name(contract_name),
            SourceUnit {
                content: source.to_string(),
            },
        );

        Self {
            language: "Solidity".to_string(),
            sources,
            settings: InputSettings::from_settings(settings),
        }
    }

    /// Add an auxiliary source unit, keeping an existing one with the same name
    pub fn add_source(&mut self, unit_name: impl Into<String>, content: String) {
        self.sources.entry(unit_name.into()).or_insert(SourceUnit { content });
    }

    pub fn to_json(&self) -> synth_core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Source unit name for a contract
pub fn primary_unit_name(contract_name: &str) -> String {
    format!("{}.sol", contract_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_default_input_document() {
        let input = CompilerInput::new("Widget", "contract Widget {}", &CompilerSettings::default());
        let value: Value = serde_json::from_str(&input.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "language": "Solidity",
                "sources": {"Widget.sol": {"content": "contract Widget {}"}},
                "settings": {
                    "optimizer": {"enabled": true, "runs": 200},
                    "outputSelection": {"*": {"*": [
                        "abi",
                        "evm.bytecode",
                        "evm.deployedBytecode",
                        "evm.methodIdentifiers",
                        "evm.gasEstimates",
                        "devdoc",
                        "userdoc"
                    ]}},
                    "evmVersion": "shanghai",
                    "remappings": []
                }
            })
        );
    }

    #[test]
    fn test_settings_flow_into_input() {
        let settings = CompilerSettings {
            optimizer_enabled: false,
            optimizer_runs: 1,
            evm_version: "paris".to_string(),
            ..Default::default()
        };
        let input = CompilerInput::new("Widget", "", &settings);

        assert!(!input.settings.optimizer.enabled);
        assert_eq!(input.settings.evm_version, "paris");
    }

    #[test]
    fn test_add_source_keeps_primary_unit() {
        let mut input = CompilerInput::new("Widget", "primary", &CompilerSettings::default());
        input.add_source("Widget.sol", "replacement".to_string());
        input.add_source("lib/Other.sol", "other".to_string());

        assert_eq!(input.sources["Widget.sol"].content, "primary");
        assert_eq!(input.sources.len(), 2);
    }
}
