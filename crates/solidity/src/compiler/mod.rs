//! Solidity compilation through an external `solc`
//!
//! The adapter gates source on the structural validator, builds the standard
//! JSON input (pulling in bundled library files), runs the engine under a
//! timeout and normalizes the output into a [`CompilerArtifact`].

pub mod abi;
pub mod engine;
pub mod imports;
pub mod input;
pub mod output;


pub use abi::{AbiParser, ContractAbi};
pub use engine::{CompilerContext, CompilerEngine, EngineLoader, SolcLoader, SolcProcess};
pub use imports::{ImportResolver, LibraryCatalog};
pub use input::CompilerInput;
pub use output::{deployment_gas, CompilerOutput};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use synth_core::config::{CompilerSettings, ContractSelection};
use synth_core::validation::declared_contracts;
use synth_core::{validate_source, CompilerArtifact, ComposedSource, Error, Result};
use tracing::{debug, error, info, warn};

use self::output::ContractOutput;

/// One compile job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub contract_name: String,
    pub source_code: String,
    /// Overrides the configured optimizer switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<bool>,
}

impl CompileRequest {
    pub fn new(contract_name: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            source_code: source_code.into(),
            optimizer: None,
        }
    }
}

impl From<&ComposedSource> for CompileRequest {
    fn from(composed: &ComposedSource) -> Self {
        Self::new(composed.contract_name(), composed.source.clone())
    }
}

/// Compiles source units into deployment artifacts
pub struct CompilerAdapter {
    context: Arc<CompilerContext>,
    settings: CompilerSettings,
    resolver: Option<Arc<dyn ImportResolver>>,
}

impl CompilerAdapter {
    pub fn new(context: Arc<CompilerContext>, settings: CompilerSettings) -> Self {
        let resolver = match settings.resolved_library_root() {
            Some(root) => Some(Arc::new(LibraryCatalog::openzeppelin(root)) as Arc<dyn ImportResolver>),
            None => {
                warn!("No library root configured and ./node_modules not found; library imports will not resolve");
                None
            }
        };

        Self {
            context,
            settings,
            resolver,
        }
    }

    /// Adapter that loads `solc` according to `settings`
    pub fn from_settings(settings: CompilerSettings) -> Self {
        Self::new(Arc::new(CompilerContext::from_settings(&settings)), settings)
    }

    /// Replace the import resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ImportResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn context(&self) -> &Arc<CompilerContext> {
        &self.context
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    /// Compile `request` and extract the artifact for its contract
    pub async fn compile(&self, request: CompileRequest) -> Result<CompilerArtifact> {
        let report = validate_source(&request.source_code);
        if !report.valid {
            warn!(contract = %request.contract_name, problems = ?report.problems, "Source failed validation");
            return Err(Error::ValidationFailed(report.problems));
        }

        let engine = tokio::time::timeout(self.timeout(), self.context.engine())
            .await
            .map_err(|_| Error::engine(format!("compiler did not load within {}s", self.settings.timeout_secs)))??;
        let input = self.build_input(&request).await?;
        let input_json = input.to_json()?;
        debug!(contract = %request.contract_name, units = input.sources.len(), "Invoking compiler");

        let raw = tokio::time::timeout(self.timeout(), engine.compile(&input_json))
            .await
            .map_err(|_| Error::CompilationTimeout(self.timeout()))??;

        let output: CompilerOutput = serde_json::from_str(&raw)?;
        self.extract_artifact(&request, output)
    }

    async fn build_input(&self, request: &CompileRequest) -> Result<CompilerInput> {
        let mut settings = self.settings.clone();
        if let Some(enabled) = request.optimizer {
            settings.optimizer_enabled = enabled;
        }

        let mut input = CompilerInput::new(&request.contract_name, &request.source_code, &settings);

        if let Some(resolver) = &self.resolver {
            let primary = input::primary_unit_name(&request.contract_name);
            let libraries = imports::collect_sources(resolver.as_ref(), &primary, &request.source_code).await?;
            for (unit, content) in libraries {
                input.add_source(unit, content);
            }
        }

        Ok(input)
    }

    fn extract_artifact(&self, request: &CompileRequest, output: CompilerOutput) -> Result<CompilerArtifact> {
        let (errors, warnings) = output.partition_diagnostics();

        for warning in &warnings {
            warn!(contract = %request.contract_name, "{}", warning);
        }

        if !errors.is_empty() {
            for message in &errors {
                error!(contract = %request.contract_name, "{}", message);
            }
            return Err(Error::CompilationFailed { errors, warnings });
        }

        let source_name = input::primary_unit_name(&request.contract_name);
        let Some(contracts) = output.contracts.get(&source_name) else {
            return Err(Error::ContractNotFound(request.contract_name.clone()));
        };

        let (contract_name, contract) = self.select_contract(request, contracts)?;
        let artifact = build_artifact(&source_name, contract_name, contract, warnings)?;

        info!(
            contract = %artifact.contract_name,
            gas = artifact.gas_estimate,
            warnings = artifact.warnings.len(),
            "Compiled contract"
        );

        Ok(artifact)
    }

    /// Pick the requested contract, or fall back per the selection policy
    fn select_contract<'a>(
        &self,
        request: &CompileRequest,
        contracts: &'a std::collections::BTreeMap<String, ContractOutput>,
    ) -> Result<(&'a str, &'a ContractOutput)> {
        if let Some((name, contract)) = contracts.get_key_value(&request.contract_name) {
            return Ok((name.as_str(), contract));
        }

        let fallback = match self.settings.contract_selection {
            ContractSelection::Strict => None,
            ContractSelection::LastDefined => declared_contracts(&request.source_code)
                .iter()
                .rev()
                .find_map(|name| contracts.get_key_value(name))
                .or_else(|| contracts.iter().next_back()),
        };

        match fallback {
            Some((name, contract)) => {
                warn!(
                    requested = %request.contract_name,
                    selected = %name,
                    "Requested contract not in output, using last defined contract"
                );
                Ok((name.as_str(), contract))
            }
            None => Err(Error::ContractNotFound(request.contract_name.clone())),
        }
    }
}

fn build_artifact(
    source_name: &str,
    contract_name: &str,
    contract: &ContractOutput,
    warnings: Vec<String>,
) -> Result<CompilerArtifact> {
    let abi_entries = contract.abi.clone().unwrap_or_default();
    let evm = contract.evm.clone().unwrap_or_default();

    let bytecode = evm.bytecode.as_ref().and_then(|b| b.prefixed());
    let deployed_bytecode = evm.deployed_bytecode.as_ref().and_then(|b| b.prefixed());
    let gas_estimates = evm.gas_estimates.as_ref().map(|g| g.normalize()).unwrap_or_default();
    let gas_estimate = deployment_gas(&gas_estimates, bytecode.as_deref());

    let method_identifiers = match evm.method_identifiers {
        Some(identifiers) if !identifiers.is_empty() => identifiers,
        _ => AbiParser::new().parse(&abi_entries)?.method_identifiers(),
    };

    let link_references = |b: &Option<output::Bytecode>| {
        b.as_ref()
            .and_then(|b| b.link_references.clone())
            .unwrap_or_else(|| Value::Object(Default::default()))
    };

    Ok(CompilerArtifact {
        contract_name: contract_name.to_string(),
        source_name: source_name.to_string(),
        bytecode,
        deployed_bytecode,
        abi: abi_entries,
        method_identifiers,
        link_references: link_references(&evm.bytecode),
        deployed_link_references: link_references(&evm.deployed_bytecode),
        devdoc: contract.devdoc.clone().unwrap_or(Value::Null),
        userdoc: contract.userdoc.clone().unwrap_or(Value::Null),
        gas_estimates,
        gas_estimate,
        warnings,
        compilation_target: format!("{}:{}", source_name, contract_name),
    })
}
