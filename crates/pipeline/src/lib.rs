/// End-to-end synthesis pipeline
///
/// Wires the interpreter, the template composer and the compiler adapter
/// together. Each stage hands its output by value to the next.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use synth_assistant::RequestInterpreter;
use synth_core::config::SynthConfig;
use synth_core::{
    ComposedSource, CompileResponse, CompilerArtifact, GeneratedContract, GenerationRequest, Interpretation,
    Result,
};
use synth_solidity::compiler::{CompileRequest, CompilerAdapter, CompilerContext};
use synth_solidity::codegen::TemplateComposer;
use tracing::{info, instrument, warn};

/// Result of generating and compiling in one go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutcome {
    pub composed: ComposedSource,
    pub compilation: CompileResponse,
}

/// Interpreter, composer and compiler behind one handle
pub struct ContractPipeline {
    composer: TemplateComposer,
    compiler: CompilerAdapter,
    interpreter: RequestInterpreter,
}

impl ContractPipeline {
    pub fn new(composer: TemplateComposer, compiler: CompilerAdapter, interpreter: RequestInterpreter) -> Self {
        Self {
            composer,
            compiler,
            interpreter,
        }
    }

    /// Build every stage from configuration
    pub fn from_config(config: &SynthConfig) -> Result<Self> {
        let context = Arc::new(CompilerContext::from_settings(&config.compiler));
        Ok(Self::new(
            TemplateComposer::new()?,
            CompilerAdapter::new(context, config.compiler.clone()),
            RequestInterpreter::from_config(&config.assistant)?,
        ))
    }

    pub fn composer(&self) -> &TemplateComposer {
        &self.composer
    }

    pub fn compiler(&self) -> &CompilerAdapter {
        &self.compiler
    }

    pub fn interpreter(&self) -> &RequestInterpreter {
        &self.interpreter
    }

    /// Validate and compose a request
    #[instrument(skip(self, request), fields(contract = %request.contract_name, family = %request.family))]
    pub fn generate(&self, request: GenerationRequest) -> Result<ComposedSource> {
        request.validate()?;

        let ignored = request.ignored_features();
        if !ignored.is_empty() {
            warn!(features = ?ignored, "Ignoring features the family does not support");
        }

        self.composer.compose(request)
    }

    /// Compile source and return the artifact
    #[instrument(skip(self, request), fields(contract = %request.contract_name))]
    pub async fn compile(&self, request: CompileRequest) -> Result<CompilerArtifact> {
        self.compiler.compile(request).await
    }

    /// Compile source and fold the result into the outbound shape
    pub async fn compile_source(&self, contract_name: &str, source: &str) -> CompileResponse {
        CompileResponse::from_result(self.compile(CompileRequest::new(contract_name, source)).await)
    }

    /// Compose a request, then compile what was composed.
    ///
    /// Request problems are errors; compiler problems land in the outcome.
    pub async fn generate_and_compile(&self, request: GenerationRequest) -> Result<SynthesisOutcome> {
        let composed = self.generate(request)?;
        let compilation = CompileResponse::from_result(self.compile(CompileRequest::from(&composed)).await);

        info!(contract = composed.contract_name(), success = compilation.success, "Synthesis finished");
        Ok(SynthesisOutcome { composed, compilation })
    }

    /// Interpret a free-text prompt; never fails
    #[instrument(skip(self, context))]
    pub async fn interpret(&self, prompt: &str, context: Option<&Value>) -> Interpretation {
        self.interpreter.interpret(prompt, context).await
    }

    /// Interpret a prompt and compose the suggested contract
    pub async fn interpret_and_generate(
        &self,
        prompt: &str,
        context: Option<&Value>,
    ) -> Result<(Interpretation, ComposedSource)> {
        let interpretation = self.interpret(prompt, context).await;
        let request = interpretation.suggestion.clone().into_request();
        let composed = self.generate(request)?;
        Ok((interpretation, composed))
    }

    /// Have the model write a complete contract; requires a model backend
    #[instrument(skip(self, context))]
    pub async fn generate_source(&self, prompt: &str, context: Option<&Value>) -> Result<GeneratedContract> {
        self.interpreter.generate_source(prompt, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use synth_core::config::CompilerSettings;
    use synth_core::{ContractFamily, Error, Provenance};
    use synth_assistant::ModelBackend;
    use synth_solidity::compiler::CompilerEngine;

    /// Engine that reports every source unit's contract with fixed bytecode
    struct EchoEngine;

    #[async_trait]
    impl CompilerEngine for EchoEngine {
        async fn version(&self) -> Result<String> {
            Ok("0.8.24".to_string())
        }

        async fn compile(&self, input: &str) -> Result<String> {
            let input: Value = serde_json::from_str(input)?;
            let mut contracts = serde_json::Map::new();
            for unit in input["sources"].as_object().into_iter().flat_map(|s| s.keys()) {
                let name = unit.trim_end_matches(".sol").rsplit('/').next().unwrap_or(unit).to_string();
                let mut entry = serde_json::Map::new();
                entry.insert(name, json!({"abi": [], "evm": {"bytecode": {"object": "60806040"}}}));
                contracts.insert(unit.clone(), Value::Object(entry));
            }
            Ok(json!({"contracts": contracts}).to_string())
        }
    }

    fn pipeline() -> ContractPipeline {
        let context = Arc::new(CompilerContext::with_engine(Arc::new(EchoEngine)));
        ContractPipeline::new(
            TemplateComposer::new().unwrap(),
            CompilerAdapter::new(context, CompilerSettings::default()),
            RequestInterpreter::new(),
        )
    }

    #[test]
    fn test_generate_validates_first() {
        let result = pipeline().generate(GenerationRequest::new(ContractFamily::FungibleToken, "bad name"));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_widget_scenario() {
        let request = GenerationRequest::new(ContractFamily::FungibleToken, "Widget")
            .with_features(["mintable", "burnable", "burnable", "mintable"]);
        let composed = pipeline().generate(request).unwrap();

        assert_eq!(composed.source.matches("function mint(").count(), 1);
        assert_eq!(composed.source.matches(", ERC20Burnable").count(), 1);
    }

    #[tokio::test]
    async fn test_generate_and_compile() {
        let request = GenerationRequest::new(ContractFamily::NonFungibleToken, "Gallery").with_features(["royalty"]);
        let outcome = pipeline().generate_and_compile(request).await.unwrap();

        assert!(outcome.compilation.success, "{:?}", outcome.compilation);
        assert_eq!(outcome.compilation.bytecode.as_deref(), Some("0x60806040"));
        assert_eq!(outcome.compilation.gas_estimate, Some(21_000 + 200 * 4));
        assert_eq!(outcome.compilation.compilation_target.as_deref(), Some("Gallery.sol:Gallery"));
    }

    #[tokio::test]
    async fn test_compile_source_folds_validation_errors() {
        let response = pipeline().compile_source("Broken", "contract Broken {").await;

        assert!(!response.success);
        assert!(response.error.is_some());
    }

    /// Backend that always answers with the same contract
    struct AuthorBackend;

    #[async_trait]
    impl ModelBackend for AuthorBackend {
        fn name(&self) -> &str {
            "author"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(json!({
                "contractCode": "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\ncontract Escrow {\n    function release() public {}\n}",
                "contractName": "Escrow",
                "contractType": "custom",
                "features": [],
                "explanation": "Two-party escrow"
            })
            .to_string())
        }
    }

    #[tokio::test]
    async fn test_model_written_source_compiles() {
        let context = Arc::new(CompilerContext::with_engine(Arc::new(EchoEngine)));
        let pipeline = ContractPipeline::new(
            TemplateComposer::new().unwrap(),
            CompilerAdapter::new(context, CompilerSettings::default()),
            RequestInterpreter::with_backend(Arc::new(AuthorBackend)),
        );

        let contract = pipeline.generate_source("an escrow", None).await.unwrap();
        assert_eq!(contract.contract_name, "Escrow");

        let response = pipeline.compile_source(&contract.contract_name, &contract.contract_code).await;
        assert!(response.success, "{:?}", response);
        assert_eq!(response.compilation_target.as_deref(), Some("Escrow.sol:Escrow"));
    }

    #[tokio::test]
    async fn test_source_generation_requires_model() {
        let result = pipeline().generate_source("an escrow", None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_interpret_and_generate_without_model() {
        let (interpretation, composed) = pipeline()
            .interpret_and_generate("Create an NFT with royalties", None)
            .await
            .unwrap();

        assert_eq!(interpretation.provenance, Provenance::Heuristic);
        assert_eq!(composed.contract_name(), "MyNFT");
        assert_eq!(composed.request.symbol.as_deref(), Some("MNFT"));
        assert!(composed.source.contains("contract MyNFT is ERC721, Ownable {"));
    }
}
