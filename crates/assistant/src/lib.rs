//! Free-text request interpretation
//!
//! Two tiers: a model backend when one is configured, and a keyword
//! heuristic that always answers. Any model failure drops to the heuristic,
//! so [`RequestInterpreter::interpret`] never fails. Whole-source generation
//! needs the model and has no fallback.

pub mod authoring;
pub mod heuristic;
pub mod model;
pub mod schema;

use std::sync::Arc;

use serde_json::Value;
use synth_core::config::AssistantConfig;
use synth_core::{Error, GeneratedContract, Interpretation, Provenance, Result};
use tracing::{info, warn};

pub use heuristic::HeuristicInterpreter;
pub use model::{ModelBackend, ModelInterpreter, OpenAiBackend};

/// Two-tier prompt interpreter
pub struct RequestInterpreter {
    model: Option<ModelInterpreter>,
    heuristic: HeuristicInterpreter,
}

impl RequestInterpreter {
    /// Heuristic-only interpreter
    pub fn new() -> Self {
        Self {
            model: None,
            heuristic: HeuristicInterpreter::new(),
        }
    }

    pub fn with_backend(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            model: Some(ModelInterpreter::new(backend)),
            heuristic: HeuristicInterpreter::new(),
        }
    }

    /// Use the OpenAI-compatible backend when the config carries an API key
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        if !config.is_configured() {
            info!("No model backend configured, using keyword heuristics");
            return Ok(Self::new());
        }

        let backend = OpenAiBackend::new(config)?;
        info!(model = %config.model, "Model backend configured");
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn model_available(&self) -> bool {
        self.model.is_some()
    }

    /// Interpret `prompt`, optionally informed by the caller's current settings
    pub async fn interpret(&self, prompt: &str, context: Option<&Value>) -> Interpretation {
        if let Some(model) = &self.model {
            match model.interpret(prompt, context).await {
                Ok(suggestion) => {
                    info!(
                        backend = model.backend_name(),
                        family = %suggestion.family,
                        contract = %suggestion.contract_name,
                        "Model interpretation accepted"
                    );
                    return Interpretation {
                        suggestion,
                        provenance: Provenance::Model,
                    };
                }
                Err(e) => warn!(backend = model.backend_name(), error = %e, "Model interpretation failed, using heuristics"),
            }
        }

        let suggestion = self.heuristic.interpret(prompt);
        info!(family = %suggestion.family, contract = %suggestion.contract_name, "Heuristic interpretation");

        Interpretation {
            suggestion,
            provenance: Provenance::Heuristic,
        }
    }

    /// Have the model write a complete contract; there is no heuristic tier for this
    pub async fn generate_source(&self, prompt: &str, context: Option<&Value>) -> Result<GeneratedContract> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::config("No model backend configured for source generation"))?;

        let contract = model.generate_source(prompt, context).await?;
        info!(
            backend = model.backend_name(),
            family = %contract.family,
            contract = %contract.contract_name,
            "Model wrote contract source"
        );
        Ok(contract)
    }
}

impl Default for RequestInterpreter {
    fn default() -> Self {
        Self::new()
    }
}
