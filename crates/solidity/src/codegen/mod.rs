//! Solidity source generation
//!
//! This module turns a declarative [`GenerationRequest`] into contract source
//! by merging a family base template with the fragments of the selected
//! features.

pub mod composer;
pub mod registry;
pub mod templates;

#[cfg(test)]
mod tests;

pub use composer::TemplateComposer;
pub use registry::{fragment, fragment_for_id, FeatureFragment};
pub use templates::SolidityTemplateManager;

use synth_core::{ComposedSource, GenerationRequest, Result};

/// Main entry point for one-off contract generation
///
/// Validates the request, then composes it with a fresh composer.
pub fn generate_contract(request: GenerationRequest) -> Result<ComposedSource> {
    request.validate()?;
    TemplateComposer::new()?.compose(request)
}
