/// Core types, validation and configuration for contract synthesis
pub mod types;
pub mod validation;
pub mod config;

/// Re-export common types from synth-common
pub use synth_common::{Error, Result};

pub use types::{
    AnalysisSuggestion, ComposedSource, CompileResponse, CompilerArtifact, ContractFamily, CreationCost,
    Feature, GasEstimates, GeneratedContract, GenerationRequest, Interpretation, ParameterSpec, Provenance,
};
pub use validation::{validate_source, SourceReport};
