/// Solidity source composition and compilation
///
/// `codegen` turns generation requests into contract source; `compiler`
/// drives `solc` and extracts deployment artifacts.
#[cfg(feature = "codegen")]
pub mod codegen;

#[cfg(feature = "compiler")]
pub mod compiler;

#[cfg(feature = "codegen")]
pub use codegen::{generate_contract, TemplateComposer};

#[cfg(feature = "compiler")]
pub use compiler::{CompileRequest, CompilerAdapter, CompilerContext, CompilerEngine};

pub use synth_core::{Error, Result};
