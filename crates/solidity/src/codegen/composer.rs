//! Template composer
//!
//! Merges a family's base template with the fragments of every requested
//! feature. Imports and inheritance entries are deduplicated, everything else
//! is appended as-is. The result is deterministic for a given request.

use std::path::{Path, PathBuf};

use synth_core::{ComposedSource, ContractFamily, Error, GenerationRequest, Result};
use tracing::{debug, info};

use super::registry::{self, FeatureFragment};
use super::templates::{SolidityTemplateManager, TemplateSlots};

/// Union of all selected fragments
#[derive(Debug, Default)]
struct MergedFragments {
    imports: Vec<&'static str>,
    inheritance: Vec<&'static str>,
    state_variables: Vec<&'static str>,
    constructor_calls: Vec<&'static str>,
    constructor_body: Vec<&'static str>,
    functions: Vec<&'static str>,
}

impl MergedFragments {
    fn absorb(&mut self, fragment: &FeatureFragment) {
        for import in fragment.imports {
            if !self.imports.contains(import) {
                self.imports.push(import);
            }
        }
        for base in fragment.inheritance {
            if !self.inheritance.contains(base) {
                self.inheritance.push(base);
            }
        }
        self.state_variables.extend_from_slice(fragment.state_variables);
        self.constructor_calls.extend_from_slice(fragment.constructor_calls);
        self.constructor_body.extend_from_slice(fragment.constructor_body);
        self.functions.extend_from_slice(fragment.functions);
    }

    fn into_slots(self, contract_name: &str) -> TemplateSlots {
        TemplateSlots {
            CONTRACT_NAME: contract_name.to_string(),
            IMPORTS: self.imports.join("\n"),
            INHERITANCE: prefixed(", ", &self.inheritance, ", "),
            STATE_VARIABLES: self.state_variables.join("\n    "),
            CONSTRUCTOR_CALLS: prefixed(" ", &self.constructor_calls, " "),
            CONSTRUCTOR_BODY: self.constructor_body.join("\n        "),
            FUNCTIONS: self.functions.join("\n\n    "),
        }
    }
}

fn prefixed(prefix: &str, items: &[&str], separator: &str) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, items.join(separator))
    }
}

/// Composes Solidity source from generation requests
pub struct TemplateComposer {
    templates: SolidityTemplateManager,
}

impl TemplateComposer {
    /// Create a composer with all base templates registered
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: SolidityTemplateManager::new()?,
        })
    }

    /// Families this composer can render
    pub fn supported_families(&self) -> Vec<ContractFamily> {
        self.templates.available_templates()
    }

    /// Compose the source for `request`.
    ///
    /// Unknown feature ids and features the family does not declare are
    /// skipped. Only a family without a base template is an error.
    pub fn compose(&self, request: GenerationRequest) -> Result<ComposedSource> {
        if !self.templates.has_template(request.family) {
            return Err(Error::UnknownFamily(request.family.as_str().to_string()));
        }

        let mut merged = MergedFragments::default();
        for id in request.unique_features() {
            match registry::fragment_for_id(id, request.family) {
                Some(fragment) => merged.absorb(fragment),
                None => debug!(feature = id, family = %request.family, "No fragment for feature, skipping"),
            }
        }

        let slots = merged.into_slots(&request.contract_name);
        let source = self.templates.render(request.family, &slots)?;

        info!(
            contract = %request.contract_name,
            family = %request.family,
            bytes = source.len(),
            "Composed contract source"
        );

        Ok(ComposedSource { source, request })
    }

    /// Write composed source to `<output_dir>/<Name>.sol`, returning the path.
    ///
    /// With `dry_run` nothing touches the filesystem.
    pub async fn write_source(&self, composed: &ComposedSource, output_dir: &Path, dry_run: bool) -> Result<PathBuf> {
        let path = output_dir.join(composed.file_name());

        if dry_run {
            info!(path = %path.display(), "Would write contract source (dry run)");
            return Ok(path);
        }

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| Error::Io(format!("Failed to create output directory: {}", e)))?;
        tokio::fs::write(&path, &composed.source)
            .await
            .map_err(|e| Error::Io(format!("Failed to write file {}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Wrote contract source");
        Ok(path)
    }
}
