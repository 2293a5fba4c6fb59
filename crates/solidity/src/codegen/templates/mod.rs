//! Base contract templates
//!
//! Each supported family has one Solidity template with placeholders for the
//! contract name and the six feature slots. Templates are embedded at build
//! time and registered with Handlebars when the manager is created.

use handlebars::Handlebars;
use serde::Serialize;
use synth_core::{ContractFamily, Error, Result};

/// Values substituted into a base template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(non_snake_case)]
pub struct TemplateSlots {
    pub CONTRACT_NAME: String,
    pub IMPORTS: String,
    pub INHERITANCE: String,
    pub STATE_VARIABLES: String,
    pub CONSTRUCTOR_CALLS: String,
    pub CONSTRUCTOR_BODY: String,
    pub FUNCTIONS: String,
}

/// Template manager for Solidity base contracts
pub struct SolidityTemplateManager {
    handlebars: Handlebars<'static>,
}

impl SolidityTemplateManager {
    /// Create a new template manager and register all base templates
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Solidity is not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self::register_templates(&mut handlebars)?;

        Ok(Self { handlebars })
    }

    fn register_templates(handlebars: &mut Handlebars) -> Result<()> {
        let templates = [
            (ContractFamily::FungibleToken, include_str!("erc20.sol.hbs")),
            (ContractFamily::NonFungibleToken, include_str!("erc721.sol.hbs")),
            (ContractFamily::MultiToken, include_str!("erc1155.sol.hbs")),
            (ContractFamily::GovernanceToken, include_str!("governance.sol.hbs")),
        ];

        for (family, template) in templates {
            handlebars
                .register_template_string(family.as_str(), template)
                .map_err(|e| Error::config(format!("Failed to register {} template: {}", family, e)))?;
        }

        Ok(())
    }

    /// Whether a base template exists for `family`
    pub fn has_template(&self, family: ContractFamily) -> bool {
        self.handlebars.has_template(family.as_str())
    }

    /// Render the base template of `family` with the given slot values
    pub fn render(&self, family: ContractFamily, slots: &TemplateSlots) -> Result<String> {
        if !self.has_template(family) {
            return Err(Error::UnknownFamily(family.as_str().to_string()));
        }

        self.handlebars
            .render(family.as_str(), slots)
            .map_err(|e| Error::config(format!("Failed to render template {}: {}", family, e)))
    }

    /// Families with a registered base template
    pub fn available_templates(&self) -> Vec<ContractFamily> {
        ContractFamily::ALL
            .into_iter()
            .filter(|family| self.has_template(*family))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_token_family_has_a_template() {
        let manager = SolidityTemplateManager::new().unwrap();
        assert_eq!(
            manager.available_templates(),
            vec![
                ContractFamily::FungibleToken,
                ContractFamily::NonFungibleToken,
                ContractFamily::MultiToken,
                ContractFamily::GovernanceToken,
            ]
        );
        assert!(!manager.has_template(ContractFamily::Custom));
    }

    #[test]
    fn test_render_does_not_escape_solidity() {
        let manager = SolidityTemplateManager::new().unwrap();
        let slots = TemplateSlots {
            CONTRACT_NAME: "Quoted".to_string(),
            IMPORTS: "import \"@openzeppelin/contracts/utils/Pausable.sol\";".to_string(),
            ..Default::default()
        };

        let source = manager.render(ContractFamily::FungibleToken, &slots).unwrap();
        assert!(source.contains("import \"@openzeppelin/contracts/utils/Pausable.sol\";"));
        assert!(!source.contains("&quot;"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_custom_family_has_no_template() {
        let manager = SolidityTemplateManager::new().unwrap();
        let result = manager.render(ContractFamily::Custom, &TemplateSlots::default());
        assert!(matches!(result, Err(Error::UnknownFamily(family)) if family == "custom"));
    }
}
