//! Integration tests for Solidity contract composition

use crate::codegen::{generate_contract, TemplateComposer};
use synth_core::{validate_source, ContractFamily, Error, Feature, GenerationRequest, Result};

fn erc20(name: &str, features: &[&str]) -> GenerationRequest {
    GenerationRequest::new(ContractFamily::FungibleToken, name).with_features(features.iter().copied())
}

#[tokio::test]
async fn test_widget_with_duplicate_features() -> Result<()> {
    let composer = TemplateComposer::new()?;
    let composed = composer.compose(erc20("Widget", &["mintable", "burnable", "mintable", "burnable"]))?;
    let source = &composed.source;

    assert_eq!(source.matches("function mint(").count(), 1);
    assert_eq!(source.matches(", ERC20Burnable").count(), 1);
    assert_eq!(
        source
            .matches("import \"@openzeppelin/contracts/token/ERC20/extensions/ERC20Burnable.sol\";")
            .count(),
        1
    );
    assert!(source.contains("contract Widget is ERC20, Ownable, ERC20Burnable {"));
    assert_eq!(composed.contract_name(), "Widget");
    assert_eq!(composed.file_name(), "Widget.sol");

    Ok(())
}

#[tokio::test]
async fn test_composition_is_deterministic() -> Result<()> {
    let request = erc20("Stable", &["pausable", "permit", "capped"]);

    let first = TemplateComposer::new()?.compose(request.clone())?;
    let second = TemplateComposer::new()?.compose(request)?;

    assert_eq!(first.source, second.source);
    Ok(())
}

#[tokio::test]
async fn test_repeating_a_feature_changes_nothing() -> Result<()> {
    let composer = TemplateComposer::new()?;

    let once = composer.compose(erc20("Repeat", &["pausable"]))?;
    let twice = composer.compose(erc20("Repeat", &["pausable", "pausable"]))?;

    assert_eq!(once.source, twice.source);
    Ok(())
}

#[tokio::test]
async fn test_contract_name_replaced_everywhere() -> Result<()> {
    let composer = TemplateComposer::new()?;

    for family in [
        ContractFamily::FungibleToken,
        ContractFamily::NonFungibleToken,
        ContractFamily::MultiToken,
        ContractFamily::GovernanceToken,
    ] {
        let composed = composer.compose(GenerationRequest::new(family, "Everywhere"))?;
        assert!(!composed.source.contains("CONTRACT_NAME"), "{} kept a placeholder", family);
        assert!(composed.source.contains("@title Everywhere"));
        assert!(composed.source.contains("contract Everywhere is "));
    }

    Ok(())
}

#[tokio::test]
async fn test_undeclared_and_unknown_features_are_skipped() -> Result<()> {
    let composer = TemplateComposer::new()?;

    let plain = composer.compose(erc20("Skips", &[]))?;
    let noisy = composer.compose(erc20("Skips", &["royalty", "ownable", "teleport"]))?;

    assert_eq!(plain.source, noisy.source);
    assert_eq!(
        noisy.request.ignored_features(),
        vec!["royalty".to_string(), "ownable".to_string(), "teleport".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_burnable_follows_family() -> Result<()> {
    let composer = TemplateComposer::new()?;

    let nft = composer.compose(
        GenerationRequest::new(ContractFamily::NonFungibleToken, "Burner").with_features(["burnable"]),
    )?;
    assert!(nft.source.contains("contract Burner is ERC721, Ownable, ERC721Burnable {"));
    assert!(!nft.source.contains("ERC20Burnable"));

    let multi = composer.compose(
        GenerationRequest::new(ContractFamily::MultiToken, "Burner").with_features(["burnable", "supply"]),
    )?;
    assert!(multi
        .source
        .contains("contract Burner is ERC1155, Ownable, ERC1155Burnable, ERC1155Supply {"));
    assert!(multi.source.contains("override(ERC1155, ERC1155Supply)"));

    Ok(())
}

#[tokio::test]
async fn test_royalty_adds_constructor_body_and_override() -> Result<()> {
    let composer = TemplateComposer::new()?;
    let composed = composer.compose(
        GenerationRequest::new(ContractFamily::NonFungibleToken, "Royal").with_features(["royalty"]),
    )?;

    assert!(composed.source.contains("import \"@openzeppelin/contracts/token/common/ERC2981.sol\";"));
    assert!(composed.source.contains("        _setDefaultRoyalty(owner, 250);"));
    assert!(composed.source.contains("override(ERC721, ERC2981)"));
    assert!(composed.source.contains("function mint(address to) public onlyOwner returns (uint256)"));

    Ok(())
}

#[tokio::test]
async fn test_capped_chains_constructor_call() -> Result<()> {
    let composer = TemplateComposer::new()?;
    let composed = composer.compose(erc20("Capped", &["capped", "permit"]))?;

    assert!(composed.source.contains("uint256 public constant CAP_MULTIPLIER = 10;"));
    assert!(composed.source.contains(
        ") ERC20(name, symbol) Ownable(owner) ERC20Capped(initialSupply * CAP_MULTIPLIER * 1e18) ERC20Permit(name) {"
    ));
    assert!(composed.source.contains("contract Capped is ERC20, Ownable, ERC20Capped, ERC20Permit {"));

    Ok(())
}

#[tokio::test]
async fn test_governance_ignores_features() -> Result<()> {
    let composer = TemplateComposer::new()?;

    let plain = composer.compose(GenerationRequest::new(ContractFamily::GovernanceToken, "Council"))?;
    let featured = composer.compose(
        GenerationRequest::new(ContractFamily::GovernanceToken, "Council").with_features(["mintable", "pausable"]),
    )?;

    assert_eq!(plain.source, featured.source);
    assert!(plain.source.contains("override(ERC20, ERC20Votes)"));
    assert!(plain.source.contains("override(ERC20Permit, Nonces)"));

    Ok(())
}

#[tokio::test]
async fn test_every_declared_combination_passes_validation() -> Result<()> {
    let composer = TemplateComposer::new()?;

    for family in composer.supported_families() {
        let all: Vec<&str> = family.allowed_features().iter().map(Feature::as_str).collect();
        let mut requests = vec![GenerationRequest::new(family, "Checked").with_features(all)];
        for feature in family.allowed_features() {
            requests.push(GenerationRequest::new(family, "Checked").with_features([feature.as_str()]));
        }

        for request in requests {
            let features = request.features.clone();
            let composed = composer.compose(request)?;
            let report = validate_source(&composed.source);
            assert!(report.valid, "{} {:?}: {:?}", family, features, report.problems);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_generate_contract_validates_request() -> Result<()> {
    let result = generate_contract(erc20("lowercase", &["mintable"]));
    assert!(matches!(result, Err(Error::InvalidRequest(_))));

    let composed = generate_contract(erc20("Valid", &["mintable"]).with_symbol("VAL"))?;
    assert!(composed.source.contains("contract Valid is ERC20, Ownable {"));

    Ok(())
}
