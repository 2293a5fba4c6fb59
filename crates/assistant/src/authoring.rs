//! Model-written contract source
//!
//! The model is asked for a JSON object carrying the full source and its
//! metadata. Replies that do not parse are mined for a code block instead,
//! with the metadata recovered from keywords. Either way the source must
//! pass the structural validator before it is handed back.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use synth_core::validation::extract_contract_name;
use synth_core::{validate_source, ContractFamily, Error, GeneratedContract, Result};
use tracing::warn;

/// Instruction sent when the model writes a whole contract
pub const GENERATION_PROMPT: &str = r#"You are an expert Solidity smart contract developer. Generate complete, secure, and gas-optimized smart contracts based on user requirements.

Guidelines:
1. Always use Solidity ^0.8.20
2. Use OpenZeppelin contracts for security
3. Include proper license headers (MIT)
4. Add comprehensive NatSpec comments
5. Follow best practices for security and gas optimization
6. Include proper error handling

Response format should be a JSON object with:
{
  "contractCode": "complete solidity contract code",
  "contractName": "extracted contract name",
  "symbol": "token symbol if applicable",
  "contractType": "erc20|erc721|erc1155|governance|custom",
  "features": ["array of features used"],
  "explanation": "brief explanation of the contract"
}

Common contract types:
- erc20: fungible tokens
- erc721: NFTs (non-fungible tokens)
- erc1155: multi-token standard
- governance: DAO voting tokens
- custom: specialized contracts

Available features: ownable, mintable, burnable, pausable, capped, permit, enumerable, uri_storage, royalty, supply"#;

const FALLBACK_EXPLANATION: &str = "Contract generated based on your requirements";

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("json object pattern"));
static SOLIDITY_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```solidity\r?\n(.*?)```").expect("solidity block pattern"));
static PLAIN_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\r?\n(.*?)```").expect("plain block pattern"));
static LICENSED_SOURCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)// SPDX.*\}").expect("licensed source pattern"));
static CODE_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:symbol[:\s]*"([A-Za-z0-9]+)"|ERC(?:20|721)\(\s*"[^"]*"\s*,\s*"([A-Za-z0-9]+)"\s*\))"#)
        .expect("code symbol pattern")
});
static TEXT_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:symbol|ticker)[:\s]+"?([A-Za-z0-9]{2,6})\b"#).expect("text symbol pattern"));

/// Family keywords, checked in order
const FAMILY_KEYWORDS: [(&[&str], ContractFamily); 4] = [
    (&["erc721", "nft", "non-fungible"], ContractFamily::NonFungibleToken),
    (&["erc1155", "multi-token", "multi token"], ContractFamily::MultiToken),
    (&["governance", "voting", "dao"], ContractFamily::GovernanceToken),
    (&["erc20", "token", "fungible"], ContractFamily::FungibleToken),
];

const FEATURE_KEYWORDS: [(&str, &[&str]); 9] = [
    ("mintable", &["mintable", "mint", "minting"]),
    ("burnable", &["burnable", "burn", "burning"]),
    ("pausable", &["pausable", "pause", "pausing"]),
    ("capped", &["capped", "cap", "maximum supply"]),
    ("permit", &["permit", "signature", "meta-transaction"]),
    ("enumerable", &["enumerable", "enumerate", "list all tokens"]),
    ("uri_storage", &["uri storage", "metadata", "token uri"]),
    ("royalty", &["royalty", "royalties", "creator fee"]),
    ("ownable", &["ownable", "owner", "ownership"]),
];

/// Fields the model is asked for; all optional so partial replies still parse
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerationReply {
    contract_code: Option<String>,
    contract_name: Option<String>,
    symbol: Option<String>,
    contract_type: Option<String>,
    features: Option<Vec<String>>,
    explanation: Option<String>,
}

/// User message for a generation request
pub fn user_message(prompt: &str, context: Option<&Value>) -> String {
    let mut message = format!("Generate a Solidity smart contract based on this requirement: \"{}\"", prompt);
    if let Some(context) = context.filter(|c| !c.is_null()) {
        message.push_str(&format!("\n\nAdditional context: {}", context));
    }
    message.push_str(
        "\n\nPlease provide a complete, production-ready contract that follows best practices and is secure. \
         Return the response as a JSON object with the specified fields.",
    );
    message
}

/// Turn a model reply into a checked contract
pub fn parse_generated_contract(reply: &str) -> Result<GeneratedContract> {
    let parsed = JSON_OBJECT
        .find(reply)
        .and_then(|m| serde_json::from_str::<GenerationReply>(m.as_str()).ok());

    let (contract_code, fields) = match parsed {
        Some(fields) => {
            let code = fields
                .contract_code
                .as_deref()
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .ok_or_else(|| Error::interpretation("Model reply did not include contract code"))?
                .to_string();
            (code, fields)
        }
        None => {
            warn!("Model reply is not JSON, extracting the contract manually");
            let code = extract_contract_code(reply)
                .ok_or_else(|| Error::interpretation("Model reply did not include contract code"))?;
            let fields = GenerationReply {
                symbol: extract_symbol(reply, &code),
                contract_type: Some(detect_family(reply, &code).as_str().to_string()),
                features: Some(extract_features(reply, &code)),
                explanation: Some(FALLBACK_EXPLANATION.to_string()),
                ..Default::default()
            };
            (code, fields)
        }
    };

    let report = validate_source(&contract_code);
    if !report.valid {
        return Err(Error::ValidationFailed(report.problems));
    }

    let contract_name = fields
        .contract_name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| extract_contract_name(&contract_code))
        .ok_or_else(|| Error::interpretation("Generated source declares no contract"))?;

    let family = fields
        .contract_type
        .as_deref()
        .and_then(|t| ContractFamily::from_str(t).ok())
        .unwrap_or_else(|| detect_family(reply, &contract_code));

    Ok(GeneratedContract {
        contract_name,
        symbol: fields.symbol.unwrap_or_default(),
        family,
        features: fields.features.unwrap_or_default(),
        explanation: fields.explanation.unwrap_or_default(),
        contract_code,
    })
}

/// Source from a fenced block, or from the license line to the last brace
pub fn extract_contract_code(text: &str) -> Option<String> {
    if let Some(caps) = SOLIDITY_BLOCK.captures(text) {
        return Some(caps[1].trim().to_string());
    }

    if let Some(caps) = PLAIN_BLOCK.captures(text) {
        let code = caps[1].trim();
        if code.contains("pragma solidity") || code.contains("contract ") {
            return Some(code.to_string());
        }
    }

    LICENSED_SOURCE.find(text).map(|m| m.as_str().trim().to_string())
}

fn extract_symbol(text: &str, code: &str) -> Option<String> {
    CODE_SYMBOL
        .captures(code)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .or_else(|| TEXT_SYMBOL.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
}

fn detect_family(text: &str, code: &str) -> ContractFamily {
    let content = format!("{} {}", text, code).to_lowercase();
    FAMILY_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| content.contains(k)))
        .map(|(_, family)| *family)
        .unwrap_or(ContractFamily::Custom)
}

/// Feature ids whose keywords occur anywhere in the reply; `ownable` is always present
fn extract_features(text: &str, code: &str) -> Vec<String> {
    let content = format!("{} {}", text, code).to_lowercase();
    let mut features: Vec<String> = FEATURE_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| content.contains(k)))
        .map(|(feature, _)| feature.to_string())
        .collect();

    if !features.iter().any(|f| f == "ownable") {
        features.push("ownable".to_string());
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VAULT: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\ncontract Vault {\n    function deposit() public payable {}\n}";

    #[test]
    fn test_json_reply_is_parsed() {
        let reply = format!(
            "Here you go:\n{}\nEnjoy!",
            json!({
                "contractCode": VAULT,
                "contractName": "Vault",
                "contractType": "custom",
                "features": ["ownable"],
                "explanation": "Holds deposits"
            })
        );

        let contract = parse_generated_contract(&reply).unwrap();
        assert_eq!(contract.contract_name, "Vault");
        assert_eq!(contract.family, ContractFamily::Custom);
        assert_eq!(contract.features, vec!["ownable".to_string()]);
        assert_eq!(contract.explanation, "Holds deposits");
        assert_eq!(contract.contract_code, VAULT);
    }

    #[test]
    fn test_json_reply_without_name_uses_declared_contract() {
        let reply = json!({"contractCode": VAULT, "contractType": "mystery"}).to_string();

        let contract = parse_generated_contract(&reply).unwrap();
        assert_eq!(contract.contract_name, "Vault");
        assert_eq!(contract.family, ContractFamily::Custom);
        assert_eq!(contract.symbol, "");
    }

    #[test]
    fn test_json_reply_without_code_is_rejected() {
        let reply = json!({"contractName": "Vault", "contractType": "custom"}).to_string();
        assert!(matches!(parse_generated_contract(&reply), Err(Error::InterpretationFailed(_))));
    }

    #[test]
    fn test_fenced_reply_falls_back_to_extraction() {
        let code = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\nimport \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";\n\ncontract Harvest is ERC20 {\n    constructor() ERC20(\"Harvest\", \"HRV\") {}\n\n    function burn(uint256 amount) public {\n        _burn(msg.sender, amount);\n    }\n}";
        let reply = format!("A burnable token:\n```solidity\n{}\n```\n", code);

        let contract = parse_generated_contract(&reply).unwrap();
        assert_eq!(contract.contract_code, code);
        assert_eq!(contract.contract_name, "Harvest");
        assert_eq!(contract.symbol, "HRV");
        assert_eq!(contract.family, ContractFamily::FungibleToken);
        assert!(contract.features.contains(&"burnable".to_string()));
        assert!(contract.features.contains(&"ownable".to_string()));
        assert_eq!(contract.explanation, FALLBACK_EXPLANATION);
    }

    #[test]
    fn test_unfenced_licensed_source_is_extracted() {
        let reply = format!("Sure.\n{}\nLet me know if you need changes.", VAULT);
        assert_eq!(extract_contract_code(&reply).as_deref(), Some(VAULT));
        assert_eq!(extract_contract_code("no code here"), None);
    }

    #[test]
    fn test_reply_without_code_is_rejected() {
        let result = parse_generated_contract("I cannot help with that.");
        assert!(matches!(result, Err(Error::InterpretationFailed(_))));
    }

    #[test]
    fn test_structurally_broken_source_is_rejected() {
        let broken = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\ncontract Broken {\n    function f() public {\n}";
        let reply = json!({"contractCode": broken, "contractName": "Broken"}).to_string();

        match parse_generated_contract(&reply) {
            Err(Error::ValidationFailed(problems)) => assert!(problems.contains(&"Unbalanced braces".to_string())),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_family_detection_order() {
        assert_eq!(detect_family("an NFT token", ""), ContractFamily::NonFungibleToken);
        assert_eq!(detect_family("a DAO", ""), ContractFamily::GovernanceToken);
        assert_eq!(detect_family("a vault", "contract Vault {}"), ContractFamily::Custom);
    }

    #[test]
    fn test_user_message_carries_context() {
        let message = user_message("a vault", Some(&json!({"network": "sepolia"})));
        assert!(message.starts_with("Generate a Solidity smart contract based on this requirement: \"a vault\""));
        assert!(message.contains("Additional context: {\"network\":\"sepolia\"}"));
        assert!(!user_message("a vault", None).contains("Additional context"));
    }
}
