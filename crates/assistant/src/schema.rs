//! Model response parsing and shape checks

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use synth_core::{AnalysisSuggestion, ContractFamily, Error, Result};

static SUGGESTED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("suggested name pattern"));

/// Accepted `contractType` values
pub const CONTRACT_TYPES: [&str; 5] = ["erc20", "erc721", "erc1155", "governance", "custom"];

/// Remove markdown code fences models like to wrap JSON in
pub fn strip_code_fences(response: &str) -> String {
    response.replace("```json", "").replace("```", "").trim().to_string()
}

fn required_text<'a>(object: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a str> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(Error::interpretation(format!("Field '{}' must be a non-empty string", field))),
        None => Err(Error::interpretation(format!("Missing field '{}'", field))),
    }
}

/// Parse and check a model reply
pub fn parse_suggestion(response: &str) -> Result<AnalysisSuggestion> {
    let cleaned = strip_code_fences(response);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| Error::interpretation(format!("Failed to parse model response: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::interpretation("Model response is not a JSON object"))?;

    let contract_type = required_text(object, "contractType")?;
    let contract_name = required_text(object, "contractName")?;
    let reasoning = required_text(object, "reasoning")?;

    if !CONTRACT_TYPES.contains(&contract_type) {
        return Err(Error::interpretation(format!("Unknown contract type '{}'", contract_type)));
    }
    let family = ContractFamily::from_str(contract_type)?;

    if !SUGGESTED_NAME.is_match(contract_name) {
        return Err(Error::interpretation(format!("Contract name '{}' is not PascalCase", contract_name)));
    }

    let features = match object.get("features") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::interpretation("Features must be strings"))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::interpretation("Field 'features' must be an array")),
        None => return Err(Error::interpretation("Missing field 'features'")),
    };

    let initial_supply = match object.get("initialSupply") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(_) => return Err(Error::interpretation("Field 'initialSupply' must be a string or number")),
    };

    let symbol = object
        .get("symbol")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(AnalysisSuggestion {
        family,
        contract_name: contract_name.to_string(),
        symbol,
        initial_supply,
        features,
        reasoning: reasoning.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_response_is_accepted() {
        let response = "```json\n{\"contractType\": \"erc20\", \"contractName\": \"Widget\", \"symbol\": \"WDG\", \"initialSupply\": 5000, \"features\": [\"mintable\"], \"reasoning\": \"Simple token\"}\n```";
        let suggestion = parse_suggestion(response).unwrap();

        assert_eq!(suggestion.family, ContractFamily::FungibleToken);
        assert_eq!(suggestion.contract_name, "Widget");
        assert_eq!(suggestion.initial_supply.as_deref(), Some("5000"));
        assert_eq!(suggestion.features, vec!["mintable".to_string()]);
    }

    #[test]
    fn test_shape_violations_are_rejected() {
        let cases = [
            "not json at all",
            "[1, 2]",
            r#"{"contractName": "Widget", "features": [], "reasoning": "r"}"#,
            r#"{"contractType": "erc9999", "contractName": "Widget", "features": [], "reasoning": "r"}"#,
            r#"{"contractType": "token", "contractName": "Widget", "features": [], "reasoning": "r"}"#,
            r#"{"contractType": "erc20", "contractName": "my widget", "features": [], "reasoning": "r"}"#,
            r#"{"contractType": "erc20", "contractName": "Widget", "features": "mintable", "reasoning": "r"}"#,
            r#"{"contractType": "erc20", "contractName": "Widget", "features": [1], "reasoning": "r"}"#,
            r#"{"contractType": "erc20", "contractName": "Widget", "features": [], "reasoning": ""}"#,
            r#"{"contractType": "erc20", "contractName": "Widget", "features": [], "reasoning": "r", "initialSupply": true}"#,
        ];

        for case in cases {
            assert!(
                matches!(parse_suggestion(case), Err(Error::InterpretationFailed(_))),
                "accepted: {}",
                case
            );
        }
    }

    #[test]
    fn test_empty_feature_list_is_allowed() {
        let suggestion = parse_suggestion(
            r#"{"contractType": "governance", "contractName": "Council", "features": [], "reasoning": "DAO"}"#,
        )
        .unwrap();
        assert!(suggestion.features.is_empty());
        assert_eq!(suggestion.symbol, "");
        assert_eq!(suggestion.initial_supply, None);
    }
}
