/// Shared data model for the synthesis pipeline
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

static CONTRACT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("contract name pattern"));

static SYMBOL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,6}$").expect("symbol pattern"));

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern"));

/// Whether `name` is a valid generated contract identifier
pub fn is_valid_contract_name(name: &str) -> bool {
    CONTRACT_NAME_PATTERN.is_match(name)
}

/// Whether `symbol` is a valid token ticker
pub fn is_valid_symbol(symbol: &str) -> bool {
    SYMBOL_PATTERN.is_match(symbol)
}

/// Contract archetype; selects the base template and the permitted features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractFamily {
    /// ERC-20 fungible token
    #[serde(rename = "erc20", alias = "fungible-token")]
    FungibleToken,

    /// ERC-721 collection
    #[serde(rename = "erc721", alias = "non-fungible-token")]
    NonFungibleToken,

    /// ERC-1155 multi-token
    #[serde(rename = "erc1155", alias = "multi-token")]
    MultiToken,

    /// ERC-20 with votes and permit
    #[serde(rename = "governance", alias = "governance-token")]
    GovernanceToken,

    /// Free-form contract; has no base template
    #[serde(rename = "custom")]
    Custom,
}

impl ContractFamily {
    /// Every family, in declaration order
    pub const ALL: [ContractFamily; 5] = [
        ContractFamily::FungibleToken,
        ContractFamily::NonFungibleToken,
        ContractFamily::MultiToken,
        ContractFamily::GovernanceToken,
        ContractFamily::Custom,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractFamily::FungibleToken => "erc20",
            ContractFamily::NonFungibleToken => "erc721",
            ContractFamily::MultiToken => "erc1155",
            ContractFamily::GovernanceToken => "governance",
            ContractFamily::Custom => "custom",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ContractFamily::FungibleToken => "ERC-20 Token",
            ContractFamily::NonFungibleToken => "ERC-721 NFT",
            ContractFamily::MultiToken => "ERC-1155 Multi-Token",
            ContractFamily::GovernanceToken => "Governance Token",
            ContractFamily::Custom => "Custom Contract",
        }
    }

    /// Features this family declares
    pub fn allowed_features(&self) -> &'static [Feature] {
        match self {
            ContractFamily::FungibleToken => &[
                Feature::Mintable,
                Feature::Burnable,
                Feature::Pausable,
                Feature::Capped,
                Feature::Permit,
            ],
            ContractFamily::NonFungibleToken => &[
                Feature::Enumerable,
                Feature::UriStorage,
                Feature::Burnable,
                Feature::Pausable,
                Feature::Royalty,
            ],
            ContractFamily::MultiToken => &[Feature::Burnable, Feature::Pausable, Feature::Supply],
            ContractFamily::GovernanceToken | ContractFamily::Custom => &[],
        }
    }

    /// Whether `feature` is declared for this family
    pub fn allows(&self, feature: Feature) -> bool {
        self.allowed_features().contains(&feature)
    }

    /// Constructor parameters of the family's base template, in argument order
    pub fn parameters(&self) -> Vec<ParameterSpec> {
        let name = ParameterSpec::new("name", "string", "Token name", false);
        let symbol = ParameterSpec::new("symbol", "string", "Token symbol", false);
        let supply = ParameterSpec::new("initialSupply", "uint256", "Initial token supply", true)
            .with_default(Value::from(1_000_000u64));
        let owner = ParameterSpec::new("owner", "address", "Contract owner address", false);

        match self {
            ContractFamily::FungibleToken | ContractFamily::GovernanceToken => {
                vec![name, symbol, supply, owner]
            }
            ContractFamily::NonFungibleToken => vec![
                ParameterSpec::new("name", "string", "NFT collection name", false),
                ParameterSpec::new("symbol", "string", "NFT collection symbol", false),
                owner,
            ],
            ContractFamily::MultiToken => vec![
                ParameterSpec::new("uri", "string", "Metadata URI template", true),
                owner,
            ],
            ContractFamily::Custom => Vec::new(),
        }
    }
}

impl fmt::Display for ContractFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContractFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "erc20" | "fungible-token" | "token" => Ok(ContractFamily::FungibleToken),
            "erc721" | "non-fungible-token" | "nft" => Ok(ContractFamily::NonFungibleToken),
            "erc1155" | "multi-token" => Ok(ContractFamily::MultiToken),
            "governance" | "governance-token" => Ok(ContractFamily::GovernanceToken),
            "custom" => Ok(ContractFamily::Custom),
            other => Err(Error::UnknownFamily(other.to_string())),
        }
    }
}

/// Optional capability a fragment can add to a base template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Mintable,
    Burnable,
    Pausable,
    Capped,
    Permit,
    Enumerable,
    UriStorage,
    Royalty,
    Supply,
}

impl Feature {
    /// Every feature, in registry order
    pub const ALL: [Feature; 9] = [
        Feature::Mintable,
        Feature::Burnable,
        Feature::Pausable,
        Feature::Capped,
        Feature::Permit,
        Feature::Enumerable,
        Feature::UriStorage,
        Feature::Royalty,
        Feature::Supply,
    ];

    /// Look a feature up by wire id. Unknown ids yield `None`.
    pub fn parse(id: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.as_str() == id.trim())
    }

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Mintable => "mintable",
            Feature::Burnable => "burnable",
            Feature::Pausable => "pausable",
            Feature::Capped => "capped",
            Feature::Permit => "permit",
            Feature::Enumerable => "enumerable",
            Feature::UriStorage => "uri_storage",
            Feature::Royalty => "royalty",
            Feature::Supply => "supply",
        }
    }

    /// One-line description
    pub fn description(&self) -> &'static str {
        match self {
            Feature::Mintable => "Allow creating new tokens after deployment",
            Feature::Burnable => "Allow destroying tokens",
            Feature::Pausable => "Emergency pause functionality",
            Feature::Capped => "Maximum supply limit",
            Feature::Permit => "Gas-less approvals",
            Feature::Enumerable => "Token enumeration",
            Feature::UriStorage => "Individual token URIs",
            Feature::Royalty => "Creator royalties",
            Feature::Supply => "Supply tracking per token id",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constructor parameter declared by a base template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Solidity type of the constructor argument
    pub solidity_type: String,
    pub description: String,
    /// Must be present at generation time unless a default exists
    pub required: bool,
    pub default: Option<Value>,
}

impl ParameterSpec {
    fn new(name: &str, solidity_type: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            solidity_type: solidity_type.to_string(),
            description: description.to_string(),
            required,
            default: None,
        }
    }

    fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Check that `value` fits the declared Solidity type
    fn check(&self, value: &Value) -> Option<String> {
        let ok = match self.solidity_type.as_str() {
            "uint256" => match value {
                Value::Number(n) => n.as_u64().is_some_and(|n| n > 0),
                Value::String(s) => s.parse::<u128>().is_ok_and(|n| n > 0),
                _ => false,
            },
            "address" => value.as_str().is_some_and(|s| ADDRESS_PATTERN.is_match(s)),
            _ => value.is_string(),
        };

        (!ok).then(|| format!("Parameter '{}' must be a valid {}", self.name, self.solidity_type))
    }
}

/// Declarative request consumed by the template composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub family: ContractFamily,
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Feature ids as received; duplicates and unknown ids are tolerated
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl GenerationRequest {
    /// Create a request with no features or parameters
    pub fn new(family: ContractFamily, contract_name: impl Into<String>) -> Self {
        Self {
            family,
            contract_name: contract_name.into(),
            symbol: None,
            features: Vec::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Check name, symbol and family parameters, reporting every problem found
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !is_valid_contract_name(&self.contract_name) {
            problems.push(format!(
                "Contract name '{}' must start with an uppercase letter and contain only letters and digits",
                self.contract_name
            ));
        }

        if let Some(symbol) = &self.symbol {
            if !is_valid_symbol(symbol) {
                problems.push(format!("Symbol '{}' must be 2-6 uppercase letters", symbol));
            }
        }

        for spec in self.family.parameters() {
            match self.parameters.get(&spec.name) {
                Some(value) => problems.extend(spec.check(value)),
                None if spec.required && spec.default.is_none() => {
                    problems.push(format!("Missing required parameter '{}'", spec.name));
                }
                None => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidRequest(problems))
        }
    }

    /// Feature ids in first-seen order with duplicates removed
    pub fn unique_features(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.features.len());
        for id in &self.features {
            if !seen.contains(&id.as_str()) {
                seen.push(id.as_str());
            }
        }
        seen
    }

    /// Requested ids that will contribute nothing: unknown, or not declared for the family
    pub fn ignored_features(&self) -> Vec<String> {
        self.unique_features()
            .into_iter()
            .filter(|id| !Feature::parse(id).is_some_and(|f| self.family.allows(f)))
            .map(str::to_string)
            .collect()
    }

    /// Constructor arguments with defaults filled in, in declaration order
    pub fn constructor_arguments(&self) -> Vec<(ParameterSpec, Option<Value>)> {
        self.family
            .parameters()
            .into_iter()
            .map(|spec| {
                let value = self.parameters.get(&spec.name).cloned().or_else(|| match spec.name.as_str() {
                    "name" => Some(Value::from(self.contract_name.clone())),
                    "symbol" => self.symbol.clone().map(Value::from),
                    _ => spec.default.clone(),
                });
                (spec, value)
            })
            .collect()
    }
}

/// Final generated text together with the request that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedSource {
    pub source: String,
    pub request: GenerationRequest,
}

impl ComposedSource {
    pub fn contract_name(&self) -> &str {
        &self.request.contract_name
    }

    /// Source unit name handed to the compiler
    pub fn file_name(&self) -> String {
        format!("{}.sol", self.request.contract_name)
    }
}

/// Creation cost reported by the compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationCost {
    pub code_deposit_cost: Option<u64>,
    pub execution_cost: Option<u64>,
    pub total_cost: Option<u64>,
}

/// Gas estimates copied from compiler output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimates {
    pub creation: CreationCost,
    #[serde(default)]
    pub external: BTreeMap<String, String>,
    #[serde(default)]
    pub internal: BTreeMap<String, String>,
}

/// Deployment-ready output of one successful compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerArtifact {
    pub contract_name: String,
    pub source_name: String,
    /// `0x`-prefixed init code
    pub bytecode: Option<String>,
    pub deployed_bytecode: Option<String>,
    pub abi: Vec<Value>,
    pub method_identifiers: BTreeMap<String, String>,
    pub link_references: Value,
    pub deployed_link_references: Value,
    pub devdoc: Value,
    pub userdoc: Value,
    pub gas_estimates: GasEstimates,
    /// Deployment gas, from compiler estimates or the bytecode-length fallback
    pub gas_estimate: u64,
    pub warnings: Vec<String>,
    pub compilation_target: String,
}

/// Structured interpretation of a free-text prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSuggestion {
    #[serde(rename = "contractType")]
    pub family: ContractFamily,
    pub contract_name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_supply: Option<String>,
    pub features: Vec<String>,
    pub reasoning: String,
}

impl AnalysisSuggestion {
    /// Turn the suggestion into a generation request
    pub fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.family, self.contract_name).with_features(self.features);
        if is_valid_symbol(&self.symbol) {
            request.symbol = Some(self.symbol);
        }
        if let Some(supply) = self.initial_supply {
            request.parameters.insert("initialSupply".to_string(), Value::from(supply));
        }
        if request.family == ContractFamily::MultiToken {
            request
                .parameters
                .entry("uri".to_string())
                .or_insert_with(|| Value::from("https://example.com/api/token/{id}.json"));
        }
        request
    }
}

/// Which interpreter tier produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "ai")]
    Model,
    #[serde(rename = "fallback")]
    Heuristic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Model => write!(f, "model"),
            Provenance::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Suggestion plus the tier that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub suggestion: AnalysisSuggestion,
    #[serde(rename = "source")]
    pub provenance: Provenance,
}

/// Complete contract source written by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContract {
    pub contract_code: String,
    pub contract_name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "contractType")]
    pub family: ContractFamily,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

/// Outbound compile result shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<CompilerArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation_target: Option<String>,
}

impl CompileResponse {
    /// Fold a compile result into the outbound shape
    pub fn from_result(result: Result<CompilerArtifact>) -> Self {
        match result {
            Ok(artifact) => Self {
                success: true,
                bytecode: artifact.bytecode.clone(),
                abi: Some(artifact.abi.clone()),
                gas_estimate: Some(artifact.gas_estimate),
                warnings: Some(artifact.warnings.clone()),
                compilation_target: Some(artifact.compilation_target.clone()),
                artifacts: Some(artifact),
                ..Default::default()
            },
            Err(Error::CompilationFailed { errors, warnings }) => Self {
                success: false,
                error: errors.first().cloned(),
                errors: Some(errors),
                warnings: Some(warnings),
                ..Default::default()
            },
            Err(err) => Self {
                success: false,
                errors: Some(err.diagnostics()),
                error: Some(err.to_string()),
                ..Default::default()
            },
        }
    }
}
