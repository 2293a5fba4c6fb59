//! Keyword-driven interpretation
//!
//! The prompt is lower-cased and split on anything that is not a letter or
//! digit. A keyword matches when some token starts with it, so `minting`
//! matches `mint` but `smart` does not match `art`.

use once_cell::sync::Lazy;
use regex::Regex;
use synth_core::{AnalysisSuggestion, ContractFamily};

static NAME_CANDIDATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z]*$").expect("name candidate pattern"));

/// Capitalized words that describe the request rather than name the contract
const RESERVED_WORDS: [&str; 7] = ["Create", "Make", "Build", "Smart", "Contract", "Token", "Coin"];

/// Suggestion produced when a family rule fires
struct FamilyRule {
    keywords: &'static [&'static str],
    family: ContractFamily,
    contract_name: &'static str,
    symbol: &'static str,
    initial_supply: Option<&'static str>,
    features: &'static [&'static str],
    reasoning: &'static str,
}

/// Checked in order; the first match wins
static FAMILY_RULES: [FamilyRule; 3] = [
    FamilyRule {
        keywords: &["nft", "721", "erc721", "collectible", "art", "unique"],
        family: ContractFamily::NonFungibleToken,
        contract_name: "MyNFT",
        symbol: "MNFT",
        initial_supply: None,
        features: &["ownable"],
        reasoning: "Detected NFT-related keywords, suggesting ERC721 contract",
    },
    FamilyRule {
        keywords: &["governance", "voting", "vote", "dao", "proposal"],
        family: ContractFamily::GovernanceToken,
        contract_name: "GovernanceToken",
        symbol: "GOV",
        initial_supply: Some("1000000"),
        features: &[],
        reasoning: "Detected governance-related keywords, suggesting governance token",
    },
    FamilyRule {
        keywords: &["multi", "1155", "erc1155", "game", "gaming", "item"],
        family: ContractFamily::MultiToken,
        contract_name: "MultiToken",
        symbol: "MULTI",
        initial_supply: None,
        features: &["ownable"],
        reasoning: "Detected multi-token keywords, suggesting ERC1155 contract",
    },
];

static DEFAULT_RULE: FamilyRule = FamilyRule {
    keywords: &[],
    family: ContractFamily::FungibleToken,
    contract_name: "MyToken",
    symbol: "MTK",
    initial_supply: Some("1000000"),
    features: &["ownable", "mintable"],
    reasoning: "General token request, suggesting standard ERC20",
};

/// Features added independently of the family rule
const FEATURE_RULES: [(&[&str], &str); 4] = [
    (&["mint", "create"], "mintable"),
    (&["burn", "destroy"], "burnable"),
    (&["pause", "emergency"], "pausable"),
    (&["cap", "limit"], "capped"),
];

/// Rule-table interpreter; never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicInterpreter;

impl HeuristicInterpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn interpret(&self, prompt: &str) -> AnalysisSuggestion {
        let lowered = prompt.to_lowercase();
        let tokens = tokenize(&lowered);
        let matches = |keywords: &[&str]| keywords.iter().any(|kw| tokens.iter().any(|t| t.starts_with(kw)));

        let rule = FAMILY_RULES
            .iter()
            .find(|rule| matches(rule.keywords))
            .unwrap_or(&DEFAULT_RULE);

        let mut features: Vec<String> = rule.features.iter().map(|f| f.to_string()).collect();
        for (keywords, feature) in FEATURE_RULES {
            if matches(keywords) && !features.iter().any(|f| f == feature) {
                features.push(feature.to_string());
            }
        }

        let (contract_name, symbol) = match extract_name(prompt) {
            Some(name) => {
                let symbol = name.chars().take(5).collect::<String>().to_uppercase();
                (name.to_string(), symbol)
            }
            None => (rule.contract_name.to_string(), rule.symbol.to_string()),
        };

        AnalysisSuggestion {
            family: rule.family,
            contract_name,
            symbol,
            initial_supply: rule.initial_supply.map(str::to_string),
            features,
            reasoning: rule.reasoning.to_string(),
        }
    }
}

fn tokenize(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

/// First capitalized word that reads like a name.
///
/// All-caps words such as `NFT` or `DAO` are acronyms, not names.
fn extract_name(prompt: &str) -> Option<&str> {
    prompt.split_whitespace().find(|word| {
        (3..20).contains(&word.len())
            && NAME_CANDIDATE.is_match(word)
            && word.chars().any(|c| c.is_ascii_lowercase())
            && !RESERVED_WORDS.contains(word)
    })
}
