//! Model-backed interpretation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use synth_core::config::AssistantConfig;
use synth_core::{AnalysisSuggestion, Error, GeneratedContract, Result};
use tracing::debug;

use crate::authoring::{self, parse_generated_contract, GENERATION_PROMPT};
use crate::schema::parse_suggestion;

/// Instruction sent with every interpretation request
pub const SYSTEM_PROMPT: &str = r#"You are an expert Solidity smart contract developer. Analyze the contract request and provide structured recommendations.

1. Contract type, the most appropriate of:
   - erc20: fungible tokens (currencies, utility tokens)
   - erc721: NFTs (unique collectibles, certificates)
   - erc1155: multi-token contracts (gaming items, multiple token types)
   - governance: DAO tokens with voting capabilities
   - custom: specialized contracts

2. Contract details: a PascalCase contract name without spaces, a 3-5 letter uppercase symbol, and an initial supply for tokens.

3. Features, chosen from:
   - mintable: create new tokens after deployment
   - burnable: destroy tokens
   - pausable: emergency pause
   - capped: maximum supply limit
   - permit: gas-less approvals
   - enumerable: token enumeration (NFTs)
   - uri_storage: per-token URIs (NFTs)
   - royalty: creator royalties (NFTs)
   - supply: supply tracking (ERC1155)

4. Reasoning: a brief explanation of the choices.

Respond ONLY with valid JSON in this exact format:
{
  "contractType": "erc20|erc721|erc1155|governance|custom",
  "contractName": "YourContractName",
  "symbol": "SYMBOL",
  "initialSupply": "1000000",
  "features": ["feature1", "feature2"],
  "reasoning": "Brief explanation of choices"
}"#;

/// A text-completion service
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Completion with room for a whole contract in the reply
    async fn complete_long(&self, system: &str, user: &str) -> Result<String> {
        self.complete(system, user).await
    }
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    generation_max_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config("Model backend requires an API key"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            generation_max_tokens: config.generation_max_tokens,
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl OpenAiBackend {
    async fn request(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("Model request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(format!("Model error {}: {}", status, truncate(&body, 320))));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::http(format!("Invalid model response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::interpretation("Model response did not include any content"))
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.request(system, user, self.max_tokens).await
    }

    async fn complete_long(&self, system: &str, user: &str) -> Result<String> {
        self.request(system, user, self.generation_max_tokens).await
    }
}

/// Interprets prompts through a [`ModelBackend`]
pub struct ModelInterpreter {
    backend: std::sync::Arc<dyn ModelBackend>,
}

impl ModelInterpreter {
    pub fn new(backend: std::sync::Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// User message: the request, plus the caller's current context when given
    pub fn user_message(prompt: &str, context: Option<&Value>) -> String {
        match context {
            Some(context) if !context.is_null() => {
                format!("Request: \"{}\"\n\nCurrent configuration:\n{}", prompt, context)
            }
            _ => format!("Request: \"{}\"", prompt),
        }
    }

    pub async fn interpret(&self, prompt: &str, context: Option<&Value>) -> Result<AnalysisSuggestion> {
        let reply = self
            .backend
            .complete(SYSTEM_PROMPT, &Self::user_message(prompt, context))
            .await?;
        debug!(backend = self.backend.name(), bytes = reply.len(), "Model replied");

        parse_suggestion(&reply)
    }

    /// Have the model write a complete contract
    pub async fn generate_source(&self, prompt: &str, context: Option<&Value>) -> Result<GeneratedContract> {
        let reply = self
            .backend
            .complete_long(GENERATION_PROMPT, &authoring::user_message(prompt, context))
            .await?;
        debug!(backend = self.backend.name(), bytes = reply.len(), "Model wrote contract source");

        parse_generated_contract(&reply)
    }
}
