//! Turns a natural-language request into a single `jq` command line.
//!
//! The request is spliced into a fixed instructional prompt and sent to the
//! Anthropic Messages API as one user turn. The first text block of the reply,
//! trimmed, is the candidate command.

use crate::config::Config;
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

pub const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const REQUEST_PLACEHOLDER: &str = "{{user_request}}";

pub const JQ_PROMPT: &str = r#"<purpose>
    You are a world-class expert at crafting precise jq commands for JSON processing.
    Your goal is to generate accurate, minimal jq commands that exactly match the user's data manipulation needs.
</purpose>

<instructions>
    <instruction>Return ONLY the jq command - no explanations, comments, or extra text.</instruction>
    <instruction>Always reference the input file specified in the user request (e.g., using -f flag if needed).</instruction>
    <instruction>Ensure the command follows jq best practices for efficiency and readability.</instruction>
    <instruction>Use the examples to understand different types of jq command patterns.</instruction>
    <instruction>When user asks to pipe or output to a file, use the correct syntax for the command and create a file name (if not specified) based on a shorted version of the user-request and the input file name.</instruction>
    <instruction>If the user request asks to pipe or output to a file, and no explicit directory is specified, use the directory of the input file.</instruction>
    <instruction>Output your response by itself, do not use backticks or markdown formatting. We're going to run your response as a shell command immediately.</instruction>
    <instruction>If your results you're working with a list of objects, default to outputting a valid json array.</instruction>
</instructions>

<examples>
    <example>
        <user-request>
            Select the "name" and "age" fields from data.json where age > 30
        </user-request>
        <jq-command>
            jq '[.[] | select(.age > 30) | {name, age}]' data.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Count the number of entries in users.json with status "active"
        </user-request>
        <jq-command>
            jq '[.[] | select(.status == "active")] | length' users.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Extract nested phone numbers from contacts.json using compact output
        </user-request>
        <jq-command>
            jq -c '.contact.info.phones' contacts.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Convert log.json entries to CSV format with timestamp, level, message
        </user-request>
        <jq-command>
            jq -r '.[] | [.timestamp, .level, .message] | @csv' log.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Sort records in people.json by age in descending order
        </user-request>
        <jq-command>
            jq 'sort_by(.age) | reverse' people.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Save active users from data/users.json to a new file
        </user-request>
        <jq-command>
            jq '[.[] | select(.status == "active")]' data/users.json > data/active_users.json
        </jq-command>
    </example>
    <example>
        <user-request>
            Convert data.json to CSV for keys name, age, city and save in same directory
        </user-request>
        <jq-command>
            jq -r '.[] | [.name, .age, .city] | @csv' data/testing/data.json > data/testing/data_csv.csv
        </jq-command>
    </example>
    <example>
        <user-request>
            Filter scores above 80 from data/mock.json and save to ./high_scores.json
        </user-request>
        <jq-command>
            jq '[.[] | select(.score > 80)]' data/mock.json > ./high_scores.json
        </jq-command>
    </example>
</examples>

<user-request>
    {{user_request}}
</user-request>"#;

/// Interpolates the user's request into [`JQ_PROMPT`].
pub fn build_prompt(user_request: &str) -> String {
    JQ_PROMPT.replace(REQUEST_PLACEHOLDER, user_request)
}

/// Command line proposed by the model, not yet executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCommand {
    pub command: String,
}

#[async_trait]
pub trait CommandGenerator: Send + Sync {
    async fn generate(&self, user_request: &str) -> Result<GeneratedCommand>;
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Generator backed by the Anthropic Messages API.
pub struct ClaudeGenerator<C: HttpClient = ReqwestHttpClient> {
    client: C,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeGenerator<ReqwestHttpClient> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .get_api_key()
            .ok_or_else(|| anyhow!("No Anthropic API key configured"))?;
        Ok(Self::with_client(
            ReqwestHttpClient::new(),
            api_key,
            &config.model,
            config.max_tokens,
        ))
    }
}

impl<C: HttpClient> ClaudeGenerator<C> {
    /// Creates a generator with an injected HTTP client (for testing).
    pub fn with_client(client: C, api_key: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        })
    }
}

#[async_trait]
impl<C: HttpClient> CommandGenerator for ClaudeGenerator<C> {
    async fn generate(&self, user_request: &str) -> Result<GeneratedCommand> {
        info!("Generating jq command with model {}", self.model);
        let prompt = build_prompt(user_request);

        let response = self
            .client
            .post_json(
                MESSAGES_URL,
                &[
                    ("x-api-key", self.api_key.as_str()),
                    ("content-type", "application/json"),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
                &self.request_body(&prompt),
            )
            .await?;

        debug!("Claude API response ({}): {}", response.status, response.body);
        parse_response(&response)
    }
}

/// Turns API error bodies and non-2xx statuses into errors.
pub(crate) fn check_api_response(response: &HttpResponse) -> Result<()> {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(&response.body) {
        warn!("Claude API returned {}: {}", err.error.kind, err.error.message);
        return Err(anyhow!(
            "Anthropic API error ({}): {}",
            err.error.kind,
            err.error.message
        ));
    }

    if !response.is_success() {
        return Err(anyhow!(
            "Anthropic API request failed with status {}: {}",
            response.status,
            response.body
        ));
    }
    Ok(())
}

/// Extracts the candidate command from a Messages API response.
fn parse_response(response: &HttpResponse) -> Result<GeneratedCommand> {
    check_api_response(response)?;

    let parsed: MessagesResponse = serde_json::from_str(&response.body)
        .map_err(|e| anyhow!("Failed to parse Anthropic API response: {}", e))?;

    let text = parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| anyhow!("Anthropic API response contained no text content"))?;

    let command = text.trim();
    if command.is_empty() {
        return Err(anyhow!("Model returned an empty command"));
    }

    Ok(GeneratedCommand {
        command: command.to_string(),
    })
}

/// Offline generator used when `AGENTKIT_USE_MOCK` is set.
///
/// Picks the first `*.json` word in the request and pretty-prints it.
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn mock_command(&self, user_request: &str) -> GeneratedCommand {
        let input = user_request
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| c == '"' || c == '\'' || c == ','))
            .find(|word| word.ends_with(".json"));

        let command = match input {
            Some(file) => format!("jq '.' {}", file),
            None => "jq '.'".to_string(),
        };
        GeneratedCommand { command }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandGenerator for MockGenerator {
    async fn generate(&self, user_request: &str) -> Result<GeneratedCommand> {
        info!("Using mock generator ({} set)", crate::config::MOCK_ENV);
        Ok(self.mock_command(user_request))
    }
}
