//! Conversational agent that edits files through the editor tool.
//!
//! Each user message starts a turn: the conversation so far is sent to the
//! Messages API together with [`tool_definition`]. While the model stops with
//! `tool_use`, every requested call is run through [`handle_tool_input`] and
//! the outputs go back as `tool_result` blocks carrying the matching
//! `tool_use_id`. The turn ends on any other stop reason.

use crate::config::Config;
use crate::editor_tool::{handle_tool_input, tool_definition, TOOL_NAME};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::jq_generator::{check_api_response, ANTHROPIC_VERSION, MESSAGES_URL};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

pub const AGENT_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const AGENT_MAX_TOKENS: u32 = 4000;

/// Upper bound on tool round-trips within one user turn.
pub const MAX_TOOL_ROUNDS: usize = 25;

pub const SYSTEM_PROMPT: &str = "You are a helpful coding assistant with access to a text editor tool.
You can view and modify files using the following commands:
1. view - examine the contents of a file before making any changes.
   Parameters: path (required), view_range (optional)
2. str_replace - modify file contents by replacing text.
   Parameters: path (required), old_str (required), new_str (required)
   The old_str must match EXACTLY with the content to replace.
3. create - create a new file with content.
   Parameters: path (required), file_text (required)
4. insert - add text after a specific line of a file.
   Parameters: path (required), insert_line (required), new_str (required)
5. undo_edit - revert the last edit made to a file.
   Parameters: path (required)

When asked to modify a file, ALWAYS use view first to see the contents.
When using str_replace, ensure old_str matches exactly with whitespace and indentation.
After making changes, summarize what you modified.
Complete one tool operation fully before starting another.";

#[derive(Debug, Deserialize)]
struct AgentReply {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplyBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

impl AgentReply {
    fn blocks(&self) -> Vec<ReplyBlock> {
        self.content
            .iter()
            .filter_map(|block| ReplyBlock::deserialize(block).ok())
            .collect()
    }

    fn text(&self) -> String {
        self.blocks()
            .into_iter()
            .filter_map(|block| match block {
                ReplyBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Multi-turn agent holding the conversation history.
pub struct EditorAgent<C: HttpClient = ReqwestHttpClient> {
    client: C,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_tool_rounds: usize,
    history: Vec<Value>,
}

impl EditorAgent<ReqwestHttpClient> {
    pub fn from_config(config: &Config, model: &str, max_tokens: u32) -> Result<Self> {
        let api_key = config
            .get_api_key()
            .ok_or_else(|| anyhow!("No Anthropic API key configured"))?;
        Ok(Self::with_client(ReqwestHttpClient::new(), api_key, model, max_tokens))
    }
}

impl<C: HttpClient> EditorAgent<C> {
    /// Creates an agent with an injected HTTP client (for testing).
    pub fn with_client(client: C, api_key: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            max_tool_rounds: MAX_TOOL_ROUNDS,
            history: Vec::new(),
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn history(&self) -> &[Value] {
        &self.history
    }

    async fn send(&self) -> Result<AgentReply> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "tools": [tool_definition()],
            "messages": self.history,
        });

        let response = self
            .client
            .post_json(
                MESSAGES_URL,
                &[
                    ("x-api-key", self.api_key.as_str()),
                    ("content-type", "application/json"),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
                &body,
            )
            .await?;

        debug!("Claude API response ({}): {}", response.status, response.body);
        check_api_response(&response)?;
        serde_json::from_str(&response.body)
            .map_err(|e| anyhow!("Failed to parse Anthropic API response: {}", e))
    }

    /// Runs one user turn to completion and returns the model's final text.
    ///
    /// Tool activity is reported on `out`. On error the history is rolled back
    /// to where it was before the message, so the conversation stays valid.
    pub async fn process_message<W: Write>(&mut self, user_message: &str, out: &mut W) -> Result<String> {
        let checkpoint = self.history.len();
        let result = self.run_turn(user_message, out).await;
        if result.is_err() {
            self.history.truncate(checkpoint);
        }
        result
    }

    async fn run_turn<W: Write>(&mut self, user_message: &str, out: &mut W) -> Result<String> {
        self.history.push(json!({
            "role": "user",
            "content": [{"type": "text", "text": user_message}]
        }));

        let mut rounds = 0;
        loop {
            let reply = self.send().await?;
            self.history.push(json!({
                "role": "assistant",
                "content": reply.content
            }));

            if reply.stop_reason.as_deref() != Some("tool_use") {
                return Ok(reply.text());
            }

            let mut results = Vec::new();
            for block in reply.blocks() {
                if let ReplyBlock::ToolUse { id, name, input } = block {
                    let output = self.run_tool(&name, &input, out)?;
                    results.push(json!({
                        "type": "tool_result",
                        "tool_use_id": id,
                        "content": output
                    }));
                }
            }

            if results.is_empty() {
                warn!("Model stopped for tool_use without requesting a tool");
                return Ok(reply.text());
            }

            rounds += 1;
            if rounds > self.max_tool_rounds {
                return Err(anyhow!(
                    "Stopped after {} tool rounds without a final answer",
                    self.max_tool_rounds
                ));
            }

            self.history.push(json!({
                "role": "user",
                "content": results
            }));
        }
    }

    fn run_tool<W: Write>(&self, name: &str, input: &Value, out: &mut W) -> Result<String> {
        writeln!(out, "\n🛠️ Using tool: {}", name)?;
        if name != TOOL_NAME {
            warn!("Model requested unknown tool {}", name);
            return Ok(format!("Error: unknown tool {}", name));
        }

        let command = input.get("command").and_then(Value::as_str).unwrap_or("");
        let path = input.get("path").and_then(Value::as_str).unwrap_or("");
        writeln!(out, "Command: {} on {}", command, path)?;
        info!("Running {} on {}", command, path);

        Ok(handle_tool_input(input))
    }

    /// Interactive loop: `exit` quits, `history` prints the conversation.
    pub async fn chat<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "\n🤖 Claude Agent with Text Editor Tool")?;
        writeln!(out, "Type 'exit' to quit, 'history' to see conversation history\n")?;

        let mut lines = input.lines();
        loop {
            write!(out, "You: ")?;
            out.flush()?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            let message = line.trim();

            match message.to_lowercase().as_str() {
                "" => continue,
                "exit" => {
                    writeln!(out, "\nGoodbye! 👋")?;
                    break;
                }
                "history" => {
                    self.print_history(out)?;
                    continue;
                }
                _ => {}
            }

            match self.process_message(message, out).await {
                Ok(text) => writeln!(out, "\nClaude: {}\n", text)?,
                Err(e) => writeln!(out, "\nError: {}", e)?,
            }
        }
        Ok(())
    }

    fn print_history<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "\n===== Conversation History =====")?;
        for message in &self.history {
            let role = message["role"].as_str().unwrap_or("unknown");
            writeln!(out, "{}: {}", role, summarize(&message["content"]))?;
        }
        writeln!(out, "================================\n")?;
        Ok(())
    }
}

/// One-line rendering of a message's content blocks.
fn summarize(content: &Value) -> String {
    let Some(blocks) = content.as_array() else {
        return content.as_str().unwrap_or_default().to_string();
    };
    blocks
        .iter()
        .map(|block| match block["type"].as_str() {
            Some("text") => block["text"].as_str().unwrap_or_default().to_string(),
            Some("tool_use") => format!("[tool_use {}]", block["name"].as_str().unwrap_or("?")),
            Some("tool_result") => "[tool_result]".to_string(),
            Some(other) => format!("[{}]", other),
            None => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mock HTTP client that replays scripted replies and records request bodies.
    struct ScriptedHttpClient {
        replies: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedHttpClient {
        fn new(replies: Vec<(u16, Value)>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|(status, body)| HttpResponse {
                            status,
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn post_json(
            &self,
            _url: &str,
            _headers: &[(&str, &str)],
            body: &Value,
        ) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(body.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted reply left"))
        }
    }

    fn tool_use_reply(calls: &[(&str, Value)]) -> (u16, Value) {
        let content: Vec<Value> = calls
            .iter()
            .map(|(id, input)| {
                json!({"type": "tool_use", "id": id, "name": TOOL_NAME, "input": input})
            })
            .collect();
        (200, json!({"role": "assistant", "content": content, "stop_reason": "tool_use"}))
    }

    fn end_turn_reply(text: &str) -> (u16, Value) {
        (
            200,
            json!({
                "role": "assistant",
                "content": [{"type": "text", "text": text}],
                "stop_reason": "end_turn"
            }),
        )
    }

    fn agent(replies: Vec<(u16, Value)>) -> EditorAgent<ScriptedHttpClient> {
        EditorAgent::with_client(ScriptedHttpClient::new(replies), "sk-test", "model-x", 1000)
    }

    fn requests(agent: &EditorAgent<ScriptedHttpClient>) -> Vec<Value> {
        agent.client.requests.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_tool_use_then_end_turn_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes/todo.txt").to_string_lossy().to_string();
        let mut agent = agent(vec![
            tool_use_reply(&[(
                "toolu_1",
                json!({"command": "create", "path": path, "file_text": "buy milk\n"}),
            )]),
            end_turn_reply("Created the file."),
        ]);
        let mut out = Vec::new();

        let text = agent.process_message("make a todo list", &mut out).await.unwrap();

        assert_eq!(text, "Created the file.");
        assert_eq!(fs::read_to_string(&path).unwrap(), "buy milk\n");
        assert_eq!(agent.history().len(), 4);

        let sent = requests(&agent);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["tools"][0]["name"], TOOL_NAME);
        assert_eq!(sent[0]["system"], SYSTEM_PROMPT);

        let tool_result = &sent[1]["messages"][2]["content"][0];
        assert_eq!(sent[1]["messages"][2]["role"], "user");
        assert_eq!(tool_result["type"], "tool_result");
        assert_eq!(tool_result["tool_use_id"], "toolu_1");
        assert!(tool_result["content"]
            .as_str()
            .unwrap()
            .starts_with("Successfully created file"));

        let printed = String::from_utf8_lossy(&out);
        assert!(printed.contains("Using tool: str_replace_editor"));
        assert!(printed.contains("Command: create on"));
    }

    #[tokio::test]
    async fn test_view_result_is_sent_back_as_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();
        let mut agent = agent(vec![
            tool_use_reply(&[(
                "toolu_view",
                json!({"command": "view", "path": path.to_string_lossy(), "view_range": [2, 3]}),
            )]),
            end_turn_reply("Lines two and three."),
        ]);

        agent.process_message("show me", &mut Vec::new()).await.unwrap();

        let sent = requests(&agent);
        assert_eq!(sent[1]["messages"][2]["content"][0]["content"], "two\nthree\n");
    }

    #[tokio::test]
    async fn test_parallel_tool_calls_share_one_result_message() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt").to_string_lossy().to_string();
        let b = dir.path().join("b.txt").to_string_lossy().to_string();
        let mut agent = agent(vec![
            tool_use_reply(&[
                ("toolu_a", json!({"command": "create", "path": a, "file_text": "a"})),
                ("toolu_b", json!({"command": "create", "path": b, "file_text": "b"})),
            ]),
            end_turn_reply("Done."),
        ]);

        agent.process_message("two files", &mut Vec::new()).await.unwrap();

        let results = agent.history()[2]["content"].as_array().unwrap().clone();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["tool_use_id"], "toolu_a");
        assert_eq!(results[1]["tool_use_id"], "toolu_b");
        assert!(dir.path().join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_undo_edit_stays_a_stub() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "unchanged\n").unwrap();
        let mut agent = agent(vec![
            tool_use_reply(&[(
                "toolu_undo",
                json!({"command": "undo_edit", "path": path.to_string_lossy()}),
            )]),
            end_turn_reply("Could not undo."),
        ]);

        agent.process_message("undo that", &mut Vec::new()).await.unwrap();

        assert_eq!(
            agent.history()[2]["content"][0]["content"],
            crate::file_service::UNDO_NOT_IMPLEMENTED
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "unchanged\n");
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_result() {
        let mut agent = agent(vec![
            (
                200,
                json!({
                    "content": [{"type": "tool_use", "id": "toolu_x", "name": "bash", "input": {}}],
                    "stop_reason": "tool_use"
                }),
            ),
            end_turn_reply("Sorry."),
        ]);

        agent.process_message("run ls", &mut Vec::new()).await.unwrap();

        assert_eq!(agent.history()[2]["content"][0]["content"], "Error: unknown tool bash");
    }

    #[tokio::test]
    async fn test_api_error_rolls_back_history() {
        let mut agent = agent(vec![(
            529,
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        )]);

        let err = agent.process_message("hello", &mut Vec::new()).await.unwrap_err();

        assert!(err.to_string().contains("Overloaded"));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let mut agent = agent(vec![
            tool_use_reply(&[("toolu_1", json!({"command": "undo_edit", "path": "a.txt"}))]),
            tool_use_reply(&[("toolu_2", json!({"command": "undo_edit", "path": "a.txt"}))]),
        ])
        .with_max_tool_rounds(1);

        let err = agent.process_message("loop", &mut Vec::new()).await.unwrap_err();

        assert!(err.to_string().contains("1 tool rounds"));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_chat_handles_history_and_exit() {
        let mut agent = agent(vec![end_turn_reply("Hi there")]);
        let input = "hello\n\nhistory\nexit\nnever sent\n".as_bytes();
        let mut out = Vec::new();

        agent.chat(input, &mut out).await.unwrap();

        let printed = String::from_utf8_lossy(&out);
        assert!(printed.contains("Claude: Hi there"));
        assert!(printed.contains("user: hello"));
        assert!(printed.contains("assistant: Hi there"));
        assert!(printed.contains("Goodbye!"));
        assert_eq!(requests(&agent).len(), 1);
    }

    #[tokio::test]
    async fn test_chat_reports_errors_and_continues() {
        let mut agent = agent(vec![
            (500, json!({"type": "error", "error": {"type": "api_error", "message": "boom"}})),
            end_turn_reply("Recovered"),
        ]);
        let input = "first\nsecond\n".as_bytes();
        let mut out = Vec::new();

        agent.chat(input, &mut out).await.unwrap();

        let printed = String::from_utf8_lossy(&out);
        assert!(printed.contains("Error: Anthropic API error (api_error): boom"));
        assert!(printed.contains("Claude: Recovered"));
        assert_eq!(agent.history().len(), 2);
    }

    #[test]
    fn test_summarize_blocks() {
        let content = json!([
            {"type": "text", "text": "Let me look"},
            {"type": "tool_use", "id": "t", "name": TOOL_NAME, "input": {}}
        ]);

        assert_eq!(summarize(&content), "Let me look [tool_use str_replace_editor]");
    }
}
