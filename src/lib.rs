//! Agentkit - small utilities for LLM-driven tooling.
//!
//! The crate holds two independent pieces:
//!
//! - **File operations** for a text-editor tool: view, replace, create and
//!   insert text in files, each returning a uniform
//!   [`FileOperationResult`](file_service::FileOperationResult) instead of an
//!   error.
//!   The `editor-agent` binary lets Claude call these operations in a chat.
//! - **jq command generation**: the `jq-gen` binary asks Claude for a single
//!   `jq` command matching a plain-English request and can run it through the
//!   shell.
//!
//! # Modules
//!
//! - [`file_service`] - Single-file read and write operations
//! - [`editor_tool`] - Decodes agent tool calls and routes them to the file service
//! - [`agent`] - Chat loop that lets Claude drive the editor tool
//! - [`config`] - Configuration management (API key, model)
//! - [`http_client`] - HTTP client abstraction
//! - [`jq_generator`] - Prompt template and Claude-backed command generation
//! - [`executor`] - Shell execution of generated commands
//! - [`jq_runner`] - Generate-then-execute flow used by `jq-gen`
//!
//! # Example
//!
//! ```no_run
//! use agentkit::editor_tool::handle_tool_input;
//! use serde_json::json;
//!
//! let reply = handle_tool_input(&json!({
//!     "command": "insert",
//!     "path": "notes.txt",
//!     "insert_line": 1,
//!     "new_str": "second line"
//! }));
//! println!("{}", reply);
//! ```
//!
//! ```bash
//! # Print the generated command
//! jq-gen "Filter scores above 80 from data/analytics.json and save to high_scores.json"
//!
//! # Generate and run it
//! jq-gen --exe "Filter scores above 80 from data/analytics.json and save to high_scores.json"
//! ```

pub mod agent;
pub mod config;
pub mod editor_tool;
pub mod executor;
pub mod file_service;
pub mod http_client;
pub mod jq_generator;
pub mod jq_runner;
