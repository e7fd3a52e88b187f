//! Text-editor tool surface for LLM agents.
//!
//! An agent emits tool-use input such as
//! `{"command": "str_replace", "path": "src/lib.rs", "old_str": "a", "new_str": "b"}`.
//! This module decodes that payload into an [`EditorCommand`], routes it to
//! [`FileService`], and renders the outcome as the tool-result string.

use crate::file_service::{FileOperationResult, FileService};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Name the tool is registered under.
pub const TOOL_NAME: &str = "str_replace_editor";

/// One editor invocation, tagged by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    View {
        path: String,
        #[serde(default)]
        view_range: Option<(i64, i64)>,
    },
    StrReplace {
        path: String,
        #[serde(default)]
        old_str: String,
        #[serde(default)]
        new_str: String,
    },
    Create {
        path: String,
        #[serde(default)]
        file_text: Option<String>,
    },
    Insert {
        path: String,
        #[serde(default)]
        insert_line: Option<i64>,
        #[serde(default)]
        new_str: String,
    },
    UndoEdit { path: String },
}

impl EditorCommand {
    pub fn path(&self) -> &str {
        match self {
            Self::View { path, .. }
            | Self::StrReplace { path, .. }
            | Self::Create { path, .. }
            | Self::Insert { path, .. }
            | Self::UndoEdit { path } => path.as_str(),
        }
    }

    /// Runs the command against the filesystem.
    pub fn execute(&self) -> FileOperationResult {
        match self {
            Self::View { path, view_range } => FileService::view_file(path, *view_range),
            Self::StrReplace {
                path,
                old_str,
                new_str,
            } => FileService::str_replace(path, old_str, new_str),
            Self::Create { path, file_text } => FileService::create_file(path, file_text.as_deref()),
            Self::Insert {
                path,
                insert_line,
                new_str,
            } => FileService::insert_text(path, *insert_line, new_str),
            Self::UndoEdit { path } => FileService::undo_edit(path),
        }
    }
}

/// Decodes a raw tool-use input and executes it.
///
/// Always returns text suitable for a `tool_result` block: file content for a
/// successful view, the operation message otherwise, or an `Error: ...` line
/// when the payload cannot be decoded.
pub fn handle_tool_input(input: &Value) -> String {
    let command = match EditorCommand::deserialize(input) {
        Ok(command) => command,
        Err(e) => {
            warn!("Rejected editor tool input {}: {}", input, e);
            return format!("Error: {}", e);
        }
    };

    info!("Editor command {:?} on {}", command, command.path());
    render(command.execute())
}

fn render(result: FileOperationResult) -> String {
    match result {
        FileOperationResult {
            success: true,
            content: Some(content),
            ..
        } => content,
        FileOperationResult { message, .. } => message,
    }
}

/// JSON schema advertising the editor tool to the model.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "View, create and edit files. Use view before editing; \
                        old_str must match the file exactly, including whitespace.",
        "input_schema": {
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["view", "str_replace", "create", "insert", "undo_edit"]
                },
                "path": {
                    "type": "string",
                    "description": "Path of the file to operate on"
                },
                "view_range": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "Inclusive 1-indexed [start, end]; end -1 reads to EOF"
                },
                "old_str": { "type": "string" },
                "new_str": { "type": "string" },
                "file_text": { "type": "string" },
                "insert_line": {
                    "type": "integer",
                    "description": "Line after which new_str is inserted; 0 inserts at the start"
                }
            },
            "required": ["command", "path"]
        }
    })
}
