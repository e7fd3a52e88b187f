//! File operations exposed to an LLM agent as text-editor tool calls.
//!
//! Every operation acts on a single path and never returns an `Err` to its
//! caller: failures are folded into a [`FileOperationResult`] whose message
//! describes what went wrong. The agent reads that message as the tool result.
//!
//! # Example
//!
//! ```no_run
//! use agentkit::file_service::FileService;
//!
//! let result = FileService::view_file("notes.txt", Some((2, -1)));
//! if result.success {
//!     print!("{}", result.content.unwrap_or_default());
//! } else {
//!     eprintln!("{}", result.message);
//! }
//! ```

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info, warn};

/// Message returned by [`FileService::undo_edit`].
pub const UNDO_NOT_IMPLEMENTED: &str = "Undo functionality is not implemented in this version.";

/// Outcome of a single file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOperationResult {
    /// Whether the operation completed.
    pub success: bool,
    /// Human-readable outcome, or the failure cause.
    pub message: String,
    /// File contents; only set by a successful view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileOperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            content: None,
        }
    }

    pub fn ok_with_content(message: impl Into<String>, content: String) -> Self {
        Self {
            success: true,
            message: message.into(),
            content: Some(content),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            content: None,
        }
    }
}

impl From<FileOpError> for FileOperationResult {
    fn from(err: FileOpError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Reasons a file operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum FileOpError {
    #[error("File {0} does not exist")]
    NotFound(String),

    #[error("Invalid file path provided: path is empty.")]
    EmptyPath,

    #[error("No line number specified: insert_line is missing.")]
    MissingLine,

    #[error("Insert line number {line} out of range (0-{max}).")]
    LineOutOfRange { line: i64, max: usize },

    #[error("The specified string was not found in the file {0}")]
    StringNotFound(String),

    #[error("Error {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

fn io_error(action: &'static str) -> impl FnOnce(io::Error) -> FileOpError {
    move |source| FileOpError::Io { action, source }
}

/// Stateless collection of file operations.
pub struct FileService;

impl FileService {
    /// Views a file, optionally limited to an inclusive 1-indexed line range.
    ///
    /// An `end` of `-1` reads through the end of the file; other negative ends
    /// count back from it. Out-of-bounds values are clamped to the file rather
    /// than rejected.
    pub fn view_file(path: &str, view_range: Option<(i64, i64)>) -> FileOperationResult {
        Self::finish("view_file", Self::view_file_impl(path, view_range))
    }

    /// Replaces the first occurrence of `old_str` with `new_str`.
    pub fn str_replace(path: &str, old_str: &str, new_str: &str) -> FileOperationResult {
        Self::finish("str_replace", Self::str_replace_impl(path, old_str, new_str))
    }

    /// Creates (or overwrites) a file, creating missing parent directories.
    pub fn create_file(path: &str, file_text: Option<&str>) -> FileOperationResult {
        Self::finish("create_file", Self::create_file_impl(path, file_text))
    }

    /// Inserts `new_str` as new line(s) directly after 1-indexed `insert_line`.
    ///
    /// Line `0` inserts at the very start; the current line count appends.
    pub fn insert_text(path: &str, insert_line: Option<i64>, new_str: &str) -> FileOperationResult {
        Self::finish("insert_text", Self::insert_text_impl(path, insert_line, new_str))
    }

    /// Undo is not supported; this never touches the file.
    pub fn undo_edit(path: &str) -> FileOperationResult {
        if path.trim().is_empty() {
            return Self::finish("undo_edit", Err(FileOpError::EmptyPath));
        }
        warn!("[undo_edit] {} ({})", UNDO_NOT_IMPLEMENTED, path);
        FileOperationResult::ok(UNDO_NOT_IMPLEMENTED)
    }

    fn finish(
        operation: &str,
        result: Result<FileOperationResult, FileOpError>,
    ) -> FileOperationResult {
        match result {
            Ok(result) => result,
            Err(e) => {
                error!("[{}] {}", operation, e);
                e.into()
            }
        }
    }

    fn ensure_exists(path: &str) -> Result<(), FileOpError> {
        if Path::new(path).exists() {
            Ok(())
        } else {
            Err(FileOpError::NotFound(path.to_string()))
        }
    }

    fn view_file_impl(
        path: &str,
        view_range: Option<(i64, i64)>,
    ) -> Result<FileOperationResult, FileOpError> {
        Self::ensure_exists(path)?;
        let content = fs::read_to_string(path).map_err(io_error("viewing file"))?;

        let content = match view_range {
            Some((start, end)) => select_lines(&content, start, end),
            None => content,
        };

        Ok(FileOperationResult::ok_with_content(
            format!("Successfully viewed file {}", path),
            content,
        ))
    }

    fn str_replace_impl(
        path: &str,
        old_str: &str,
        new_str: &str,
    ) -> Result<FileOperationResult, FileOpError> {
        Self::ensure_exists(path)?;
        let content = fs::read_to_string(path).map_err(io_error("replacing text"))?;

        if !content.contains(old_str) {
            return Err(FileOpError::StringNotFound(path.to_string()));
        }

        let new_content = content.replacen(old_str, new_str, 1);
        fs::write(path, new_content).map_err(io_error("replacing text"))?;

        info!("[str_replace] Successfully replaced text in {}", path);
        Ok(FileOperationResult::ok(format!(
            "Successfully replaced text in {}",
            path
        )))
    }

    fn create_file_impl(
        path: &str,
        file_text: Option<&str>,
    ) -> Result<FileOperationResult, FileOpError> {
        if path.trim().is_empty() {
            return Err(FileOpError::EmptyPath);
        }

        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                info!("[create_file] Creating directory: {}", dir.display());
                fs::create_dir_all(dir).map_err(io_error("creating file"))?;
            }
        }

        fs::write(path, file_text.unwrap_or("")).map_err(io_error("creating file"))?;

        info!("[create_file] Successfully created file {}", path);
        Ok(FileOperationResult::ok(format!(
            "Successfully created file {}",
            path
        )))
    }

    fn insert_text_impl(
        path: &str,
        insert_line: Option<i64>,
        new_str: &str,
    ) -> Result<FileOperationResult, FileOpError> {
        if path.trim().is_empty() {
            return Err(FileOpError::EmptyPath);
        }
        Self::ensure_exists(path)?;
        let line = insert_line.ok_or(FileOpError::MissingLine)?;

        let content = fs::read_to_string(path).map_err(io_error("inserting text"))?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();

        let index = usize::try_from(line)
            .ok()
            .filter(|index| *index <= lines.len())
            .ok_or(FileOpError::LineOutOfRange {
                line,
                max: lines.len(),
            })?;

        // Appending after an unterminated last line must not glue onto it.
        if index == lines.len() {
            if let Some(last) = lines.last_mut() {
                if !last.ends_with('\n') {
                    last.push('\n');
                }
            }
        }

        let mut text = new_str.to_string();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        lines.insert(index, text);

        fs::write(path, lines.concat()).map_err(io_error("inserting text"))?;

        info!("[insert_text] Successfully inserted text after line {} in {}", line, path);
        Ok(FileOperationResult::ok(format!(
            "Successfully inserted text after line {} in {}",
            line, path
        )))
    }
}

/// Returns lines `start..=end` (1-indexed) keeping their terminators.
///
/// `end == -1` means end of file; any other negative `end` counts back from
/// the end, so `-2` drops the last two lines.
fn select_lines(content: &str, start: i64, end: i64) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let len = lines.len();

    let from = usize::try_from(start.saturating_sub(1)).unwrap_or(0).min(len);
    let to = match end {
        -1 => len,
        end if end < 0 => len.saturating_sub(usize::try_from(end.unsigned_abs()).unwrap_or(len)),
        end => usize::try_from(end).unwrap_or(len).min(len),
    };

    if from >= to {
        return String::new();
    }
    lines[from..to].concat()
}
