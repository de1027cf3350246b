//! The structured reply the model is instructed to produce.
//!
//! Every assistant message is a JSON object, optionally wrapped in a
//! ```` ```json ```` code fence:
//!
//! ```json
//! {
//!   "message": "shown to the user",
//!   "remember": "a fact worth keeping",
//!   "iptmem": [0, 3],
//!   "cmd": "Get-Content §file§",
//!   "cmd_dir": "C:\\Users\\me",
//!   "file": "notes.txt"
//! }
//! ```
//!
//! Only `message` is required. Unknown fields are ignored.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use crate::error::ReplyError;

/// Token inside `cmd` that is replaced with the value of `file`.
pub const FILE_PLACEHOLDER: &str = "§file§";

/// A parsed model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    /// Text shown to the user
    pub message: String,

    /// A new fact to store in memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<String>,

    /// Indices into the memory listing of the system message to reinforce.
    /// Kept loose so a malformed value degrades to "no reinforcement".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iptmem: Option<serde_json::Value>,

    /// Shell command to run before the model continues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,

    /// Working directory for `cmd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd_dir: Option<String>,

    /// Value substituted for [`FILE_PLACEHOLDER`] in `cmd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ModelReply {
    /// Parse raw assistant text, stripping a surrounding code fence if present.
    pub fn parse(raw: &str) -> Result<Self, ReplyError> {
        let body = strip_code_fence(raw);
        if body.is_empty() {
            return Err(ReplyError::Empty);
        }
        serde_json::from_str(body).map_err(|e| ReplyError::Malformed {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
    }

    /// The fact to remember, if present and non-blank.
    pub fn remember(&self) -> Option<&str> {
        self.remember.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The requested command, if present and non-blank.
    pub fn command(&self) -> Option<&str> {
        self.cmd.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The command with the file placeholder filled in.
    pub fn resolved_command(&self) -> Option<String> {
        self.command()
            .map(|cmd| cmd.replace(FILE_PLACEHOLDER, self.file.as_deref().unwrap_or("")))
    }

    /// Working directory for the command; empty means current directory.
    pub fn command_dir(&self) -> &str {
        self.cmd_dir.as_deref().unwrap_or("")
    }

    /// Integer entries of `iptmem` when it is a list. Anything else yields nothing.
    pub fn reinforce_indices(&self) -> Vec<i64> {
        match &self.iptmem {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(serde_json::Value::as_i64).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Wrap typed user text with the time it was sent.
pub fn wrap_user_input(text: &str, now: DateTime<Local>) -> String {
    serde_json::json!({
        "time": now.to_rfc3339(),
        "message": text,
    })
    .to_string()
}
