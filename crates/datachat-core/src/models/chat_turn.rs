use serde::{Deserialize, Serialize};

/// Author of a chat turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A PNG-encoded image together with its pixel dimensions
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PngImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for PngImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PngImage")
            .field("len", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One finalized unit of conversation.
///
/// Turns are immutable once appended to the session history. Every optional
/// field that is present is rendered as its own block on replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PngImage>,
}

/// `Some(text)` unless the text is empty
fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            code: None,
            output: None,
            image: None,
        }
    }

    /// Build an assistant turn from accumulated stream buffers.
    /// Empty buffers are treated as absent fields.
    pub fn assistant(content: String, code: String, output: String) -> Self {
        Self {
            role: Role::Assistant,
            content: non_empty(content),
            code: non_empty(code),
            output: non_empty(output),
            image: None,
        }
    }
}
