//! Wire types for the chat.z.ai chat API.
//!
//! The upstream streams one JSON object per `data:` line. Only the fields the
//! transcoder needs are modeled; everything else is ignored on deserialize.

use super::openai_types::ChatMessage;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types (what we send TO the upstream)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub stream: bool,
    pub model: String,
    pub model_item: ModelItem,
    pub messages: Vec<ChatMessage>,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub features: Features,
    pub chat_id: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelItem {
    pub id: String,
    pub name: String,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Features {
    pub enable_thinking: bool,
}

// ---------------------------------------------------------------------------
// Stream frames (what we receive FROM the upstream)
// ---------------------------------------------------------------------------

/// Stage of generation a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Thinking,
    Answer,
    Done,
    #[serde(other)]
    Other,
}

/// One parsed `data:` record of the upstream stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamEvent {
    #[serde(default)]
    pub data: FrameData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl FrameData {
    /// Text carried by this frame: `delta_content`, falling back to
    /// `edit_content` when the former is missing or empty.
    pub fn content(&self) -> &str {
        self.delta_content
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.edit_content.as_deref())
            .unwrap_or("")
    }

    pub fn is_terminal(&self) -> bool {
        self.done == Some(true) || self.phase == Some(Phase::Done)
    }
}
