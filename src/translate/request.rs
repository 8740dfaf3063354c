use super::openai_types::ChatCompletionRequest;
use super::upstream_types::{Features, ModelItem, UpstreamRequest};
use crate::upstream::{UPSTREAM_MODEL_ID, UPSTREAM_MODEL_NAME, UPSTREAM_OWNER};

/// Translate an OpenAI chat request into the upstream request body.
/// Pure function: the caller supplies the chat id (see [`new_chat_id`]).
///
/// Every request is pinned to the upstream GLM model with thinking enabled,
/// whatever model the client asked for. The upstream is always asked to
/// stream; non-streaming clients are served by aggregating that stream.
pub fn openai_to_upstream(req: &ChatCompletionRequest, chat_id: &str) -> UpstreamRequest {
    UpstreamRequest {
        stream: true,
        model: UPSTREAM_MODEL_ID.to_string(),
        model_item: ModelItem {
            id: UPSTREAM_MODEL_ID.to_string(),
            name: UPSTREAM_MODEL_NAME.to_string(),
            owned_by: UPSTREAM_OWNER.to_string(),
        },
        messages: req.messages.clone(),
        params: serde_json::Map::new(),
        features: Features {
            enable_thinking: true,
        },
        chat_id: chat_id.to_string(),
        id: chrono::Utc::now().timestamp_millis().to_string(),
    }
}

/// Fresh upstream conversation id: `<unix millis>-<random>`.
pub fn new_chat_id() -> String {
    let random = uuid::Uuid::new_v4().as_u128() % 1_000_000;
    format!("{}-{random}", chrono::Utc::now().timestamp_millis())
}
