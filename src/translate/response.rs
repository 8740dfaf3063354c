use super::openai_types::{ChatCompletionResponse, ChatUsage, Choice, ChoiceMessage};

/// Wrap aggregated answer text in an OpenAI `chat.completion` object.
/// Usage is not tracked, so every counter is zero.
pub fn completion_response(content: String, model: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content: Some(content),
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(ChatUsage::default()),
    }
}
