//! Fixed facts about the chat.z.ai upstream.
//!
//! The upstream only accepts requests that look like they come from its web
//! client, so every call carries the browser headers below. All chat requests
//! are pinned to one upstream model regardless of what the client asked for.

use crate::translate::openai_types::{ModelList, ModelObject};

pub const DEFAULT_UPSTREAM_URL: &str = "https://chat.z.ai/api/chat/completions";

pub const UPSTREAM_MODEL_ID: &str = "0727-360B-API";
pub const UPSTREAM_MODEL_NAME: &str = "GLM-4.5";
pub const UPSTREAM_OWNER: &str = "z.ai";

/// Model id advertised to OpenAI clients on `/v1/models`.
pub const PUBLIC_MODEL_ID: &str = "glm-4.5";

const ORIGIN: &str = "https://chat.z.ai";

/// Headers that make the request look like the upstream's own web client.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0",
    ),
    ("Accept", "application/json, text/event-stream"),
    ("Accept-Language", "zh-CN,zh;q=0.9"),
    ("X-FE-Version", "prod-fe-1.0.70"),
    (
        "sec-ch-ua",
        "\"Not;A=Brand\";v=\"99\", \"Microsoft Edge\";v=\"139\", \"Chromium\";v=\"139\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("Origin", ORIGIN),
];

/// `Referer` the web client would send for a given conversation.
#[must_use]
pub fn referer(chat_id: &str) -> String {
    format!("{ORIGIN}/c/{chat_id}")
}

/// Body of `GET /v1/models`.
#[must_use]
pub fn advertised_models() -> ModelList {
    ModelList {
        object: "list".to_string(),
        data: vec![ModelObject {
            id: PUBLIC_MODEL_ID.to_string(),
            object: "model".to_string(),
            created: chrono::Utc::now().timestamp(),
            owned_by: UPSTREAM_OWNER.to_string(),
        }],
    }
}
