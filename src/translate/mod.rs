//! API translation between the `OpenAI` and chat.z.ai formats.
//!
//! The core of the proxy: builds upstream requests, classifies upstream stream
//! frames, and turns them back into OpenAI chunks or a single completion.
//! Nothing in here performs I/O.

pub mod aggregate;
pub mod normalize;
pub mod openai_types;
pub mod phase;
pub mod request;
pub mod response;
pub mod sse;
pub mod streaming;
pub mod upstream_types;
