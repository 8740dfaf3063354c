//! State machine for translating chat.z.ai stream frames into OpenAI chunks.
//!
//! The [`StreamTranscoder`] processes upstream frames one at a time and emits
//! [`OutboundChunk`]s. Thinking text is shown to OpenAI clients as the
//! arguments of a synthetic `thought_process` tool call; the answer is plain
//! content. Chunks are lowered to [`ChatCompletionChunk`] only when written.

use super::normalize::ThinkTagsMode;
use super::openai_types::{
    ChatCompletionChunk, ChunkChoice, ChunkDelta, ChunkToolCall, ChunkToolCallFunction,
};
use super::phase::{FrameEvent, PhaseMachine, StreamPhase};
use super::upstream_types::FrameData;

/// Function name used for the synthetic tool call carrying thinking text.
pub const THOUGHT_FUNCTION_NAME: &str = "thought_process";

/// One record of the outbound stream, before it is lowered to the OpenAI schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundChunk {
    Role,
    ThoughtStart { call_id: String },
    ThoughtDelta { arguments: String },
    Content { text: String },
    Finish,
}

impl OutboundChunk {
    fn into_choice(self) -> ChunkChoice {
        let mut finish_reason = None;
        let delta = match self {
            Self::Role => ChunkDelta {
                role: Some("assistant".to_string()),
                ..Default::default()
            },
            Self::ThoughtStart { call_id } => ChunkDelta {
                tool_calls: Some(vec![ChunkToolCall {
                    index: 0,
                    id: Some(call_id),
                    call_type: Some("function".to_string()),
                    function: Some(ChunkToolCallFunction {
                        name: Some(THOUGHT_FUNCTION_NAME.to_string()),
                        arguments: Some(String::new()),
                    }),
                }]),
                ..Default::default()
            },
            Self::ThoughtDelta { arguments } => ChunkDelta {
                tool_calls: Some(vec![ChunkToolCall {
                    index: 0,
                    id: None,
                    call_type: Some("function".to_string()),
                    function: Some(ChunkToolCallFunction {
                        name: None,
                        arguments: Some(arguments),
                    }),
                }]),
                ..Default::default()
            },
            Self::Content { text } => ChunkDelta {
                content: Some(text),
                ..Default::default()
            },
            Self::Finish => {
                finish_reason = Some("stop".to_string());
                ChunkDelta::default()
            }
        };

        ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }
    }
}

/// Result of feeding one frame to the transcoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue(Vec<OutboundChunk>),
    Terminal,
}

/// Translates upstream frames into outbound chunks for one response.
///
/// Usage:
///   let mut transcoder = StreamTranscoder::new("glm-4.5", ThinkTagsMode::Strip);
///   let mut out = transcoder.start();
///   for frame in frames {
///       match transcoder.process_frame(&frame) {
///           FrameOutcome::Continue(chunks) => out.extend(chunks),
///           FrameOutcome::Terminal => break,
///       }
///   }
///   out.extend(transcoder.finish());
#[derive(Debug)]
pub struct StreamTranscoder {
    model: String,
    completion_id: String,
    created: i64,
    machine: PhaseMachine,
    tool_call_id: Option<String>,
    started: bool,
    finished: bool,
}

impl StreamTranscoder {
    pub fn new(model: &str, mode: ThinkTagsMode) -> Self {
        Self {
            model: model.to_string(),
            completion_id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            machine: PhaseMachine::new(mode),
            tool_call_id: None,
            started: false,
            finished: false,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.machine.phase()
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    /// Role announcement. Returns it only on the first call.
    pub fn start(&mut self) -> Vec<OutboundChunk> {
        if self.started {
            return Vec::new();
        }
        self.started = true;
        vec![OutboundChunk::Role]
    }

    /// Process a single upstream frame.
    pub fn process_frame(&mut self, frame: &FrameData) -> FrameOutcome {
        if self.finished {
            return FrameOutcome::Terminal;
        }

        let events = self.machine.advance(frame);
        if events.iter().any(|e| matches!(e, FrameEvent::Terminal)) {
            return FrameOutcome::Terminal;
        }

        let mut chunks = self.start();
        for event in events {
            match event {
                FrameEvent::Terminal => {}
                FrameEvent::EnteredThinking => {
                    let call_id = format!("call_{}", uuid::Uuid::new_v4().simple());
                    self.tool_call_id = Some(call_id.clone());
                    chunks.push(OutboundChunk::ThoughtStart { call_id });
                }
                FrameEvent::Thought(arguments) => {
                    chunks.push(OutboundChunk::ThoughtDelta { arguments });
                }
                FrameEvent::Answer(text) => chunks.push(OutboundChunk::Content { text }),
            }
        }
        FrameOutcome::Continue(chunks)
    }

    /// Closing chunk. Returns it only once, preceded by the role announcement
    /// if the stream never started.
    pub fn finish(&mut self) -> Vec<OutboundChunk> {
        if self.finished {
            return Vec::new();
        }
        let mut chunks = self.start();
        chunks.push(OutboundChunk::Finish);
        self.finished = true;
        chunks
    }

    /// Lower a chunk to the OpenAI wire schema, stamped with this stream's metadata.
    pub fn to_wire(&self, chunk: OutboundChunk) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.completion_id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![chunk.into_choice()],
        }
    }
}
