//! Non-streaming variant: fold every answer fragment into one string.

use super::normalize::ThinkTagsMode;
use super::phase::{FrameEvent, PhaseMachine};
use super::upstream_types::FrameData;

/// Collects normalized answer text for one upstream response.
///
/// Uses the same [`PhaseMachine`] as the streaming transcoder, so the result
/// is exactly the concatenation of the content chunks a streaming run over the
/// same input would emit. Thinking text is dropped.
#[derive(Debug)]
pub struct Aggregator {
    machine: PhaseMachine,
    content: String,
    finished: bool,
}

impl Aggregator {
    pub fn new(mode: ThinkTagsMode) -> Self {
        Self {
            machine: PhaseMachine::new(mode),
            content: String::new(),
            finished: false,
        }
    }

    /// Feed one frame. Returns `true` once a terminal frame has been seen;
    /// frames pushed after that are ignored.
    pub fn push_frame(&mut self, frame: &FrameData) -> bool {
        if self.finished {
            return true;
        }
        for event in self.machine.advance(frame) {
            match event {
                FrameEvent::Answer(text) => self.content.push_str(&text),
                FrameEvent::Terminal => self.finished = true,
                FrameEvent::EnteredThinking | FrameEvent::Thought(_) => {}
            }
        }
        self.finished
    }

    pub fn into_content(self) -> String {
        self.content
    }
}
