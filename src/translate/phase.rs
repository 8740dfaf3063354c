//! Phase tracking for one upstream response.
//!
//! Upstream frames arrive `thinking* -> answer* -> done`. [`PhaseMachine`]
//! turns each frame into zero or more [`FrameEvent`]s with text that is
//! already normalized. The replayed thinking block is cut from the first
//! answer frame on the edge into [`StreamPhase::Answering`]; that edge can be
//! taken only once, so the cut happens at most once per stream.

use super::normalize::{normalize, strip_replayed_thinking, ThinkTagsMode};
use super::upstream_types::{FrameData, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Init,
    Thinking,
    Answering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// First thinking frame with content. Always followed by the frame's
    /// text as a [`FrameEvent::Thought`] unless it normalized to nothing.
    EnteredThinking,
    Thought(String),
    Answer(String),
    Terminal,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: StreamPhase,
    mode: ThinkTagsMode,
}

impl PhaseMachine {
    pub fn new(mode: ThinkTagsMode) -> Self {
        Self {
            phase: StreamPhase::Init,
            mode,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Classify one frame and advance the phase.
    pub fn advance(&mut self, frame: &FrameData) -> Vec<FrameEvent> {
        if frame.is_terminal() {
            return vec![FrameEvent::Terminal];
        }

        let content = frame.content();
        if content.is_empty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        match (self.phase, frame.phase) {
            (StreamPhase::Init, Some(Phase::Thinking)) => {
                self.phase = StreamPhase::Thinking;
                events.push(FrameEvent::EnteredThinking);
                self.push_text(&mut events, content, FrameEvent::Thought);
            }
            (StreamPhase::Thinking, Some(Phase::Thinking)) => {
                self.push_text(&mut events, content, FrameEvent::Thought);
            }
            (StreamPhase::Init | StreamPhase::Thinking, Some(Phase::Answer)) => {
                self.phase = StreamPhase::Answering;
                let answer = strip_replayed_thinking(content);
                self.push_text(&mut events, answer, FrameEvent::Answer);
            }
            (StreamPhase::Answering, Some(Phase::Answer)) => {
                self.push_text(&mut events, content, FrameEvent::Answer);
            }
            // Phase never moves backwards; late thinking frames are dropped.
            (StreamPhase::Answering, Some(Phase::Thinking))
            | (_, Some(Phase::Other | Phase::Done))
            | (_, None) => {}
        }
        events
    }

    fn push_text(&self, events: &mut Vec<FrameEvent>, raw: &str, wrap: fn(String) -> FrameEvent) {
        let text = normalize(raw, self.mode);
        if !text.is_empty() {
            events.push(wrap(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(phase: Phase, content: &str) -> FrameData {
        FrameData {
            phase: Some(phase),
            delta_content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_thinking_then_answer() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);

        let events = machine.advance(&frame(Phase::Thinking, "> step 1"));
        assert_eq!(
            events,
            vec![FrameEvent::EnteredThinking, FrameEvent::Thought("step 1".into())]
        );
        assert_eq!(machine.phase(), StreamPhase::Thinking);

        let events = machine.advance(&frame(Phase::Thinking, "\n> step 2"));
        assert_eq!(events, vec![FrameEvent::Thought("step 2".into())]);

        let events = machine.advance(&frame(Phase::Answer, "> step 1\n> step 2</details>Hi"));
        assert_eq!(events, vec![FrameEvent::Answer("Hi".into())]);
        assert_eq!(machine.phase(), StreamPhase::Answering);
    }

    #[test]
    fn test_dedup_only_on_first_answer_frame() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);

        let first = machine.advance(&frame(Phase::Answer, "plain start"));
        assert_eq!(first, vec![FrameEvent::Answer("plain start".into())]);

        // The second frame is not searched for the tag; normalization alone
        // removes the tag itself but keeps the text before it.
        let second = machine.advance(&frame(Phase::Answer, "kept</details>tail"));
        assert_eq!(second, vec![FrameEvent::Answer("kepttail".into())]);
    }

    #[test]
    fn test_entered_thinking_even_when_text_normalizes_away() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        let events = machine.advance(&frame(Phase::Thinking, "<details type=\"reasoning\">"));
        assert_eq!(events, vec![FrameEvent::EnteredThinking]);
        assert_eq!(machine.phase(), StreamPhase::Thinking);
    }

    #[test]
    fn test_empty_content_does_not_transition() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        assert!(machine.advance(&frame(Phase::Thinking, "")).is_empty());
        assert!(machine.advance(&frame(Phase::Answer, "")).is_empty());
        assert_eq!(machine.phase(), StreamPhase::Init);
    }

    #[test]
    fn test_answer_consumed_by_dedup_still_transitions() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        let events = machine.advance(&frame(Phase::Answer, "replay</details>"));
        assert!(events.is_empty());
        assert_eq!(machine.phase(), StreamPhase::Answering);
    }

    #[test]
    fn test_late_thinking_is_ignored() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        machine.advance(&frame(Phase::Answer, "answer"));
        assert!(machine.advance(&frame(Phase::Thinking, "late")).is_empty());
        assert_eq!(machine.phase(), StreamPhase::Answering);
    }

    #[test]
    fn test_other_phase_is_ignored() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        assert!(machine.advance(&frame(Phase::Other, "x")).is_empty());
        assert_eq!(machine.phase(), StreamPhase::Init);
    }

    #[test]
    fn test_terminal_frames() {
        let mut machine = PhaseMachine::new(ThinkTagsMode::Strip);
        let done_flag = FrameData {
            done: Some(true),
            phase: Some(Phase::Answer),
            delta_content: Some("ignored".into()),
            ..Default::default()
        };
        assert_eq!(machine.advance(&done_flag), vec![FrameEvent::Terminal]);
        assert_eq!(machine.advance(&frame(Phase::Done, "")), vec![FrameEvent::Terminal]);
    }
}
