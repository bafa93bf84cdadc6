//! Built-in echo agent
//!
//! A minimal [`Agent`] so the server runs end-to-end without an external
//! model: it mirrors text actions back word by word and answers audio or
//! opening inputs with a canned greeting. Useful for wiring checks and as a
//! template for real adapters.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;

use crate::agent::{Agent, AgentError, StepEvent, StepInput, StepStream};
use crate::session::log::Turn;

const GREETING: &str = "Hello! I am listening.";
const AUDIO_FALLBACK: &str = "I received your recording.";

/// Echoes the user's text back as a single streamed response.
#[derive(Debug, Default)]
pub struct EchoAgent;

impl EchoAgent {
    fn reply_for(input: &StepInput) -> (Option<String>, String) {
        match input {
            StepInput::Opening => (None, GREETING.to_string()),
            StepInput::Audio(_) => (None, AUDIO_FALLBACK.to_string()),
            StepInput::Action(action) => {
                let user_text = action
                    .get("content")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let reply = match &user_text {
                    Some(text) => format!("You said: {text}"),
                    None => format!("Received action '{}'.", action.message_type()),
                };
                (user_text, reply)
            }
        }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run_step(
        &self,
        _history: Vec<Turn>,
        input: StepInput,
    ) -> Result<StepStream, AgentError> {
        let (user_text, reply) = Self::reply_for(&input);

        let events = stream! {
            if let Some(text) = user_text {
                yield Ok(StepEvent::UserText(text));
            }
            yield Ok(StepEvent::ResponseStart { timed: Vec::new() });
            for word in reply.split_inclusive(' ') {
                yield Ok(StepEvent::Text(word.to_string()));
            }
            yield Ok(StepEvent::ResponseEnd {
                text: reply,
                context: None,
                messages: Vec::new(),
            });
        };

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::dialog::envelope::Envelope;

    async fn collect(agent: &EchoAgent, input: StepInput) -> Vec<StepEvent> {
        let mut stream = agent.run_step(Vec::new(), input).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_echoes_text_action() {
        let action =
            Envelope::from_value(json!({ "type": "text_chat_response", "content": "hi" }))
                .unwrap();
        let events = collect(&EchoAgent, StepInput::Action(action)).await;

        assert!(matches!(&events[0], StepEvent::UserText(t) if t == "hi"));
        assert!(matches!(events[1], StepEvent::ResponseStart { .. }));
        let StepEvent::ResponseEnd { text, .. } = events.last().unwrap() else {
            panic!("expected ResponseEnd");
        };
        assert_eq!(text, "You said: hi");
    }

    #[tokio::test]
    async fn test_opening_yields_single_response() {
        let events = collect(&EchoAgent, StepInput::Opening).await;
        let starts = events
            .iter()
            .filter(|e| matches!(e, StepEvent::ResponseStart { .. }))
            .count();
        let ends = events
            .iter()
            .filter(|e| matches!(e, StepEvent::ResponseEnd { .. }))
            .count();
        assert_eq!((starts, ends), (1, 1));
    }
}
