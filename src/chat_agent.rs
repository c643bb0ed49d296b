use std::sync::Arc;

use tracing::{debug, warn};

use crate::flight_context::summarize;
use crate::record_store::RecordStore;
use crate::session::{ChatTurn, SessionStore, DEFAULT_SESSION};
use crate::traits::CompletionService;

/// Chat orchestration over per-session conversation state.
///
/// Appends the user turn, builds the system instruction from the session's
/// flight digest, calls the completion service, and records the reply. A
/// completion failure is degraded to a plain-text diagnostic so the
/// conversation never hard-fails on a flaky LLM call.
pub struct ChatAgent {
    sessions: SessionStore,
    completion: Arc<dyn CompletionService>,
}

impl ChatAgent {
    pub fn new(sessions: SessionStore, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            sessions,
            completion,
        }
    }

    pub fn completion_name(&self) -> &str {
        self.completion.name()
    }

    /// Attach ingested flight data to a session for later chat context and
    /// anomaly queries.
    pub async fn set_flight_data(&self, session_id: &str, store: RecordStore) {
        self.sessions.set_flight_data(session_id, store).await;
    }

    /// Flight data snapshot for a session, `None` when it has never stored a
    /// log.
    pub async fn flight_data(&self, session_id: &str) -> Option<RecordStore> {
        self.sessions.flight_data(session_id).await
    }

    /// Process one user message and return the assistant reply.
    pub async fn process_message(&self, message: &str, session_id: Option<&str>) -> String {
        let session_id = session_id.unwrap_or(DEFAULT_SESSION);
        let session = self.sessions.session(session_id).await;
        let mut session = session.lock().await;

        session.append_turn(ChatTurn::user(message));

        let flight_context = session
            .flight_data
            .as_ref()
            .map(summarize)
            .unwrap_or_default();
        let system_instruction = build_system_instruction(&flight_context);

        debug!(
            "Requesting completion for session {} ({} turns)",
            session_id,
            session.history.len()
        );

        match self
            .completion
            .complete(&system_instruction, session.history())
            .await
        {
            Ok(reply) => {
                session.append_turn(ChatTurn::assistant(&reply));
                reply
            }
            Err(e) => {
                warn!("Completion service failed for session {}: {}", session_id, e);
                // Degrade to a readable message; the failed exchange is not
                // recorded as an assistant turn.
                format!("Error processing message: {}", e)
            }
        }
    }
}

fn build_system_instruction(flight_context: &str) -> String {
    format!(
        r#"You are an expert UAV flight data analyst.
Your role is to help users understand their flight logs and identify potential issues.
Be concise and technical in your responses.

You have access to the following flight data:
{flight_context}

You can analyze:
1. Flight parameters (altitude, speed, position)
2. System status (GPS, battery, RC signal)
3. Error messages and events
4. Flight modes and commands

When analyzing data:
- Look for patterns and anomalies
- Consider the context of the flight
- Explain technical terms when needed
- Suggest potential solutions for issues

Documentation reference: https://ardupilot.org/plane/docs/logmessages.html"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::StaticCompletion;
    use crate::message_types::MessageType;
    use crate::record_store::Record;
    use crate::session::Role;

    fn agent(completion: StaticCompletion) -> ChatAgent {
        ChatAgent::new(SessionStore::new(8), Arc::new(completion))
    }

    #[tokio::test]
    async fn test_reply_is_recorded_in_history() {
        let agent = agent(StaticCompletion::replying("all nominal"));

        let reply = agent.process_message("how was the flight?", Some("s1")).await;
        assert_eq!(reply, "all nominal");

        let session = agent.sessions.session("s1").await;
        let guard = session.lock().await;
        assert_eq!(guard.history.len(), 2);
        assert_eq!(guard.history[0].role, Role::User);
        assert_eq!(guard.history[1].role, Role::Assistant);
        assert_eq!(guard.history[1].content, "all nominal");
    }

    #[tokio::test]
    async fn test_missing_session_id_uses_default() {
        let agent = agent(StaticCompletion::replying("ok"));
        agent.process_message("hello", None).await;

        let session = agent.sessions.session(DEFAULT_SESSION).await;
        assert_eq!(session.lock().await.history.len(), 2);
    }

    #[tokio::test]
    async fn test_completion_failure_degrades_to_message() {
        let agent = agent(StaticCompletion::failing());

        let reply = agent.process_message("hello", Some("s1")).await;
        assert!(reply.starts_with("Error processing message:"));

        // The user turn is kept; no assistant turn is recorded.
        let session = agent.sessions.session("s1").await;
        let guard = session.lock().await;
        assert_eq!(guard.history.len(), 1);
        assert_eq!(guard.history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_flight_data_feeds_the_system_instruction() {
        let mut store = RecordStore::new();
        store.push(MessageType::Gps, Record::new(0.0));
        store.push(MessageType::Gps, Record::new(60.0));

        let agent = agent(StaticCompletion::replying("ok"));
        agent.set_flight_data("s1", store).await;

        assert!(agent.flight_data("s1").await.is_some());
        let digest = summarize(&agent.flight_data("s1").await.unwrap());
        assert!(digest.contains("Flight duration: 60.0 seconds"));
    }

    #[test]
    fn test_system_instruction_embeds_context() {
        let instruction = build_system_instruction("Flight duration: 12.0 seconds");
        assert!(instruction.contains("expert UAV flight data analyst"));
        assert!(instruction.contains("Flight duration: 12.0 seconds"));
    }
}
