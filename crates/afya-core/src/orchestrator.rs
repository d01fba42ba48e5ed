//! Request orchestration
//!
//! One request runs `classify -> route -> agent(s) -> respond`, then hands the
//! chosen response to the memory agent on a detached task. Any failure before
//! a response is chosen collapses to the fixed fallback chat and is not
//! recorded.

use std::sync::Arc;

use afya_store::RecordStore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::agents::{
    AgentResult, DIRECT_REQUEST_CONTEXT, Interaction, MemoryResult, run_care_agent,
    run_escalation_agent, run_memory_agent, run_triage_agent,
};
use crate::error::Result;
use crate::intent::classify_intent;
use crate::providers::LlmProvider;
use crate::types::{BackendResponse, EscalationChannel, HistoryTurn, Intent, UrgencyLevel};
use crate::whatsapp::WhatsAppLink;

const TRIAGE_SUPPORT_PREFIX: &str = "Jambo AfyaMkononi, I need help with my health. Reason: ";
const DIRECT_SUPPORT_MESSAGE: &str = "Jambo AfyaMkononi, I need to speak with a health assistant.";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Prior turns forwarded to the classifier and triage agent
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { history_window: 6 }
    }
}

/// Everything one request produced
#[derive(Debug)]
pub struct Dispatch {
    /// `None` when classification failed
    pub intent: Option<Intent>,
    pub agent_results: Vec<AgentResult>,
    pub response: BackendResponse,
    /// Detached memory write; `None` for the fallback
    pub memory: Option<JoinHandle<MemoryResult>>,
}

#[derive(Default)]
struct Trace {
    intent: Option<Intent>,
    agent_results: Vec<AgentResult>,
}

pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RecordStore>,
    whatsapp: WhatsAppLink,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RecordStore>,
        whatsapp: WhatsAppLink,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            whatsapp,
            config,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Answer one user message. Never fails; never waits on the memory write.
    pub async fn handle(&self, input: &str, user_id: &str, history: &[HistoryTurn]) -> BackendResponse {
        self.dispatch(input, user_id, history).await.response
    }

    /// Like [`Self::handle`], but exposes the intent, agent outputs and the
    /// memory task
    pub async fn dispatch(&self, input: &str, user_id: &str, history: &[HistoryTurn]) -> Dispatch {
        let mut trace = Trace::default();

        match self.route(input, history, &mut trace).await {
            Ok(response) => {
                info!(
                    "Request for {} answered with {} (intent {:?})",
                    user_id,
                    response.kind(),
                    trace.intent
                );
                let memory = self.spawn_memory_write(user_id, input, &response);
                Dispatch {
                    intent: trace.intent,
                    agent_results: trace.agent_results,
                    response,
                    memory: Some(memory),
                }
            }
            Err(e) => {
                error!("Orchestration failed for {}: {}", user_id, e);
                Dispatch {
                    intent: trace.intent,
                    agent_results: trace.agent_results,
                    response: BackendResponse::fallback(),
                    memory: None,
                }
            }
        }
    }

    async fn route(&self, input: &str, history: &[HistoryTurn], trace: &mut Trace) -> Result<BackendResponse> {
        let provider = self.provider.as_ref();
        let window = self.config.history_window;

        let intent = classify_intent(provider, input, history, window).await?;
        trace.intent = Some(intent);

        match intent {
            Intent::Triage => {
                let triage = run_triage_agent(provider, input, history, window).await?;
                trace.agent_results.push(AgentResult::Triage(triage.clone()));

                if triage.urgency == UrgencyLevel::Emergency {
                    return Ok(BackendResponse::emergency());
                }

                if triage.action.is_escalation() {
                    let escalation =
                        run_escalation_agent(provider, input, &triage.escalation_context()).await?;
                    // The channel does not change the outcome here
                    debug!("Triage escalation picked channel {:?}", escalation.channel);
                    trace.agent_results.push(AgentResult::Escalation(escalation));

                    let text = format!("{}{}", TRIAGE_SUPPORT_PREFIX, triage.message);
                    return Ok(BackendResponse::whatsapp(self.whatsapp.url_for(&text)));
                }

                Ok(BackendResponse::chat(triage.message))
            }
            Intent::Care => {
                let care = run_care_agent(provider, input).await?;
                let response = BackendResponse::Chat {
                    message: care.message.clone(),
                    disclaimer: Some(care.disclaimer.clone()),
                };
                trace.agent_results.push(AgentResult::Care(care));
                Ok(response)
            }
            Intent::Escalation => {
                let escalation =
                    run_escalation_agent(provider, input, DIRECT_REQUEST_CONTEXT).await?;
                let channel = escalation.channel;
                trace.agent_results.push(AgentResult::Escalation(escalation));

                if channel == EscalationChannel::Emergency {
                    Ok(BackendResponse::emergency())
                } else {
                    Ok(BackendResponse::whatsapp(self.whatsapp.url_for(DIRECT_SUPPORT_MESSAGE)))
                }
            }
        }
    }

    fn spawn_memory_write(
        &self,
        user_id: &str,
        input: &str,
        response: &BackendResponse,
    ) -> JoinHandle<MemoryResult> {
        let store = Arc::clone(&self.store);
        let user_id = user_id.to_string();
        let interaction = Interaction::now(input, response.clone());
        tokio::spawn(async move { run_memory_agent(store.as_ref(), &user_id, &interaction).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use percent_encoding::percent_decode_str;

    use super::*;
    use crate::testing::{FailingStore, RecordingStore, ScriptedProvider, StalledStore};
    use crate::types::{EMERGENCY_MESSAGE, FALLBACK_MESSAGE, TriageAction};

    fn orchestrator(provider: Arc<ScriptedProvider>, store: Arc<dyn RecordStore>) -> Orchestrator {
        Orchestrator::new(
            provider,
            store,
            WhatsAppLink::default(),
            OrchestratorConfig::default(),
        )
    }

    fn decoded_text(url: &str) -> String {
        let (_, query) = url.split_once("?text=").unwrap();
        percent_decode_str(query).decode_utf8().unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_chest_pain_is_emergency_whatever_the_action() {
        for action in TriageAction::VARIANTS {
            let triage = serde_json::json!({
                "urgency": "EMERGENCY",
                "action": action,
                "message": "Pole sana.",
            })
            .to_string();
            let provider = Arc::new(ScriptedProvider::new([
                r#"{"intent": "TRIAGE"}"#.to_string(),
                triage,
                r#"{"channel": "DOCTOR", "message": "unused"}"#.to_string(),
            ]));
            let orch = orchestrator(provider.clone(), Arc::new(RecordingStore::default()));

            let response = orch
                .handle("I have severe chest pain and can't breathe", "user-1", &[])
                .await;
            assert_eq!(response, BackendResponse::emergency(), "action {}", action);
            assert!(EMERGENCY_MESSAGE.contains("112"));
            // escalation is skipped
            assert_eq!(provider.call_count(), 2, "action {}", action);
        }
    }

    #[tokio::test]
    async fn test_high_urgency_whatsapp_escalation_redirects() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "HIGH", "action": "ESCALATE_WHATSAPP", "message": "A nurse should review this rash today."}"#,
            r#"{"channel": "WHATSAPP", "message": "Connecting you."}"#,
        ]));
        let orch = orchestrator(provider.clone(), Arc::new(RecordingStore::default()));

        let dispatch = orch.dispatch("Rash spreading on my arm", "user-1", &[]).await;
        let BackendResponse::Redirect { url, .. } = dispatch.response else {
            panic!("expected redirect");
        };
        assert!(url.starts_with("https://wa.me/254700000000?text="));
        assert!(decoded_text(&url).contains("A nurse should review this rash today."));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_care_returns_chat_with_disclaimer() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "CARE", "reason": "nutrition question"}"#,
            r#"{"message": "Eat a balanced diet with fruits and vegetables.", "disclaimer": "This is general guidance, not a diagnosis."}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(RecordingStore::default()));

        let dispatch = orch.dispatch("What should I eat to stay healthy?", "user-1", &[]).await;
        assert_eq!(dispatch.intent, Some(Intent::Care));
        match dispatch.response {
            BackendResponse::Chat { message, disclaimer } => {
                assert!(message.contains("balanced"));
                assert!(!disclaimer.unwrap().is_empty());
            }
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_triage_escalation_redirects_with_rationale() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "HIGH", "action": "REFER_DOCTOR", "message": "Persistent fever for five days needs a clinician."}"#,
            r#"{"channel": "EMERGENCY", "message": "ignored"}"#,
        ]));
        let orch = orchestrator(provider.clone(), Arc::new(RecordingStore::default()));

        let dispatch = orch.dispatch("Fever for five days", "user-1", &[]).await;
        let BackendResponse::Redirect { url, .. } = dispatch.response else {
            panic!("expected redirect");
        };
        assert!(url.starts_with("https://wa.me/254700000000?text="));
        assert!(!url.contains('+'));
        let text = decoded_text(&url);
        assert!(text.contains("Persistent fever for five days needs a clinician."));
        assert!(text.starts_with("Jambo AfyaMkononi"));

        assert_eq!(dispatch.agent_results.len(), 2);
        assert!(provider.prompts()[2].contains("Triage result: HIGH urgency,"));
    }

    #[tokio::test]
    async fn test_triage_without_escalation_is_chat() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "LOW", "action": "ASK_FOLLOWUP", "message": "Pole. Since when?"}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(RecordingStore::default()));

        let response = orch.handle("Nina homa", "user-1", &[]).await;
        assert_eq!(response, BackendResponse::chat("Pole. Since when?"));
    }

    #[tokio::test]
    async fn test_classifier_failure_returns_fallback_without_agents() {
        let provider = Arc::new(ScriptedProvider::failing("quota exceeded"));
        let store = Arc::new(RecordingStore::default());
        let orch = orchestrator(provider.clone(), store.clone());

        let dispatch = orch.dispatch("hello", "user-1", &[]).await;
        assert_eq!(dispatch.response, BackendResponse::chat(FALLBACK_MESSAGE));
        assert_eq!(dispatch.intent, None);
        assert!(dispatch.agent_results.is_empty());
        assert!(dispatch.memory.is_none());
        assert_eq!(provider.call_count(), 1);
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_agent_schema_violation_returns_fallback() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "CARE"}"#,
            r#"{"message": "Drink water."}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(RecordingStore::default()));

        let dispatch = orch.dispatch("Tips?", "user-1", &[]).await;
        assert_eq!(dispatch.intent, Some(Intent::Care));
        assert_eq!(dispatch.response, BackendResponse::fallback());
        assert!(dispatch.memory.is_none());
    }

    #[tokio::test]
    async fn test_direct_doctor_request_redirects() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "ESCALATION"}"#,
            r#"{"channel": "DOCTOR", "message": "Connecting you to a clinician."}"#,
        ]));
        let orch = orchestrator(provider.clone(), Arc::new(RecordingStore::default()));

        let response = orch.handle("I want to talk to a real doctor", "user-1", &[]).await;
        let BackendResponse::Redirect { url, .. } = response else {
            panic!("expected redirect");
        };
        assert!(url.starts_with("https://wa.me/"));
        assert_eq!(decoded_text(&url), DIRECT_SUPPORT_MESSAGE);
        assert!(provider.prompts()[1].starts_with("Context: User requested human help directly."));
    }

    #[tokio::test]
    async fn test_direct_emergency_escalation() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "ESCALATION"}"#,
            r#"{"channel": "EMERGENCY", "message": "Unconscious person."}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(RecordingStore::default()));

        let response = orch.handle("My father collapsed, get help", "user-1", &[]).await;
        assert_eq!(response, BackendResponse::emergency());
    }

    #[tokio::test]
    async fn test_memory_write_lands() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "LOW", "action": "CONTINUE_CHAT", "message": "Rest and hydrate."}"#,
        ]));
        let store = Arc::new(RecordingStore::default());
        let orch = orchestrator(provider, store.clone());

        let dispatch = orch.dispatch("Feeling tired", "user-7", &[]).await;
        let memory = dispatch.memory.unwrap().await.unwrap();
        assert!(memory.stored);

        store.wait_for(1).await;
        let saved = store.saved();
        assert_eq!(saved[0].0, "user-7");
        assert_eq!(saved[0].1.input, "Feeling tired");
        assert_eq!(saved[0].1.response["message"], "Rest and hydrate.");
    }

    #[tokio::test]
    async fn test_memory_failure_does_not_change_response() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "LOW", "action": "CONTINUE_CHAT", "message": "Rest."}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(FailingStore));

        let dispatch = orch.dispatch("Tired", "user-1", &[]).await;
        assert_eq!(dispatch.response, BackendResponse::chat("Rest."));
        assert!(!dispatch.memory.unwrap().await.unwrap().stored);
    }

    #[tokio::test]
    async fn test_response_does_not_wait_for_memory() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "LOW", "action": "CONTINUE_CHAT", "message": "Rest."}"#,
        ]));
        let orch = orchestrator(provider, Arc::new(StalledStore));

        let response = tokio::time::timeout(Duration::from_secs(2), orch.handle("Tired", "user-1", &[]))
            .await
            .expect("response blocked on the memory write");
        assert_eq!(response, BackendResponse::chat("Rest."));
    }

    #[tokio::test]
    async fn test_history_is_windowed() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "TRIAGE"}"#,
            r#"{"urgency": "LOW", "action": "CONTINUE_CHAT", "message": "ok"}"#,
        ]));
        let orch = Orchestrator::new(
            provider.clone(),
            Arc::new(RecordingStore::default()),
            WhatsAppLink::default(),
            OrchestratorConfig { history_window: 1 },
        );
        let history = vec![HistoryTurn::user("oldest turn"), HistoryTurn::model("latest turn")];

        orch.handle("and now?", "user-1", &history).await;
        for prompt in provider.prompts() {
            assert!(!prompt.contains("oldest turn"));
            assert!(prompt.contains("latest turn"));
        }
    }
}
