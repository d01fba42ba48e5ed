//! Test doubles for the oracle and the record store

use std::collections::VecDeque;
use std::sync::Mutex;

use afya_store::{InteractionRecord, RecordStore, SaveOutcome};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::providers::{ChatMessage, ChatResponse, ChatUsage, GenerationOptions, LlmProvider, StopReason};

/// Oracle that replays a fixed script of replies in order
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    always_fail: Option<String>,
    prompts: Mutex<Vec<String>>,
    systems: Mutex<Vec<String>>,
    temperatures: Mutex<Vec<Option<f32>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Mix successful replies (`Ok`) and transport failures (`Err`)
    pub fn with_script<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            always_fail: None,
            prompts: Mutex::new(Vec::new()),
            systems: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            always_fail: Some(message.to_string()),
            ..Self::with_script([])
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn system_instructions(&self) -> Vec<String> {
        self.systems.lock().unwrap().clone()
    }

    /// Temperature override sent with each call
    pub fn temperatures(&self) -> Vec<Option<f32>> {
        self.temperatures.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        system: &str,
        options: &GenerationOptions,
    ) -> Result<ChatResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        self.systems.lock().unwrap().push(system.to_string());
        self.temperatures.lock().unwrap().push(options.temperature);

        if let Some(message) = &self.always_fail {
            return Err(anyhow!("{}", message));
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatResponse {
                text,
                stop_reason: StopReason::EndTurn,
                usage: ChatUsage::default(),
            }),
            Some(Err(message)) => Err(anyhow!("{}", message)),
            None => Err(anyhow!("scripted provider ran out of replies")),
        }
    }
}

/// Store that keeps every write in memory
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<(String, InteractionRecord)>>,
    notify: Notify,
}

impl RecordingStore {
    pub fn saved(&self) -> Vec<(String, InteractionRecord)> {
        self.saved.lock().unwrap().clone()
    }

    /// Resolve once at least `count` writes have landed
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.saved.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn save(&self, user_id: &str, record: &InteractionRecord) -> Result<SaveOutcome> {
        let id = {
            let mut saved = self.saved.lock().unwrap();
            saved.push((user_id.to_string(), record.clone()));
            format!("consultation-{}", saved.len())
        };
        self.notify.notify_waiters();
        Ok(SaveOutcome { success: true, id })
    }
}

/// Store whose every write errors
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn save(&self, _user_id: &str, _record: &InteractionRecord) -> Result<SaveOutcome> {
        Err(anyhow!("database is locked"))
    }
}

/// Store whose writes never complete
pub struct StalledStore;

#[async_trait]
impl RecordStore for StalledStore {
    async fn save(&self, _user_id: &str, _record: &InteractionRecord) -> Result<SaveOutcome> {
        std::future::pending().await
    }
}
