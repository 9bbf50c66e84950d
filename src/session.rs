//! Conversation sessions
//!
//! A session binds one model to one fixed sampling configuration and an
//! append-only message log. Changing any parameter means starting a new
//! session; clearing a chat drops the session entirely.

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::llm::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, SafetySetting,
    Tool,
};
use crate::llm::{GeminiClient, LlmResult};
use crate::message::{ChatMessage, MessagePart};
use crate::prompts;

/// Documented parameter ranges, enforced at construction
pub mod bounds {
    pub const MAX_OUTPUT_TOKENS: std::ops::RangeInclusive<u32> = 64..=8192;
    pub const TEMPERATURE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
    pub const TOP_P: std::ops::RangeInclusive<f32> = 0.0..=1.0;
    pub const TOP_K: std::ops::RangeInclusive<u32> = 1..=64;
    pub const PENALTY: std::ops::RangeInclusive<f32> = -2.0..=1.99;
}

/// Immutable configuration for one session.
///
/// Constructed through [`SessionConfig::builder`], which rejects values
/// outside the documented ranges.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    model: String,
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
    safety_settings: Vec<SafetySetting>,
    system_instruction: Option<String>,
    tools: Vec<Tool>,
}

impl SessionConfig {
    pub fn builder(model: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            model: model.into(),
            max_output_tokens: 1024,
            temperature: 0.9,
            top_p: 0.95,
            top_k: 32,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            safety_settings: SafetySetting::defaults(),
            system_instruction: None,
            tools: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn presence_penalty(&self) -> f32 {
        self.presence_penalty
    }

    pub fn frequency_penalty(&self) -> f32 {
        self.frequency_penalty
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    /// Wire generation config for this session
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: Some(self.max_output_tokens),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            top_k: Some(self.top_k),
            presence_penalty: Some(self.presence_penalty),
            frequency_penalty: Some(self.frequency_penalty),
            response_mime_type: None,
            response_schema: None,
        }
    }
}

/// Builder enforcing the documented parameter ranges
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    model: String,
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
    safety_settings: Vec<SafetySetting>,
    system_instruction: Option<String>,
    tools: Vec<Tool>,
}

impl SessionConfigBuilder {
    pub fn max_output_tokens(mut self, value: u32) -> Self {
        self.max_output_tokens = value;
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = value;
        self
    }

    pub fn top_p(mut self, value: f32) -> Self {
        self.top_p = value;
        self
    }

    pub fn top_k(mut self, value: u32) -> Self {
        self.top_k = value;
        self
    }

    pub fn presence_penalty(mut self, value: f32) -> Self {
        self.presence_penalty = value;
        self
    }

    pub fn frequency_penalty(mut self, value: f32) -> Self {
        self.frequency_penalty = value;
        self
    }

    pub fn safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        if !bounds::MAX_OUTPUT_TOKENS.contains(&self.max_output_tokens) {
            bail!(
                "max_output_tokens {} outside {}..={}",
                self.max_output_tokens,
                bounds::MAX_OUTPUT_TOKENS.start(),
                bounds::MAX_OUTPUT_TOKENS.end()
            );
        }
        if !bounds::TEMPERATURE.contains(&self.temperature) {
            bail!("temperature {} outside 0.0..=2.0", self.temperature);
        }
        if !bounds::TOP_P.contains(&self.top_p) {
            bail!("top_p {} outside 0.0..=1.0", self.top_p);
        }
        if !bounds::TOP_K.contains(&self.top_k) {
            bail!("top_k {} outside 1..=64", self.top_k);
        }
        if !bounds::PENALTY.contains(&self.presence_penalty) {
            bail!("presence_penalty {} outside -2.0..=1.99", self.presence_penalty);
        }
        if !bounds::PENALTY.contains(&self.frequency_penalty) {
            bail!(
                "frequency_penalty {} outside -2.0..=1.99",
                self.frequency_penalty
            );
        }

        Ok(SessionConfig {
            model: self.model,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            safety_settings: self.safety_settings,
            system_instruction: self.system_instruction,
            tools: self.tools,
        })
    }
}

/// Seam over the remote call so sessions can be exercised without a network
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LlmResult<GenerateContentResponse>;
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LlmResult<GenerateContentResponse> {
        self.generate_content(model, request).await
    }
}

/// One bound conversation: fixed config, append-only log.
pub struct ChatSession<B: ChatBackend = GeminiClient> {
    id: Uuid,
    backend: B,
    config: SessionConfig,
    messages: Vec<ChatMessage>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            config,
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send user content and return the assistant's response parts in
    /// arrival order.
    ///
    /// The user and assistant messages are appended to the log only after
    /// the call succeeds; a failed call leaves the log exactly as it was.
    pub async fn send(&mut self, parts: Vec<MessagePart>) -> LlmResult<Vec<MessagePart>> {
        let user_content = Content::user_parts(parts.iter().map(MessagePart::to_wire_part).collect());
        let response_parts = self.exchange(user_content).await?;

        self.messages.push(ChatMessage::user(parts));
        self.messages
            .push(ChatMessage::assistant(response_parts.clone()));
        Ok(response_parts)
    }

    /// Convenience for plain-text prompts
    pub async fn send_text(&mut self, text: impl Into<String>) -> LlmResult<Vec<MessagePart>> {
        self.send(vec![MessagePart::Text { text: text.into() }])
            .await
    }

    /// Ask the assistant to introduce itself when a chat starts.
    ///
    /// The prompt is hidden: only the assistant's answer is logged, so the
    /// chat opens with an introduction rather than a canned question.
    pub async fn request_introduction(&mut self) -> LlmResult<Vec<MessagePart>> {
        let response_parts = self
            .exchange(Content::user(prompts::INTRODUCTION_REQUEST))
            .await?;

        self.messages
            .push(ChatMessage::assistant(response_parts.clone()));
        Ok(response_parts)
    }

    /// Perform one remote call with the full history plus `user_content`.
    async fn exchange(&self, user_content: Content) -> LlmResult<Vec<MessagePart>> {
        let mut contents: Vec<Content> =
            self.messages.iter().map(ChatMessage::to_content).collect();
        contents.push(user_content);

        let request = GenerateContentRequest {
            contents,
            system_instruction: self
                .config
                .system_instruction
                .as_deref()
                .map(Content::system),
            generation_config: Some(self.config.generation_config()),
            safety_settings: self.config.safety_settings.clone(),
            tools: self.config.tools.clone(),
        };

        let response = self.backend.generate(&self.config.model, &request).await?;
        Ok(response
            .parts()
            .iter()
            .map(MessagePart::from_response_part)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Candidate, ContentRole, Part};
    use crate::llm::LlmError;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Backend that replays scripted results and records requests
    struct ScriptedBackend {
        responses: Mutex<Vec<LlmResult<GenerateContentResponse>>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<LlmResult<GenerateContentResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }

        fn text_response(text: &str) -> GenerateContentResponse {
            GenerateContentResponse {
                candidates: vec![Candidate {
                    content: Some(Content {
                        role: Some(ContentRole::Model),
                        parts: vec![Part::text(text)],
                    }),
                    finish_reason: Some("STOP".into()),
                }],
                usage_metadata: None,
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn generate(
            &self,
            _model: &str,
            _request: &GenerateContentRequest,
        ) -> LlmResult<GenerateContentResponse> {
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::builder("models/gemini-1.5-flash-002")
            .temperature(0.9)
            .top_p(0.95)
            .build()
            .unwrap()
    }

    #[test]
    fn test_config_reports_constructed_values() {
        let config = config();
        assert_eq!(config.temperature(), 0.9);
        assert_eq!(config.top_p(), 0.95);
        assert_eq!(config.model(), "models/gemini-1.5-flash-002");
    }

    #[test]
    fn test_builder_rejects_out_of_range_values() {
        assert!(SessionConfig::builder("m").temperature(2.5).build().is_err());
        assert!(SessionConfig::builder("m").top_p(1.5).build().is_err());
        assert!(SessionConfig::builder("m").top_k(0).build().is_err());
        assert!(SessionConfig::builder("m")
            .max_output_tokens(16)
            .build()
            .is_err());
        assert!(SessionConfig::builder("m")
            .presence_penalty(2.0)
            .build()
            .is_err());
        assert!(SessionConfig::builder("m").temperature(2.0).build().is_ok());
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let backend = ScriptedBackend::new(vec![Ok(ScriptedBackend::text_response("Hi there"))]);
        let mut session = ChatSession::new(backend, config());

        let parts = session.send_text("Hello").await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].text(), "Hello");
        assert_eq!(session.messages()[1].text(), "Hi there");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_log_unchanged() {
        let backend = ScriptedBackend::new(vec![
            Ok(ScriptedBackend::text_response("first")),
            Err(LlmError::Client {
                status: 429,
                message: "quota exhausted".into(),
            }),
        ]);
        let mut session = ChatSession::new(backend, config());

        session.send_text("one").await.unwrap();
        assert_eq!(session.messages().len(), 2);

        let err = session.send_text("two").await.unwrap_err();
        assert!(err.is_client_error());
        // the failed turn must not appear in the log
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].text(), "one");
    }

    #[tokio::test]
    async fn test_introduction_logs_only_the_answer() {
        let backend =
            ScriptedBackend::new(vec![Ok(ScriptedBackend::text_response("I review code."))]);
        let mut session = ChatSession::new(backend, config());

        session.request_introduction().await.unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, crate::message::Role::Assistant);
    }
}
