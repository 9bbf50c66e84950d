//! Gemchat - a terminal front-end for Google Gemini chat assistants
//!
//! The pieces are usable as a library: load a persona registry, bind a
//! session to one model and one immutable sampling configuration, and send
//! messages; or run two research-agent personas through the negotiation
//! loop until they agree on an answer.
//!
//! # Example
//!
//! ```no_run
//! use gemchat::{ChatSession, GeminiClient, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?)?;
//!     let config = SessionConfig::builder("models/gemini-1.5-flash-002")
//!         .temperature(0.9)
//!         .top_p(0.95)
//!         .build()?;
//!
//!     let mut session = ChatSession::new(client, config);
//!     for part in session.send_text("What is the capital of France?").await? {
//!         println!("{:?}", part);
//!     }
//!     Ok(())
//! }
//! ```

mod assistants;
mod config;
mod llm;
mod message;
mod negotiation;
mod prompts;
mod session;

// Re-export the public API
pub use assistants::{AssistantDefinition, AssistantRegistry, DEFAULT_ASSISTANT_NAME};
pub use config::Config;
pub use llm::{types, GeminiClient, LlmError, LlmResult};
pub use message::{ChatMessage, MessagePart, Role};
pub use negotiation::{
    AgentJudgment, NegotiationAgent, NegotiationOutcome, Negotiator, ResearchAgent,
};
pub use session::{ChatBackend, ChatSession, SessionConfig, SessionConfigBuilder};
