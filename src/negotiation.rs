//! Two-agent negotiation loop
//!
//! A supervisor presents a question to two research-agent personas in a
//! fixed order until one of them agrees with the current answer. Each
//! agent is stateless: it sees only the question, the current candidate
//! answer, and a running history of previous answers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm::types::{
    Content, GenerateContentRequest, GenerationConfig,
};
use crate::llm::GeminiClient;
use crate::prompts;

/// Candidate answer before any agent has spoken
pub const UNANSWERED: &str = "This question is unanswered";

/// History before any turn has completed
pub const NO_HISTORY: &str = "None so far, we're just getting started";

/// Rounds allowed before the loop gives up; two perpetually disagreeing
/// agents would otherwise spin forever.
pub const DEFAULT_MAX_ROUNDS: u32 = 15;

/// One agent's verdict on the current answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentJudgment {
    pub agrees: bool,
    pub answer: String,
}

/// A stateless judge: given question, candidate answer, and history,
/// either approve the answer or revise it.
#[async_trait]
pub trait NegotiationAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn judge(
        &self,
        question: &str,
        current_answer: &str,
        history: &str,
    ) -> Result<AgentJudgment>;
}

/// JSON schema the agents' responses are constrained to
fn judgment_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "agrees": {"type": "BOOLEAN"},
            "answer": {"type": "STRING"}
        },
        "required": ["agrees", "answer"]
    })
}

/// Production agent: one persona bound to a Gemini model, forced to answer
/// in the judgment schema.
pub struct ResearchAgent {
    name: String,
    client: GeminiClient,
    model: String,
    system_instruction: String,
}

impl ResearchAgent {
    pub fn new(
        name: impl Into<String>,
        client: GeminiClient,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            model: model.into(),
            system_instruction: system_instruction.into(),
        }
    }

    /// The imaginative agent persona
    pub fn creative(client: GeminiClient, model: impl Into<String>) -> Self {
        Self::new(
            "research_agent_a",
            client,
            model,
            prompts::RESEARCH_AGENT_A_INSTRUCTIONS,
        )
    }

    /// The methodical agent persona
    pub fn methodical(client: GeminiClient, model: impl Into<String>) -> Self {
        Self::new(
            "research_agent_b",
            client,
            model,
            prompts::RESEARCH_AGENT_B_INSTRUCTIONS,
        )
    }

    fn generation_config() -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: Some(2048),
            temperature: Some(2.0),
            top_p: Some(0.6),
            top_k: Some(32),
            presence_penalty: Some(0.0),
            frequency_penalty: Some(0.0),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(judgment_schema()),
        }
    }
}

#[async_trait]
impl NegotiationAgent for ResearchAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn judge(
        &self,
        question: &str,
        current_answer: &str,
        history: &str,
    ) -> Result<AgentJudgment> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::negotiation_prompt(
                question,
                current_answer,
                history,
            ))],
            system_instruction: Some(Content::system(self.system_instruction.as_str())),
            generation_config: Some(Self::generation_config()),
            safety_settings: Vec::new(),
            tools: Vec::new(),
        };

        let response = self.client.generate_content(&self.model, &request).await?;
        let text = response.text();
        serde_json::from_str(&text)
            .with_context(|| format!("{} returned an unparseable judgment: {}", self.name, text))
    }
}

/// Result of negotiating one question
#[derive(Debug, Clone)]
pub struct NegotiationOutcome {
    pub answer: String,
    /// False when the round cap was reached without agreement
    pub converged: bool,
    pub rounds: u32,
    pub agent_calls: u32,
    pub history: String,
}

/// Drives the fixed-order negotiation between two agents.
pub struct Negotiator {
    /// First responder first; the original hands the question to the
    /// methodical agent before the creative one.
    agents: Vec<Box<dyn NegotiationAgent>>,
    max_rounds: u32,
}

impl Negotiator {
    pub fn new(first: Box<dyn NegotiationAgent>, second: Box<dyn NegotiationAgent>) -> Self {
        Self {
            agents: vec![first, second],
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Negotiate one question to agreement or the round cap.
    ///
    /// A disagreeing agent's answer becomes the new candidate and is
    /// appended to the history; an agreeing judgment ends the turn with the
    /// candidate as final.
    pub async fn run(&self, question: &str) -> Result<NegotiationOutcome> {
        let mut current_answer = UNANSWERED.to_string();
        let mut history = NO_HISTORY.to_string();
        let mut agent_calls = 0;

        for round in 1..=self.max_rounds {
            for agent in &self.agents {
                let judgment = agent
                    .judge(question, &current_answer, &history)
                    .await
                    .with_context(|| format!("negotiation failed at round {}", round))?;
                agent_calls += 1;
                info!(
                    agent = agent.name(),
                    agrees = judgment.agrees,
                    round,
                    "judgment"
                );

                if judgment.agrees {
                    return Ok(NegotiationOutcome {
                        answer: current_answer,
                        converged: true,
                        rounds: round,
                        agent_calls,
                        history,
                    });
                }

                if history == NO_HISTORY {
                    history.clear();
                }
                history.push_str(&format!("\n- [{}]: {}", agent.name(), judgment.answer));
                current_answer = judgment.answer;
            }
        }

        Ok(NegotiationOutcome {
            answer: current_answer,
            converged: false,
            rounds: self.max_rounds,
            agent_calls,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Agent that replays a fixed script of judgments
    struct ScriptedAgent {
        name: String,
        script: Vec<AgentJudgment>,
        cursor: AtomicU32,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedAgent {
        fn new(name: &str, script: Vec<AgentJudgment>, calls: Arc<AtomicU32>) -> Box<Self> {
            Box::new(Self {
                name: name.into(),
                script,
                cursor: AtomicU32::new(0),
                calls,
            })
        }
    }

    #[async_trait]
    impl NegotiationAgent for ScriptedAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn judge(&self, _: &str, _: &str, _: &str) -> Result<AgentJudgment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let i = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.script[i.min(self.script.len() - 1)].clone())
        }
    }

    fn judgment(agrees: bool, answer: &str) -> AgentJudgment {
        AgentJudgment {
            agrees,
            answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn test_two_calls_then_agreement_reports_revised_answer() {
        let calls = Arc::new(AtomicU32::new(0));
        let first = ScriptedAgent::new("b", vec![judgment(false, "X")], calls.clone());
        let second = ScriptedAgent::new("a", vec![judgment(true, "ignored")], calls.clone());

        let outcome = Negotiator::new(first, second).run("question?").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.answer, "X");
        assert!(outcome.converged);
        assert_eq!(outcome.rounds, 1);
    }

    #[tokio::test]
    async fn test_immediate_agreement_keeps_sentinel_answer() {
        let calls = Arc::new(AtomicU32::new(0));
        let first = ScriptedAgent::new("b", vec![judgment(true, "anything")], calls.clone());
        let second = ScriptedAgent::new("a", vec![judgment(true, "anything")], calls.clone());

        let outcome = Negotiator::new(first, second).run("question?").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.answer, UNANSWERED);
    }

    #[tokio::test]
    async fn test_round_cap_stops_perpetual_disagreement() {
        let calls = Arc::new(AtomicU32::new(0));
        let first = ScriptedAgent::new("b", vec![judgment(false, "B says no")], calls.clone());
        let second = ScriptedAgent::new("a", vec![judgment(false, "A says no")], calls.clone());

        let outcome = Negotiator::new(first, second)
            .with_max_rounds(3)
            .run("question?")
            .await
            .unwrap();
        assert!(!outcome.converged);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(outcome.answer, "A says no");
        assert_eq!(outcome.rounds, 3);
    }

    #[tokio::test]
    async fn test_history_accumulates_disagreements() {
        let calls = Arc::new(AtomicU32::new(0));
        let first = ScriptedAgent::new(
            "b",
            vec![judgment(false, "draft one")],
            calls.clone(),
        );
        let second = ScriptedAgent::new(
            "a",
            vec![judgment(false, "draft two"), judgment(true, "done")],
            calls.clone(),
        );

        let outcome = Negotiator::new(first, second)
            .with_max_rounds(2)
            .run("question?")
            .await
            .unwrap();
        assert!(outcome.history.contains("[b]: draft one"));
        assert!(outcome.history.contains("[a]: draft two"));
        assert!(!outcome.history.contains(NO_HISTORY));
    }

    #[test]
    fn test_judgment_deserializes_from_schema_output() {
        let judgment: AgentJudgment =
            serde_json::from_str(r#"{"agrees": false, "answer": "Elandir Moonwhisper"}"#).unwrap();
        assert!(!judgment.agrees);
        assert_eq!(judgment.answer, "Elandir Moonwhisper");
    }
}
