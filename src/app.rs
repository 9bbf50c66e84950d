//! Interactive chat surface
//!
//! A line-oriented loop over stdin: slash commands configure the next
//! session, anything else is sent to the active chat. Remote failures are
//! printed as warnings and abort only the current action; the message log
//! is never touched by a failed call.

use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::assistants::AssistantRegistry;
use crate::commands::{self, Command, Param};
use crate::config::Config;
use crate::llm::types::ModelInfo;
use crate::llm::{GeminiClient, LlmError};
use crate::message::MessagePart;
use crate::negotiation::{Negotiator, ResearchAgent};
use crate::session::{bounds, ChatSession, SessionConfig};

const DEFAULT_PAGE_TITLE: &str = "Google Gemini Chat Assistants";

/// Sampling parameters staged for the next chat
#[derive(Debug, Clone)]
struct PendingParams {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

impl PendingParams {
    fn from_defaults(config: &Config) -> Self {
        Self {
            max_output_tokens: config.defaults.max_output_tokens,
            temperature: config.defaults.temperature,
            top_p: config.defaults.top_p,
            top_k: config.defaults.top_k,
            presence_penalty: config.defaults.presence_penalty,
            frequency_penalty: config.defaults.frequency_penalty,
        }
    }
}

/// Application state for the chat surface
pub struct App {
    config: Config,
    client: GeminiClient,
    registry: AssistantRegistry,
    models: Vec<ModelInfo>,
    assistant_name: String,
    model_name: String,
    params: PendingParams,
    session: Option<ChatSession>,
    pending_attachments: Vec<MessagePart>,
}

impl App {
    /// Wire up the client, registry, and model catalog.
    ///
    /// A missing API key or an empty model catalog is fatal here; the rest
    /// of the surface fails soft.
    pub async fn new(config: Config) -> Result<Self> {
        let api_key = config.api_key()?;
        let client = GeminiClient::new(api_key).context("Failed to create API client")?;

        let models = client
            .list_models()
            .await
            .context("Configuration failed. API key not valid?")?;
        if models.is_empty() {
            anyhow::bail!("Failed to retrieve any models");
        }

        let registry = AssistantRegistry::load(&config.general.assistants_path);
        let assistant_name = registry
            .names()
            .first()
            .map(|s| s.to_string())
            .expect("registry always has at least one assistant");

        let model_name = if models.iter().any(|m| m.name == config.defaults.model) {
            config.defaults.model.clone()
        } else {
            models[0].name.clone()
        };

        let params = PendingParams::from_defaults(&config);
        Ok(Self {
            config,
            client,
            registry,
            models,
            assistant_name,
            model_name,
            params,
            session: None,
            pending_attachments: Vec::new(),
        })
    }

    /// Run the interactive loop until /quit or EOF
    pub async fn run(&mut self) -> Result<()> {
        self.print_intro();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.prompt();
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                match commands::parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => self.execute(command).await,
                    Err(e) => warning(&e.to_string()),
                }
            } else {
                self.send_prompt(line).await;
            }
        }
        Ok(())
    }

    fn print_intro(&self) {
        println!("# {}\n", DEFAULT_PAGE_TITLE);
        println!("Use /help to see the commands, /new to start a chat.\n");
        println!("{}\n", self.registry.catalog());
        if let Some(doc_path) = self.config.general.params_doc_path.as_deref() {
            if doc_path.exists() {
                if let Ok(doc) = std::fs::read_to_string(doc_path) {
                    println!("{}\n", doc);
                }
            }
        }
    }

    fn prompt(&self) {
        if self.session.is_some() {
            print!("> ");
        } else {
            print!("(no chat) > ");
        }
        let _ = std::io::stdout().flush();
    }

    fn selected_model(&self) -> &ModelInfo {
        // model_name is always taken from the catalog
        self.models
            .iter()
            .find(|m| m.name == self.model_name)
            .expect("selected model is in the catalog")
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Help => println!("{}", commands::HELP_TEXT),
            Command::Assistants => println!("{}", self.registry.catalog()),
            Command::Models => self.print_models(),
            Command::Assistant(name) => {
                if self.registry.contains(&name) {
                    self.assistant_name = name;
                } else {
                    warning(&format!("No assistant named '{}'", name));
                }
            }
            Command::Model(name) => self.select_model(&name),
            Command::Set(param, value) => {
                if let Err(e) = self.set_param(param, &value) {
                    warning(&e.to_string());
                }
            }
            Command::New => self.new_chat().await,
            Command::Clear => {
                self.session = None;
                self.pending_attachments.clear();
                println!("Chat cleared.");
            }
            Command::Attach(path) => self.attach(&path),
            Command::Quit => unreachable!("handled by the run loop"),
        }
    }

    fn print_models(&self) {
        for model in &self.models {
            let penalties = if model.supports_penalties() {
                ", penalties"
            } else {
                ""
            };
            let marker = if model.name == self.model_name { "*" } else { " " };
            println!(
                "{} {} ({}, max {} output tokens{})",
                marker, model.display_name, model.name, model.output_token_limit, penalties
            );
        }
    }

    fn select_model(&mut self, name: &str) {
        let found = self
            .models
            .iter()
            .find(|m| m.name == name || m.display_name == name);
        match found {
            Some(model) => self.model_name = model.name.clone(),
            None => warning(&format!("No model named '{}', see /models", name)),
        }
    }

    /// Validate and stage a parameter for the next chat. The ranges match
    /// what the session builder enforces; penalties are only available on
    /// models that support them.
    fn set_param(&mut self, param: Param, value: &str) -> Result<()> {
        match param {
            Param::MaxOutputTokens => {
                let v: u32 = value.parse().context("expected an integer")?;
                let limit = self.selected_model().output_token_limit;
                if v < *bounds::MAX_OUTPUT_TOKENS.start() || v > limit {
                    anyhow::bail!("max_output_tokens must be between 64 and {}", limit);
                }
                self.params.max_output_tokens = v;
            }
            Param::Temperature => {
                let v: f32 = value.parse().context("expected a number")?;
                let max = self.selected_model().max_temperature.unwrap_or(2.0);
                if v < 0.0 || v > max {
                    anyhow::bail!("temperature must be between 0.0 and {}", max);
                }
                self.params.temperature = v;
            }
            Param::TopP => {
                let v: f32 = value.parse().context("expected a number")?;
                if !bounds::TOP_P.contains(&v) {
                    anyhow::bail!("top_p must be between 0.0 and 1.0");
                }
                self.params.top_p = v;
            }
            Param::TopK => {
                let v: u32 = value.parse().context("expected an integer")?;
                let max = self.selected_model().top_k.unwrap_or(40).max(1);
                if v < 1 || v > max {
                    anyhow::bail!("top_k must be between 1 and {}", max);
                }
                self.params.top_k = v;
            }
            Param::PresencePenalty | Param::FrequencyPenalty => {
                if !self.selected_model().supports_penalties() {
                    anyhow::bail!(
                        "{} does not support penalty parameters",
                        self.selected_model().display_name
                    );
                }
                let v: f32 = value.parse().context("expected a number")?;
                if !bounds::PENALTY.contains(&v) {
                    anyhow::bail!("{} must be between -2.0 and 1.99", param.name());
                }
                if param == Param::PresencePenalty {
                    self.params.presence_penalty = v;
                } else {
                    self.params.frequency_penalty = v;
                }
            }
        }
        println!("{} = {}", param.name(), value);
        Ok(())
    }

    /// Start a new chat: bind the selected assistant and parameters into an
    /// immutable session and ask for the introduction.
    async fn new_chat(&mut self) {
        let instructions = self.registry.instructions(&self.assistant_name);
        let model = self.selected_model();
        let supports_penalties = model.supports_penalties();

        let mut builder = SessionConfig::builder(model.name.clone())
            .max_output_tokens(self.params.max_output_tokens.min(8192))
            .temperature(self.params.temperature.min(2.0))
            .top_p(self.params.top_p)
            .top_k(self.params.top_k.min(64))
            .presence_penalty(if supports_penalties {
                self.params.presence_penalty
            } else {
                0.0
            })
            .frequency_penalty(if supports_penalties {
                self.params.frequency_penalty
            } else {
                0.0
            });
        if let Some(instructions) = instructions {
            builder = builder.system_instruction(instructions);
        }

        let config = match builder.build() {
            Ok(config) => config,
            Err(e) => {
                warning(&e.to_string());
                return;
            }
        };

        let mut session = ChatSession::new(self.client.clone(), config);
        info!(session = %session.id(), assistant = %self.assistant_name, "new chat");

        println!("\n# {}\n", self.registry.page_title(&self.assistant_name));
        match session.request_introduction().await {
            Ok(parts) => {
                self.render_parts(&parts);
                self.session = Some(session);
                self.pending_attachments.clear();
            }
            Err(e) => report_llm_error(&e),
        }
    }

    /// Send a free-text prompt (plus any staged attachments) to the chat
    async fn send_prompt(&mut self, text: String) {
        if self.session.is_none() {
            warning("No active chat. Use /new to start one.");
            return;
        }

        let mut parts = vec![MessagePart::Text { text }];
        parts.append(&mut self.pending_attachments);

        let session = self.session.as_mut().expect("checked above");
        match session.send(parts).await {
            Ok(response) => self.render_parts(&response),
            Err(e) => report_llm_error(&e),
        }
    }

    /// Stage an image attachment for the next prompt.
    ///
    /// Unrecognized or unreadable files are reported per file; the prompt
    /// itself still goes through with whatever did attach.
    fn attach(&mut self, path: &str) {
        let path = Path::new(path);
        let mime_type = match image_mime_type(path) {
            Some(mime) => mime,
            None => {
                warning(&format!("Unrecognized image type: {}", path.display()));
                return;
            }
        };
        match std::fs::read(path) {
            Ok(bytes) => {
                let data = base64::engine::general_purpose::STANDARD.encode(bytes);
                self.pending_attachments.push(MessagePart::Image {
                    mime_type: mime_type.to_string(),
                    data,
                });
                println!("Attached {}", path.display());
            }
            Err(e) => warning(&format!("Could not read {}: {}", path.display(), e)),
        }
    }

    /// Print response parts in arrival order
    fn render_parts(&self, parts: &[MessagePart]) {
        for part in parts {
            match part {
                MessagePart::Text { text } => println!("{}", text),
                MessagePart::Code { language, code } => {
                    println!("```{}\n{}\n```", language.to_lowercase(), code);
                }
                MessagePart::CodeResult { outcome, output } => {
                    println!("[{}]\n{}", outcome, output);
                }
                MessagePart::Image { mime_type, data } => match save_inline_image(mime_type, data)
                {
                    Ok(path) => println!("[image saved to {}]", path.display()),
                    Err(e) => warning(&format!("Could not save inline image: {}", e)),
                },
            }
        }
    }
}

/// Interactive negotiation demo: a supervisor hands each question to the
/// methodical agent first, then the creative one, until they agree.
pub async fn run_negotiation(config: Config, model: String, max_rounds: u32) -> Result<()> {
    let client = GeminiClient::new(config.api_key()?)?;
    let negotiator = Negotiator::new(
        Box::new(ResearchAgent::methodical(client.clone(), model.clone())),
        Box::new(ResearchAgent::creative(client, model)),
    )
    .with_max_rounds(max_rounds);

    println!("Ask a question for the research agents to negotiate (quit to exit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("question> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "q" | "exit") {
            break;
        }

        match negotiator.run(question).await {
            Ok(outcome) => {
                if !outcome.converged {
                    warning(&format!(
                        "No agreement after {} rounds; reporting the last answer.",
                        outcome.rounds
                    ));
                }
                println!(
                    "[Supervisor]: {} (rounds: {}, agent calls: {})",
                    outcome.answer, outcome.rounds, outcome.agent_calls
                );
            }
            Err(e) => warning(&format!("{:#}", e)),
        }
    }
    Ok(())
}

/// Print a user-visible warning without ending the process
fn warning(message: &str) {
    eprintln!("⚠️  {}", message);
}

/// Surface a remote failure as a warning; the caller has already left its
/// state untouched.
fn report_llm_error(error: &LlmError) {
    warn!(%error, "remote call failed");
    warning(&error.to_string());
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    match path
        .extension()?
        .to_str()?
        .to_ascii_lowercase()
        .as_str()
    {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Decode an inline image and write it somewhere the user can open
fn save_inline_image(mime_type: &str, data: &str) -> Result<std::path::PathBuf> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("invalid base64 image data")?;
    let extension = match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    };
    let path = std::env::temp_dir().join(format!("gemchat-{}.{}", uuid::Uuid::new_v4(), extension));
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type_by_extension() {
        assert_eq!(image_mime_type(Path::new("cat.PNG")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("dog.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("notes.txt")), None);
        assert_eq!(image_mime_type(Path::new("no_extension")), None);
    }

    #[test]
    fn test_save_inline_image_round_trip() {
        let data = base64::engine::general_purpose::STANDARD.encode(b"not really a png");
        let path = save_inline_image("image/png", &data).unwrap();
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), b"not really a png");
        let _ = std::fs::remove_file(path);
    }
}
