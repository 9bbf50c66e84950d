//! Slash command system for the chat surface

use anyhow::{bail, Result};

/// Sampling parameters adjustable before a chat starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    MaxOutputTokens,
    Temperature,
    TopP,
    TopK,
    PresencePenalty,
    FrequencyPenalty,
}

impl Param {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "max_output_tokens" => Self::MaxOutputTokens,
            "temperature" => Self::Temperature,
            "top_p" => Self::TopP,
            "top_k" => Self::TopK,
            "presence_penalty" => Self::PresencePenalty,
            "frequency_penalty" => Self::FrequencyPenalty,
            unknown => bail!("Unknown parameter: {}", unknown),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaxOutputTokens => "max_output_tokens",
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::TopK => "top_k",
            Self::PresencePenalty => "presence_penalty",
            Self::FrequencyPenalty => "frequency_penalty",
        }
    }
}

/// Available slash commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    /// List the available assistants
    Assistants,
    /// List the available model variants
    Models,
    /// Select the assistant for the next chat
    Assistant(String),
    /// Select the model variant for the next chat
    Model(String),
    /// Adjust a sampling parameter for the next chat
    Set(Param, String),
    /// Start a new chat with the selected options
    New,
    /// Clear the current chat
    Clear,
    /// Attach an image to the next prompt
    Attach(String),
}

/// Parse input text and return a command if it starts with /
pub fn parse_command(input: &str) -> Result<Command> {
    let input = input.trim();

    if !input.starts_with('/') {
        bail!("Not a command");
    }

    let mut words = input[1..].splitn(2, char::is_whitespace);
    let cmd_name = words.next().filter(|w| !w.is_empty()).ok_or_else(|| {
        anyhow::anyhow!("Empty command")
    })?;
    let rest = words.next().map(str::trim).unwrap_or("");

    match cmd_name {
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "assistants" => Ok(Command::Assistants),
        "models" => Ok(Command::Models),
        "assistant" => {
            if rest.is_empty() {
                bail!("Usage: /assistant <name>");
            }
            Ok(Command::Assistant(rest.to_string()))
        }
        "model" => {
            if rest.is_empty() {
                bail!("Usage: /model <name>");
            }
            Ok(Command::Model(rest.to_string()))
        }
        "set" => {
            let mut args = rest.splitn(2, char::is_whitespace);
            let param = args.next().filter(|p| !p.is_empty());
            let value = args.next().map(str::trim).filter(|v| !v.is_empty());
            match (param, value) {
                (Some(param), Some(value)) => {
                    Ok(Command::Set(Param::parse(param)?, value.to_string()))
                }
                _ => bail!("Usage: /set <parameter> <value>"),
            }
        }
        "new" => Ok(Command::New),
        "clear" => Ok(Command::Clear),
        "attach" => {
            if rest.is_empty() {
                bail!("Usage: /attach <image path>");
            }
            Ok(Command::Attach(rest.to_string()))
        }
        unknown => bail!("Unknown command: /{}", unknown),
    }
}

/// Help text listing every command
pub const HELP_TEXT: &str = "\
Commands:
  /assistants              list available assistants
  /models                  list available model variants
  /assistant <name>        choose the assistant for the next chat
  /model <name>            choose the model for the next chat
  /set <param> <value>     adjust a sampling parameter for the next chat
                           (max_output_tokens, temperature, top_p, top_k,
                            presence_penalty, frequency_penalty)
  /new                     start a new chat with the selected options
  /clear                   clear the current chat
  /attach <path>           attach an image to your next message
  /help                    show this help
  /quit                    exit";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("/new").unwrap(), Command::New);
        assert_eq!(parse_command("  /clear  ").unwrap(), Command::Clear);
        assert_eq!(parse_command("/quit").unwrap(), Command::Quit);
        assert_eq!(parse_command("/exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_command("/assistant Story Writer").unwrap(),
            Command::Assistant("Story Writer".into())
        );
        assert_eq!(
            parse_command("/set temperature 1.5").unwrap(),
            Command::Set(Param::Temperature, "1.5".into())
        );
        assert_eq!(
            parse_command("/attach ./cat.png").unwrap(),
            Command::Attach("./cat.png".into())
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_command("hello").is_err());
        assert!(parse_command("/bogus").is_err());
        assert!(parse_command("/set temperature").is_err());
        assert!(parse_command("/set warp_factor 9").is_err());
        assert!(parse_command("/assistant").is_err());
    }
}
