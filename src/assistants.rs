//! Assistant persona registry
//!
//! Assistants are named personas loaded from a JSON file mapping name to
//! icon, intro text, and an optional path to a system-instruction file.
//! Loading fails soft: any structural problem with the file discards the
//! whole set and substitutes a single default assistant, so the chat
//! surface always has at least one persona to offer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Keys every assistant entry must carry (values may be null)
const REQUIRED_KEYS: [&str; 3] = ["icon", "intro", "instructions"];

pub const DEFAULT_ASSISTANT_NAME: &str = "Default Gemini Assistant";

/// One persona definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantDefinition {
    pub icon: Option<String>,
    pub intro: Option<String>,
    /// Path to a plain-text system instruction file
    pub instructions: Option<PathBuf>,
}

impl AssistantDefinition {
    fn default_assistant() -> Self {
        Self {
            icon: Some("♊️".to_string()),
            intro: Some(
                "I'm your default Gemini Assistant, how can I help you?".to_string(),
            ),
            instructions: None,
        }
    }
}

/// In-memory mapping of assistant name to definition
#[derive(Debug, Clone)]
pub struct AssistantRegistry {
    assistants: BTreeMap<String, AssistantDefinition>,
}

impl AssistantRegistry {
    /// Load definitions from a JSON file.
    ///
    /// A missing file, unparseable JSON, a non-object document, or any
    /// entry missing one of the required keys all collapse to the single
    /// default assistant.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Some(assistants) if !assistants.is_empty() => Self { assistants },
            _ => {
                warn!(path = %path.display(), "invalid assistant definitions, using default");
                Self::fallback()
            }
        }
    }

    fn try_load(path: &Path) -> Option<BTreeMap<String, AssistantDefinition>> {
        let raw = std::fs::read_to_string(path).ok()?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        let entries = value.as_object()?;

        for entry in entries.values() {
            let fields = entry.as_object()?;
            if REQUIRED_KEYS.iter().any(|key| !fields.contains_key(*key)) {
                return None;
            }
        }

        serde_json::from_value(value).ok()
    }

    /// The single synthetic default entry
    pub fn fallback() -> Self {
        let mut assistants = BTreeMap::new();
        assistants.insert(
            DEFAULT_ASSISTANT_NAME.to_string(),
            AssistantDefinition::default_assistant(),
        );
        Self { assistants }
    }

    /// All assistant names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.assistants.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assistants.contains_key(name)
    }

    /// Title for the chat surface: `icon + " " + name` when an icon exists,
    /// otherwise just the name.
    pub fn page_title(&self, name: &str) -> String {
        match self
            .assistants
            .get(name)
            .and_then(|def| def.icon.as_deref())
            .filter(|icon| !icon.is_empty())
        {
            Some(icon) => format!("{} {}", icon, name),
            None => name.to_string(),
        }
    }

    /// Introduction text shown when a new chat starts
    pub fn intro(&self, name: &str) -> Option<&str> {
        self.assistants.get(name)?.intro.as_deref()
    }

    /// Read the system instructions for an assistant.
    ///
    /// Returns `None` when no path is configured or the file does not
    /// exist; a missing instruction file is not an error.
    pub fn instructions(&self, name: &str) -> Option<String> {
        let path = self.assistants.get(name)?.instructions.as_deref()?;
        if path.exists() {
            std::fs::read_to_string(path).ok()
        } else {
            None
        }
    }

    /// Markdown list of every assistant with its intro, for the startup
    /// screen.
    pub fn catalog(&self) -> String {
        let mut doc = String::from(
            "* **Assistant name**: An AI agent/assistant/persona that has been given \
             instructions to perform a specific task.\n",
        );
        let intros: Vec<String> = self
            .names()
            .iter()
            .map(|name| {
                format!("    * *{}*: {}", name, self.intro(name).unwrap_or_default())
            })
            .collect();
        doc.push_str(&intros.join("\n"));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_definitions() {
        let file = write_json(
            r#"{
                "Code Reviewer": {"icon": "🔍", "intro": "I review code.", "instructions": null},
                "Story Writer": {"icon": null, "intro": "I write stories.", "instructions": "instructions/story_writer.txt"}
            }"#,
        );
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(registry.names(), vec!["Code Reviewer", "Story Writer"]);
        assert_eq!(registry.intro("Code Reviewer"), Some("I review code."));
    }

    #[test]
    fn test_missing_icon_key_falls_back_to_default() {
        let file = write_json(
            r#"{
                "Good": {"icon": "✅", "intro": "ok", "instructions": null},
                "Bad": {"intro": "missing icon key", "instructions": null}
            }"#,
        );
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(registry.names(), vec![DEFAULT_ASSISTANT_NAME]);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let registry = AssistantRegistry::load(Path::new("/nonexistent/assistants.json"));
        assert_eq!(registry.names(), vec![DEFAULT_ASSISTANT_NAME]);
        assert!(registry.intro(DEFAULT_ASSISTANT_NAME).is_some());
    }

    #[test]
    fn test_malformed_json_falls_back_to_default() {
        let file = write_json("{not json");
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(registry.names(), vec![DEFAULT_ASSISTANT_NAME]);
    }

    #[test]
    fn test_non_object_entry_falls_back_to_default() {
        let file = write_json(r#"{"Oops": "just a string"}"#);
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(registry.names(), vec![DEFAULT_ASSISTANT_NAME]);
    }

    #[test]
    fn test_page_title_with_and_without_icon() {
        let file = write_json(
            r#"{
                "Iconed": {"icon": "🔍", "intro": "x", "instructions": null},
                "Plain": {"icon": null, "intro": "y", "instructions": null}
            }"#,
        );
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(registry.page_title("Iconed"), "🔍 Iconed");
        assert_eq!(registry.page_title("Plain"), "Plain");
        assert_eq!(registry.page_title("Unknown"), "Unknown");
    }

    #[test]
    fn test_instructions_read_only_when_file_exists() {
        let mut instructions = NamedTempFile::new().unwrap();
        instructions
            .write_all(b"You are a careful reviewer.")
            .unwrap();

        let file = write_json(&format!(
            r#"{{
                "Reviewer": {{"icon": null, "intro": "x", "instructions": {:?}}},
                "Ghost": {{"icon": null, "intro": "y", "instructions": "/no/such/file.txt"}}
            }}"#,
            instructions.path()
        ));
        let registry = AssistantRegistry::load(file.path());
        assert_eq!(
            registry.instructions("Reviewer").as_deref(),
            Some("You are a careful reviewer.")
        );
        assert_eq!(registry.instructions("Ghost"), None);
    }

    #[test]
    fn test_catalog_lists_every_assistant() {
        let registry = AssistantRegistry::fallback();
        let catalog = registry.catalog();
        assert!(catalog.contains(DEFAULT_ASSISTANT_NAME));
        assert!(catalog.contains("how can I help you?"));
    }
}
