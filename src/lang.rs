use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Built-in English strings used by the pipeline and the bundled commands
const DEFAULT_EN: &[(&str, &str)] = &[
    ("empty_invocation", "Type a command after \"{prefix}\"."),
    ("not_found", "Command not found."),
    ("not_found_suggest", "Command not found. Did you mean \"{suggestion}\"?"),
    ("no_permission", "You don't have permission to use this command."),
    ("command_failed", "Command execution failed."),
    ("use_prefix", "Commands start with \"{prefix}\", e.g. {prefix}help"),
    ("info", "Bot Info\nMessages: {messages}\nUptime: {uptime}"),
    ("uid", "UID: {uid}"),
    ("help_header", "Available commands:"),
    ("welcome", "Welcome, {name}!"),
];

/// Localized string table with `{var}` substitution.
#[derive(Debug, Clone)]
pub struct Lang {
    code: String,
    strings: HashMap<String, String>,
}

impl Lang {
    /// The built-in English table.
    pub fn builtin() -> Self {
        Self {
            code: "en".to_string(),
            strings: DEFAULT_EN
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Built-in table overlaid with the entries of a JSON object file.
    pub fn load(code: &str, path: Option<&Path>) -> Result<Self> {
        let mut lang = Self::builtin();
        lang.code = code.to_string();

        if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read language file: {}", path.display()))?;
            let overrides: HashMap<String, String> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid language file: {}", path.display()))?;
            info!(
                "Loaded {} strings for language '{}' from {}",
                overrides.len(),
                code,
                path.display()
            );
            lang.strings.extend(overrides);
        }

        Ok(lang)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Look up `key` and substitute every `{name}` from `vars`.
    /// Unknown keys render as the key itself.
    pub fn t(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let mut text = self
            .strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());
        for (name, value) in vars {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}
