//! Forms configuration: YAML loading, message templates and failsafe timing.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields the stock behaviour: a 10 second failsafe, `password` as the
//! `passretry` reference field, and the built-in English messages.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Substitution slot used by every message and markup template.
pub const TEMPLATE_SLOT: &str = "{%}";

/// Default failsafe duration before a busy trigger control is re-enabled.
pub const DEFAULT_FAILSAFE_TIMEOUT_MS: u64 = 10_000;

// ---------------------------------------------------------------------------
// FormsConfig
// ---------------------------------------------------------------------------

/// Root configuration for a [`PrettyForms`](crate::service::PrettyForms) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Milliseconds until the failsafe timer re-enables a pending control.
    pub failsafe_timeout_ms: u64,
    /// Reference field compared by `passretry` when the rule has no parameter.
    pub default_password_field: String,
    pub messages: Messages,
    pub templates: Templates,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            failsafe_timeout_ms: DEFAULT_FAILSAFE_TIMEOUT_MS,
            default_password_field: "password".to_string(),
            messages: Messages::default(),
            templates: Templates::default(),
        }
    }
}

impl FormsConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Parsing forms configuration")
    }

    /// Load from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))
    }

    pub fn failsafe_timeout(&self) -> Duration {
        Duration::from_millis(self.failsafe_timeout_ms)
    }
}

/// User-facing messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Banner text shown when the request fails or the reply is unusable.
    pub server_error: String,
    /// Default confirmation prompt for triggers marked `really`.
    pub really: String,
    /// Banner preamble for validation failures.
    pub fix_and_retry: String,
    /// Per-rule template overrides, keyed by rule name.
    pub rules: HashMap<String, String>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            server_error: "Something went wrong on the server and your data could not be \
                           processed. Please try again later."
                .to_string(),
            really: "Do you really want to do this?".to_string(),
            fix_and_retry: "Please fix the errors in the form and submit it again.".to_string(),
            rules: HashMap::new(),
        }
    }
}

/// Markup templates handed to the presentation adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    /// Wrapper for a single error message, `{%}` is the message text.
    pub field_message: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            field_message: "<p>{%}</p>".to_string(),
        }
    }
}

impl Templates {
    /// Render a list of messages into one HTML fragment.
    pub fn render_messages<I, S>(&self, messages: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        messages
            .into_iter()
            .map(|m| fill_slot(&self.field_message, m.as_ref()))
            .collect()
    }
}

/// Replace the first `{%}` slot of a template.
pub fn fill_slot(template: &str, value: &str) -> String {
    template.replacen(TEMPLATE_SLOT, value, 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
