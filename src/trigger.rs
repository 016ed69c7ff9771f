//! Trigger controls
//!
//! A trigger is a button or link carrying the `senddata` class. Its markup
//! names the target URL, the container to collect from, whether to ask for
//! confirmation and whether to clear the container after a successful reply.

use std::collections::HashMap;

use url::Url;

use crate::config::Messages;

pub const TRIGGER_CLASS: &str = "senddata";
pub const CONFIRM_CLASS: &str = "really";
pub const CONFIRM_TEXT_ATTR: &str = "data-really-text";
pub const LINK_ATTR: &str = "data-link";
pub const INPUT_ATTR: &str = "data-input";
pub const CLEAR_INPUTS_ATTR: &str = "data-clearinputs";

/// Declarative description of one trigger control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Control identity used for enable/disable and pending tracking.
    pub id: String,
    pub href: Option<String>,
    /// Fallback target when `href` is absent or `#`.
    pub link: Option<String>,
    /// Selector of the container whose fields are collected.
    pub input_container: Option<String>,
    pub requires_confirmation: bool,
    /// Custom prompt overriding the configured default.
    pub confirmation_text: Option<String>,
    pub clear_inputs: bool,
}

impl TriggerSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Read a trigger from element attributes and classes.
    ///
    /// Returns `None` when the element is not marked as a trigger.
    pub fn from_markup(id: &str, attrs: &HashMap<String, String>, classes: &[&str]) -> Option<Self> {
        if !classes.contains(&TRIGGER_CLASS) {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            href: attrs.get("href").cloned(),
            link: attrs.get(LINK_ATTR).cloned(),
            input_container: attrs.get(INPUT_ATTR).filter(|s| !s.is_empty()).cloned(),
            requires_confirmation: classes.contains(&CONFIRM_CLASS),
            confirmation_text: attrs.get(CONFIRM_TEXT_ATTR).filter(|s| !s.is_empty()).cloned(),
            clear_inputs: attrs.get(CLEAR_INPUTS_ATTR).is_some_and(|v| v == "true"),
        })
    }

    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn input_container(mut self, container: impl Into<String>) -> Self {
        self.input_container = Some(container.into());
        self
    }

    pub fn confirm(mut self, text: Option<&str>) -> Self {
        self.requires_confirmation = true;
        self.confirmation_text = text.map(str::to_string);
        self
    }

    pub fn clear_inputs(mut self, clear: bool) -> Self {
        self.clear_inputs = clear;
        self
    }

    /// Target URL: `href` unless absent or `#`, then `data-link`, then the
    /// current page. Relative targets are resolved against the current page.
    pub fn resolve_url(&self, current: &str) -> String {
        let raw = match (self.href.as_deref(), self.link.as_deref()) {
            (Some(href), _) if href != "#" => href,
            (_, Some(link)) => link,
            _ => current,
        };

        match Url::parse(current).and_then(|base| base.join(raw)) {
            Ok(url) => url.to_string(),
            Err(_) => raw.to_string(),
        }
    }

    /// Prompt shown before a confirmed trigger proceeds.
    pub fn confirmation_prompt<'a>(&'a self, messages: &'a Messages) -> &'a str {
        self.confirmation_text.as_deref().unwrap_or(&messages.really)
    }
}
