//! Built-in command handlers: `validation_errors`, `redirect`, `nothing`.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::{CommandBus, CommandContext};

pub const VALIDATION_ERRORS: &str = "validation_errors";
pub const REDIRECT: &str = "redirect";
pub const NOTHING: &str = "nothing";

/// Register the built-in handlers on a bus.
pub fn register_all(bus: &CommandBus) {
    bus.register_handler(VALIDATION_ERRORS, validation_errors);
    bus.register_handler(REDIRECT, redirect);
    bus.register_handler(NOTHING, |_, _| Ok(()));
}

/// One entry of a `validation_errors` payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEntry {
    Field { field: String, errors: Vec<String> },
    /// Form-level message with no field attached.
    General(String),
}

/// Render server-reported errors.
///
/// Field entries are rendered inline, flagged as server-originated and
/// locked against local re-validation; the first rendered field receives
/// focus. General entries replace the "fix and retry" banner preamble.
/// Without a payload only the preamble is shown.
pub fn validation_errors(
    ctx: &CommandContext<'_>,
    data: Option<&JsonValue>,
) -> anyhow::Result<()> {
    let entries: Vec<ErrorEntry> = match data {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value.clone())
            .context("validation_errors payload must be a list of {field, errors} or messages")?,
    };

    let templates = &ctx.config.templates;
    let general: Vec<&str> = entries
        .iter()
        .filter_map(|e| match e {
            ErrorEntry::General(message) => Some(message.as_str()),
            ErrorEntry::Field { .. } => None,
        })
        .collect();

    let mut banner_html = if general.is_empty() {
        ctx.config.messages.fix_and_retry.clone()
    } else {
        templates.render_messages(&general)
    };

    let mut focused = false;
    for entry in &entries {
        let ErrorEntry::Field { field, errors } = entry else {
            continue;
        };
        let Some(target) = ctx.adapter.find_field(field) else {
            debug!(field = %field, "Server reported errors for a field not on the page");
            continue;
        };
        if errors.is_empty() {
            continue;
        }

        let field_html = templates.render_messages(errors);
        banner_html.push_str(&field_html);

        ctx.states.mark_server_error(field);
        let slot = ctx.adapter.ensure_field_error_container(field);
        ctx.adapter.show_field_invalid(&slot, &field_html, true);

        if !focused {
            ctx.adapter.focus(target.id);
            focused = true;
        }
    }

    match ctx.banner {
        Some(banner) => ctx.adapter.show_banner(banner, &banner_html),
        None => debug!("No banner for this submission, errors rendered inline only"),
    }
    Ok(())
}

/// Navigate to the given link, or reload the current page without one.
pub fn redirect(ctx: &CommandContext<'_>, data: Option<&JsonValue>) -> anyhow::Result<()> {
    let target = match data {
        None | Some(JsonValue::Null) => ctx.adapter.current_url(),
        Some(JsonValue::String(link)) => link.clone(),
        Some(other) => bail!("redirect target must be a string, got {}", other),
    };
    info!(target = %target, "Redirecting");
    ctx.adapter.navigate(&target);
    Ok(())
}
