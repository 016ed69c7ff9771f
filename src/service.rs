//! Forms service
//!
//! [`PrettyForms`] is constructed once per page and handed to whatever
//! wires page events to it. It owns the rule registry, command bus, value
//! extractors, field state and the submission controller.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::commands::{Command, CommandBus, CommandContext, Dispatch, DispatchReport};
use crate::config::FormsConfig;
use crate::error::FormsError;
use crate::field::{FieldDescriptor, FieldId, FieldKind, FieldStates};
use crate::presentation::{BannerHandle, PresentationAdapter, ValueExtractor, ValueExtractors};
use crate::rules::{RuleContext, RuleRegistry};
use crate::submission::{ControlStates, SubmissionController, SubmitDecision, TriggerOutcome};
use crate::transport::{HttpTransport, Transport};
use crate::trigger::TriggerSpec;
use crate::validator::{ElementValidator, ValidationOutcome};

/// State shared by the validator, the command handlers and the controller.
pub struct FormsCore {
    pub adapter: Arc<dyn PresentationAdapter>,
    pub config: FormsConfig,
    pub rules: RuleRegistry,
    pub commands: CommandBus,
    pub extractors: ValueExtractors,
    pub field_states: FieldStates,
}

impl FormsCore {
    pub fn validator(&self) -> ElementValidator<'_> {
        ElementValidator::new(
            &self.rules,
            &self.extractors,
            &self.field_states,
            self.adapter.as_ref(),
            &self.config,
        )
    }

    fn context<'a>(&'a self, banner: Option<&'a BannerHandle>) -> CommandContext<'a> {
        CommandContext {
            adapter: self.adapter.as_ref(),
            states: &self.field_states,
            config: &self.config,
            banner,
        }
    }

    /// Run a command batch in order against this page.
    pub fn dispatch(&self, commands: &[Command], banner: Option<&BannerHandle>) -> DispatchReport {
        self.commands.execute_all(&self.context(banner), commands)
    }

    pub fn execute(
        &self,
        name: &str,
        data: Option<&JsonValue>,
        banner: Option<&BannerHandle>,
    ) -> Dispatch {
        self.commands.execute(&self.context(banner), name, data)
    }
}

/// Builder for [`PrettyForms`].
pub struct PrettyFormsBuilder {
    adapter: Arc<dyn PresentationAdapter>,
    config: FormsConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl PrettyFormsBuilder {
    pub fn config(mut self, config: FormsConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML file.
    pub fn config_file(mut self, path: &Path) -> Result<Self, FormsError> {
        self.config = FormsConfig::load_from_file(path)?;
        Ok(self)
    }

    /// Replace the default HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> PrettyForms {
        let rules = RuleRegistry::with_builtins();
        for (name, template) in &self.config.messages.rules {
            if !rules.set_message(name, template) {
                warn!(rule = %name, "Message override for unknown rule ignored");
            }
        }

        let core = Arc::new(FormsCore {
            adapter: self.adapter,
            config: self.config,
            rules,
            commands: CommandBus::with_builtins(),
            extractors: ValueExtractors::new(),
            field_states: FieldStates::new(),
        });

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new()) as Arc<dyn Transport>);

        PrettyForms {
            submission: SubmissionController::new(Arc::clone(&core), transport),
            core,
        }
    }
}

/// The forms engine for one page.
pub struct PrettyForms {
    core: Arc<FormsCore>,
    submission: SubmissionController,
}

impl PrettyForms {
    pub fn builder(adapter: Arc<dyn PresentationAdapter>) -> PrettyFormsBuilder {
        PrettyFormsBuilder {
            adapter,
            config: FormsConfig::default(),
            transport: None,
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Add or replace a validation rule.
    pub fn register_rule<F>(&self, name: &str, message_template: &str, predicate: F)
    where
        F: Fn(&RuleContext<'_>, &str, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.core.rules.register(name, message_template, predicate);
    }

    /// Add or replace a command handler.
    pub fn register_handler<F>(&self, name: &str, handler: F)
    where
        F: Fn(&CommandContext<'_>, Option<&JsonValue>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.core.commands.register_handler(name, handler);
    }

    /// Read values of `kind` fields through a replacement widget.
    pub fn register_extractor(&self, kind: FieldKind, extractor: Arc<dyn ValueExtractor>) {
        self.core.extractors.register(kind, extractor);
    }

    // ── Page events ───────────────────────────────────────────

    pub fn validate(&self, field: &FieldDescriptor) -> ValidationOutcome {
        self.core.validator().validate(field)
    }

    /// Keystroke or change on a field. `None` if the field is not on the page.
    pub fn on_field_input(&self, id: FieldId) -> Option<ValidationOutcome> {
        let Some(field) = self.core.adapter.field(id) else {
            debug!(field = ?id, "Input event for unknown field");
            return None;
        };
        Some(self.validate(&field))
    }

    /// Native form submission.
    pub fn on_form_submit(&self, container: &str) -> SubmitDecision {
        self.submission.handle_form_submit(container)
    }

    /// Trigger control activation.
    pub async fn on_trigger(&self, trigger: &TriggerSpec) -> TriggerOutcome {
        self.submission.activate(trigger).await
    }

    /// Run one command outside any submission, without a banner.
    pub fn execute(&self, name: &str, data: Option<&JsonValue>) -> Dispatch {
        self.core.execute(name, data, None)
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &FormsConfig {
        &self.core.config
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.core.rules
    }

    pub fn commands(&self) -> &CommandBus {
        &self.core.commands
    }

    pub fn field_states(&self) -> &FieldStates {
        &self.core.field_states
    }

    pub fn controls(&self) -> &ControlStates {
        self.submission.controls()
    }

    pub fn submission(&self) -> &SubmissionController {
        &self.submission
    }
}
