//! Element validator
//!
//! Evaluates every rule of a field's descriptor against its current value
//! and renders the outcome through the presentation adapter. All rules run;
//! a field failing three rules reports three messages, in declaration order.

use tracing::debug;

use crate::config::FormsConfig;
use crate::field::{FieldDescriptor, FieldStates};
use crate::presentation::{PresentationAdapter, ValueExtractors};
use crate::rules::{RuleContext, RuleRegistry};

/// Result of validating one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// Failing rule messages in descriptor order. Empty when the field is
    /// locked by a server-reported error.
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn messages(&self) -> &[String] {
        match self {
            Self::Valid => &[],
            Self::Invalid(messages) => messages,
        }
    }
}

/// Borrowing validator over the engine's registries and field state.
pub struct ElementValidator<'a> {
    rules: &'a RuleRegistry,
    extractors: &'a ValueExtractors,
    states: &'a FieldStates,
    adapter: &'a dyn PresentationAdapter,
    config: &'a FormsConfig,
}

impl<'a> ElementValidator<'a> {
    pub fn new(
        rules: &'a RuleRegistry,
        extractors: &'a ValueExtractors,
        states: &'a FieldStates,
        adapter: &'a dyn PresentationAdapter,
        config: &'a FormsConfig,
    ) -> Self {
        Self {
            rules,
            extractors,
            states,
            adapter,
            config,
        }
    }

    /// Validate a field and mark it checked or erroneous on the page.
    ///
    /// Hidden plain fields, fields without rules and server-locked fields
    /// return early without touching the page.
    pub fn validate(&self, field: &FieldDescriptor) -> ValidationOutcome {
        if !self.adapter.is_visible(field.id) && !self.adapter.is_enhanced_widget(field.id) {
            return ValidationOutcome::Valid;
        }

        let Some(descriptor) = field.rules.as_ref().filter(|d| !d.is_empty()) else {
            return ValidationOutcome::Valid;
        };

        if self.states.has_server_error(&field.name) {
            debug!(field = %field.name, "Field locked by server error, skipping local validation");
            return ValidationOutcome::Invalid(Vec::new());
        }

        let value = self.extractors.value_of(field);
        let ctx = RuleContext {
            field,
            page: self.adapter,
            default_password_field: &self.config.default_password_field,
        };

        let mut messages = Vec::new();
        for invocation in descriptor {
            let Some(rule) = self.rules.lookup(&invocation.rule) else {
                debug!(field = %field.name, rule = %invocation.rule, "Unknown rule skipped");
                continue;
            };

            let param = invocation.param.as_deref();
            if !rule.check(&ctx, &value, param) {
                messages.push(rule.message(param));
            }
        }

        let slot = self.adapter.ensure_field_error_container(&field.name);
        if messages.is_empty() {
            self.adapter.show_field_valid(&slot);
            ValidationOutcome::Valid
        } else {
            debug!(field = %field.name, failures = messages.len(), "Field failed validation");
            let html = self.config.templates.render_messages(&messages);
            self.adapter.show_field_invalid(&slot, &html, false);
            ValidationOutcome::Invalid(messages)
        }
    }
}
