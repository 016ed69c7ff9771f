//! Submission controller
//!
//! Two entry paths share one pipeline. A native form submit is only
//! validated; the host proceeds with it when the decision is
//! [`SubmitDecision::Allow`]. A trigger activation collects, validates and
//! sends the container's fields, then dispatches the server's commands.
//!
//! Every field in a container is validated even after one fails. The
//! trigger control is disabled for the duration of the request and a
//! failsafe task re-enables it after `failsafe_timeout_ms` whether or not
//! the request has finished. The request itself is never cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::commands::{Command, DispatchReport, VALIDATION_ERRORS};
use crate::error::TransportError;
use crate::field::{FieldDescriptor, FieldId, FieldKind, FormPayload};
use crate::presentation::BannerHandle;
use crate::service::FormsCore;
use crate::transport::Transport;
use crate::trigger::TriggerSpec;

/// Per-control submission state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlState {
    #[default]
    Idle,
    /// A request started by this control has not been released yet.
    Pending,
}

/// Submission state records keyed by control id.
#[derive(Debug, Default)]
pub struct ControlStates {
    inner: Mutex<HashMap<String, ControlState>>,
}

impl ControlStates {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, control: &str) -> ControlState {
        self.lock().get(control).copied().unwrap_or_default()
    }

    pub fn is_pending(&self, control: &str) -> bool {
        self.state(control) == ControlState::Pending
    }

    /// Move to `Pending`. Returns `false` if the control already was.
    pub fn try_begin(&self, control: &str) -> bool {
        let mut states = self.lock();
        let state = states.entry(control.to_string()).or_default();
        if *state == ControlState::Pending {
            return false;
        }
        *state = ControlState::Pending;
        true
    }

    /// Move back to `Idle`. Returns `true` if the control was pending.
    pub fn release(&self, control: &str) -> bool {
        self.lock()
            .insert(control.to_string(), ControlState::Idle)
            .is_some_and(|previous| previous == ControlState::Pending)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ControlState>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One send, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub target_url: String,
    pub payload: FormPayload,
    /// Control that started the request.
    pub trigger: String,
    /// Container the payload was collected from.
    pub container: Option<String>,
    /// Empty the container's fields after a successful reply.
    pub clear_on_success: bool,
}

/// Verdict on a native form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitDecision {
    Allow(FormPayload),
    Block,
}

/// Which path a trigger activation took.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Control disabled or a request from it still pending.
    Ignored,
    /// The user declined the confirmation prompt.
    Declined,
    /// Local validation failed; nothing was sent.
    Blocked,
    /// Server replied; its commands were dispatched.
    Sent(DispatchReport),
    /// The request failed; a generic server-error banner was dispatched.
    TransportFailed {
        error: TransportError,
        report: DispatchReport,
    },
}

impl TriggerOutcome {
    /// Whether a request reached the transport.
    pub fn was_sent(&self) -> bool {
        matches!(self, Self::Sent(_) | Self::TransportFailed { .. })
    }
}

/// Collects, validates and sends container fields.
pub struct SubmissionController {
    core: Arc<FormsCore>,
    transport: Arc<dyn Transport>,
    controls: Arc<ControlStates>,
}

impl SubmissionController {
    pub fn new(core: Arc<FormsCore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            core,
            transport,
            controls: Arc::new(ControlStates::new()),
        }
    }

    pub fn controls(&self) -> &ControlStates {
        &self.controls
    }

    /// Validate every eligible field of a container and gather its values.
    ///
    /// Returns `None` if any field is invalid. Inline errors have then been
    /// rendered for every field and the first invalid one has focus.
    pub fn collect(&self, container: &str) -> Option<FormPayload> {
        let adapter = self.core.adapter.as_ref();
        let validator = self.core.validator();

        let mut payload = FormPayload::new();
        let mut first_invalid: Option<FieldId> = None;

        for field in adapter.fields_in(container) {
            if !field.is_eligible() {
                continue;
            }

            if !validator.validate(&field).is_valid() && first_invalid.is_none() {
                first_invalid = Some(field.id);
            }

            if field.is_array() {
                payload.ensure_list(&field.name);
            }
            if field.kind == FieldKind::Checkbox && !field.checked {
                continue;
            }
            payload.insert(&field.name, self.core.extractors.value_of(&field));
        }

        if let Some(id) = first_invalid {
            debug!(container = %container, "Collection blocked by invalid fields");
            adapter.focus(id);
            return None;
        }

        debug!(container = %container, fields = payload.len(), "Collected form data");
        Some(payload)
    }

    /// Native form submission: validate only.
    pub fn handle_form_submit(&self, container: &str) -> SubmitDecision {
        match self.collect(container) {
            Some(payload) => SubmitDecision::Allow(payload),
            None => {
                let banner = self.core.adapter.ensure_form_banner(container);
                self.core
                    .dispatch(&[Command::new(VALIDATION_ERRORS, None)], Some(&banner));
                SubmitDecision::Block
            }
        }
    }

    /// Trigger activation: confirm, collect, send, dispatch.
    pub async fn activate(&self, trigger: &TriggerSpec) -> TriggerOutcome {
        let adapter = self.core.adapter.as_ref();

        if self.controls.is_pending(&trigger.id) || !adapter.is_control_enabled(&trigger.id) {
            debug!(control = %trigger.id, "Trigger busy or disabled, ignoring activation");
            return TriggerOutcome::Ignored;
        }

        if trigger.requires_confirmation {
            let prompt = trigger.confirmation_prompt(&self.core.config.messages);
            if !adapter.confirm(prompt) {
                debug!(control = %trigger.id, "Confirmation declined");
                return TriggerOutcome::Declined;
            }
        }

        let target_url = trigger.resolve_url(&adapter.current_url());

        // Without a container the banner is placed beside the trigger itself.
        let Some(container) = trigger.input_container.as_deref() else {
            let banner = adapter.ensure_form_banner(&trigger.id);
            adapter.clear_and_hide_banner(&banner);
            let request = SubmissionRequest {
                target_url,
                payload: FormPayload::new(),
                trigger: trigger.id.clone(),
                container: None,
                clear_on_success: false,
            };
            return self.send(request, Some(banner)).await;
        };

        let banner = adapter.ensure_form_banner(container);
        adapter.clear_and_hide_banner(&banner);
        let fields = adapter.fields_in(container);
        self.core
            .field_states
            .clear_server_errors(fields.iter().map(|f| f.name.as_str()));

        let Some(payload) = self.collect(container) else {
            self.core
                .dispatch(&[Command::new(VALIDATION_ERRORS, None)], Some(&banner));
            return TriggerOutcome::Blocked;
        };

        let request = SubmissionRequest {
            target_url,
            payload,
            trigger: trigger.id.clone(),
            container: Some(container.to_string()),
            clear_on_success: trigger.clear_inputs,
        };
        self.send(request, Some(banner)).await
    }

    /// Send a request and dispatch the reply.
    pub async fn send(&self, request: SubmissionRequest, banner: Option<BannerHandle>) -> TriggerOutcome {
        let control = request.trigger.as_str();
        if !self.controls.try_begin(control) {
            debug!(control = %control, "Request already pending for control");
            return TriggerOutcome::Ignored;
        }

        self.core.adapter.set_control_enabled(control, false);
        self.arm_failsafe(control);

        info!(control = %control, url = %request.target_url, "Sending form data");
        let result = self
            .transport
            .submit(&request.target_url, &request.payload)
            .await;

        self.controls.release(control);
        self.core.adapter.set_control_enabled(control, true);

        match result {
            Ok(commands) => {
                info!(control = %control, commands = commands.len(), "Server replied");
                let report = self.core.dispatch(&commands, banner.as_ref());

                let accepted = commands
                    .first()
                    .is_some_and(|first| first.kind != VALIDATION_ERRORS);
                if request.clear_on_success && accepted {
                    if let Some(container) = request.container.as_deref() {
                        self.clear_container(container);
                    }
                }
                TriggerOutcome::Sent(report)
            }
            Err(error) => {
                warn!(control = %control, error = %error, "Form submission failed");
                let server_error = &self.core.config.messages.server_error;
                let report = self.core.dispatch(
                    &[Command::new(VALIDATION_ERRORS, Some(json!([server_error])))],
                    banner.as_ref(),
                );
                TriggerOutcome::TransportFailed { error, report }
            }
        }
    }

    /// Re-enable the control after the failsafe timeout, request or not.
    fn arm_failsafe(&self, control: &str) {
        let controls = Arc::clone(&self.controls);
        let adapter = Arc::clone(&self.core.adapter);
        let timeout = self.core.config.failsafe_timeout();
        let control = control.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if controls.release(&control) {
                info!(control = %control, "Failsafe re-enabled control with request still pending");
            }
            adapter.set_control_enabled(&control, true);
        });
    }

    /// Reset every non-hidden field of a container. Text-like fields are
    /// emptied; checkboxes and radios are unchecked. Hidden fields keep
    /// their value.
    fn clear_container(&self, container: &str) {
        let adapter = self.core.adapter.as_ref();
        let cleared: Vec<FieldDescriptor> = adapter
            .fields_in(container)
            .into_iter()
            .filter(|f| f.kind.is_collectible() && f.kind != FieldKind::Hidden)
            .collect();

        for field in &cleared {
            match field.kind {
                FieldKind::Checkbox | FieldKind::Radio => adapter.set_field_checked(field.id, false),
                _ => adapter.set_field_value(field.id, ""),
            }
        }
        debug!(container = %container, fields = cleared.len(), "Cleared inputs after success");
    }
}
