//! In-memory page: a headless [`PresentationAdapter`].
//!
//! Holds containers, fields and trigger controls, and records every visual
//! effect the engine asks for so hosts without a DOM (and the test suite)
//! can inspect them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::field::{FieldDescriptor, FieldId};
use crate::presentation::{BannerHandle, ErrorSlot, PresentationAdapter};

/// Id prefix of the inline error container created beside a field.
pub const ERROR_CONTAINER_PREFIX: &str = "validation-error-";

/// Rendered state of a field's inline error container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMark {
    pub visible: bool,
    pub html: String,
    pub server_originated: bool,
    /// Last call was `show_field_valid`.
    pub checked: bool,
}

/// Rendered state of a container's banner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerState {
    pub visible: bool,
    pub html: String,
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    fields: Vec<(String, FieldDescriptor)>,
    controls: HashMap<String, bool>,
    marks: HashMap<String, FieldMark>,
    banners: HashMap<String, BannerState>,
    focused: Option<FieldId>,
    navigations: Vec<String>,
    prompts: Vec<String>,
    confirm_answer: bool,
}

/// Headless page model.
#[derive(Debug)]
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PageState {
                url: url.into(),
                confirm_answer: true,
                ..PageState::default()
            }),
        }
    }

    /// Add a field to a container. The field's id is assigned here.
    pub fn add_field(&self, container: &str, mut field: FieldDescriptor) -> FieldId {
        let mut state = self.lock();
        let id = FieldId(state.fields.len());
        field.id = id;
        state.fields.push((container.to_string(), field));
        id
    }

    /// Add an enabled trigger control.
    pub fn add_control(&self, control: &str) {
        self.lock().controls.insert(control.to_string(), true);
    }

    /// Answer all future confirmation prompts with `answer`.
    pub fn answer_confirmations(&self, answer: bool) {
        self.lock().confirm_answer = answer;
    }

    /// Simulate user input into a field.
    pub fn type_value(&self, id: FieldId, value: &str) {
        self.set_field_value(id, value);
    }

    pub fn set_checked(&self, id: FieldId, checked: bool) {
        if let Some((_, field)) = self.lock().fields.get_mut(id.0) {
            field.checked = checked;
        }
    }

    pub fn set_visible(&self, id: FieldId, visible: bool) {
        if let Some((_, field)) = self.lock().fields.get_mut(id.0) {
            field.visible = visible;
        }
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn value(&self, id: FieldId) -> Option<String> {
        self.lock().fields.get(id.0).map(|(_, f)| f.value.clone())
    }

    pub fn mark(&self, field_name: &str) -> Option<FieldMark> {
        self.lock()
            .marks
            .get(&error_container_id(field_name))
            .cloned()
    }

    pub fn banner(&self, container: &str) -> Option<BannerState> {
        self.lock().banners.get(container).cloned()
    }

    pub fn focused(&self) -> Option<FieldId> {
        self.lock().focused
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn error_container_id(field_name: &str) -> String {
    format!("{}{}", ERROR_CONTAINER_PREFIX, field_name)
}

impl PresentationAdapter for MemoryPage {
    fn ensure_field_error_container(&self, field_name: &str) -> ErrorSlot {
        let id = error_container_id(field_name);
        self.lock().marks.entry(id.clone()).or_default();
        ErrorSlot(id)
    }

    fn show_field_invalid(&self, slot: &ErrorSlot, messages_html: &str, server_originated: bool) {
        let mut state = self.lock();
        let mark = state.marks.entry(slot.0.clone()).or_default();
        mark.visible = true;
        mark.html = messages_html.to_string();
        mark.server_originated = server_originated;
        mark.checked = false;
    }

    fn show_field_valid(&self, slot: &ErrorSlot) {
        let mut state = self.lock();
        let mark = state.marks.entry(slot.0.clone()).or_default();
        mark.visible = false;
        mark.server_originated = false;
        mark.checked = true;
    }

    fn ensure_form_banner(&self, container: &str) -> BannerHandle {
        self.lock()
            .banners
            .entry(container.to_string())
            .or_default();
        BannerHandle(container.to_string())
    }

    fn show_banner(&self, banner: &BannerHandle, html: &str) {
        let mut state = self.lock();
        let entry = state.banners.entry(banner.0.clone()).or_default();
        entry.visible = true;
        entry.html = html.to_string();
    }

    fn clear_and_hide_banner(&self, banner: &BannerHandle) {
        let mut state = self.lock();
        let entry = state.banners.entry(banner.0.clone()).or_default();
        entry.visible = false;
        entry.html.clear();
    }

    fn fields_in(&self, container: &str) -> Vec<FieldDescriptor> {
        self.lock()
            .fields
            .iter()
            .filter(|(c, _)| c == container)
            .map(|(_, f)| f.clone())
            .collect()
    }

    fn field(&self, id: FieldId) -> Option<FieldDescriptor> {
        self.lock().fields.get(id.0).map(|(_, f)| f.clone())
    }

    fn find_field(&self, name: &str) -> Option<FieldDescriptor> {
        self.lock()
            .fields
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(_, f)| f.clone())
    }

    fn field_value(&self, name: &str) -> Option<String> {
        self.find_field(name).map(|f| f.value)
    }

    fn set_field_value(&self, id: FieldId, value: &str) {
        if let Some((_, field)) = self.lock().fields.get_mut(id.0) {
            field.value = value.to_string();
        }
    }

    fn set_field_checked(&self, id: FieldId, checked: bool) {
        self.set_checked(id, checked);
    }

    fn focus(&self, id: FieldId) {
        self.lock().focused = Some(id);
    }

    fn is_visible(&self, id: FieldId) -> bool {
        self.lock()
            .fields
            .get(id.0)
            .is_some_and(|(_, f)| f.visible)
    }

    fn is_enhanced_widget(&self, id: FieldId) -> bool {
        self.lock()
            .fields
            .get(id.0)
            .is_some_and(|(_, f)| f.enhanced)
    }

    fn set_control_enabled(&self, control: &str, enabled: bool) {
        debug!(control, enabled, "Control state changed");
        self.lock().controls.insert(control.to_string(), enabled);
    }

    fn is_control_enabled(&self, control: &str) -> bool {
        self.lock().controls.get(control).copied().unwrap_or(true)
    }

    fn confirm(&self, prompt: &str) -> bool {
        let mut state = self.lock();
        state.prompts.push(prompt.to_string());
        state.confirm_answer
    }

    fn navigate(&self, url: &str) {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
    }

    fn current_url(&self) -> String {
        self.lock().url.clone()
    }
}
