//! Presentation adapter: the boundary between the engine and the page.
//!
//! The engine never touches markup. Everything it needs from the page
//! (field snapshots, error rendering, banners, focus, navigation, control
//! state, confirmation prompts) goes through [`PresentationAdapter`].
//! Value extraction for replacement widgets is pluggable per [`FieldKind`]
//! through [`ValueExtractors`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::field::{FieldDescriptor, FieldId, FieldKind};

/// Handle to the inline error container rendered beside a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorSlot(pub String);

/// Handle to a container's error banner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BannerHandle(pub String);

/// Page operations consumed by the engine.
///
/// Implementations use interior mutability; the engine only ever holds a
/// shared reference.
pub trait PresentationAdapter: Send + Sync {
    // ── Field rendering ────────────────────────────────────────

    /// Locate the error container for a field, creating it beside the field if absent.
    fn ensure_field_error_container(&self, field_name: &str) -> ErrorSlot;

    /// Show an error list. `server_originated` marks errors reported by the server.
    fn show_field_invalid(&self, slot: &ErrorSlot, messages_html: &str, server_originated: bool);

    fn show_field_valid(&self, slot: &ErrorSlot);

    // ── Banners ───────────────────────────────────────────────

    /// Locate the banner of a container, or of a trigger control when the
    /// trigger names no container, creating it if absent.
    fn ensure_form_banner(&self, container: &str) -> BannerHandle;

    fn show_banner(&self, banner: &BannerHandle, html: &str);

    fn clear_and_hide_banner(&self, banner: &BannerHandle);

    // ── Fields ────────────────────────────────────────────────

    /// Every form field inside a container, in document order.
    fn fields_in(&self, container: &str) -> Vec<FieldDescriptor>;

    fn field(&self, id: FieldId) -> Option<FieldDescriptor>;

    /// First field carrying `name`.
    fn find_field(&self, name: &str) -> Option<FieldDescriptor>;

    /// Current raw value of the first field carrying `name`.
    fn field_value(&self, name: &str) -> Option<String>;

    fn set_field_value(&self, id: FieldId, value: &str);

    /// Check or uncheck a checkbox or radio.
    fn set_field_checked(&self, id: FieldId, checked: bool);

    fn focus(&self, id: FieldId);

    fn is_visible(&self, id: FieldId) -> bool;

    /// Field is backed by a replacement widget, so hiding the original
    /// control does not exempt it from validation.
    fn is_enhanced_widget(&self, id: FieldId) -> bool;

    // ── Controls and navigation ───────────────────────────────

    fn set_control_enabled(&self, control: &str, enabled: bool);

    fn is_control_enabled(&self, control: &str) -> bool;

    /// Blocking confirmation prompt. `true` means the user accepted.
    fn confirm(&self, prompt: &str) -> bool;

    fn navigate(&self, url: &str);

    fn current_url(&self) -> String;
}

/// Reads the value of a field backed by a replacement widget.
pub trait ValueExtractor: Send + Sync {
    /// `None` falls back to the field's own value.
    fn extract(&self, field: &FieldDescriptor) -> Option<String>;
}

impl<F> ValueExtractor for F
where
    F: Fn(&FieldDescriptor) -> Option<String> + Send + Sync,
{
    fn extract(&self, field: &FieldDescriptor) -> Option<String> {
        self(field)
    }
}

/// Value extractors keyed by field kind.
#[derive(Default)]
pub struct ValueExtractors {
    by_kind: RwLock<HashMap<FieldKind, Arc<dyn ValueExtractor>>>,
}

impl ValueExtractors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extractor, replacing any previous one for `kind`.
    pub fn register(&self, kind: FieldKind, extractor: Arc<dyn ValueExtractor>) {
        self.by_kind
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, extractor);
    }

    /// Current value of a field, through the extractor for its kind if any.
    pub fn value_of(&self, field: &FieldDescriptor) -> String {
        let extractor = self
            .by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field.kind)
            .cloned();

        extractor
            .and_then(|e| e.extract(field))
            .unwrap_or_else(|| field.value.clone())
    }
}

impl std::fmt::Debug for ValueExtractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<FieldKind> = self
            .by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        f.debug_struct("ValueExtractors").field("kinds", &kinds).finish()
    }
}
