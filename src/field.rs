//! Field model: descriptors, payload values and per-field state records.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::descriptor::RuleDescriptor;
use crate::error::DescriptorError;

/// Markup attribute carrying the rule descriptor.
pub const VALIDATION_ATTR: &str = "data-validation";
/// Markup attribute excluding a field from collection.
pub const DONT_SEND_ATTR: &str = "data-dontsend";
/// Name suffix marking an array field.
pub const ARRAY_SUFFIX: &str = "[]";

/// Identity of one field within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub usize);

/// Kind of form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Checkbox,
    Radio,
    Select,
    TextArea,
    /// Textarea backed by a rich-text editor.
    RichText,
    Hidden,
    /// Any other input type (`number`, `tel`, ...). Validated on input but
    /// never collected for submission.
    Other,
}

impl FieldKind {
    /// Map a tag name and `type` attribute onto a kind.
    ///
    /// Returns `None` for controls that are not form fields at all (buttons,
    /// submit inputs, file pickers).
    pub fn parse(tag: &str, type_attr: Option<&str>) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "textarea" => Some(Self::TextArea),
            "input" => match type_attr.map(str::to_ascii_lowercase).as_deref() {
                None | Some("text") => Some(Self::Text),
                Some("email") => Some(Self::Email),
                Some("password") => Some(Self::Password),
                Some("checkbox") => Some(Self::Checkbox),
                Some("radio") => Some(Self::Radio),
                Some("hidden") => Some(Self::Hidden),
                Some("submit" | "button" | "reset" | "image" | "file") => None,
                Some(_) => Some(Self::Other),
            },
            _ => None,
        }
    }

    /// Whether fields of this kind take part in collection.
    pub fn is_collectible(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Snapshot of one field as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub name: String,
    pub kind: FieldKind,
    pub rules: Option<RuleDescriptor>,
    /// Current raw value of the control.
    pub value: String,
    /// Checked state; only meaningful for checkboxes and radios.
    pub checked: bool,
    pub visible: bool,
    /// Backed by a replacement widget (rich-text editor, enhanced select).
    pub enhanced: bool,
    pub do_not_send: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: FieldId(0),
            name: name.into(),
            kind,
            rules: None,
            value: String::new(),
            checked: false,
            visible: kind != FieldKind::Hidden,
            enhanced: kind == FieldKind::RichText,
            do_not_send: false,
        }
    }

    /// Build a descriptor from markup attributes.
    ///
    /// Returns `Ok(None)` when the element is not a form field.
    pub fn from_markup(
        tag: &str,
        attrs: &HashMap<String, String>,
        visible: bool,
    ) -> Result<Option<Self>, DescriptorError> {
        let Some(kind) = FieldKind::parse(tag, attrs.get("type").map(String::as_str)) else {
            return Ok(None);
        };

        let mut field = Self::new(attrs.get("name").cloned().unwrap_or_default(), kind);
        field.value = attrs.get("value").cloned().unwrap_or_default();
        field.checked = attrs.contains_key("checked");
        field.visible = visible;
        field.do_not_send = attrs.get(DONT_SEND_ATTR).is_some_and(|v| v == "true");
        field.rules = match attrs.get(VALIDATION_ATTR) {
            Some(source) if !source.trim().is_empty() => Some(RuleDescriptor::parse(source)?),
            _ => None,
        };
        Ok(Some(field))
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_rules(mut self, rules: RuleDescriptor) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn enhanced(mut self, enhanced: bool) -> Self {
        self.enhanced = enhanced;
        self
    }

    pub fn do_not_send(mut self, do_not_send: bool) -> Self {
        self.do_not_send = do_not_send;
        self
    }

    /// Name ends in `[]`: values accumulate into a list.
    pub fn is_array(&self) -> bool {
        self.name.ends_with(ARRAY_SUFFIX)
    }

    /// Whether collection picks this field up at all.
    ///
    /// Unchecked radios are filtered here; unchecked checkboxes are eligible
    /// (and validated) but contribute no value.
    pub fn is_eligible(&self) -> bool {
        !self.name.is_empty()
            && !self.do_not_send
            && self.kind.is_collectible()
            && (self.kind != FieldKind::Radio || self.checked)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One collected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Collected field values in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPayload {
    entries: Vec<(String, FieldValue)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure an array key exists, even if no value ends up in it.
    pub fn ensure_list(&mut self, name: &str) {
        if self.position(name).is_none() {
            self.entries
                .push((name.to_string(), FieldValue::Multiple(Vec::new())));
        }
    }

    /// Add a value. Array keys append; scalar keys overwrite in place.
    pub fn insert(&mut self, name: &str, value: String) {
        match self.position(name) {
            Some(pos) => match &mut self.entries[pos].1 {
                FieldValue::Multiple(values) => values.push(value),
                single => *single = FieldValue::Single(value),
            },
            None if name.ends_with(ARRAY_SUFFIX) => self
                .entries
                .push((name.to_string(), FieldValue::Multiple(vec![value]))),
            None => self
                .entries
                .push((name.to_string(), FieldValue::Single(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.position(name).map(|pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Wire pairs: list values repeat their key once per element.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, value) in &self.entries {
            match value {
                FieldValue::Single(v) => pairs.push((name.clone(), v.clone())),
                FieldValue::Multiple(values) => {
                    pairs.extend(values.iter().map(|v| (name.clone(), v.clone())))
                }
            }
        }
        pairs
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }
}

// ---------------------------------------------------------------------------
// Per-field state
// ---------------------------------------------------------------------------

/// State the engine keeps about a field, independent of its markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldState {
    /// Server rejected the last submitted value. While set, local
    /// re-validation is suppressed and the field counts as invalid.
    pub server_error: bool,
}

/// Field state records keyed by field name.
#[derive(Debug, Default)]
pub struct FieldStates {
    inner: Mutex<HashMap<String, FieldState>>,
}

impl FieldStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_server_error(&self, name: &str) -> bool {
        self.lock().get(name).is_some_and(|state| state.server_error)
    }

    pub fn mark_server_error(&self, name: &str) {
        self.lock().entry(name.to_string()).or_default().server_error = true;
    }

    /// Clear the sticky flag for the given fields.
    pub fn clear_server_errors<'a, I>(&self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut states = self.lock();
        for name in names {
            if let Some(state) = states.get_mut(name) {
                state.server_error = false;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FieldState>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
