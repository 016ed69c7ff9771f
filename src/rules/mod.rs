//! Rule registry
//!
//! Named, parameterized validation predicates with their message templates.
//! Predicates return `true` when the value is valid. Registration is
//! last-write-wins so hosts can replace built-in rules after startup.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::fill_slot;
use crate::field::FieldDescriptor;
use crate::presentation::PresentationAdapter;

/// What a predicate can see besides the value itself.
pub struct RuleContext<'a> {
    pub field: &'a FieldDescriptor,
    pub page: &'a dyn PresentationAdapter,
    /// Reference field for `passretry` when the rule carries no parameter.
    pub default_password_field: &'a str,
}

/// Predicate signature: `(context, value, param) -> valid`.
pub type Predicate = Arc<dyn Fn(&RuleContext<'_>, &str, Option<&str>) -> bool + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&RuleContext<'_>, &str, Option<&str>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered rule.
#[derive(Clone)]
pub struct ValidationRule {
    pub name: String,
    /// Error message with one `{%}` slot for the parameter.
    pub message_template: String,
    predicate: Predicate,
}

impl ValidationRule {
    pub fn new(
        name: impl Into<String>,
        message_template: impl Into<String>,
        predicate: Predicate,
    ) -> Self {
        Self {
            name: name.into(),
            message_template: message_template.into(),
            predicate,
        }
    }

    pub fn check(&self, ctx: &RuleContext<'_>, value: &str, param: Option<&str>) -> bool {
        (self.predicate)(ctx, value, param)
    }

    /// Error message for a failed check, parameter substituted.
    pub fn message(&self, param: Option<&str>) -> String {
        fill_slot(&self.message_template, param.unwrap_or_default())
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("message_template", &self.message_template)
            .finish_non_exhaustive()
    }
}

/// Registry of rules keyed by unique name.
#[derive(Default)]
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, ValidationRule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in rule
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::register_all(&registry);
        registry
    }

    /// Store a rule, replacing any rule with the same name.
    pub fn register<F>(&self, name: &str, message_template: &str, f: F)
    where
        F: Fn(&RuleContext<'_>, &str, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.insert(ValidationRule::new(name, message_template, predicate(f)));
    }

    pub fn insert(&self, rule: ValidationRule) {
        let previous = self
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.name.clone(), rule);
        if let Some(previous) = previous {
            tracing::debug!(rule = %previous.name, "Validation rule overwritten");
        }
    }

    /// Replace only the message template of a registered rule.
    ///
    /// Returns `false` when no rule has that name.
    pub fn set_message(&self, name: &str, message_template: &str) -> bool {
        match self
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(name)
        {
            Some(rule) => {
                rule.message_template = message_template.to_string();
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ValidationRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered rule names, sorted.
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
