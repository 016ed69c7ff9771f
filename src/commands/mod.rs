//! Command bus
//!
//! Servers answer a submission with a JSON array of `{type, data}` commands.
//! The bus maps each `type` to a registered handler and runs them in array
//! order. A handler that returns an error or panics is isolated: the fault
//! is logged and recorded in the [`DispatchReport`], and dispatch continues
//! with the next command.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::FormsConfig;
use crate::error::HandlerFault;
use crate::field::FieldStates;
use crate::presentation::{BannerHandle, PresentationAdapter};

pub use builtin::{NOTHING, REDIRECT, VALIDATION_ERRORS};

/// One server-issued (or locally synthesized) command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl Command {
    pub fn new(kind: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Everything a handler may act on.
pub struct CommandContext<'a> {
    pub adapter: &'a dyn PresentationAdapter,
    pub states: &'a FieldStates,
    pub config: &'a FormsConfig,
    /// Banner of the container the current submission came from, if any.
    pub banner: Option<&'a BannerHandle>,
}

/// A command handler. Closures with the matching signature implement this.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, ctx: &CommandContext<'_>, data: Option<&JsonValue>) -> anyhow::Result<()>;
}

impl<F> CommandHandler for F
where
    F: Fn(&CommandContext<'_>, Option<&JsonValue>) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, ctx: &CommandContext<'_>, data: Option<&JsonValue>) -> anyhow::Result<()> {
        self(ctx, data)
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// No handler registered for the command; nothing happened.
    Unhandled,
    Faulted(HandlerFault),
}

/// Summary of a dispatched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub handled: usize,
    pub unhandled: Vec<String>,
    pub faults: Vec<HandlerFault>,
}

impl DispatchReport {
    fn record(&mut self, command: &str, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Handled => self.handled += 1,
            Dispatch::Unhandled => self.unhandled.push(command.to_string()),
            Dispatch::Faulted(fault) => self.faults.push(fault),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Name-keyed handler registry with fail-isolated dispatch.
#[derive(Default)]
pub struct CommandBus {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl CommandBus {
    /// Create a bus with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus holding `validation_errors`, `redirect` and `nothing`
    pub fn with_builtins() -> Self {
        let bus = Self::new();
        builtin::register_all(&bus);
        bus
    }

    /// Store a handler function, replacing any existing handler for `name`.
    pub fn register_handler<F>(&self, name: &str, handler: F)
    where
        F: Fn(&CommandContext<'_>, Option<&JsonValue>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.insert_handler(name, Arc::new(handler));
    }

    /// Store a handler object, replacing any existing handler for `name`.
    pub fn insert_handler(&self, name: &str, handler: Arc<dyn CommandHandler>) {
        let replaced = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handler)
            .is_some();
        if replaced {
            debug!(command = %name, "Command handler replaced");
        }
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Execute one command. Handler faults are captured, never propagated.
    pub fn execute(
        &self,
        ctx: &CommandContext<'_>,
        name: &str,
        data: Option<&JsonValue>,
    ) -> Dispatch {
        // Clone out so a handler may register handlers without deadlocking.
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        let Some(handler) = handler else {
            debug!(command = %name, "No handler registered, ignoring command");
            return Dispatch::Unhandled;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(ctx, data)));
        let message = match outcome {
            Ok(Ok(())) => return Dispatch::Handled,
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(command = %name, error = %message, "Command handler failed");
        Dispatch::Faulted(HandlerFault {
            command: name.to_string(),
            message,
        })
    }

    /// Execute a batch strictly in order. A fault never stops the batch.
    pub fn execute_all(&self, ctx: &CommandContext<'_>, commands: &[Command]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for command in commands {
            let dispatch = self.execute(ctx, &command.kind, command.data.as_ref());
            report.record(&command.kind, dispatch);
        }
        report
    }
}

impl fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        f.debug_struct("CommandBus").field("handlers", &names).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
