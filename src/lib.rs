//! PrettyForms - declarative form validation and server-driven submission
//!
//! Fields declare their rules in markup (`data-validation="notempty;minlength:5"`).
//! Trigger controls collect a container's fields, validate all of them,
//! post them to the server and run the JSON commands it answers with.
//!
//! ## Flow
//! Page event -> PrettyForms -> ElementValidator / SubmissionController
//! -> Transport -> CommandBus -> PresentationAdapter
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prettyforms::{FieldDescriptor, FieldKind, MemoryPage, PrettyForms, RuleDescriptor, TriggerSpec};
//!
//! # async fn run() -> Result<(), prettyforms::DescriptorError> {
//! let page = Arc::new(MemoryPage::new("https://example.test/signup"));
//! page.add_field(
//!     "#signup",
//!     FieldDescriptor::new("email", FieldKind::Email)
//!         .with_rules(RuleDescriptor::parse("notempty;isemail")?)
//!         .with_value("me@example.test"),
//! );
//!
//! let forms = PrettyForms::builder(page.clone()).build();
//! let trigger = TriggerSpec::new("send").link("/signup").input_container("#signup");
//! let outcome = forms.on_trigger(&trigger).await;
//! assert!(outcome.was_sent());
//! # Ok(())
//! # }
//! ```

// Core error handling and configuration
pub mod config;
pub mod error;

// Field model and rule descriptors
pub mod descriptor;
pub mod field;

// Validation
pub mod rules;
pub mod validator;

// Page boundary
pub mod page;
pub mod presentation;

// Server commands and submission
pub mod commands;
pub mod submission;
pub mod transport;
pub mod trigger;

// Service object
pub mod service;

pub use commands::{Command, CommandBus, CommandContext, CommandHandler, Dispatch, DispatchReport};
pub use config::{FormsConfig, Messages, Templates};
pub use descriptor::{RuleDescriptor, RuleInvocation};
pub use error::{DescriptorError, FormsError, HandlerFault, TransportError};
pub use field::{FieldDescriptor, FieldId, FieldKind, FieldStates, FieldValue, FormPayload};
pub use page::MemoryPage;
pub use presentation::{BannerHandle, ErrorSlot, PresentationAdapter, ValueExtractor, ValueExtractors};
pub use rules::{RuleContext, RuleRegistry, ValidationRule};
pub use service::{FormsCore, PrettyForms, PrettyFormsBuilder};
pub use submission::{
    ControlState, ControlStates, SubmissionController, SubmissionRequest, SubmitDecision,
    TriggerOutcome,
};
pub use transport::{HttpTransport, Transport};
pub use trigger::TriggerSpec;
pub use validator::{ElementValidator, ValidationOutcome};
