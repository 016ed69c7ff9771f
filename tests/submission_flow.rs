//! End-to-end submission flows against the headless page and a recording transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use prettyforms::{
    Command, FieldDescriptor, FieldKind, FieldValue, FormPayload, MemoryPage, PresentationAdapter,
    PrettyForms, RuleDescriptor, TransportError, TriggerOutcome, TriggerSpec, ValidationOutcome,
};

const PAGE_URL: &str = "https://example.test/account";

/// Records every request and answers with a fixed reply, optionally
/// holding the reply until released.
struct RecordingTransport {
    requests: Mutex<Vec<(String, FormPayload)>>,
    reply: Result<Vec<Command>, TransportError>,
    gate: Option<Arc<Notify>>,
}

impl RecordingTransport {
    fn replying(commands: Vec<Command>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(commands),
            gate: None,
        })
    }

    fn failing(error: TransportError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Err(error),
            gate: None,
        })
    }

    fn gated(commands: Vec<Command>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(commands),
            gate: Some(gate),
        })
    }

    fn requests(&self) -> Vec<(String, FormPayload)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl prettyforms::Transport for RecordingTransport {
    async fn submit(&self, url: &str, payload: &FormPayload) -> Result<Vec<Command>, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone()
    }
}

fn setup(transport: &Arc<RecordingTransport>) -> (Arc<MemoryPage>, PrettyForms) {
    let page = Arc::new(MemoryPage::new(PAGE_URL));
    page.add_control("save");
    let forms = PrettyForms::builder(page.clone())
        .transport(transport.clone())
        .build();
    (page, forms)
}

fn field(name: &str, kind: FieldKind, rules: &str, value: &str) -> FieldDescriptor {
    let field = FieldDescriptor::new(name, kind).with_value(value);
    if rules.is_empty() {
        field
    } else {
        field.with_rules(RuleDescriptor::parse(rules).unwrap())
    }
}

fn save_trigger() -> TriggerSpec {
    TriggerSpec::new("save")
        .link("/account/save")
        .input_container("#profile")
}

#[tokio::test]
async fn test_invalid_field_sends_nothing() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "notempty", ""));
    let email = page.add_field(
        "#profile",
        field("email", FieldKind::Email, "notempty;isemail", "bad"),
    );

    let outcome = forms.on_trigger(&save_trigger()).await;

    assert!(matches!(outcome, TriggerOutcome::Blocked));
    assert!(transport.requests().is_empty());
    // No short-circuit: both fields rendered, first one focused.
    assert!(page.mark("name").unwrap().visible);
    assert!(page.mark("email").unwrap().visible);
    assert_eq!(page.focused(), Some(name));
    assert_ne!(page.focused(), Some(email));
    assert_eq!(
        page.banner("#profile").unwrap().html,
        forms.config().messages.fix_and_retry
    );
    assert!(page.is_control_enabled("save"));
}

#[tokio::test]
async fn test_success_clears_non_hidden_fields() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "", "Ann"));
    let bio = page.add_field("#profile", field("bio", FieldKind::TextArea, "", "Hello"));
    let token = page.add_field("#profile", field("token", FieldKind::Hidden, "", "t0k"));
    let agree = page.add_field(
        "#profile",
        field("agree", FieldKind::Checkbox, "", "yes").checked(true),
    );
    let color = page.add_field(
        "#profile",
        field("color", FieldKind::Radio, "", "red").checked(true),
    );
    let other = page.add_field("#other", field("keep", FieldKind::Text, "", "untouched"));

    let outcome = forms
        .on_trigger(&save_trigger().clear_inputs(true))
        .await;

    let TriggerOutcome::Sent(report) = outcome else {
        panic!("expected a sent request, got {outcome:?}");
    };
    assert_eq!(report.handled, 1);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "https://example.test/account/save");
    assert_eq!(
        requests[0].1.to_pairs(),
        vec![
            ("name".to_string(), "Ann".to_string()),
            ("bio".to_string(), "Hello".to_string()),
            ("token".to_string(), "t0k".to_string()),
            ("agree".to_string(), "yes".to_string()),
            ("color".to_string(), "red".to_string()),
        ]
    );

    assert_eq!(page.value(name).as_deref(), Some(""));
    assert_eq!(page.value(bio).as_deref(), Some(""));
    assert_eq!(page.value(token).as_deref(), Some("t0k"));
    assert!(!page.field(agree).unwrap().checked);
    assert!(!page.field(color).unwrap().checked);
    assert_eq!(page.value(other).as_deref(), Some("untouched"));
    assert!(page.is_control_enabled("save"));

    // A resubmission of the cleared form carries none of the old choices.
    forms.on_trigger(&save_trigger()).await;
    assert_eq!(
        transport.requests()[1].1.to_pairs(),
        vec![
            ("name".to_string(), String::new()),
            ("bio".to_string(), String::new()),
            ("token".to_string(), "t0k".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_no_clearing_without_flag_or_on_empty_reply() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "", "Ann"));

    forms.on_trigger(&save_trigger()).await;
    assert_eq!(page.value(name).as_deref(), Some("Ann"));

    let empty = RecordingTransport::replying(Vec::new());
    let (page, forms) = setup(&empty);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "", "Ann"));

    let outcome = forms.on_trigger(&save_trigger().clear_inputs(true)).await;
    assert!(matches!(outcome, TriggerOutcome::Sent(ref r) if r.handled == 0));
    assert_eq!(page.value(name).as_deref(), Some("Ann"));
}

#[tokio::test]
async fn test_server_errors_lock_field_until_next_attempt() {
    let transport = RecordingTransport::replying(vec![Command::new(
        "validation_errors",
        Some(json!([{"field": "login", "errors": ["Login already taken"]}])),
    )]);
    let (page, forms) = setup(&transport);
    let login = page.add_field("#profile", field("login", FieldKind::Text, "notempty", "neo"));

    let outcome = forms.on_trigger(&save_trigger().clear_inputs(true)).await;
    assert!(matches!(outcome, TriggerOutcome::Sent(_)));

    // First command was validation_errors: nothing cleared.
    assert_eq!(page.value(login).as_deref(), Some("neo"));
    assert!(forms.field_states().has_server_error("login"));
    let mark = page.mark("login").unwrap();
    assert!(mark.visible && mark.server_originated);
    assert_eq!(mark.html, "<p>Login already taken</p>");
    assert_eq!(page.focused(), Some(login));
    assert!(page.banner("#profile").unwrap().visible);

    // Typing does not re-validate a locked field.
    page.type_value(login, "trinity");
    assert_eq!(
        forms.on_field_input(login),
        Some(ValidationOutcome::Invalid(Vec::new()))
    );
    assert!(page.mark("login").unwrap().server_originated);

    // The next attempt clears the lock, the banner and validates afresh.
    forms.on_trigger(&save_trigger()).await;
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(
        transport.requests()[1].1.get("login"),
        Some(&FieldValue::Single("trinity".into()))
    );
}

#[tokio::test]
async fn test_declined_confirmation_changes_nothing() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "notempty", ""));
    forms.field_states().mark_server_error("name");
    page.answer_confirmations(false);

    let outcome = forms
        .on_trigger(&save_trigger().confirm(None).clear_inputs(true))
        .await;

    assert!(matches!(outcome, TriggerOutcome::Declined));
    assert!(transport.requests().is_empty());
    assert_eq!(page.prompts(), vec![forms.config().messages.really.clone()]);
    assert_eq!(page.value(name).as_deref(), Some(""));
    assert!(page.mark("name").is_none());
    assert!(page.banner("#profile").is_none());
    assert!(forms.field_states().has_server_error("name"));
}

#[tokio::test]
async fn test_transport_failure_shows_server_error() {
    let transport = RecordingTransport::failing(TransportError::Http("HTTP 500".into()));
    let (page, forms) = setup(&transport);
    let name = page.add_field("#profile", field("name", FieldKind::Text, "notempty", "Ann"));

    let outcome = forms
        .on_trigger(&save_trigger().clear_inputs(true))
        .await;

    let TriggerOutcome::TransportFailed { error, report } = outcome else {
        panic!("expected a transport failure, got {outcome:?}");
    };
    assert_eq!(error, TransportError::Http("HTTP 500".into()));
    assert!(report.is_clean());

    let banner = page.banner("#profile").unwrap();
    assert!(banner.visible);
    assert_eq!(
        banner.html,
        format!("<p>{}</p>", forms.config().messages.server_error)
    );
    assert!(!forms.field_states().has_server_error("name"));
    assert_eq!(page.value(name).as_deref(), Some("Ann"));
    assert!(page.is_control_enabled("save"));
    assert!(!forms.controls().is_pending("save"));
}

#[tokio::test]
async fn test_reentrant_activation_is_ignored() {
    let gate = Arc::new(Notify::new());
    let transport = RecordingTransport::gated(vec![Command::new("nothing", None)], gate.clone());
    let (page, forms) = setup(&transport);
    page.add_field("#profile", field("name", FieldKind::Text, "", "Ann"));
    let trigger = save_trigger();

    let first = forms.on_trigger(&trigger);
    let second = async {
        assert_eq!(transport.requests().len(), 1);
        assert!(!page.is_control_enabled("save"));
        let outcome = forms.on_trigger(&trigger).await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, TriggerOutcome::Sent(_)));
    assert!(matches!(second, TriggerOutcome::Ignored));
    assert_eq!(transport.requests().len(), 1);
    assert!(page.is_control_enabled("save"));
}

#[tokio::test]
async fn test_disabled_control_is_ignored() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    page.set_control_enabled("save", false);

    let outcome = forms.on_trigger(&save_trigger()).await;
    assert!(matches!(outcome, TriggerOutcome::Ignored));
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failsafe_reenables_control_while_request_pending() {
    let gate = Arc::new(Notify::new());
    let transport = RecordingTransport::gated(vec![Command::new("nothing", None)], gate.clone());
    let (page, forms) = setup(&transport);
    let trigger = save_trigger();

    let request = forms.on_trigger(&trigger);
    let observer = async {
        tokio::time::sleep(Duration::from_millis(9_999)).await;
        let before = page.is_control_enabled("save");
        tokio::time::sleep(Duration::from_millis(2)).await;
        let after = page.is_control_enabled("save");
        let pending = forms.controls().is_pending("save");
        let requests = transport.requests().len();
        gate.notify_one();
        (before, after, pending, requests)
    };
    let (outcome, (before, after, pending, requests)) = tokio::join!(request, observer);

    assert!(!before);
    assert!(after);
    assert!(!pending);
    assert_eq!(requests, 1);
    // The request was never cancelled; its reply is still dispatched.
    assert!(matches!(outcome, TriggerOutcome::Sent(ref r) if r.handled == 1));
}

#[tokio::test]
async fn test_trigger_without_container_sends_empty_payload() {
    let transport = RecordingTransport::replying(vec![Command::new(
        "redirect",
        Some(json!("https://example.test/done")),
    )]);
    let (page, forms) = setup(&transport);
    page.add_field("#profile", field("name", FieldKind::Text, "notempty", ""));

    let outcome = forms
        .on_trigger(&TriggerSpec::new("save").href("#").link("logout"))
        .await;

    assert!(outcome.was_sent());
    let requests = transport.requests();
    assert_eq!(requests[0].0, "https://example.test/logout");
    assert!(requests[0].1.is_empty());
    assert!(page.mark("name").is_none());
    assert_eq!(
        page.navigations(),
        vec!["https://example.test/done".to_string()]
    );
}

#[tokio::test]
async fn test_transport_failure_without_container_shows_banner_at_trigger() {
    let transport = RecordingTransport::failing(TransportError::Http("HTTP 500".into()));
    let (page, forms) = setup(&transport);

    let outcome = forms
        .on_trigger(&TriggerSpec::new("save").link("/logout"))
        .await;

    assert!(matches!(outcome, TriggerOutcome::TransportFailed { .. }));
    let banner = page.banner("save").unwrap();
    assert!(banner.visible);
    assert_eq!(
        banner.html,
        format!("<p>{}</p>", forms.config().messages.server_error)
    );
    assert!(page.is_control_enabled("save"));
}

#[tokio::test]
async fn test_array_fields_and_exclusions() {
    let transport = RecordingTransport::replying(vec![Command::new("nothing", None)]);
    let (page, forms) = setup(&transport);
    page.add_field("#profile", field("tags[]", FieldKind::Text, "", "rust"));
    page.add_field("#profile", field("tags[]", FieldKind::Select, "", "web"));
    page.add_field("#profile", field("opts[]", FieldKind::Checkbox, "", "a"));
    page.add_field("#profile", field("title", FieldKind::Text, "", "first"));
    page.add_field("#profile", field("title", FieldKind::Text, "", "second"));
    page.add_field("#profile", field("color", FieldKind::Radio, "", "red"));
    page.add_field(
        "#profile",
        field("color", FieldKind::Radio, "", "blue").checked(true),
    );
    page.add_field(
        "#profile",
        field("secret", FieldKind::Text, "", "x").do_not_send(true),
    );

    forms.on_trigger(&save_trigger()).await;

    let payload = &transport.requests()[0].1;
    assert_eq!(
        payload.get("tags[]"),
        Some(&FieldValue::Multiple(vec!["rust".into(), "web".into()]))
    );
    assert_eq!(payload.get("opts[]"), Some(&FieldValue::Multiple(Vec::new())));
    assert_eq!(payload.get("title"), Some(&FieldValue::Single("second".into())));
    assert_eq!(payload.get("color"), Some(&FieldValue::Single("blue".into())));
    assert!(payload.get("secret").is_none());
    assert_eq!(
        payload.to_pairs(),
        vec![
            ("tags[]".to_string(), "rust".to_string()),
            ("tags[]".to_string(), "web".to_string()),
            ("title".to_string(), "second".to_string()),
            ("color".to_string(), "blue".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_faulting_handler_does_not_stop_batch_or_clearing() {
    let transport = RecordingTransport::replying(vec![
        Command::new("boom", None),
        Command::new("unknown", Some(json!({"x": 1}))),
        Command::new("redirect", Some(json!("/next"))),
    ]);
    let (page, forms) = setup(&transport);
    forms.register_handler("boom", |_, _| anyhow::bail!("handler exploded"));
    let name = page.add_field("#profile", field("name", FieldKind::Text, "", "Ann"));

    let outcome = forms
        .on_trigger(&save_trigger().clear_inputs(true))
        .await;

    let TriggerOutcome::Sent(report) = outcome else {
        panic!("expected a sent request, got {outcome:?}");
    };
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].command, "boom");
    assert_eq!(report.unhandled, vec!["unknown".to_string()]);
    assert_eq!(report.handled, 1);
    assert_eq!(page.navigations(), vec!["/next".to_string()]);
    assert_eq!(page.value(name).as_deref(), Some(""));
}
