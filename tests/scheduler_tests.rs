// tests/scheduler_tests.rs

use std::{cell::RefCell, rc::Rc, sync::Arc};

use validif_lang::ast::CallId;
use validif_lang::evaluator::EvalError;
use validif_lang::resolve::{FieldInput, FormFields, FormResolver};
use validif_lang::scheduler::{
    Abort, AsyncError, Backend, FieldKey, FieldScheduler, FieldState, FormScheduler, Progress,
    Ticket, TransportError, Verdict,
};
use validif_lang::value::AsyncCall;
use validif_lang::{Rule, Value};

// ============================================================================
// Recording backend
// ============================================================================

#[derive(Default)]
struct Recorder {
    launched: Vec<(Ticket, AsyncCall)>,
    aborted: Rc<RefCell<Vec<CallId>>>,
    refuse: bool,
}

struct RecordedHandle {
    call: CallId,
    aborted: Rc<RefCell<Vec<CallId>>>,
}

impl Abort for RecordedHandle {
    fn abort(self) {
        self.aborted.borrow_mut().push(self.call);
    }
}

impl Backend for Recorder {
    type Handle = RecordedHandle;

    fn launch(&mut self, ticket: Ticket, call: &AsyncCall) -> Result<RecordedHandle, TransportError> {
        if self.refuse {
            return Err(TransportError::Runtime("no runtime".to_string()));
        }
        let handle = RecordedHandle {
            call: ticket.call,
            aborted: self.aborted.clone(),
        };
        self.launched.push((ticket, call.clone()));
        Ok(handle)
    }
}

type Outcomes = Rc<RefCell<Vec<Result<bool, AsyncError>>>>;

fn outcomes() -> Outcomes {
    Rc::new(RefCell::new(vec![]))
}

fn record(outcomes: &Outcomes) -> impl FnOnce(Result<bool, AsyncError>) + 'static {
    let outcomes = outcomes.clone();
    move |outcome| outcomes.borrow_mut().push(outcome)
}

fn rule(text: &str) -> Arc<Rule> {
    Arc::new(Rule::parse(text).unwrap())
}

fn ticket(scheduler: &FormScheduler<Recorder>, index: usize) -> Ticket {
    scheduler.backend().launched[index].0.clone()
}

fn aborted(scheduler: &FormScheduler<Recorder>) -> Vec<CallId> {
    scheduler.backend().aborted.borrow().clone()
}

// ============================================================================
// Synchronous outcomes
// ============================================================================

#[test]
fn test_ready_on_first_walk() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("Total", 0, rule("['lt','Max']"));
    let form = FormFields::new().text("Total", "5").text("Max", "10");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Ready(true));
    assert!(scheduler.backend().launched.is_empty());
    assert_eq!(scheduler.state(&key), Some(FieldState::Resolved));
    assert!(matches!(seen.borrow().as_slice(), [Ok(true)]));
}

#[test]
fn test_scope_follows_the_element_name() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("Order.Total", 0, rule("['lte','Max']"));
    let form = FormFields::new()
        .text("Order.Total", "3")
        .text("Order.Max", "5")
        .text("Max", "1");

    assert_eq!(scheduler.validate(&key, &form, |_| {}), Verdict::Ready(true));
    assert_eq!(
        scheduler.start(&key, Value::Number(9.0), &form, |_| {}),
        Verdict::Ready(false)
    );
}

#[test]
fn test_checkbox_and_select_inputs() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("Tags", 0, rule("['and','Agree',['in',['str','b']]]"));
    let mut form = FormFields::new()
        .with("Agree", FieldInput::Checkbox(true))
        .with("Tags", FieldInput::Select(vec!["a".to_string(), "b".to_string()]));

    assert_eq!(scheduler.validate(&key, &form, |_| {}), Verdict::Ready(true));

    form.set("Agree", FieldInput::Checkbox(false));
    assert_eq!(scheduler.validate(&key, &form, |_| {}), Verdict::Ready(false));
}

#[test]
fn test_unknown_field() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let seen = outcomes();

    let verdict = scheduler.validate(&FieldKey::new("Nope", 3), &FormFields::new(), record(&seen));
    assert_eq!(verdict, Verdict::Failed);
    assert!(matches!(
        seen.borrow().as_slice(),
        [Err(AsyncError::UnknownField { field, slot: 3 })] if field == "Nope"
    ));
}

#[test]
fn test_evaluation_error_is_reported() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("Code", 0, rule("['regex',['str','(']]"));
    let form = FormFields::new().text("Code", "x");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Failed);
    assert_eq!(scheduler.state(&key), Some(FieldState::Failed));
    assert!(matches!(
        seen.borrow().as_slice(),
        [Err(AsyncError::Eval(EvalError::InvalidPattern { .. }))]
    ));
}

// ============================================================================
// Suspension
// ============================================================================

#[test]
fn test_pending_then_resolved() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("UserName", 0, rule("['remote',['str','/free']]"));
    let form = FormFields::new().text("UserName", "bob");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Pending);
    assert_eq!(scheduler.state(&key), Some(FieldState::AwaitingCalls));
    assert!(!scheduler.is_idle());
    assert!(seen.borrow().is_empty());

    let (first, call) = scheduler.backend().launched[0].clone();
    assert_eq!(
        call,
        AsyncCall::Remote {
            target: "/free".to_string(),
            args: vec![Value::from("bob")],
        }
    );
    assert_eq!(first.key, key);

    let progress = scheduler.complete(&first, Ok(Value::Boolean(false)), &form);
    assert_eq!(progress, Progress::Resolved(false));
    assert!(scheduler.is_idle());
    assert!(matches!(seen.borrow().as_slice(), [Ok(false)]));
}

#[test]
fn test_remote_arguments_are_evaluated() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("Zip", 0, rule("['remote','Endpoint','','Country']"));
    let form = FormFields::new()
        .text("Zip", "90210")
        .text("Endpoint", "/zip-ok")
        .text("Country", "US");

    assert_eq!(scheduler.validate(&key, &form, |_| {}), Verdict::Pending);
    assert_eq!(
        scheduler.backend().launched[0].1,
        AsyncCall::Remote {
            target: "/zip-ok".to_string(),
            args: vec![Value::Number(90210.0), Value::from("US")],
        }
    );
}

#[test]
fn test_short_circuit_aborts_remaining_calls() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['or',['remote',['str','/a']],['remote',['str','/b']]]"),
    );
    let form = FormFields::new().text("Name", "x");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Pending);
    assert_eq!(scheduler.backend().launched.len(), 2);
    assert_eq!(scheduler.field(&key).unwrap().in_flight(), 2);

    let a = ticket(&scheduler, 0);
    let b = ticket(&scheduler, 1);
    assert_ne!(a.call, b.call);

    assert_eq!(scheduler.complete(&a, Ok(Value::Boolean(true)), &form), Progress::Resolved(true));
    assert_eq!(aborted(&scheduler), vec![b.call]);

    // The aborted call's result may still arrive
    assert_eq!(scheduler.complete(&b, Ok(Value::Boolean(false)), &form), Progress::Stale);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_undecided_after_one_result_keeps_waiting() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['and',['remote',['str','/a']],['remote',['str','/b']]]"),
    );
    let form = FormFields::new().text("Name", "x");

    scheduler.validate(&key, &form, |_| {});
    let a = ticket(&scheduler, 0);
    let b = ticket(&scheduler, 1);

    assert_eq!(scheduler.complete(&a, Ok(Value::Boolean(true)), &form), Progress::Waiting);
    // Nothing new is launched for a call that is already in flight
    assert_eq!(scheduler.backend().launched.len(), 2);
    assert_eq!(scheduler.complete(&b, Ok(Value::from("yes")), &form), Progress::Resolved(true));
}

#[test]
fn test_result_can_uncover_new_calls() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['if',['remote',['str','/a']],['delay',5,['str','ok']],false]"),
    );
    let form = FormFields::new().text("Name", "x");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Pending);
    assert_eq!(scheduler.backend().launched.len(), 1);

    let a = ticket(&scheduler, 0);
    assert_eq!(scheduler.complete(&a, Ok(Value::Boolean(true)), &form), Progress::Waiting);
    assert_eq!(scheduler.backend().launched.len(), 2);
    assert_eq!(
        scheduler.backend().launched[1].1,
        AsyncCall::Delay {
            millis: 5,
            result: Value::from("ok"),
        }
    );

    let delay = ticket(&scheduler, 1);
    assert_eq!(scheduler.complete(&delay, Ok(Value::from("ok")), &form), Progress::Resolved(true));
    assert!(matches!(seen.borrow().as_slice(), [Ok(true)]));
}

#[test]
fn test_else_branch_needs_no_further_calls() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['if',['remote',['str','/a']],['delay',5,['str','ok']],false]"),
    );
    let form = FormFields::new().text("Name", "x");

    scheduler.validate(&key, &form, |_| {});
    let a = ticket(&scheduler, 0);
    assert_eq!(scheduler.complete(&a, Ok(Value::from("False")), &form), Progress::Resolved(false));
    assert_eq!(scheduler.backend().launched.len(), 1);
}

#[test]
fn test_decided_operands_skip_later_calls() {
    let cases = vec![
        ("['and','Empty',['remote',['str','/a']]]", false),
        ("['or','Ex',['remote',['str','/a']]]", true),
        ("['not','Ex',['delay',10,false]]", false),
        ("['nor','Empty',['remote',['str','/a']]]", true),
        ("['if','Empty',['remote',['str','/a']],true]", true),
        ("['lt','Missing',['remote',['str','/a']]]", true),
        ("['gt',['value',['str','Missing']],['remote',['str','/a']]]", true),
    ];

    for (text, expected) in cases {
        let mut scheduler = FormScheduler::new(Recorder::default());
        let key = scheduler.attach("Name", 0, rule(text));
        let form = FormFields::new().text("Name", "x").text("Ex", "x").text("Empty", "");

        assert_eq!(
            scheduler.validate(&key, &form, |_| {}),
            Verdict::Ready(expected),
            "Failed for {}",
            text
        );
        assert!(scheduler.backend().launched.is_empty(), "Launched a call for {}", text);
    }
}

#[test]
fn test_identical_calls_launch_separately() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['and',['remote',['str','/a']],['remote',['str','/a']]]"),
    );
    let form = FormFields::new().text("Name", "x");

    scheduler.validate(&key, &form, |_| {});
    let launched = &scheduler.backend().launched;
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[0].1, launched[1].1);
    assert_ne!(launched[0].0.call, launched[1].0.call);
}

// ============================================================================
// Cancellation and failure
// ============================================================================

#[test]
fn test_restart_supersedes_the_previous_attempt() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("UserName", 0, rule("['remote',['str','/free']]"));
    let mut form = FormFields::new().text("UserName", "bo");
    let first = outcomes();
    let second = outcomes();

    scheduler.validate(&key, &form, record(&first));
    let old = ticket(&scheduler, 0);

    form.set("UserName", FieldInput::Text("bob".to_string()));
    assert_eq!(scheduler.validate(&key, &form, record(&second)), Verdict::Pending);
    assert_eq!(aborted(&scheduler), vec![old.call]);

    let new = ticket(&scheduler, 1);
    assert_ne!(old.attempt, new.attempt);
    assert_eq!(scheduler.complete(&old, Ok(Value::Boolean(true)), &form), Progress::Stale);
    assert_eq!(scheduler.complete(&new, Ok(Value::Boolean(false)), &form), Progress::Resolved(false));

    assert!(first.borrow().is_empty());
    assert!(matches!(second.borrow().as_slice(), [Ok(false)]));
}

#[test]
fn test_cancel() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("UserName", 0, rule("['remote',['str','/free']]"));
    let form = FormFields::new().text("UserName", "bob");
    let seen = outcomes();

    scheduler.validate(&key, &form, record(&seen));
    let pending = ticket(&scheduler, 0);
    scheduler.cancel(&key);

    assert_eq!(scheduler.state(&key), Some(FieldState::Cancelled));
    assert!(scheduler.is_idle());
    assert_eq!(aborted(&scheduler), vec![pending.call]);
    assert_eq!(scheduler.complete(&pending, Ok(Value::Boolean(true)), &form), Progress::Stale);
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_reattaching_a_slot_cancels_its_attempt() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach("UserName", 0, rule("['remote',['str','/free']]"));
    let form = FormFields::new().text("UserName", "bob");

    scheduler.validate(&key, &form, |_| {});
    let pending = ticket(&scheduler, 0);

    scheduler.attach("UserName", 0, rule("''"));
    assert_eq!(aborted(&scheduler), vec![pending.call]);
    assert_eq!(scheduler.state(&key), Some(FieldState::Idle));
    assert_eq!(scheduler.complete(&pending, Ok(Value::Boolean(true)), &form), Progress::Stale);
}

#[test]
fn test_slots_are_independent() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let remote = scheduler.attach("UserName", 0, rule("['remote',['str','/free']]"));
    let required = scheduler.attach("UserName", 1, rule("''"));
    let form = FormFields::new().text("UserName", "bob");

    assert_eq!(scheduler.validate(&remote, &form, |_| {}), Verdict::Pending);
    assert_eq!(scheduler.validate(&required, &form, |_| {}), Verdict::Ready(true));
    assert_eq!(scheduler.state(&remote), Some(FieldState::AwaitingCalls));
    assert!(aborted(&scheduler).is_empty());
}

#[test]
fn test_transport_failure() {
    let mut scheduler = FormScheduler::new(Recorder::default());
    let key = scheduler.attach(
        "Name",
        0,
        rule("['or',['remote',['str','/a']],['remote',['str','/b']]]"),
    );
    let form = FormFields::new().text("Name", "x");
    let seen = outcomes();

    scheduler.validate(&key, &form, record(&seen));
    let a = ticket(&scheduler, 0);
    let b = ticket(&scheduler, 1);

    let error = TransportError::Remote {
        target: "/a".to_string(),
        message: "503".to_string(),
    };
    assert_eq!(scheduler.complete(&a, Err(error), &form), Progress::Failed);
    assert_eq!(scheduler.state(&key), Some(FieldState::Failed));
    assert_eq!(aborted(&scheduler), vec![b.call]);
    assert!(matches!(
        seen.borrow().as_slice(),
        [Err(AsyncError::Transport(TransportError::Remote { .. }))]
    ));
}

#[test]
fn test_launch_failure() {
    let mut scheduler = FormScheduler::new(Recorder {
        refuse: true,
        ..Recorder::default()
    });
    let key = scheduler.attach("Name", 0, rule("['delay',10,true]"));
    let form = FormFields::new().text("Name", "x");
    let seen = outcomes();

    assert_eq!(scheduler.validate(&key, &form, record(&seen)), Verdict::Failed);
    assert!(matches!(
        seen.borrow().as_slice(),
        [Err(AsyncError::Transport(TransportError::Runtime(_)))]
    ));
}

// ============================================================================
// Single field
// ============================================================================

#[test]
fn test_field_scheduler_directly() {
    let mut backend = Recorder::default();
    let mut field = FieldScheduler::new(FieldKey::new("Age", 0), rule("['gte',['delay',0,18]]"));
    let form = FormFields::new();
    let resolver = FormResolver::for_element(&form, "Age");
    let seen = outcomes();

    assert_eq!(field.state(), FieldState::Idle);
    let verdict = field.start(&mut backend, Value::Number(21.0), &resolver, record(&seen));
    assert_eq!(verdict, Verdict::Pending);
    assert_eq!(field.in_flight(), 1);

    let (delay, call) = backend.launched[0].clone();
    assert_eq!(
        call,
        AsyncCall::Delay {
            millis: 0,
            result: Value::Number(18.0),
        }
    );
    let progress = field.complete(&mut backend, &delay, Ok(Value::Number(18.0)), &resolver);
    assert_eq!(progress, Progress::Resolved(true));
    assert_eq!(field.in_flight(), 0);
    assert!(matches!(seen.borrow().as_slice(), [Ok(true)]));
}
