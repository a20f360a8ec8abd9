//! Interactive evaluation with suspendable async calls.
//!
//! A walk of the rule either decides it or yields the `remote`/`delay`
//! calls it is waiting on. The scheduler launches those through a
//! [`Backend`], records a pending substitution for each call node, and
//! re-walks the whole rule from the root every time a result arrives. The
//! first concrete answer is reported once and every call still in flight
//! for that attempt is aborted.
//!
//! Nothing here blocks: the host feeds results back through
//! [`FieldScheduler::complete`] (or [`FormScheduler::complete`]) whenever
//! they arrive.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    ast::{CallId, Rule},
    evaluator::{EvalContext, EvalError, Evaluator, Substitutions},
    resolve::{FieldAccessor, FormResolver, Resolve},
    value::{AsyncCall, Value},
    wire::WireError,
};

/// One rule on one field. A field may carry several rules, each in its own
/// slot and scheduled independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub field: String,
    pub slot: usize,
}

impl FieldKey {
    pub fn new(field: impl Into<String>, slot: usize) -> Self {
        FieldKey {
            field: field.into(),
            slot,
        }
    }
}

/// Identifies a launched call. Results are delivered with their ticket so
/// that results for superseded attempts can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: FieldKey,
    pub attempt: u64,
    pub call: CallId,
}

/// Cancels in-flight work.
pub trait Abort {
    fn abort(self);
}

/// Starts async calls on behalf of the scheduler.
pub trait Backend {
    type Handle: Abort;

    /// Begin `call`; its result must later be passed to `complete` together
    /// with `ticket`.
    fn launch(&mut self, ticket: Ticket, call: &AsyncCall) -> Result<Self::Handle, TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote validator '{target}' failed: {message}")]
    Remote { target: String, message: String },

    #[error("cannot launch async call: {0}")]
    Runtime(String),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Why an attempt ended without a verdict.
#[derive(Debug, Error)]
pub enum AsyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("no rule attached to field '{field}' in slot {slot}")]
    UnknownField { field: String, slot: usize },

    #[error("rule is waiting but no call is in flight")]
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Idle,
    Evaluating,
    AwaitingCalls,
    Resolved,
    Cancelled,
    Failed,
}

/// Outcome of [`FieldScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Decided on the first walk
    Ready(bool),
    /// Waiting on async calls; the callback fires later
    Pending,
    /// Ended with an error, already passed to the callback
    Failed,
}

/// Outcome of delivering one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The result belongs to a superseded or finished attempt
    Stale,
    /// Still waiting on calls
    Waiting,
    /// The rule is decided
    Resolved(bool),
    /// The attempt ended with an error
    Failed,
}

/// Receives the final outcome of an attempt.
pub type OnResolved = Box<dyn FnOnce(Result<bool, AsyncError>)>;

/// One validation of one field.
struct Attempt<H> {
    id: u64,
    value: Value,
    substitutions: Substitutions,
    in_flight: HashMap<CallId, H>,
    on_resolved: Option<OnResolved>,
}

impl<H: Abort> Attempt<H> {
    fn abort_all(&mut self) -> usize {
        let count = self.in_flight.len();
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
        count
    }
}

/// Drives the attempts of a single rule slot.
pub struct FieldScheduler<B: Backend> {
    key: FieldKey,
    rule: Arc<Rule>,
    evaluator: Evaluator,
    state: FieldState,
    next_attempt: u64,
    attempt: Option<Attempt<B::Handle>>,
}

impl<B: Backend> FieldScheduler<B> {
    pub fn new(key: FieldKey, rule: Arc<Rule>) -> Self {
        FieldScheduler {
            key,
            rule,
            evaluator: Evaluator::new(),
            state: FieldState::Idle,
            next_attempt: 0,
            attempt: None,
        }
    }

    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Number of calls the current attempt is waiting on.
    pub fn in_flight(&self) -> usize {
        self.attempt.as_ref().map_or(0, |a| a.in_flight.len())
    }

    /// Validate `value`, superseding any unfinished attempt.
    ///
    /// `on_resolved` receives the outcome exactly once, unless a later
    /// `start` or `cancel` supersedes this attempt first, in which case it
    /// is dropped without being called.
    pub fn start(
        &mut self,
        backend: &mut B,
        value: Value,
        fields: &dyn Resolve,
        on_resolved: impl FnOnce(Result<bool, AsyncError>) + 'static,
    ) -> Verdict {
        self.cancel();

        let id = self.next_attempt;
        self.next_attempt += 1;
        debug!("Start attempt {} for {}[{}]", id, self.key.field, self.key.slot);

        self.attempt = Some(Attempt {
            id,
            value,
            substitutions: Substitutions::new(),
            in_flight: HashMap::new(),
            on_resolved: Some(Box::new(on_resolved)),
        });

        match self.walk(backend, fields) {
            Progress::Resolved(valid) => Verdict::Ready(valid),
            Progress::Failed => Verdict::Failed,
            Progress::Waiting | Progress::Stale => Verdict::Pending,
        }
    }

    /// Deliver the result of a launched call.
    pub fn complete(
        &mut self,
        backend: &mut B,
        ticket: &Ticket,
        result: Result<Value, TransportError>,
        fields: &dyn Resolve,
    ) -> Progress {
        let Some(attempt) = self.attempt.as_mut() else {
            trace!("Ignore result for finished attempt {}", ticket.attempt);
            return Progress::Stale;
        };
        if attempt.id != ticket.attempt || attempt.in_flight.remove(&ticket.call).is_none() {
            trace!(
                "Ignore stale result for call {} of attempt {}",
                ticket.call, ticket.attempt
            );
            return Progress::Stale;
        }

        match result {
            Ok(value) => {
                trace!("Call {} resolved to {}", ticket.call, value);
                attempt.substitutions.resolve(ticket.call, value);
                self.walk(backend, fields)
            }
            Err(e) => {
                warn!("Async call {} failed: {}", ticket.call, e);
                self.finish(Err(e.into()))
            }
        }
    }

    /// Abandon the current attempt, aborting its calls. Its callback is
    /// dropped without being called.
    pub fn cancel(&mut self) {
        if let Some(mut attempt) = self.attempt.take() {
            let aborted = attempt.abort_all();
            debug!(
                "Cancel attempt {} for {}[{}], aborted {} call(s)",
                attempt.id, self.key.field, self.key.slot, aborted
            );
            self.state = FieldState::Cancelled;
        }
    }

    /// Evaluate from the root and launch whatever the rule still needs.
    fn walk(&mut self, backend: &mut B, fields: &dyn Resolve) -> Progress {
        let Some(attempt) = self.attempt.as_mut() else {
            return Progress::Stale;
        };
        self.state = FieldState::Evaluating;

        let result = {
            let ctx = EvalContext::interactive(fields, &attempt.substitutions);
            self.evaluator.evaluate(self.rule.root(), &attempt.value, &ctx)
        };

        let deferred = match result {
            Ok(Value::Deferred(deferred)) => deferred,
            Ok(value) => return self.finish(Ok(value.is_present())),
            Err(e) => return self.finish(Err(e.into())),
        };

        for pending in deferred.into_calls() {
            let ticket = Ticket {
                key: self.key.clone(),
                attempt: attempt.id,
                call: pending.call,
            };
            match backend.launch(ticket, &pending.kind) {
                Ok(handle) => {
                    debug!("Launched call {} for attempt {}", pending.call, attempt.id);
                    attempt.substitutions.mark_pending(pending.call);
                    attempt.in_flight.insert(pending.call, handle);
                }
                Err(e) => {
                    warn!("Failed to launch call {}: {}", pending.call, e);
                    return self.finish(Err(e.into()));
                }
            }
        }

        if attempt.in_flight.is_empty() {
            return self.finish(Err(AsyncError::Stalled));
        }
        self.state = FieldState::AwaitingCalls;
        Progress::Waiting
    }

    /// End the current attempt and report its outcome.
    fn finish(&mut self, outcome: Result<bool, AsyncError>) -> Progress {
        let Some(mut attempt) = self.attempt.take() else {
            return Progress::Stale;
        };
        let aborted = attempt.abort_all();
        if aborted > 0 {
            debug!("Attempt {} decided, aborted {} call(s)", attempt.id, aborted);
        }

        let progress = match &outcome {
            Ok(valid) => {
                self.state = FieldState::Resolved;
                Progress::Resolved(*valid)
            }
            Err(_) => {
                self.state = FieldState::Failed;
                Progress::Failed
            }
        };
        if let Some(on_resolved) = attempt.on_resolved.take() {
            on_resolved(outcome);
        }
        progress
    }
}

/// All the rule slots of a form, sharing one backend.
pub struct FormScheduler<B: Backend> {
    backend: B,
    fields: HashMap<FieldKey, FieldScheduler<B>>,
}

impl<B: Backend> FormScheduler<B> {
    pub fn new(backend: B) -> Self {
        FormScheduler {
            backend,
            fields: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Attach `rule` to a field slot, replacing (and cancelling) whatever was
    /// attached there.
    pub fn attach(&mut self, field: impl Into<String>, slot: usize, rule: Arc<Rule>) -> FieldKey {
        let key = FieldKey::new(field, slot);
        if let Some(mut previous) = self
            .fields
            .insert(key.clone(), FieldScheduler::new(key.clone(), rule))
        {
            previous.cancel();
        }
        key
    }

    pub fn field(&self, key: &FieldKey) -> Option<&FieldScheduler<B>> {
        self.fields.get(key)
    }

    pub fn state(&self, key: &FieldKey) -> Option<FieldState> {
        self.fields.get(key).map(FieldScheduler::state)
    }

    /// True when no slot is waiting on async calls.
    pub fn is_idle(&self) -> bool {
        self.fields
            .values()
            .all(|f| f.state() != FieldState::AwaitingCalls)
    }

    /// Validate `value` for the slot; field references resolve relative to
    /// the slot's field name.
    pub fn start(
        &mut self,
        key: &FieldKey,
        value: Value,
        form: &dyn FieldAccessor,
        on_resolved: impl FnOnce(Result<bool, AsyncError>) + 'static,
    ) -> Verdict {
        let Some(field) = self.fields.get_mut(key) else {
            on_resolved(Err(AsyncError::UnknownField {
                field: key.field.clone(),
                slot: key.slot,
            }));
            return Verdict::Failed;
        };
        let resolver = FormResolver::for_element(form, &key.field);
        field.start(&mut self.backend, value, &resolver, on_resolved)
    }

    /// Validate the slot's field with its current value in `form`.
    pub fn validate(
        &mut self,
        key: &FieldKey,
        form: &dyn FieldAccessor,
        on_resolved: impl FnOnce(Result<bool, AsyncError>) + 'static,
    ) -> Verdict {
        let value = form.lookup(&key.field).unwrap_or(Value::Null);
        self.start(key, value, form, on_resolved)
    }

    /// Deliver a result to the slot named by its ticket.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<Value, TransportError>,
        form: &dyn FieldAccessor,
    ) -> Progress {
        let Some(field) = self.fields.get_mut(&ticket.key) else {
            return Progress::Stale;
        };
        let resolver = FormResolver::for_element(form, &ticket.key.field);
        field.complete(&mut self.backend, ticket, result, &resolver)
    }

    pub fn cancel(&mut self, key: &FieldKey) {
        if let Some(field) = self.fields.get_mut(key) {
            field.cancel();
        }
    }
}
