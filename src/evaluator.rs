use std::{cell::RefCell, collections::HashMap, slice};

use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{Call, CallId, Comparison, Expr, Operator, Rule},
    coerce,
    registry::RemoteRegistry,
    resolve::{Container, GraphResolver, Resolve},
    value::{AsyncCall, Deferred, PendingCall, Value},
};

/// Errors that can occur during rule evaluation.
///
/// Unknown operators and operand counts are rejected when parsing, so what
/// remains is what only the values can reveal.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// The pattern operand of `regex` is not a valid regular expression
    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// A hand-built call has fewer operands than its operator needs
    #[error("'{op}' is missing operand {index}")]
    MissingOperand { op: &'static str, index: usize },
}

/// What a `remote`/`delay` node should evaluate to on a re-walk.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    /// Launched, no result yet
    Pending,
    /// The call's result
    Resolved(Value),
}

/// Per-attempt table of async results, keyed by call node.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    entries: HashMap<CallId, Substitution>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, call: CallId) -> Option<&Substitution> {
        self.entries.get(&call)
    }

    pub fn mark_pending(&mut self, call: CallId) {
        self.entries.insert(call, Substitution::Pending);
    }

    /// Record a result. Returns false if the call was never launched.
    pub fn resolve(&mut self, call: CallId, value: Value) -> bool {
        match self.entries.get_mut(&call) {
            Some(entry) => {
                *entry = Substitution::Resolved(value);
                true
            }
            None => false,
        }
    }

    /// Calls launched but not yet resolved.
    pub fn pending(&self) -> impl Iterator<Item = CallId> + '_ {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, Substitution::Pending))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the rule runs, which decides what `remote` and `delay` do.
#[derive(Clone, Copy)]
pub enum Environment<'a> {
    /// Server side: remote validators are called in-process, delays are
    /// pass-through.
    Trusted(&'a RemoteRegistry),

    /// Client side: async calls yield `Deferred` unless the attempt already
    /// has a substitution for them.
    Interactive(&'a Substitutions),
}

/// Evaluation context: field lookups, the current `with` prefix and the
/// environment.
#[derive(Clone)]
pub struct EvalContext<'a> {
    fields: &'a dyn Resolve,
    prefix: String,
    env: Environment<'a>,
}

impl<'a> EvalContext<'a> {
    pub fn new(fields: &'a dyn Resolve, env: Environment<'a>) -> Self {
        EvalContext {
            fields,
            prefix: String::new(),
            env,
        }
    }

    pub fn trusted(fields: &'a dyn Resolve, registry: &'a RemoteRegistry) -> Self {
        Self::new(fields, Environment::Trusted(registry))
    }

    pub fn interactive(fields: &'a dyn Resolve, substitutions: &'a Substitutions) -> Self {
        Self::new(fields, Environment::Interactive(substitutions))
    }

    /// Create a context whose field paths are relative to `path`
    pub fn rebind(&self, path: &str) -> Self {
        EvalContext {
            fields: self.fields,
            prefix: format!("{}{}.", self.prefix, path),
            env: self.env,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn environment(&self) -> Environment<'a> {
        self.env
    }

    /// Look up a field path. The empty path is the value under test.
    pub fn resolve(&self, path: &str, value: &Value) -> Value {
        if path.is_empty() {
            value.clone()
        } else {
            self.fields.resolve(&format!("{}{}", self.prefix, path))
        }
    }
}

/// Collects the calls of deferred operands while an operator scans them.
#[derive(Default)]
struct Pending(Option<Deferred>);

impl Pending {
    /// The concrete value, or `None` after merging a deferred one.
    fn settle(&mut self, value: Value) -> Option<Value> {
        match value {
            Value::Deferred(deferred) => {
                self.0.get_or_insert_with(Deferred::waiting).merge(deferred);
                None
            }
            concrete => Some(concrete),
        }
    }

    fn is_waiting(&self) -> bool {
        self.0.is_some()
    }

    /// The merged deferred value if anything was deferred, else `value`.
    fn or(self, value: Value) -> Value {
        self.0.map_or(value, Value::Deferred)
    }

    fn or_try(self, f: impl FnOnce() -> Result<Value, EvalError>) -> Result<Value, EvalError> {
        match self.0 {
            Some(deferred) => Ok(Value::Deferred(deferred)),
            None => f(),
        }
    }
}

/// Compiled patterns kept per evaluator before the cache starts over.
const PATTERN_CACHE_LIMIT: usize = 64;

/// The rule evaluator.
///
/// One implementation serves both environments; only `remote` and `delay`
/// look at [`Environment`]. Holds a cache of compiled patterns, so reuse an
/// evaluator across walks of the same rule.
#[derive(Default)]
pub struct Evaluator {
    patterns: RefCell<HashMap<String, Regex>>,
}

fn operand(call: &Call, index: usize) -> Result<&Expr, EvalError> {
    call.args.get(index).ok_or(EvalError::MissingOperand {
        op: call.op.name(),
        index,
    })
}

/// A list's elements, or the value itself.
fn elements(value: &Value) -> &[Value] {
    match value {
        Value::List(items) => items,
        other => slice::from_ref(other),
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates a rule tree against the value under test.
    ///
    /// In the trusted environment the result is always concrete. In the
    /// interactive environment it may be [`Value::Deferred`], carrying the
    /// async calls that must complete before the rule can be decided.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use validif_lang::evaluator::{EvalContext, Evaluator};
    /// use validif_lang::resolve::GraphResolver;
    /// use validif_lang::{RemoteRegistry, Rule, Value};
    ///
    /// let model = json!({ "Two": 2 });
    /// let fields = GraphResolver::new(&model);
    /// let registry = RemoteRegistry::empty();
    /// let ctx = EvalContext::trusted(&fields, &registry);
    ///
    /// let rule = Rule::parse("['lt','Two']").unwrap();
    /// let result = Evaluator::new().evaluate(rule.root(), &Value::Number(1.0), &ctx).unwrap();
    /// assert_eq!(result, Value::Boolean(true));
    /// ```
    pub fn evaluate(&self, expr: &Expr, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(literal.clone()),
            Expr::Field(path) => Ok(ctx.resolve(path, value)),
            Expr::Call(call) => self.eval_call(call, value, ctx),
        }
    }

    fn eval_call(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        match call.op {
            Operator::Present => self.eval_presence(call, value, ctx, true, false),
            Operator::Any => self.eval_presence(call, value, ctx, true, true),
            Operator::Absent => self.eval_presence(call, value, ctx, false, false),
            Operator::AnyAbsent => self.eval_presence(call, value, ctx, false, true),
            Operator::If => self.eval_if(call, value, ctx),
            Operator::Coalesce => self.eval_coalesce(call, value, ctx),
            Operator::Count => self.eval_count(call, value, ctx),
            Operator::Contains => self.eval_contains(call, value, ctx),
            Operator::In => self.eval_in(call, value, ctx),
            Operator::Regex => self.eval_regex(call, value, ctx),
            Operator::Str => self.eval_str(call, value, ctx),
            Operator::Len => self.eval_len(call, value, ctx),
            Operator::Value => self.eval_value(call, value, ctx),
            Operator::Concat => self.eval_concat(call, value, ctx),
            Operator::With => self.eval_with(call, value, ctx),
            Operator::Compare(cmp) => self.eval_compare(cmp, call, value, ctx),
            Operator::Remote | Operator::Delay => self.eval_async(call, value, ctx),
        }
    }

    // ========================================
    // Presence
    // ========================================

    /// `present`/`any` look for present operands, `absent`/`anyabsent` for
    /// absent ones. `any` decides on the first match; the others decide on
    /// the first mismatch.
    fn eval_presence(
        &self,
        call: &Call,
        value: &Value,
        ctx: &EvalContext,
        want_present: bool,
        any: bool,
    ) -> Result<Value, EvalError> {
        if call.args.is_empty() {
            return Ok(Value::Boolean(value.is_present() == want_present));
        }

        let mut pending = Pending::default();
        for arg in &call.args {
            let result = self.evaluate(arg, value, ctx)?;
            let Some(result) = pending.settle(result) else {
                continue;
            };
            let matches = result.is_present() == want_present;
            if matches == any {
                // `any` found a match, or `all` found a mismatch
                return Ok(Value::Boolean(any));
            }
        }
        Ok(pending.or(Value::Boolean(!any)))
    }

    // ========================================
    // Utilities
    // ========================================

    fn eval_if(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        for pair in call.args.chunks_exact(2) {
            let condition = self.evaluate(&pair[0], value, ctx)?;
            let Some(condition) = pending.settle(condition) else {
                continue;
            };
            if condition.is_present() {
                return pending.or_try(|| self.evaluate(&pair[1], value, ctx));
            }
        }

        pending.or_try(|| match call.args.len() % 2 {
            1 => self.evaluate(operand(call, call.args.len() - 1)?, value, ctx),
            _ => Ok(Value::Null),
        })
    }

    fn eval_coalesce(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        for arg in &call.args {
            let result = self.evaluate(arg, value, ctx)?;
            if let Some(result) = pending.settle(result) {
                if result.is_present() {
                    return Ok(pending.or(result));
                }
            }
        }
        Ok(pending.or(Value::Null))
    }

    fn eval_count(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        let mut count = 0usize;
        for arg in &call.args {
            let result = self.evaluate(arg, value, ctx)?;
            if pending.settle(result).is_some_and(|r| r.is_present()) {
                count += 1;
            }
        }
        Ok(pending.or(Value::Number(count as f64)))
    }

    /// Evaluate every operand; a deferred one makes the whole call deferred.
    fn eval_all<'e>(
        &self,
        args: impl IntoIterator<Item = &'e Expr>,
        value: &Value,
        ctx: &EvalContext,
        pending: &mut Pending,
    ) -> Result<Vec<Value>, EvalError> {
        let mut results = vec![];
        for arg in args {
            let result = self.evaluate(arg, value, ctx)?;
            results.push(pending.settle(result).unwrap_or(Value::Null));
        }
        Ok(results)
    }

    fn eval_contains(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        let mut operands = self.eval_all(&call.args, value, ctx, &mut pending)?;
        if pending.is_waiting() {
            return Ok(pending.or(Value::Null));
        }

        let needle = operands.pop().unwrap_or(Value::Null);
        let haystacks = if operands.is_empty() {
            vec![value.clone()]
        } else {
            operands
        };

        let found = haystacks.iter().any(|haystack| {
            coerce::equals(haystack, &needle)
                || matches!(haystack, Value::List(items) if items.iter().any(|i| coerce::equals(i, &needle)))
        });
        Ok(Value::Boolean(found))
    }

    fn eval_in(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        let mut operands = self.eval_all(&call.args, value, ctx, &mut pending)?;
        if pending.is_waiting() {
            return Ok(pending.or(Value::Null));
        }

        let test = if operands.len() < 2 {
            value.clone()
        } else {
            operands.remove(0)
        };

        let found = operands.iter().any(|candidate| {
            elements(&test)
                .iter()
                .any(|t| elements(candidate).iter().any(|c| coerce::equals(t, c)))
        });
        Ok(Value::Boolean(found))
    }

    fn eval_regex(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        let mut operands = self.eval_all(&call.args, value, ctx, &mut pending)?;

        pending.or_try(|| {
            let pattern = operands.pop().unwrap_or(Value::Null);
            let test = operands.pop().unwrap_or_else(|| value.clone());
            let regex = self.pattern(&pattern.to_text())?;
            Ok(Value::Boolean(regex.is_match(&test.to_text())))
        })
    }

    /// Compile a pattern anchored at both ends, reusing earlier compilations.
    fn pattern(&self, source: &str) -> Result<Regex, EvalError> {
        if let Some(regex) = self.patterns.borrow().get(source) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| EvalError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })?;
        let mut patterns = self.patterns.borrow_mut();
        // Patterns can come from field values, so the cache must not grow
        // with every distinct input
        if patterns.len() >= PATTERN_CACHE_LIMIT {
            patterns.clear();
        }
        patterns.insert(source.to_string(), regex.clone());
        Ok(regex)
    }

    fn eval_str(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        match operand(call, 0)? {
            Expr::Literal(Value::String(s)) => Ok(Value::String(s.clone())),
            other => {
                let mut pending = Pending::default();
                let result = self.evaluate(other, value, ctx)?;
                let text = pending.settle(result).map(|r| r.to_text()).unwrap_or_default();
                Ok(pending.or(Value::String(text)))
            }
        }
    }

    fn eval_len(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let target = match call.args.first() {
            Some(arg) => self.evaluate(arg, value, ctx)?,
            None => value.clone(),
        };

        let length = match &target {
            Value::Deferred(_) => return Ok(target),
            Value::List(items) => items.len(),
            other => other.to_text().chars().count(),
        };
        Ok(Value::Number(length as f64))
    }

    fn eval_value(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let path = self.evaluate(operand(call, 0)?, value, ctx)?;
        if path.is_deferred() {
            return Ok(path);
        }
        Ok(ctx.resolve(&path.to_text(), value))
    }

    fn eval_concat(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut pending = Pending::default();
        let parts = self.eval_all(&call.args, value, ctx, &mut pending)?;
        let text: String = parts.iter().map(Value::to_text).collect();
        Ok(pending.or(Value::String(text)))
    }

    /// `with`: a path operand is taken as written; any other operand is
    /// evaluated and its text used as the path.
    fn eval_with(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        let path = match operand(call, 0)? {
            Expr::Field(path) => path.clone(),
            other => {
                let result = self.evaluate(other, value, ctx)?;
                if result.is_deferred() {
                    return Ok(result);
                }
                result.to_text()
            }
        };
        self.evaluate(operand(call, 1)?, value, &ctx.rebind(&path))
    }

    // ========================================
    // Comparison
    // ========================================

    /// Null on either side passes. The first side is checked before the
    /// second is evaluated.
    fn eval_compare(
        &self,
        cmp: Comparison,
        call: &Call,
        value: &Value,
        ctx: &EvalContext,
    ) -> Result<Value, EvalError> {
        let (first, second) = match call.args.len() {
            1 => (value.clone(), operand(call, 0)?),
            _ => (self.evaluate(operand(call, 0)?, value, ctx)?, operand(call, 1)?),
        };
        if first.is_null() {
            return Ok(Value::Boolean(true));
        }

        let second = self.evaluate(second, value, ctx)?;
        if second.is_null() {
            return Ok(Value::Boolean(true));
        }

        let mut pending = Pending::default();
        let first = pending.settle(first);
        let second = pending.settle(second);
        Ok(match (first, second) {
            (Some(a), Some(b)) => Value::Boolean(cmp.holds(coerce::compare(&a, &b))),
            _ => pending.or(Value::Null),
        })
    }

    // ========================================
    // Async calls
    // ========================================

    fn eval_async(&self, call: &Call, value: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        if let Environment::Interactive(substitutions) = ctx.environment() {
            match substitutions.get(call.id) {
                Some(Substitution::Resolved(result)) => return Ok(result.clone()),
                Some(Substitution::Pending) => return Ok(Value::Deferred(Deferred::waiting())),
                None => {}
            }
        }

        let mut pending = Pending::default();
        let mut operands = self.eval_all(&call.args, value, ctx, &mut pending)?;
        if pending.is_waiting() {
            return Ok(pending.or(Value::Null));
        }

        let kind = match call.op {
            Operator::Delay => {
                let result = operands.pop().unwrap_or(Value::Null);
                let millis = operands.first().map_or(0.0, delay_millis);
                AsyncCall::Delay {
                    millis: millis as u64,
                    result,
                }
            }
            _ => {
                let target = operands.first().map(Value::to_text).unwrap_or_default();
                let args = if operands.len() > 1 {
                    operands.split_off(1)
                } else {
                    vec![value.clone()]
                };
                AsyncCall::Remote { target, args }
            }
        };

        match ctx.environment() {
            Environment::Trusted(registry) => Ok(match kind {
                AsyncCall::Remote { target, args } => registry.invoke(&target, &args),
                AsyncCall::Delay { result, .. } => result,
            }),
            Environment::Interactive(_) => Ok(Value::Deferred(Deferred::single(PendingCall {
                call: call.id,
                kind,
            }))),
        }
    }
}

/// Milliseconds for `delay`; anything that is not a non-negative number
/// is no delay.
fn delay_millis(value: &Value) -> f64 {
    let millis = match value {
        Value::Number(n) => *n,
        Value::String(s) => coerce::parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if millis.is_finite() { millis.max(0.0) } else { 0.0 }
}

/// Evaluates a rule on the trusted side.
pub fn evaluate_sync(
    rule: &Rule,
    value: &Value,
    container: &dyn Container,
    registry: &RemoteRegistry,
) -> Result<Value, EvalError> {
    let fields = GraphResolver::new(container);
    let ctx = EvalContext::trusted(&fields, registry);
    Evaluator::new().evaluate(rule.root(), value, &ctx)
}

/// Validates a value on the trusted side: the rule passes when its result
/// is present.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use validif_lang::{validate_sync, RemoteRegistry, Rule, Value};
///
/// let model = json!({ "Empty": "", "One": 1 });
/// let registry = RemoteRegistry::empty();
/// let rule = Rule::parse("['present','One']").unwrap();
///
/// assert!(validate_sync(&rule, &Value::Number(1.0), &model, &registry).unwrap());
/// ```
pub fn validate_sync(
    rule: &Rule,
    value: &Value,
    container: &dyn Container,
    registry: &RemoteRegistry,
) -> Result<bool, EvalError> {
    Ok(evaluate_sync(rule, value, container, registry)?.is_present())
}
