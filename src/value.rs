use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::{ast::CallId, coerce};

/// A runtime value of the rule language.
///
/// There is no integer type: every number, whether written `2` or `2.0`, is
/// an `f64`. `Deferred` is not a user-visible value; it marks a result that
/// still depends on asynchronous calls.
///
/// # Examples
///
/// ```
/// use validif_lang::Value;
///
/// assert!(Value::Number(0.0).is_present());
/// assert!(!Value::String("False".to_string()).is_present());
/// assert!(!Value::List(vec![]).is_present());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value
    Null,

    /// `true` / `false`
    Boolean(bool),

    /// Any number
    Number(f64),

    /// UTF-8 text
    String(String),

    /// Calendar date and time, without an offset
    Date(NaiveDateTime),

    /// Ordered list, e.g. a multi-select input
    List(Vec<Value>),

    /// Result that is waiting on asynchronous calls
    Deferred(Deferred),
}

/// Asynchronous work captured from a `remote` or `delay` call site, with its
/// operands already evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncCall {
    /// Invoke a registered validator
    Remote { target: String, args: Vec<Value> },

    /// Resolve to `result` after `millis` milliseconds
    Delay { millis: u64, result: Value },
}

/// An async call that must complete before the rule can be decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    /// The call node this work belongs to
    pub call: CallId,
    pub kind: AsyncCall,
}

/// The set of pending calls behind a deferred result.
///
/// An empty set still means "not decided yet": every call it depends on has
/// already been launched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deferred {
    calls: Vec<PendingCall>,
}

impl Deferred {
    /// Waiting on calls that are already in flight.
    pub fn waiting() -> Self {
        Self::default()
    }

    pub fn single(call: PendingCall) -> Self {
        Deferred { calls: vec![call] }
    }

    pub fn calls(&self) -> &[PendingCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<PendingCall> {
        self.calls
    }

    /// Union with another set; a call node appears at most once.
    pub fn merge(&mut self, other: Deferred) {
        for call in other.calls {
            if !self.calls.iter().any(|c| c.call == call.call) {
                self.calls.push(call);
            }
        }
    }
}

impl Value {
    /// The language's pass/fail predicate.
    ///
    /// Distinct from truthiness: zero is present, `"false"` is not. Callers
    /// must settle `Deferred` values first; they are reported as absent here.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            Value::Number(_) => true,
            Value::Date(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Deferred(_) => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Get as number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used by `concat`, `str`, `len`, `regex` and field paths.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) if d.nanosecond() == 0 => d.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::Date(d) => d.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Deferred(_) => String::new(),
        }
    }

    /// Interpret raw text the way form inputs and remote responses are read:
    /// booleans, then numbers, then dates, otherwise the text itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use validif_lang::Value;
    ///
    /// assert_eq!(Value::infer("True"), Value::Boolean(true));
    /// assert_eq!(Value::infer(" 42 "), Value::Number(42.0));
    /// assert!(matches!(Value::infer("2000-01-01"), Value::Date(_)));
    /// assert_eq!(Value::infer("H0H0H0"), Value::String("H0H0H0".to_string()));
    /// ```
    pub fn infer(text: &str) -> Value {
        match text {
            "true" | "True" => return Value::Boolean(true),
            "false" | "False" => return Value::Boolean(false),
            _ => {}
        }
        if let Some(n) = coerce::parse_number(text) {
            return Value::Number(n);
        }
        if let Some(d) = coerce::parse_date(text) {
            return Value::Date(d);
        }
        Value::String(text.to_string())
    }

    /// Apply [`Value::infer`] to strings, recursing into lists.
    pub fn inferred(self) -> Value {
        match self {
            Value::String(s) => Value::infer(&s),
            Value::List(items) => Value::List(items.into_iter().map(Value::inferred).collect()),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Deferred(d) => write!(f, "<deferred on {} call(s)>", d.calls().len()),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
