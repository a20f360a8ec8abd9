use std::fmt;

use crate::{ast::Operator, value::Value};

/// Identity of a call node within its rule.
///
/// Assigned by the parser in pre-order, so two calls that look identical but
/// sit at different positions in the tree get different ids. The async
/// scheduler keys its substitutions on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub usize);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Abstract Syntax Tree node representing a parsed rule.
///
/// The tree is immutable once parsed and is shared by every evaluation of
/// the rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    ///
    /// Booleans, numbers and null appear as-is. Strings only become
    /// literals as the argument of `str`.
    ///
    /// # Example
    /// ```text
    /// 42
    /// true
    /// ['str', 'a.b']
    /// ```
    Literal(Value),

    /// Dotted field path
    ///
    /// Resolved against the object under validation. The empty path is the
    /// value under test.
    ///
    /// # Example
    /// ```text
    /// 'Obj.Sub.Y2K'
    /// ''
    /// ```
    Field(String),

    /// Operator call
    ///
    /// # Example
    /// ```text
    /// ['gte', 'RangeMin']
    /// ```
    Call(Call),
}

/// An operator applied to its argument sub-rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub id: CallId,
    pub op: Operator,
    pub args: Vec<Expr>,
}

impl fmt::Display for Expr {
    /// Renders the canonical, double-quoted JSON form of the rule.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write_quoted(f, s),
            Expr::Literal(Value::Null) => write!(f, "null"),
            Expr::Literal(Value::Boolean(b)) => write!(f, "{}", b),
            Expr::Literal(Value::Number(n)) => write!(f, "{}", n),
            Expr::Literal(other) => write_quoted(f, &other.to_text()),
            Expr::Field(path) => write_quoted(f, path),
            Expr::Call(call) => {
                write!(f, "[")?;
                write_quoted(f, call.op.name())?;
                for arg in &call.args {
                    write!(f, ",{}", arg)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let encoded = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&encoded)
}
