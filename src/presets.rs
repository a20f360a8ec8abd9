//! Ready-made rules for the common cases.
//!
//! Each function returns rule text; field names are escaped, so any name
//! is safe to pass.

use crate::value::Value;

/// The other side of a preset comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Number(f64),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Operand::Field(name.into())
    }

    fn to_rule(&self) -> String {
        match self {
            Operand::Field(name) => quoted(name),
            Operand::Number(n) => Value::Number(*n).to_text(),
        }
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Field(name.to_string())
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Number(n)
    }
}

impl From<i32> for Operand {
    fn from(n: i32) -> Self {
        Operand::Number(f64::from(n))
    }
}

fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn compare(op: &str, other: impl Into<Operand>) -> String {
    format!(r#"["{}",{}]"#, op, other.into().to_rule())
}

/// Required when `other` is present.
pub fn required_if(other: &str) -> String {
    format!(r#"["if",{},"",true]"#, quoted(other))
}

/// Required when `other` is absent: one of the two must be given.
pub fn required_if_absent(other: &str) -> String {
    format!(r#"["or","",{}]"#, quoted(other))
}

pub fn equal_to(other: impl Into<Operand>) -> String {
    compare("eq", other)
}

pub fn less_than(other: impl Into<Operand>) -> String {
    compare("lt", other)
}

pub fn less_than_or_equal_to(other: impl Into<Operand>) -> String {
    compare("lte", other)
}

pub fn greater_than(other: impl Into<Operand>) -> String {
    compare("gt", other)
}

pub fn greater_than_or_equal_to(other: impl Into<Operand>) -> String {
    compare("gte", other)
}
