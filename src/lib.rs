//! A declarative rule language for field validation.
//!
//! Rules are nested arrays such as `['if','Other','',true]`. The same rule
//! runs in two environments: [`validate_sync`] decides it on the trusted
//! side, calling remote validators in-process, while the
//! [`scheduler`] decides it interactively, suspending on `remote` and
//! `delay` calls and re-evaluating as their results arrive.

pub mod ast;
pub mod cache;
pub mod coerce;
pub mod convert;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod presets;
pub mod registry;
pub mod resolve;
pub mod runtime;
pub mod scheduler;
pub mod value;
pub mod wire;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{CallId, Expr, Operator, Rule, Token};
pub use cache::{LazyRule, RuleCache};
pub use evaluator::{evaluate_sync, validate_sync, EvalContext, EvalError, Evaluator};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use registry::{RemoteRegistry, SharedRegistry};
pub use resolve::{Container, FieldAccessor, FormFields};
pub use scheduler::{FieldScheduler, FormScheduler, Verdict};
pub use value::Value;
