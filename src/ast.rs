//! # Validation Rule Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for validation rules:
//! compact, declarative expressions that decide whether a field's value is
//! valid.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, field references, calls)
//! - **[operators]** - The fixed set of built-in operators
//! - **[rule]** - A parsed rule, the unit that gets cached and evaluated
//!
//! ## Quick Start
//!
//! ```text
//! ['if', 'Country', ['regex', ['str', '[0-9]{5}']], true]
//! ```
//!
//! If `Country` is present, the value under test must be five digits.
//!
//! ## Core Concepts
//!
//! ### Rules are arrays
//!
//! A rule is written as JSON (single or double quotes). An array is an
//! operator call whose first element names the operator:
//!
//! ```text
//! ['operator', argument, argument, ...]
//! ```
//!
//! ### Strings are field paths
//!
//! A bare string is a dotted path into the object under validation. The empty
//! string `''` is the value under test itself. To write a string constant, wrap
//! it in `['str', ...]`.
//!
//! ### Presence, not truth
//!
//! A rule passes when its result is *present*: `true`, any number, any date, a
//! non-empty list, or non-empty text other than `"false"`.
//!
//! ## Examples
//!
//! ### Required
//!
//! ```text
//! ''
//! ```
//!
//! ### Range check against sibling fields
//!
//! ```text
//! ['and', ['gte', 'RangeMin'], ['lte', 'RangeMax']]
//! ```
//!
//! ### Relative references
//!
//! ```text
//! ['with', 'President', ['eq', 'Country', 666]]
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod rule;

pub use tokens::Token;
pub use expressions::{Call, CallId, Expr};
pub use operators::{Comparison, Operator};
pub use rule::Rule;
