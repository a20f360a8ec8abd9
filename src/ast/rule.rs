use std::str::FromStr;

use crate::{
    ast::Expr,
    lexer::Lexer,
    parser::{ParseError, Parser},
};

/// A complete, parsed validation rule.
///
/// Parse once, evaluate many times. The tree is never mutated by
/// evaluation, so a `Rule` can be shared freely (typically behind an `Arc`).
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Rule text as written
    source: String,

    /// Root of the expression tree
    root: Expr,

    /// Number of call nodes; call ids are `0..call_count`
    call_count: usize,
}

impl Rule {
    /// Parse rule text.
    ///
    /// # Examples
    ///
    /// ```
    /// use validif_lang::Rule;
    ///
    /// let rule = Rule::parse("['eq', ['str', 'a']]").unwrap();
    /// assert_eq!(rule.canonical_text(), r#"["eq",["str","a"]]"#);
    /// ```
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(Lexer::new(text))?;
        let root = parser.parse()?;
        Ok(Rule {
            source: text.to_string(),
            root,
            call_count: parser.call_count(),
        })
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn call_count(&self) -> usize {
        self.call_count
    }

    /// The double-quoted JSON form handed to interactive clients.
    pub fn canonical_text(&self) -> String {
        self.root.to_string()
    }
}

impl FromStr for Rule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::parse(s)
    }
}
