//! Evaluate a rule against a value and a JSON model

use serde::Serialize;

use super::CliError;
use crate::{
    convert::{json_to_value, value_to_json},
    evaluator::evaluate_sync,
    resolve::NoFields,
    RemoteRegistry, Rule, Value,
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The rule to evaluate
    pub rule: String,
    /// The value under test, as JSON
    pub value: Option<String>,
    /// The model the rule's field paths refer to, as JSON
    pub input: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Syntax validation passed; carries the canonical rule text
    SyntaxValid(String),
    /// The rule was evaluated
    Evaluated(Outcome),
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Outcome {
    /// What the rule evaluated to
    pub result: serde_json::Value,
    /// Whether that result counts as passing
    pub valid: bool,
}

/// Execute a check operation.
///
/// Remote validators are not available from the command line, so every
/// `remote` call evaluates to null.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let rule = Rule::parse(&options.rule)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid(rule.canonical_text()));
    }

    let value = match &options.value {
        Some(json) => json_to_value(&serde_json::from_str(json)?).inferred(),
        None => Value::Null,
    };

    let registry = RemoteRegistry::empty();
    let result = match &options.input {
        Some(json) => {
            let model: serde_json::Value = serde_json::from_str(json)?;
            evaluate_sync(&rule, &value, &model, &registry)?
        }
        None => evaluate_sync(&rule, &value, &NoFields, &registry)?,
    };

    Ok(CheckResult::Evaluated(Outcome {
        valid: result.is_present(),
        result: value_to_json(&result),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn check(rule: &str, value: &str, input: &str) -> CheckResult {
        execute_check(&CheckOptions {
            rule: rule.to_string(),
            value: Some(value.to_string()),
            input: Some(input.to_string()),
            syntax_only: false,
        })
        .unwrap()
    }

    #[test]
    fn evaluates_against_the_model() {
        let result = check("['lt','Two']", "1", r#"{"Two": 2}"#);
        assert_eq!(
            result,
            CheckResult::Evaluated(Outcome {
                result: json!(true),
                valid: true,
            })
        );
    }

    #[test]
    fn syntax_only_returns_canonical_text() {
        let options = CheckOptions {
            rule: "['eq',['str','a']]".to_string(),
            syntax_only: true,
            ..Default::default()
        };
        assert_eq!(
            execute_check(&options).unwrap(),
            CheckResult::SyntaxValid(r#"["eq",["str","a"]]"#.to_string())
        );
    }

    #[test]
    fn bad_rules_are_parse_errors() {
        let options = CheckOptions {
            rule: "['nope']".to_string(),
            ..Default::default()
        };
        assert!(matches!(execute_check(&options), Err(CliError::Parse(_))));
    }
}
