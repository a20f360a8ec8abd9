//! Documentation content for the validif CLI

use super::CliError;

/// Available documentation topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTopic {
    Syntax,
    Presence,
    Utilities,
    Comparison,
    Async,
    Values,
}

impl DocTopic {
    /// Parse topic name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "presence" | "logic" => Some(Self::Presence),
            "utilities" | "utility" | "utils" => Some(Self::Utilities),
            "comparison" | "compare" | "comparisons" => Some(Self::Comparison),
            "async" | "remote" | "delay" => Some(Self::Async),
            "values" | "value" | "types" => Some(Self::Values),
            _ => None,
        }
    }
}

/// Get the docs overview (topic listing)
pub fn get_docs_overview() -> &'static str {
    r#"VALIDIF DOCUMENTATION

A validation rule decides whether a field's value is acceptable. Rules are
nested arrays: the first element names an operator, the rest are operands.
A rule passes when its result is "present".

DOCUMENTATION TOPICS

  syntax        Literals, field paths, calls and the canonical form
  presence      present, any, absent, anyabsent and their aliases
  utilities     if, coalesce, count, contains, in, regex, str, len, value,
                concat, with
  comparison    eq, neq, lt, lte, gt, gte and the null-passes rule
  async         remote and delay
  values        Presence table, type inference and coercion

QUICK REFERENCE

  ''                            The value under test must be present
  ['present','Other']           Other must be present
  ['if','Other','',true]        Required when Other is present
  ['lte','RangeMax']            At most RangeMax (passes if either is null)
  ['regex',['str','[0-9]{5}']]  Whole value matches the pattern
  ['remote',['str','/check']]   Ask the validator registered as /check
  ['remote','CheckUrl']         Ask the validator named by field CheckUrl

Run 'validif doc <topic>' for detailed documentation.
"#
}

/// Get documentation for a specific topic
pub fn get_doc_topic(name: &str) -> Result<&'static str, CliError> {
    match DocTopic::from_name(name) {
        Some(DocTopic::Syntax) => Ok(SYNTAX_DOC),
        Some(DocTopic::Presence) => Ok(PRESENCE_DOC),
        Some(DocTopic::Utilities) => Ok(UTILITIES_DOC),
        Some(DocTopic::Comparison) => Ok(COMPARISON_DOC),
        Some(DocTopic::Async) => Ok(ASYNC_DOC),
        Some(DocTopic::Values) => Ok(VALUES_DOC),
        None => Err(CliError::UnknownTopic(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Rules, Literals and Field Paths

LITERALS
  true  false  null  42  -1.5  2e3
    Booleans, null and numbers stand for themselves. `True`/`False` are
    accepted too.

FIELD PATHS
  'Name'   'Obj.Sub.Y2K'   ''
    A quoted string is a field path, resolved against the model being
    validated. The empty path is the value under test.

    Constraints:
      - Missing fields resolve to null, never an error
      - A path ending on a nested object resolves to null
      - Single and double quotes are both accepted

STRING CONSTANTS
  ['str','text']
    The only way to write a string constant.

CALLS
  ['op', operand, ...]
    Operands are evaluated left to right unless the operator decides early.
    Unknown operators and wrong operand counts are rejected when the rule
    is parsed.

CANONICAL FORM
  validif canonical "['eq',['str','a']]"
    Prints ["eq",["str","a"]], the double-quoted JSON form.
"#;

const PRESENCE_DOC: &str = r#"PRESENCE - Boolean Logic Over Presence

  present / all / and
    []         the value under test is present
    [a, b...]  every operand is present; stops at the first absent one

  any / or
    []         the value under test is present
    [a, b...]  some operand is present; stops at the first present one

  absent / not
    []         the value under test is absent
    [a, b...]  every operand is absent; stops at the first present one

  anyabsent / nor
    []         the value under test is absent
    [a, b...]  some operand is absent; stops at the first absent one

  Example:
    ['or','','Other']      one of this field or Other must be given
"#;

const UTILITIES_DOC: &str = r#"UTILITIES

  ['if', c1, r1, c2, r2, ..., else]
    The result of the first present condition; else the trailing operand,
    or null when there is none.

  ['coalesce', a, b, ...]      first present operand, else null
  ['count', a, b, ...]         number of present operands

  ['contains', x]              the value under test contains x
  ['contains', h1, h2, ..., x] some haystack contains x
    Haystacks are lists or single values.

  ['in', c1, ...]              the value under test is among the candidates
  ['in', test, c1, ...]        test is among the candidates
    Lists on either side are flattened.

  ['regex', pattern]           the whole value matches
  ['regex', test, pattern]     the whole of test matches
    Patterns are anchored at both ends.

  ['str', 'text']              a string constant
  ['len']  ['len', x]          list length or text length; null is 0
  ['value', x]                 the field whose path is x's text
  ['concat', a, b, ...]        the operands' text, joined
  ['with', 'Path', rule]       evaluate rule with paths relative to Path

  Example:
    ['with','President',['eq','Country',666]]
"#;

const COMPARISON_DOC: &str = r#"COMPARISON

  eq  neq  lt  lte  gt  gte
    ['lt', other]           the value under test < other
    ['lt', first, second]   first < second

NULL PASSES
  If either side is null the comparison is true, so optional fields are
  only compared when given. The first side is checked before the second is
  evaluated.

COERCION
  Number vs numeric text     compared as numbers
  Date vs date text          compared as dates
  Boolean vs "true"/"false"  compared as booleans
  Text vs text               as numbers, dates or booleans when both
                             read as one; otherwise lexically
  List vs list               equal when element-wise equal
  Anything else              never equal, never ordered (neq is true)
"#;

const ASYNC_DOC: &str = r#"ASYNC - remote and delay

  ['remote', id]
  ['remote', id, arg1, ...]
    Call the validator registered under id's text, with the arguments (or
    the value under test). On the server the call is made in-process; an
    unregistered id gives null. In the browser the call is a POST with
    body {"args": [...]}, answered with a single JSON value.

  ['delay', ms, result]
    Server: result. Browser: result after ms milliseconds.

  While calls are outstanding the rule is re-evaluated as each answer
  arrives; once the answer is known, remaining calls are aborted.

  Note: the CLI registers no validators.
"#;

const VALUES_DOC: &str = r#"VALUES - Presence and Types

PRESENCE
  null           absent
  true / false   the boolean itself
  text           present unless empty or "false" (any case)
  number         always present, zero included
  date           always present
  list           present unless empty

TYPE INFERENCE
  Text from form inputs and remote answers is read as:
    "true" / "True"      boolean true
    "false" / "False"    boolean false
    numeric text         number
    date text            date (2000-01-31, 2000-01-31T10:00, 01/31/2000)
    anything else        text
"#;
