use std::cmp::Ordering;

/// Built-in operators.
///
/// Aliases collapse onto one variant when parsing, e.g. `and`, `all` and
/// `present` are all [`Operator::Present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Presence
    /// Every operand present (`present`, `all`, `and`)
    Present,
    /// Any operand present (`any`, `or`)
    Any,
    /// Every operand absent (`absent`, `not`)
    Absent,
    /// Any operand absent (`anyabsent`, `nor`)
    AnyAbsent,

    // Utilities
    /// Condition/result pairs with a trailing else (`if`)
    If,
    /// First present operand (`coalesce`)
    Coalesce,
    /// Number of present operands (`count`)
    Count,
    /// List membership (`contains`)
    Contains,
    /// Set membership (`in`)
    In,
    /// Anchored pattern match (`regex`)
    Regex,
    /// String constant (`str`)
    Str,
    /// List or text length (`len`)
    Len,
    /// Indirect field lookup (`value`)
    Value,
    /// Text concatenation (`concat`)
    Concat,
    /// Context rebind (`with`)
    With,

    // Comparison
    /// `eq`, `neq`, `lt`, `lte`, `gt`, `gte`
    Compare(Comparison),

    // Asynchronous on the interactive side
    /// Registered validator call (`remote`)
    Remote,
    /// Timed pass-through (`delay`)
    Delay,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Equal (`eq`)
    Equal,
    /// Not equal (`neq`)
    NotEqual,
    /// Less than (`lt`)
    LessThan,
    /// Less than or equal (`lte`)
    LessEqual,
    /// Greater than (`gt`)
    GreaterThan,
    /// Greater than or equal (`gte`)
    GreaterEqual,
}

impl Comparison {
    /// Decide the comparison from an ordering; `None` means incomparable.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            Comparison::Equal => ordering == Some(Ordering::Equal),
            Comparison::NotEqual => ordering != Some(Ordering::Equal),
            Comparison::LessThan => ordering == Some(Ordering::Less),
            Comparison::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Comparison::GreaterThan => ordering == Some(Ordering::Greater),
            Comparison::GreaterEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }
}

impl Operator {
    /// Look up an operator by the name used in rule text.
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "present" | "all" | "and" => Operator::Present,
            "any" | "or" => Operator::Any,
            "absent" | "not" => Operator::Absent,
            "anyabsent" | "nor" => Operator::AnyAbsent,
            "if" => Operator::If,
            "coalesce" => Operator::Coalesce,
            "count" => Operator::Count,
            "contains" => Operator::Contains,
            "in" => Operator::In,
            "regex" => Operator::Regex,
            "str" => Operator::Str,
            "len" => Operator::Len,
            "value" => Operator::Value,
            "concat" => Operator::Concat,
            "with" => Operator::With,
            "eq" => Operator::Compare(Comparison::Equal),
            "neq" => Operator::Compare(Comparison::NotEqual),
            "lt" => Operator::Compare(Comparison::LessThan),
            "lte" => Operator::Compare(Comparison::LessEqual),
            "gt" => Operator::Compare(Comparison::GreaterThan),
            "gte" => Operator::Compare(Comparison::GreaterEqual),
            "remote" => Operator::Remote,
            "delay" => Operator::Delay,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical name, used when rendering a rule back to text.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Present => "present",
            Operator::Any => "any",
            Operator::Absent => "absent",
            Operator::AnyAbsent => "anyabsent",
            Operator::If => "if",
            Operator::Coalesce => "coalesce",
            Operator::Count => "count",
            Operator::Contains => "contains",
            Operator::In => "in",
            Operator::Regex => "regex",
            Operator::Str => "str",
            Operator::Len => "len",
            Operator::Value => "value",
            Operator::Concat => "concat",
            Operator::With => "with",
            Operator::Compare(Comparison::Equal) => "eq",
            Operator::Compare(Comparison::NotEqual) => "neq",
            Operator::Compare(Comparison::LessThan) => "lt",
            Operator::Compare(Comparison::LessEqual) => "lte",
            Operator::Compare(Comparison::GreaterThan) => "gt",
            Operator::Compare(Comparison::GreaterEqual) => "gte",
            Operator::Remote => "remote",
            Operator::Delay => "delay",
        }
    }

    /// Accepted operand count as `(min, max)`; `None` is unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Operator::Present | Operator::Any | Operator::Absent | Operator::AnyAbsent => (0, None),
            Operator::If | Operator::Coalesce | Operator::Count | Operator::Concat => (0, None),
            Operator::Contains | Operator::In | Operator::Remote => (1, None),
            Operator::Regex | Operator::Compare(_) => (1, Some(2)),
            Operator::Str | Operator::Value => (1, Some(1)),
            Operator::Len => (0, Some(1)),
            Operator::With | Operator::Delay => (2, Some(2)),
        }
    }

    /// True for operators that suspend on the interactive side.
    pub fn is_async(self) -> bool {
        matches!(self, Operator::Remote | Operator::Delay)
    }
}
