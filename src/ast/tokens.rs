use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Number; integers and floats share one representation
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -3.5
    /// 1e3
    /// ```
    Number(f64),

    /// String enclosed in single or double quotes
    ///
    /// Depending on position this is a field path or a string constant.
    ///
    /// # Examples
    /// ```text
    /// 'Obj.Sub.DtToday'
    /// "[0-9]{5}"
    /// ```
    String(String),

    /// Boolean values
    ///
    /// # Examples
    /// ```text
    /// true
    /// false
    /// ```
    Boolean(bool),

    /// Null value
    Null,

    // Delimiters
    /// Opens an operator call
    LBracket,

    /// Closes an operator call
    RBracket,

    /// Separates operator name and arguments
    Comma,

    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Null => write!(f, "null"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
