//! Error types for EL parsing and evaluation.

use thiserror::Error;

/// Result type used by evaluation and by the context/resolver contract.
pub type ElResult<T> = Result<T, ElError>;

/// A lexical or syntactic error raised while building an expression tree.
///
/// The message already includes a description of the offending position (a quoted
/// character, `end of line` or `end of file`). The full source text is kept so that an
/// embedding container can render it alongside the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} in {expression}")]
pub struct ParseError {
    /// A description of what went wrong
    pub message: String,
    /// The source text that was being parsed
    pub expression: String,
}

impl ParseError {
    /// Create a new parse error for the given source text.
    pub fn new(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expression: expression.into(),
        }
    }
}

/// A value could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {value} of type {from} to {to}")]
pub struct CoercionError {
    /// Rendered form of the offending value
    pub value: String,
    pub from: &'static str,
    pub to: &'static str,
}

/// Errors raised by the evaluator, the resolvers and the function mapper.
#[derive(Debug, Error)]
pub enum ElError {
    /// The expression could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A strict lookup could not resolve the named property.
    #[error("property '{property}' not found{}", on_base(.base))]
    PropertyNotFound {
        property: String,
        base: Option<&'static str>,
    },
    /// The target of an assignment cannot be written.
    #[error("'{0}' is not writable")]
    NotWritable(String),
    /// No method with the given name could be invoked on the base value.
    #[error("method '{method}' not found{}", on_base(.base))]
    MethodNotFound {
        method: String,
        base: Option<&'static str>,
    },
    /// The node has no value of its own, e.g. a lambda parameter list without `->`.
    #[error("'{0}' cannot be evaluated")]
    NotEvaluable(String),
    /// The value in call position cannot be invoked.
    #[error("'{0}' is not a function or lambda expression")]
    NotCallable(String),
    /// A function or lambda was invoked with the wrong number of arguments.
    #[error("'{name}' expects {expected} arguments, got {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    /// The invoked function itself failed. The original failure is kept as the source.
    #[error("error invoking '{name}'")]
    Invocation {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    /// An operand could not be coerced to the type an operator needs.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    /// Arithmetic failure such as an integer modulo by zero.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    /// The right hand side of `matches` is not a valid regular expression.
    #[error("invalid pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ElError {
    /// Shorthand for a property lookup failure.
    pub fn property_not_found(property: impl Into<String>, base: Option<&'static str>) -> Self {
        ElError::PropertyNotFound {
            property: property.into(),
            base,
        }
    }

    /// Shorthand for a method lookup failure.
    pub fn method_not_found(method: impl Into<String>, base: Option<&'static str>) -> Self {
        ElError::MethodNotFound {
            method: method.into(),
            base,
        }
    }
}

fn on_base(base: &Option<&'static str>) -> String {
    match base {
        Some(ty) => format!(" on {ty}"),
        None => String::new(),
    }
}
