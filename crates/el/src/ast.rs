//! Abstract syntax tree for EL expressions.
//!
//! Trees are built once by the [`Parser`](crate::parser::Parser) and never change
//! afterwards. They carry no per-evaluation state, so one tree can be cached and
//! evaluated any number of times, from any number of threads, against different
//! contexts.

use std::fmt;
use std::sync::Arc;

use crate::expression::ValueExpression;
use crate::functions::FunctionRef;

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal.
    String(String),
    /// Integer literal.
    Long(i64),
    /// Floating point literal.
    Double(f64),
    /// Boolean literal.
    Boolean(bool),
    /// Null literal.
    Null,

    /// Plain identifier resolved through the context at evaluation time.
    Identifier(String),
    /// Implicit object registered on the context, e.g. a container scope.
    Implicit(String),
    /// Identifier bound through the variable mapper when the expression was parsed.
    Variable {
        name: String,
        expression: Arc<ValueExpression>,
    },
    /// Reference to a parameter of an enclosing lambda.
    LambdaVar(String),
    /// Parenthesised parameter list `(a, b)` waiting for a `->`.
    LambdaParams(Vec<String>),
    /// Lambda expression `params -> body`.
    Lambda { params: Vec<String>, body: Arc<Expr> },

    /// Property access: `object.field` or `object[field]`.
    Field { object: Box<Expr>, field: Box<Expr> },

    /// Arithmetic operation, e.g. `left + right`.
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short circuiting `&&` / `||`.
    Logical {
        op: LogicalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison, e.g. `left < right`.
    Compare {
        op: CompareOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation, e.g. `!expr`.
    Unary { op: UnaryOperator, expr: Box<Expr> },
    /// String concatenation `left += right`.
    Concat { left: Box<Expr>, right: Box<Expr> },

    /// `test ? then : otherwise`.
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `value ?: default`.
    ConditionalNull { value: Box<Expr>, default: Box<Expr> },
    /// `target = value`.
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// `left ; right`.
    Semicolon { left: Box<Expr>, right: Box<Expr> },

    /// Function resolved through the function mapper, e.g. `fn:length`.
    Function { name: String, function: FunctionRef },
    /// Invocation of a callable value: `f(args)`, `(x -> x + 1)(2)`.
    Call { target: Box<Expr>, args: Vec<Expr> },
    /// Method invocation `object.method(args)`.
    Method {
        object: Box<Expr>,
        method: Box<Expr>,
        args: Vec<Expr>,
    },

    /// List literal `[a, b]`.
    List(Vec<Expr>),
    /// Set literal `{a, b}`.
    Set(Vec<Expr>),
    /// Map literal `{k: v}`.
    Map(Vec<MapEntry>),

    /// Literal text followed by an embedded expression (or the reverse) in a template.
    Interpolate { left: Box<Expr>, right: Box<Expr> },
}

/// A `key: value` entry of a map literal.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// Arithmetic operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Logical operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Comparison operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Matches,
}

/// Unary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Empty,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

impl LogicalOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Eq => "==",
            CompareOperator::Ne => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::Le => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::Ge => ">=",
            CompareOperator::Matches => "matches",
        }
    }
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Minus => "-",
            UnaryOperator::Empty => "empty ",
        }
    }
}

impl Expr {
    /// Returns true if the expression only consists of literals.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::String(_) | Expr::Long(_) | Expr::Double(_) | Expr::Boolean(_) | Expr::Null => {
                true
            }
            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::Concat { left, right }
            | Expr::Interpolate { left, right } => left.is_constant() && right.is_constant(),
            Expr::Unary { expr, .. } => expr.is_constant(),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => test.is_constant() && then.is_constant() && otherwise.is_constant(),
            Expr::ConditionalNull { value, default } => {
                value.is_constant() && default.is_constant()
            }
            Expr::List(items) | Expr::Set(items) => items.iter().all(Expr::is_constant),
            Expr::Map(entries) => entries
                .iter()
                .all(|entry| entry.key.is_constant() && entry.value.is_constant()),
            _ => false,
        }
    }

    /// Returns true for a template that contained no embedded expression at all.
    pub fn is_literal_text(&self) -> bool {
        matches!(self, Expr::String(_))
    }

    /// Wraps this expression in a field access `self[field]`.
    pub fn create_field(self, field: Expr) -> Expr {
        Expr::Field {
            object: Box::new(self),
            field: Box::new(field),
        }
    }

    /// Turns this expression into an invocation with the given arguments.
    ///
    /// Returns `None` when the expression can never be called, e.g. a literal.
    pub fn create_method(self, args: Vec<Expr>) -> Option<Expr> {
        match self {
            Expr::Field { object, field } => Some(Expr::Method {
                object,
                method: field,
                args,
            }),
            Expr::Identifier(_)
            | Expr::Implicit(_)
            | Expr::Variable { .. }
            | Expr::LambdaVar(_)
            | Expr::Lambda { .. }
            | Expr::Function { .. }
            | Expr::Call { .. }
            | Expr::Method { .. }
            | Expr::Conditional { .. }
            | Expr::ConditionalNull { .. } => Some(Expr::Call {
                target: Box::new(self),
                args,
            }),
            _ => None,
        }
    }

    /// Returns the name this expression contributes as a lambda parameter, if it is a
    /// bare name.
    pub fn lambda_param_name(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name)
            | Expr::Implicit(name)
            | Expr::LambdaVar(name)
            | Expr::Variable { name, .. } => Some(name),
            Expr::Function { name, .. } if !name.contains(':') => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::String(text) => write!(f, "'{}'", text.replace('\'', "\\'")),
            Expr::Long(value) => write!(f, "{value}"),
            Expr::Double(value) => write!(f, "{}", crate::value::format_double(*value)),
            Expr::Boolean(value) => write!(f, "{value}"),
            Expr::Null => write!(f, "null"),
            Expr::Identifier(name)
            | Expr::Implicit(name)
            | Expr::LambdaVar(name)
            | Expr::Variable { name, .. }
            | Expr::Function { name, .. } => write!(f, "{name}"),
            Expr::LambdaParams(params) => write!(f, "({})", params.join(", ")),
            Expr::Lambda { params, body } => write!(f, "({}) -> {body}", params.join(", ")),
            Expr::Field { object, field } => match field.as_ref() {
                Expr::String(name) if is_plain_name(name) => write!(f, "{object}.{name}"),
                other => write!(f, "{object}[{other}]"),
            },
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Logical { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Compare { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Unary { op, expr } => write!(f, "{}{expr}", op.symbol()),
            Expr::Concat { left, right } => write!(f, "({left} += {right})"),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "({test} ? {then} : {otherwise})"),
            Expr::ConditionalNull { value, default } => write!(f, "({value} ?: {default})"),
            Expr::Assign { target, value } => write!(f, "{target} = {value}"),
            Expr::Semicolon { left, right } => write!(f, "{left}; {right}"),
            Expr::Call { target, args } => {
                write!(f, "{target}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Method {
                object,
                method,
                args,
            } => {
                match method.as_ref() {
                    Expr::String(name) if is_plain_name(name) => write!(f, "{object}.{name}(")?,
                    other => write!(f, "{object}[{other}](")?,
                }
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Set(items) => {
                write!(f, "{{")?;
                write_list(f, items)?;
                write!(f, "}}")
            }
            Expr::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{}: {}", entry.key, entry.value))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Expr::Interpolate { left, right } => write!(f, "{left} {right}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    let rendered: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    write!(f, "{}", rendered.join(", "))
}

fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(crate::lexer::is_ident_start)
        && chars.all(crate::lexer::is_ident_part)
}
