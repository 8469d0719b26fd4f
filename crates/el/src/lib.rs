//! A Unified Expression Language (EL) engine.
//!
//! Templates such as `Hello ${user.name}!` are parsed once into an immutable
//! [`Expr`] tree and evaluated any number of times against an [`ElContext`], which
//! supplies variables, property resolution, functions and lambda scopes.
//!
//! ```rust
//! use uel::{ElContext, Value};
//!
//! let mut ctx = ElContext::new();
//! ctx.variables().define("name", "world");
//!
//! let expr = uel::parse(&ctx, "Hello ${fn:toUpperCase(name)}!").unwrap();
//! assert_eq!(expr.get_value(&mut ctx).unwrap(), Value::from("Hello WORLD!"));
//!
//! let expr = uel::parse_expression(&ctx, "[1, 2, 3].size() * 2").unwrap();
//! assert_eq!(expr.get_value(&mut ctx).unwrap(), Value::Long(6));
//! ```

pub mod ast;
pub mod coerce;
pub mod context;
pub mod error;
pub mod eval;
pub mod expression;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod resolver;
pub mod value;

pub use crate::ast::Expr;
pub use crate::context::{ElContext, ImportHandler, VariableMapper};
pub use crate::error::{CoercionError, ElError, ElResult, ParseError};
pub use crate::eval::ValueReference;
pub use crate::expression::{MethodExpression, ValueExpression};
pub use crate::functions::{FunctionMapper, FunctionRef};
pub use crate::parser::Parser;
pub use crate::resolver::Resolver;
pub use crate::value::{Bean, HostObject, Value, ValueType};

/// Parses a template: literal text with embedded `${...}` or `#{...}` expressions.
pub fn parse(context: &ElContext, source: &str) -> Result<Expr, ParseError> {
    log::debug!("parsing template {source:?}");
    Parser::new(context, source).parse()
}

/// Parses a single expression without template delimiters, e.g. `a + b`.
pub fn parse_expression(context: &ElContext, source: &str) -> Result<Expr, ParseError> {
    log::debug!("parsing expression {source:?}");
    Parser::new(context, source).parse_expr()
}
