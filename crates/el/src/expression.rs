//! Parsed expressions ready to be evaluated, as handed out to embedding containers.
//!
//! A [`ValueExpression`] is a template or expression together with the type its
//! result should be converted to. A [`MethodExpression`] refers to something
//! invocable, such as `#{bean.save}`, and is invoked with caller supplied arguments.

use std::fmt;

use crate::ast::Expr;
use crate::coerce::{convert_to_type, to_string};
use crate::context::ElContext;
use crate::error::{ElError, ElResult, ParseError};
use crate::eval::{ValueReference, invoke_callable, invoke_method};
use crate::parser::Parser;
use crate::value::{Value, ValueType};

/// A parsed template evaluated to a value of an expected type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueExpression {
    source: String,
    expr: Expr,
    expected_type: ValueType,
}

impl ValueExpression {
    /// Parses a template. The result is not converted until
    /// [`ValueExpression::with_expected_type`] says otherwise.
    pub fn parse(context: &ElContext, source: &str) -> Result<Self, ParseError> {
        let expr = Parser::new(context, source).parse()?;
        log::debug!("parsed value expression {source:?}");
        Ok(Self::from_expr(source, expr))
    }

    /// Wraps an already parsed tree.
    pub fn from_expr(source: impl Into<String>, expr: Expr) -> Self {
        Self {
            source: source.into(),
            expr,
            expected_type: ValueType::Any,
        }
    }

    /// Sets the type results are converted to.
    pub fn with_expected_type(mut self, expected_type: ValueType) -> Self {
        self.expected_type = expected_type;
        self
    }

    pub fn expected_type(&self) -> ValueType {
        self.expected_type
    }

    /// The source text the expression was parsed from.
    pub fn expression_string(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// True if the source contained no `${...}` or `#{...}` at all.
    pub fn is_literal_text(&self) -> bool {
        self.expr.is_literal_text()
    }

    /// Evaluates the expression and converts the result to the expected type.
    pub fn get_value(&self, ctx: &mut ElContext) -> ElResult<Value> {
        let value = self.expr.get_value(ctx)?;
        Ok(convert_to_type(value, self.expected_type)?)
    }

    pub fn set_value(&self, ctx: &mut ElContext, value: Value) -> ElResult<()> {
        self.expr.set_value(ctx, value)
    }

    pub fn is_read_only(&self, ctx: &mut ElContext) -> ElResult<bool> {
        self.expr.is_read_only(ctx)
    }

    pub fn get_type(&self, ctx: &mut ElContext) -> ElResult<ValueType> {
        self.expr.get_type(ctx)
    }

    pub fn get_value_reference(&self, ctx: &mut ElContext) -> ElResult<Option<ValueReference>> {
        self.expr.get_value_reference(ctx)
    }
}

impl fmt::Display for ValueExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A parsed reference to a method, lambda or function.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodExpression {
    source: String,
    expr: Expr,
    expected_type: ValueType,
}

impl MethodExpression {
    /// Parses a method expression. Only a single embedded expression naming something
    /// invocable is accepted, or plain text.
    pub fn parse(context: &ElContext, source: &str) -> Result<Self, ParseError> {
        let expr = Parser::new(context, source)
            .method_expression(true)
            .parse()?;
        log::debug!("parsed method expression {source:?}");
        Ok(Self {
            source: source.to_string(),
            expr,
            expected_type: ValueType::Any,
        })
    }

    /// Sets the type results are converted to.
    pub fn with_expected_type(mut self, expected_type: ValueType) -> Self {
        self.expected_type = expected_type;
        self
    }

    pub fn expression_string(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn is_literal_text(&self) -> bool {
        self.expr.is_literal_text()
    }

    /// Invokes the referenced method with `params`.
    ///
    /// `#{bean.save}` calls `save` on `bean` with `params`. An expression with its
    /// own argument list, such as `#{bean.save(1)}`, is evaluated as written and
    /// `params` are ignored. A name that evaluates to a lambda or function is called
    /// with `params`. Plain text is returned as is.
    pub fn invoke(&self, ctx: &mut ElContext, params: Vec<Value>) -> ElResult<Value> {
        let result = match &self.expr {
            Expr::String(text) => Value::String(text.clone()),
            Expr::Field { object, field } => {
                let base = object.get_value(ctx)?;
                let name = to_string(&field.get_value(ctx)?);
                invoke_method(ctx, &base, &name, params)?
            }
            Expr::Method { .. } | Expr::Call { .. } => self.expr.get_value(ctx)?,
            other => {
                let callee = other.get_value(ctx)?;
                match callee {
                    Value::Lambda(_) | Value::Function(_) => {
                        invoke_callable(ctx, &callee, params, || other.to_string())?
                    }
                    _ => return Err(ElError::NotCallable(other.to_string())),
                }
            }
        };
        Ok(convert_to_type(result, self.expected_type)?)
    }
}

impl fmt::Display for MethodExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
