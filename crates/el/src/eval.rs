//! Tree walking evaluation of [`Expr`] against an [`ElContext`].
//!
//! Reads are lenient for plain identifiers (an unresolved name reads as null) and
//! strict everywhere else: writing, asking for the type of or asking whether an
//! unresolved name is read only fails with [`ElError::PropertyNotFound`].
//!
//! The only state that changes during evaluation is the context's stack of lambda
//! argument frames, so a parsed tree can be evaluated concurrently against separate
//! contexts.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Expr, LogicalOperator, UnaryOperator};
use crate::coerce::{to_boolean, to_string};
use crate::context::ElContext;
use crate::error::{ElError, ElResult};
use crate::operators;
use crate::resolver::Resolver;
use crate::value::{LambdaValue, Value, ValueType};

/// A resolved `(base, property)` pair that an assignment writes through.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReference {
    pub base: Value,
    pub property: Value,
}

impl Expr {
    /// Evaluates the expression.
    pub fn get_value(&self, ctx: &mut ElContext) -> ElResult<Value> {
        match self {
            Expr::String(text) => Ok(Value::String(text.clone())),
            Expr::Long(value) => Ok(Value::Long(*value)),
            Expr::Double(value) => Ok(Value::Double(*value)),
            Expr::Boolean(value) => Ok(Value::Boolean(*value)),
            Expr::Null => Ok(Value::Null),

            Expr::Identifier(name) => identifier_value(ctx, name),
            Expr::Implicit(name) => match ctx.implicit_object(name) {
                Some(value) => Ok(value.clone()),
                None => identifier_value(ctx, name),
            },
            Expr::Variable { expression, .. } => expression.get_value(ctx),
            Expr::LambdaVar(name) => ctx
                .lambda_argument(name)
                .cloned()
                .ok_or_else(|| ElError::property_not_found(name.clone(), None)),
            Expr::LambdaParams(_) => Err(ElError::NotEvaluable(self.to_string())),
            Expr::Lambda { params, body } => Ok(Value::Lambda(LambdaValue::new(
                params.clone(),
                Arc::clone(body),
                ctx.lambda_arguments(),
            ))),

            Expr::Field { object, field } => {
                let base = object.get_value(ctx)?;
                if base.is_null() {
                    return Ok(Value::Null);
                }
                let property = field.get_value(ctx)?;
                if property.is_null() {
                    return Ok(Value::Null);
                }
                let resolver = ctx.resolver();
                resolver
                    .get_value(ctx, Some(&base), &property)?
                    .ok_or_else(|| {
                        ElError::property_not_found(to_string(&property), Some(base.type_name()))
                    })
            }

            Expr::Binary { op, left, right } => {
                let left = left.get_value(ctx)?;
                let right = right.get_value(ctx)?;
                operators::arithmetic(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = to_boolean(&left.get_value(ctx)?)?;
                match (op, left) {
                    (LogicalOperator::And, false) => Ok(Value::Boolean(false)),
                    (LogicalOperator::Or, true) => Ok(Value::Boolean(true)),
                    _ => Ok(Value::Boolean(to_boolean(&right.get_value(ctx)?)?)),
                }
            }
            Expr::Compare { op, left, right } => {
                let left = left.get_value(ctx)?;
                let right = right.get_value(ctx)?;
                operators::compare(*op, &left, &right).map(Value::Boolean)
            }
            Expr::Unary { op, expr } => {
                let value = expr.get_value(ctx)?;
                match op {
                    UnaryOperator::Not => Ok(Value::Boolean(!to_boolean(&value)?)),
                    UnaryOperator::Minus => operators::negate(&value),
                    UnaryOperator::Empty => Ok(Value::Boolean(value.is_empty())),
                }
            }
            Expr::Concat { left, right } | Expr::Interpolate { left, right } => {
                let mut text = to_string(&left.get_value(ctx)?);
                text.push_str(&to_string(&right.get_value(ctx)?));
                Ok(Value::String(text))
            }

            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if to_boolean(&test.get_value(ctx)?)? {
                    then.get_value(ctx)
                } else {
                    otherwise.get_value(ctx)
                }
            }
            Expr::ConditionalNull { value, default } => {
                let value = value.get_value(ctx)?;
                if value.is_null() {
                    default.get_value(ctx)
                } else {
                    Ok(value)
                }
            }
            Expr::Assign { target, value } => assign(ctx, target, value),
            Expr::Semicolon { left, right } => {
                left.get_value(ctx)?;
                right.get_value(ctx)
            }

            Expr::Function { function, .. } => Ok(Value::Function(function.clone())),
            Expr::Call { target, args } => {
                let callee = target.get_value(ctx)?;
                let args = evaluate_all(ctx, args)?;
                invoke_callable(ctx, &callee, args, || target.to_string())
            }
            Expr::Method {
                object,
                method,
                args,
            } => {
                let base = object.get_value(ctx)?;
                let name = to_string(&method.get_value(ctx)?);
                let args = evaluate_all(ctx, args)?;
                invoke_method(ctx, &base, &name, args)
            }

            Expr::List(items) => Ok(Value::List(evaluate_all(ctx, items)?)),
            Expr::Set(items) => {
                let mut set = IndexSet::with_capacity(items.len());
                for item in items {
                    set.insert(item.get_value(ctx)?);
                }
                Ok(Value::Set(set))
            }
            Expr::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for entry in entries {
                    let key = entry.key.get_value(ctx)?;
                    let value = entry.value.get_value(ctx)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// Assigns a value to the expression. Only identifiers, variables bound through the
    /// variable mapper, property accesses and the right side of `;` can be written.
    pub fn set_value(&self, ctx: &mut ElContext, value: Value) -> ElResult<()> {
        match self {
            Expr::Identifier(name) => {
                if ctx.is_lambda_argument(name) {
                    return Err(ElError::NotWritable(name.clone()));
                }
                if let Some(expression) = ctx.variable_mapper().resolve_variable(name) {
                    return expression.set_value(ctx, value);
                }
                let resolver = ctx.resolver();
                if resolver.set_value(ctx, None, &Value::from(name.as_str()), value)? {
                    Ok(())
                } else {
                    Err(ElError::property_not_found(name.clone(), None))
                }
            }
            Expr::Variable { expression, .. } => expression.set_value(ctx, value),
            Expr::Field { object, field } => {
                let base = object.get_value(ctx)?;
                let property = field.get_value(ctx)?;
                write_property(ctx, &base, &property, value)
            }
            Expr::Semicolon { left, right } => {
                left.get_value(ctx)?;
                right.set_value(ctx, value)
            }
            _ => Err(ElError::NotWritable(self.to_string())),
        }
    }

    /// Returns the type of the value the expression refers to.
    pub fn get_type(&self, ctx: &mut ElContext) -> ElResult<ValueType> {
        match self {
            Expr::Identifier(name) => {
                if let Some(value) = ctx.lambda_argument(name) {
                    return Ok(value.value_type());
                }
                if let Some(expression) = ctx.variable_mapper().resolve_variable(name) {
                    return expression.get_type(ctx);
                }
                if let Some(value) = ctx.import_handler().and_then(|imports| imports.resolve(name)) {
                    return Ok(value.value_type());
                }
                let resolver = ctx.resolver();
                resolver
                    .get_type(ctx, None, &Value::from(name.as_str()))?
                    .ok_or_else(|| ElError::property_not_found(name.clone(), None))
            }
            Expr::Variable { expression, .. } => expression.get_type(ctx),
            Expr::Field { object, field } => {
                let (base, property) = evaluate_reference(ctx, object, field)?;
                let resolver = ctx.resolver();
                resolver
                    .get_type(ctx, Some(&base), &property)?
                    .ok_or_else(|| {
                        ElError::property_not_found(to_string(&property), Some(base.type_name()))
                    })
            }
            Expr::Semicolon { left, right } => {
                left.get_value(ctx)?;
                right.get_type(ctx)
            }
            _ => Ok(self.get_value(ctx)?.value_type()),
        }
    }

    /// Returns whether the expression cannot be assigned to.
    pub fn is_read_only(&self, ctx: &mut ElContext) -> ElResult<bool> {
        match self {
            Expr::Identifier(name) => {
                if ctx.is_lambda_argument(name) {
                    return Ok(true);
                }
                if let Some(expression) = ctx.variable_mapper().resolve_variable(name) {
                    return expression.is_read_only(ctx);
                }
                if ctx
                    .import_handler()
                    .is_some_and(|imports| imports.resolve(name).is_some())
                {
                    return Ok(true);
                }
                let resolver = ctx.resolver();
                resolver
                    .is_read_only(ctx, None, &Value::from(name.as_str()))?
                    .ok_or_else(|| ElError::property_not_found(name.clone(), None))
            }
            Expr::Variable { expression, .. } => expression.is_read_only(ctx),
            Expr::Field { object, field } => {
                let (base, property) = evaluate_reference(ctx, object, field)?;
                let resolver = ctx.resolver();
                resolver
                    .is_read_only(ctx, Some(&base), &property)?
                    .ok_or_else(|| {
                        ElError::property_not_found(to_string(&property), Some(base.type_name()))
                    })
            }
            Expr::Semicolon { left, right } => {
                left.get_value(ctx)?;
                right.is_read_only(ctx)
            }
            _ => Ok(true),
        }
    }

    /// Returns the `(base, property)` pair a property access refers to, or `None` for
    /// expressions that are not property accesses.
    pub fn get_value_reference(&self, ctx: &mut ElContext) -> ElResult<Option<ValueReference>> {
        match self {
            Expr::Field { object, field } => {
                let base = object.get_value(ctx)?;
                let property = field.get_value(ctx)?;
                Ok(Some(ValueReference { base, property }))
            }
            Expr::Variable { expression, .. } => expression.get_value_reference(ctx),
            Expr::Identifier(name) if !ctx.is_lambda_argument(name) => {
                match ctx.variable_mapper().resolve_variable(name) {
                    Some(expression) => expression.get_value_reference(ctx),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

impl LambdaValue {
    /// Invokes the lambda.
    ///
    /// The captured arguments and the parameters bound to `args` form a new scope frame
    /// that is popped again whether or not the body fails. Missing arguments are an
    /// error, extra arguments are ignored.
    pub fn invoke(&self, ctx: &mut ElContext, args: Vec<Value>) -> ElResult<Value> {
        let params = self.params();
        if args.len() < params.len() {
            return Err(ElError::ArgumentCount {
                name: self.to_string(),
                expected: params.len(),
                found: args.len(),
            });
        }

        let mut frame = self.captured().clone();
        frame.extend(params.iter().cloned().zip(args));

        ctx.enter_lambda_scope(frame);
        let result = self.body().get_value(ctx);
        ctx.exit_lambda_scope();
        result
    }
}

fn identifier_value(ctx: &mut ElContext, name: &str) -> ElResult<Value> {
    if let Some(value) = ctx.lambda_argument(name) {
        return Ok(value.clone());
    }
    if let Some(expression) = ctx.variable_mapper().resolve_variable(name) {
        return expression.get_value(ctx);
    }
    if let Some(value) = ctx.import_handler().and_then(|imports| imports.resolve(name)) {
        return Ok(value.clone());
    }

    let resolver = ctx.resolver();
    let value = resolver.get_value(ctx, None, &Value::from(name))?;
    if value.is_none() {
        log::trace!("identifier '{name}' is not resolved, reading as null");
    }
    Ok(value.unwrap_or(Value::Null))
}

/// Evaluates the base and property of a strict property lookup.
fn evaluate_reference(ctx: &mut ElContext, object: &Expr, field: &Expr) -> ElResult<(Value, Value)> {
    let base = object.get_value(ctx)?;
    let property = field.get_value(ctx)?;
    if base.is_null() {
        return Err(ElError::property_not_found(to_string(&property), None));
    }
    Ok((base, property))
}

fn evaluate_all(ctx: &mut ElContext, exprs: &[Expr]) -> ElResult<Vec<Value>> {
    exprs.iter().map(|expr| expr.get_value(ctx)).collect()
}

fn write_property(ctx: &mut ElContext, base: &Value, property: &Value, value: Value) -> ElResult<()> {
    if base.is_null() {
        return Err(ElError::property_not_found(to_string(property), None));
    }
    let resolver = ctx.resolver();
    if resolver.set_value(ctx, Some(base), property, value)? {
        Ok(())
    } else {
        Err(ElError::property_not_found(
            to_string(property),
            Some(base.type_name()),
        ))
    }
}

/// `target = value`: the target's reference is resolved before the value is evaluated.
/// Returns the assigned value.
fn assign(ctx: &mut ElContext, target: &Expr, value: &Expr) -> ElResult<Value> {
    if matches!(target, Expr::LambdaVar(_)) || target.is_constant() {
        return Err(ElError::NotWritable(target.to_string()));
    }

    match target.get_value_reference(ctx)? {
        Some(ValueReference { base, property }) => {
            let value = value.get_value(ctx)?;
            write_property(ctx, &base, &property, value.clone())?;
            Ok(value)
        }
        None => {
            let value = value.get_value(ctx)?;
            target.set_value(ctx, value.clone())?;
            Ok(value)
        }
    }
}

/// Calls a lambda or function value.
pub(crate) fn invoke_callable(
    ctx: &mut ElContext,
    callee: &Value,
    args: Vec<Value>,
    describe: impl FnOnce() -> String,
) -> ElResult<Value> {
    match callee {
        Value::Lambda(lambda) => lambda.invoke(ctx, args),
        Value::Function(function) => function.invoke(args),
        _ => Err(ElError::NotCallable(describe())),
    }
}

/// Calls `base.name(args)`: first through the resolver chain, then by calling a lambda
/// or function stored in a map entry or object property of that name.
pub(crate) fn invoke_method(
    ctx: &mut ElContext,
    base: &Value,
    name: &str,
    args: Vec<Value>,
) -> ElResult<Value> {
    if base.is_null() {
        return Err(ElError::method_not_found(name, None));
    }

    let resolver = ctx.resolver();
    if let Some(value) = resolver.invoke(ctx, base, name, &args)? {
        return Ok(value);
    }

    if matches!(base, Value::Map(_) | Value::Object(_)) {
        if let Some(callee @ (Value::Lambda(_) | Value::Function(_))) =
            resolver.get_value(ctx, Some(base), &Value::from(name))?
        {
            return invoke_callable(ctx, &callee, args, || name.to_string());
        }
    }

    Err(ElError::method_not_found(name, Some(base.type_name())))
}
