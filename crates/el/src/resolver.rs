//! Property and method resolution.
//!
//! Evaluation never looks into values itself. Identifier lookups, property reads and
//! writes and method calls are all delegated to a chain of [`Resolver`]s. Each
//! resolver either handles a `(base, property)` pair or declines, and the
//! [`CompositeResolver`] asks each one in turn until one of them handles it.
//!
//! Whether a resolver handled a request is expressed in the return type: `None` (or
//! `false`) means "not mine", while `Some(Value::Null)` means "resolved, and the value
//! is null".

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::coerce;
use crate::context::ElContext;
use crate::error::{ElError, ElResult};
use crate::value::{Value, ValueType};

/// A link of the resolver chain.
///
/// `base` is `None` for top level identifiers and the evaluated object otherwise.
pub trait Resolver: Send + Sync {
    /// Reads a property. Returns `None` if this resolver does not handle it.
    fn get_value(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<Value>>;

    /// Returns the type of a property, or `None` if this resolver does not handle it.
    fn get_type(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<ValueType>> {
        Ok(self
            .get_value(context, base, property)?
            .map(|value| value.value_type()))
    }

    /// Writes a property. Returns `false` if this resolver does not handle it.
    fn set_value(
        &self,
        _context: &ElContext,
        _base: Option<&Value>,
        _property: &Value,
        _value: Value,
    ) -> ElResult<bool> {
        Ok(false)
    }

    /// Returns whether a property is read only, or `None` if this resolver does not
    /// handle it.
    fn is_read_only(
        &self,
        _context: &ElContext,
        _base: Option<&Value>,
        _property: &Value,
    ) -> ElResult<Option<bool>> {
        Ok(None)
    }

    /// Invokes a method on `base`. Returns `None` if this resolver does not handle it.
    fn invoke(
        &self,
        _context: &ElContext,
        _base: &Value,
        _method: &str,
        _args: &[Value],
    ) -> ElResult<Option<Value>> {
        Ok(None)
    }
}

/// Asks a list of resolvers in order; the first one that handles a request wins.
#[derive(Clone, Default)]
pub struct CompositeResolver {
    resolvers: VecDeque<Arc<dyn Resolver>>,
}

impl CompositeResolver {
    pub fn new(resolvers: impl IntoIterator<Item = Arc<dyn Resolver>>) -> Self {
        Self {
            resolvers: resolvers.into_iter().collect(),
        }
    }

    /// Adds a resolver to the end of the chain.
    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push_back(resolver);
    }

    /// Adds a resolver to the front of the chain.
    pub fn push_front(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push_front(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

fn describe_base(base: Option<&Value>) -> &'static str {
    base.map_or("<top level>", Value::type_name)
}

impl Resolver for CompositeResolver {
    fn get_value(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<Value>> {
        for resolver in &self.resolvers {
            if let Some(value) = resolver.get_value(context, base, property)? {
                return Ok(Some(value));
            }
        }
        log::trace!(
            "no resolver handled read of {property} on {}",
            describe_base(base)
        );
        Ok(None)
    }

    fn get_type(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<ValueType>> {
        for resolver in &self.resolvers {
            if let Some(ty) = resolver.get_type(context, base, property)? {
                return Ok(Some(ty));
            }
        }
        Ok(None)
    }

    fn set_value(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
        value: Value,
    ) -> ElResult<bool> {
        for resolver in &self.resolvers {
            if resolver.set_value(context, base, property, value.clone())? {
                return Ok(true);
            }
        }
        log::trace!(
            "no resolver handled write of {property} on {}",
            describe_base(base)
        );
        Ok(false)
    }

    fn is_read_only(
        &self,
        context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<bool>> {
        for resolver in &self.resolvers {
            if let Some(read_only) = resolver.is_read_only(context, base, property)? {
                return Ok(Some(read_only));
            }
        }
        Ok(None)
    }

    fn invoke(
        &self,
        context: &ElContext,
        base: &Value,
        method: &str,
        args: &[Value],
    ) -> ElResult<Option<Value>> {
        for resolver in &self.resolvers {
            if let Some(value) = resolver.invoke(context, base, method, args)? {
                return Ok(Some(value));
            }
        }
        log::trace!("no resolver handled {}.{method}()", base.type_name());
        Ok(None)
    }
}

/// Top level variables.
///
/// Only names that have been defined can be written; assigning to an unknown name is
/// left unresolved so that it surfaces as a property-not-found error.
#[derive(Debug, Default)]
pub struct VariableResolver {
    variables: RwLock<IndexMap<String, Value>>,
}

impl VariableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a variable.
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all defined variables, in definition order.
    pub fn names(&self) -> Vec<String> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Resolver for VariableResolver {
    fn get_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<Value>> {
        match (base, property) {
            (None, Value::String(name)) => Ok(self.get(name)),
            _ => Ok(None),
        }
    }

    fn set_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
        value: Value,
    ) -> ElResult<bool> {
        let (None, Value::String(name)) = (base, property) else {
            return Ok(false);
        };
        let mut variables = self
            .variables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match variables.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_read_only(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<bool>> {
        match (base, property) {
            (None, Value::String(name)) => Ok(self.contains(name).then_some(false)),
            _ => Ok(None),
        }
    }
}

/// Index and key access on lists and maps.
///
/// Collection values are immutable, so every list and map property is read only.
/// Reading a list index out of range or a missing map key resolves to null.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionResolver;

impl Resolver for CollectionResolver {
    fn get_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<Value>> {
        match base {
            Some(Value::List(items)) => {
                let index = coerce::to_long(property)?;
                let item = usize::try_from(index)
                    .ok()
                    .and_then(|index| items.get(index))
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(Some(item))
            }
            Some(Value::Map(entries)) => {
                Ok(Some(entries.get(property).cloned().unwrap_or(Value::Null)))
            }
            _ => Ok(None),
        }
    }

    fn set_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
        _value: Value,
    ) -> ElResult<bool> {
        match base {
            Some(Value::List(_) | Value::Map(_)) => {
                Err(ElError::NotWritable(coerce::to_string(property)))
            }
            _ => Ok(false),
        }
    }

    fn is_read_only(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        _property: &Value,
    ) -> ElResult<Option<bool>> {
        match base {
            Some(Value::List(_) | Value::Map(_)) => Ok(Some(true)),
            _ => Ok(None),
        }
    }
}

/// Properties and methods of host objects, see [`HostObject`](crate::value::HostObject).
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectResolver;

impl Resolver for ObjectResolver {
    fn get_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<Value>> {
        match base {
            Some(Value::Object(object)) => {
                Ok(object.get().property(&coerce::to_string(property)))
            }
            _ => Ok(None),
        }
    }

    fn set_value(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
        value: Value,
    ) -> ElResult<bool> {
        match base {
            Some(Value::Object(object)) => object
                .get()
                .set_property(&coerce::to_string(property), value),
            _ => Ok(false),
        }
    }

    fn is_read_only(
        &self,
        _context: &ElContext,
        base: Option<&Value>,
        property: &Value,
    ) -> ElResult<Option<bool>> {
        match base {
            Some(Value::Object(object)) => {
                Ok(object.get().is_read_only(&coerce::to_string(property)))
            }
            _ => Ok(None),
        }
    }

    fn invoke(
        &self,
        _context: &ElContext,
        base: &Value,
        method: &str,
        args: &[Value],
    ) -> ElResult<Option<Value>> {
        let Value::Object(object) = base else {
            return Ok(None);
        };
        match object.get().invoke(method, args) {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(source)) => Err(ElError::Invocation {
                name: format!("{}.{method}", object.get().type_name()),
                source,
            }),
        }
    }
}

/// A small set of methods on strings and collections, e.g. `name.toUpperCase()` or
/// `items.size()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodResolver;

fn expect_args(method: &str, args: &[Value], expected: usize) -> ElResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ElError::ArgumentCount {
            name: method.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(coerce::to_string).unwrap_or_default()
}

fn len_value(len: usize) -> Value {
    Value::Long(i64::try_from(len).unwrap_or(i64::MAX))
}

impl MethodResolver {
    fn string_method(text: &str, method: &str, args: &[Value]) -> ElResult<Option<Value>> {
        let value = match method {
            "length" => {
                expect_args(method, args, 0)?;
                len_value(text.chars().count())
            }
            "isEmpty" => {
                expect_args(method, args, 0)?;
                Value::Boolean(text.is_empty())
            }
            "toUpperCase" => {
                expect_args(method, args, 0)?;
                Value::String(text.to_uppercase())
            }
            "toLowerCase" => {
                expect_args(method, args, 0)?;
                Value::String(text.to_lowercase())
            }
            "trim" => {
                expect_args(method, args, 0)?;
                Value::from(text.trim())
            }
            "contains" => {
                expect_args(method, args, 1)?;
                Value::Boolean(text.contains(&string_arg(args, 0)))
            }
            "startsWith" => {
                expect_args(method, args, 1)?;
                Value::Boolean(text.starts_with(&string_arg(args, 0)))
            }
            "endsWith" => {
                expect_args(method, args, 1)?;
                Value::Boolean(text.ends_with(&string_arg(args, 0)))
            }
            "indexOf" => {
                expect_args(method, args, 1)?;
                let needle = string_arg(args, 0);
                let index = text
                    .find(&needle)
                    .map_or(-1, |byte_idx| text[..byte_idx].chars().count() as i64);
                Value::Long(index)
            }
            "substring" => {
                if args.is_empty() || args.len() > 2 {
                    expect_args(method, args, 2)?;
                }
                let chars: Vec<char> = text.chars().collect();
                let begin = coerce::to_long(&args[0])?;
                let end = match args.get(1) {
                    Some(end) => coerce::to_long(end)?,
                    None => chars.len() as i64,
                };
                if begin < 0 || end > chars.len() as i64 || begin > end {
                    return Err(ElError::Invocation {
                        name: "substring".to_string(),
                        source: anyhow::anyhow!(
                            "range {begin}..{end} out of bounds for length {}",
                            chars.len()
                        ),
                    });
                }
                Value::String(chars[begin as usize..end as usize].iter().collect())
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn collection_method(base: &Value, method: &str, args: &[Value]) -> ElResult<Option<Value>> {
        let value = match (base, method) {
            (Value::List(items), "size") => {
                expect_args(method, args, 0)?;
                len_value(items.len())
            }
            (Value::Set(items), "size") => {
                expect_args(method, args, 0)?;
                len_value(items.len())
            }
            (Value::Map(entries), "size") => {
                expect_args(method, args, 0)?;
                len_value(entries.len())
            }
            (Value::List(_) | Value::Set(_) | Value::Map(_), "isEmpty") => {
                expect_args(method, args, 0)?;
                Value::Boolean(base.is_empty())
            }
            (Value::List(items), "contains") => {
                expect_args(method, args, 1)?;
                Value::Boolean(items.contains(&args[0]))
            }
            (Value::Set(items), "contains") => {
                expect_args(method, args, 1)?;
                Value::Boolean(items.contains(&args[0]))
            }
            (Value::Map(entries), "containsKey") => {
                expect_args(method, args, 1)?;
                Value::Boolean(entries.contains_key(&args[0]))
            }
            (Value::List(items), "get") => {
                expect_args(method, args, 1)?;
                let index = coerce::to_long(&args[0])?;
                usize::try_from(index)
                    .ok()
                    .and_then(|index| items.get(index))
                    .cloned()
                    .ok_or_else(|| ElError::Invocation {
                        name: "get".to_string(),
                        source: anyhow::anyhow!(
                            "index {index} out of bounds for length {}",
                            items.len()
                        ),
                    })?
            }
            (Value::Map(entries), "get") => {
                expect_args(method, args, 1)?;
                entries.get(&args[0]).cloned().unwrap_or(Value::Null)
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

impl Resolver for MethodResolver {
    fn get_value(
        &self,
        _context: &ElContext,
        _base: Option<&Value>,
        _property: &Value,
    ) -> ElResult<Option<Value>> {
        Ok(None)
    }

    fn invoke(
        &self,
        _context: &ElContext,
        base: &Value,
        method: &str,
        args: &[Value],
    ) -> ElResult<Option<Value>> {
        match base {
            Value::String(text) => Self::string_method(text, method, args),
            Value::List(_) | Value::Set(_) | Value::Map(_) => {
                Self::collection_method(base, method, args)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Bean;

    #[test]
    fn variables_are_only_writable_once_defined() {
        let ctx = ElContext::new();
        let variables = VariableResolver::new();
        let name = Value::from("a");

        assert!(!variables.set_value(&ctx, None, &name, Value::Long(1)).unwrap());
        assert_eq!(variables.is_read_only(&ctx, None, &name).unwrap(), None);

        variables.define("a", 0);
        assert!(variables.set_value(&ctx, None, &name, Value::Long(1)).unwrap());
        assert_eq!(variables.get("a"), Some(Value::Long(1)));
        assert_eq!(variables.is_read_only(&ctx, None, &name).unwrap(), Some(false));
    }

    #[test]
    fn collections_resolve_index_and_key() {
        let ctx = ElContext::new();
        let list = Value::list(["a", "b"]);
        let map = Value::map([("k", 1)]);

        let read = |base: &Value, property: Value| {
            CollectionResolver
                .get_value(&ctx, Some(base), &property)
                .unwrap()
        };
        assert_eq!(read(&list, Value::Long(1)), Some(Value::from("b")));
        assert_eq!(read(&list, Value::from("0")), Some(Value::from("a")));
        assert_eq!(read(&list, Value::Long(5)), Some(Value::Null));
        assert_eq!(read(&map, Value::from("k")), Some(Value::Long(1)));
        assert_eq!(read(&map, Value::from("missing")), Some(Value::Null));
        assert_eq!(read(&Value::Long(3), Value::Long(0)), None);

        let err = CollectionResolver
            .set_value(&ctx, Some(&list), &Value::Long(0), Value::Null)
            .unwrap_err();
        assert!(matches!(err, ElError::NotWritable(_)));
    }

    #[test]
    fn objects_delegate_to_host() {
        let ctx = ElContext::new();
        let bean = Value::object(Bean::new().with("name", "x").with_read_only("id", 7));

        assert_eq!(
            ObjectResolver
                .get_value(&ctx, Some(&bean), &Value::from("name"))
                .unwrap(),
            Some(Value::from("x"))
        );
        assert_eq!(
            ObjectResolver
                .is_read_only(&ctx, Some(&bean), &Value::from("id"))
                .unwrap(),
            Some(true)
        );
        assert!(
            !ObjectResolver
                .set_value(&ctx, Some(&bean), &Value::from("other"), Value::Null)
                .unwrap()
        );
    }

    #[test]
    fn builtin_methods() {
        let ctx = ElContext::new();
        let invoke = |base: Value, method: &str, args: &[Value]| {
            MethodResolver.invoke(&ctx, &base, method, args).unwrap()
        };

        assert_eq!(
            invoke(Value::from("héllo"), "length", &[]),
            Some(Value::Long(5))
        );
        assert_eq!(
            invoke(Value::from("hello"), "substring", &[Value::Long(1), Value::Long(3)]),
            Some(Value::from("el"))
        );
        assert_eq!(
            invoke(Value::list([1, 2]), "contains", &[Value::Long(2)]),
            Some(Value::Boolean(true))
        );
        assert_eq!(invoke(Value::Long(1), "size", &[]), None);
        assert_eq!(invoke(Value::from("x"), "reverse", &[]), None);

        let err = MethodResolver
            .invoke(&ctx, &Value::from("x"), "trim", &[Value::Null])
            .unwrap_err();
        assert!(matches!(err, ElError::ArgumentCount { expected: 0, found: 1, .. }));
    }
}
