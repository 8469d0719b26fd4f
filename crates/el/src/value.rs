//! Runtime value representation for EL expressions.
//!
//! Values are dynamically typed. Integral and floating point numbers are kept apart
//! (`Long` and `Double`) because the arithmetic rules depend on which one an operand
//! is. Equality and hashing follow Java's `equals`/`hashCode` flavour so values can
//! be used as set members and map keys: doubles compare by bit pattern, and host
//! objects, lambdas and functions compare by identity.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::ast::Expr;
use crate::error::{ElError, ElResult};
use crate::functions::FunctionRef;

/// Runtime value produced by evaluating EL expressions.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    /// Ordered sequence, duplicates retained.
    List(Vec<Value>),
    /// Insertion-ordered unique set.
    Set(IndexSet<Value>),
    /// Insertion-ordered mapping.
    Map(IndexMap<Value, Value>),
    Lambda(LambdaValue),
    Function(FunctionRef),
    /// A host-supplied object whose properties are resolved through [`HostObject`].
    Object(ObjectRef),
}

/// The types a value can have, also used to declare function parameter types and the
/// expected type of a [`ValueExpression`](crate::expression::ValueExpression).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Any value; converting to `Any` leaves the value untouched.
    Any,
    Null,
    Boolean,
    Long,
    Double,
    String,
    List,
    Set,
    Map,
    Lambda,
    Function,
    Object,
}

impl ValueType {
    /// Returns a static type name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Set => "set",
            ValueType::Map => "map",
            ValueType::Lambda => "lambda",
            ValueType::Function => "function",
            ValueType::Object => "object",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Set(_) => ValueType::Set,
            Value::Map(_) => ValueType::Map,
            Value::Lambda(_) => ValueType::Lambda,
            Value::Function(_) => ValueType::Function,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// Returns a static type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Object(object) => object.0.type_name(),
            other => other.value_type().name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns whether the value is considered empty by the `empty` operator.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Set(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Builds a list value from anything convertible into values.
    pub fn list<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value from key/value pairs, keeping insertion order.
    pub fn map<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Wraps a host object.
    pub fn object(object: impl HostObject + 'static) -> Value {
        Value::Object(ObjectRef::new(object))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(value) => value.hash(state),
            Value::Long(value) => value.hash(state),
            Value::Double(value) => value.to_bits().hash(state),
            Value::String(text) => text.hash(state),
            Value::List(items) => items.hash(state),
            // Set and map equality ignores order, so only the size can take part in the hash.
            Value::Set(items) => items.len().hash(state),
            Value::Map(entries) => entries.len().hash(state),
            Value::Lambda(lambda) => lambda.hash(state),
            Value::Function(function) => function.hash(state),
            Value::Object(object) => object.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Long(value) => write!(f, "{value}"),
            Value::Double(value) => f.write_str(&format_double(*value)),
            Value::String(text) => write!(f, "{text}"),
            Value::List(items) => write_sequence(f, items.iter()),
            Value::Set(items) => write_sequence(f, items.iter()),
            Value::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Lambda(lambda) => write!(f, "{lambda}"),
            Value::Function(function) => write!(f, "{}", function.name()),
            Value::Object(object) => f.write_str(&object.0.describe()),
        }
    }
}

fn write_sequence<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    let rendered: Vec<String> = items.map(|item| item.to_string()).collect();
    write!(f, "[{}]", rendered.join(", "))
}

/// Formats a double the way Java's `Double.toString` does for the common cases:
/// `5.0`, `0.25`, `1.0E7`, `1.5E-5`, `NaN`, `Infinity`.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if value.fract() == 0.0 {
            format!("{value:.1}")
        } else {
            format!("{value}")
        }
    } else {
        let rendered = format!("{value:E}");
        match rendered.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                format!("{mantissa}.0E{exponent}")
            }
            _ => rendered,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Long(value) => serializer.serialize_i64(*value),
            Value::Double(value) => serializer.serialize_f64(*value),
            Value::String(text) => serializer.serialize_str(text),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    // JSON-like formats only accept string keys
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Boolean(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Long(value),
                None => Value::Double(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(text) => Value::String(text),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (Value::String(key), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Long(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A lambda expression evaluated to a value.
///
/// The value remembers the lambda arguments that were in scope when it was created, so a
/// lambda returned from another lambda still sees the outer parameters when it is
/// invoked later.
#[derive(Clone)]
pub struct LambdaValue(Arc<LambdaInner>);

struct LambdaInner {
    params: Vec<String>,
    body: Arc<Expr>,
    captured: HashMap<String, Value>,
}

impl LambdaValue {
    pub fn new(params: Vec<String>, body: Arc<Expr>, captured: HashMap<String, Value>) -> Self {
        Self(Arc::new(LambdaInner {
            params,
            body,
            captured,
        }))
    }

    /// Declared parameter names, in order.
    pub fn params(&self) -> &[String] {
        &self.0.params
    }

    pub fn body(&self) -> &Expr {
        &self.0.body
    }

    /// Lambda arguments captured from the enclosing scope at creation time.
    pub fn captured(&self) -> &HashMap<String, Value> {
        &self.0.captured
    }
}

impl PartialEq for LambdaValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Hash for LambdaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for LambdaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaValue")
            .field("params", &self.0.params)
            .field("body", &self.0.body)
            .finish_non_exhaustive()
    }
}

impl Display for LambdaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.0.params.join(", "), self.0.body)
    }
}

/// Objects supplied by the embedding container.
///
/// This is the seam through which container beans take part in evaluation: the
/// [`ObjectResolver`](crate::resolver::ObjectResolver) reads, writes and invokes
/// methods on them. Implementations must be thread safe because a parsed expression may
/// be evaluated concurrently against different contexts.
pub trait HostObject: Send + Sync {
    /// Name used in diagnostics.
    fn type_name(&self) -> &'static str {
        "object"
    }

    /// Rendering used when the object is converted to a string.
    fn describe(&self) -> String {
        self.type_name().to_string()
    }

    /// Returns the property value, or `None` if the object has no such property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Writes the property. Returns `Ok(false)` if the object has no such property.
    fn set_property(&self, name: &str, value: Value) -> ElResult<bool>;

    /// Returns whether the property is read only, or `None` if it does not exist.
    fn is_read_only(&self, name: &str) -> Option<bool>;

    /// Invokes a method. Returns `None` if the object has no such method.
    fn invoke(&self, _method: &str, _args: &[Value]) -> Option<anyhow::Result<Value>> {
        None
    }
}

/// Shared handle to a [`HostObject`].
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn HostObject>);

impl ObjectRef {
    pub fn new(object: impl HostObject + 'static) -> Self {
        Self(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn HostObject>) -> Self {
        Self(object)
    }

    pub fn get(&self) -> &dyn HostObject {
        self.0.as_ref()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0) as *const (), state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.0.describe())
    }
}

/// A simple thread safe property bag implementing [`HostObject`].
///
/// Properties are kept in insertion order. Properties marked read only reject writes,
/// and writes to unknown properties are reported as unresolved.
#[derive(Debug, Default)]
pub struct Bean {
    properties: RwLock<IndexMap<String, Value>>,
    read_only: HashSet<String>,
}

impl Bean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a writable property.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
        self
    }

    /// Adds a read only property.
    pub fn with_read_only(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.read_only.insert(name.clone());
        self.with(name, value)
    }

    /// Returns a copy of the current property value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl HostObject for Bean {
    fn type_name(&self) -> &'static str {
        "bean"
    }

    fn describe(&self) -> String {
        let properties = self.properties.read().unwrap_or_else(PoisonError::into_inner);
        let rendered: Vec<String> = properties
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("Bean{{{}}}", rendered.join(", "))
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> ElResult<bool> {
        if self.read_only.contains(name) {
            return Err(ElError::NotWritable(name.to_string()));
        }
        let mut properties = self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match properties.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_read_only(&self, name: &str) -> Option<bool> {
        let properties = self.properties.read().unwrap_or_else(PoisonError::into_inner);
        properties
            .contains_key(name)
            .then(|| self.read_only.contains(name))
    }
}
