//! Functions callable from EL expressions (`prefix:name(args)`).
//!
//! A [`FunctionMapper`] maps qualified names to [`FunctionRef`] handles. Every function
//! declares the types of its parameters; when it is invoked each argument is converted
//! to the declared type before the function body runs.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::bail;

use crate::coerce;
use crate::error::{ElError, ElResult};
use crate::value::{Value, ValueType};

/// A type alias for a boxed function body.
pub type Function = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

struct FunctionDef {
    name: String,
    params: Vec<ValueType>,
    function: Function,
}

/// Shared handle to a registered function.
#[derive(Clone)]
pub struct FunctionRef(Arc<FunctionDef>);

impl FunctionRef {
    /// Creates a standalone function handle.
    pub fn new<F>(name: impl Into<String>, params: Vec<ValueType>, function: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionDef {
            name: name.into(),
            params,
            function: Arc::new(function),
        }))
    }

    /// The qualified name, e.g. `fn:length`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared parameter types.
    pub fn params(&self) -> &[ValueType] {
        &self.0.params
    }

    /// Invokes the function, converting every argument to its declared parameter type.
    ///
    /// Failures of the function body are wrapped in [`ElError::Invocation`] with the
    /// original error attached.
    pub fn invoke(&self, args: Vec<Value>) -> ElResult<Value> {
        let def = &self.0;
        if args.len() != def.params.len() {
            return Err(ElError::ArgumentCount {
                name: def.name.clone(),
                expected: def.params.len(),
                found: args.len(),
            });
        }

        let args = args
            .into_iter()
            .zip(&def.params)
            .map(|(arg, ty)| coerce::convert_to_type(arg, *ty))
            .collect::<Result<Vec<_>, _>>()?;

        (def.function)(&args).map_err(|source| ElError::Invocation {
            name: def.name.clone(),
            source,
        })
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Hash for FunctionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRef")
            .field("name", &self.0.name)
            .field("params", &self.0.params)
            .finish_non_exhaustive()
    }
}

/// Maps `prefix:local` names to functions.
#[derive(Debug, Clone, Default)]
pub struct FunctionMapper {
    functions: HashMap<String, FunctionRef>,
}

impl FunctionMapper {
    /// Creates a new, empty function mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a function mapper with the standard `fn:` string functions registered.
    pub fn standard() -> Self {
        let mut mapper = Self::new();
        use ValueType::{Any, Long, String as Str};

        mapper.register("fn", "length", vec![Any], length_fn);
        mapper.register("fn", "toUpperCase", vec![Str], |args| {
            Ok(Value::String(string_arg(args, 0).to_uppercase()))
        });
        mapper.register("fn", "toLowerCase", vec![Str], |args| {
            Ok(Value::String(string_arg(args, 0).to_lowercase()))
        });
        mapper.register("fn", "trim", vec![Str], |args| {
            Ok(Value::String(string_arg(args, 0).trim().to_string()))
        });
        mapper.register("fn", "contains", vec![Str, Str], |args| {
            Ok(Value::Boolean(string_arg(args, 0).contains(string_arg(args, 1))))
        });
        mapper.register("fn", "containsIgnoreCase", vec![Str, Str], |args| {
            let haystack = string_arg(args, 0).to_lowercase();
            let needle = string_arg(args, 1).to_lowercase();
            Ok(Value::Boolean(haystack.contains(&needle)))
        });
        mapper.register("fn", "startsWith", vec![Str, Str], |args| {
            Ok(Value::Boolean(
                string_arg(args, 0).starts_with(string_arg(args, 1)),
            ))
        });
        mapper.register("fn", "endsWith", vec![Str, Str], |args| {
            Ok(Value::Boolean(string_arg(args, 0).ends_with(string_arg(args, 1))))
        });
        mapper.register("fn", "indexOf", vec![Str, Str], |args| {
            Ok(Value::Long(char_index_of(
                string_arg(args, 0),
                string_arg(args, 1),
            )))
        });
        mapper.register("fn", "substring", vec![Str, Long, Long], substring_fn);
        mapper.register("fn", "substringBefore", vec![Str, Str], |args| {
            let text = string_arg(args, 0);
            let result = text
                .find(string_arg(args, 1))
                .map_or("", |idx| &text[..idx]);
            Ok(Value::from(result))
        });
        mapper.register("fn", "substringAfter", vec![Str, Str], |args| {
            let text = string_arg(args, 0);
            let needle = string_arg(args, 1);
            let result = text
                .find(needle)
                .map_or("", |idx| &text[idx + needle.len()..]);
            Ok(Value::from(result))
        });
        mapper.register("fn", "replace", vec![Str, Str, Str], |args| {
            let text = string_arg(args, 0);
            let before = string_arg(args, 1);
            if before.is_empty() {
                return Ok(Value::from(text));
            }
            Ok(Value::String(text.replace(before, string_arg(args, 2))))
        });
        mapper.register("fn", "split", vec![Str, Str], split_fn);
        mapper.register("fn", "join", vec![ValueType::List, Str], join_fn);
        mapper.register("fn", "escapeXml", vec![Str], |args| {
            Ok(Value::String(escape_xml(string_arg(args, 0))))
        });
        mapper
    }

    /// Register a function under `prefix:local`. An empty prefix registers an
    /// unqualified function.
    pub fn register<F>(&mut self, prefix: &str, local: &str, params: Vec<ValueType>, function: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = qualified_name(prefix, local);
        self.functions
            .insert(name.clone(), FunctionRef::new(name, params, function));
    }

    /// Resolves a function by prefix and local name.
    pub fn resolve(&self, prefix: &str, local: &str) -> Option<FunctionRef> {
        self.functions.get(&qualified_name(prefix, local)).cloned()
    }

    /// Resolves a function by its name as written in an expression (`fn:trim` or `trim`).
    pub fn resolve_name(&self, name: &str) -> Option<FunctionRef> {
        match name.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => self.resolve(prefix, local),
            _ => self.resolve("", name),
        }
    }
}

fn qualified_name(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

// Arguments have already been converted to their declared types, so string
// parameters are always strings here.
fn string_arg(args: &[Value], index: usize) -> &str {
    args.get(index).and_then(Value::as_str).unwrap_or_default()
}

fn long_arg(args: &[Value], index: usize) -> i64 {
    match args.get(index) {
        Some(Value::Long(value)) => *value,
        _ => 0,
    }
}

fn length_fn(args: &[Value]) -> anyhow::Result<Value> {
    let length = match args.first() {
        None | Some(Value::Null) => 0,
        Some(Value::String(text)) => text.chars().count(),
        Some(Value::List(items)) => items.len(),
        Some(Value::Set(items)) => items.len(),
        Some(Value::Map(entries)) => entries.len(),
        Some(other) => bail!("cannot take the length of {}", other.type_name()),
    };
    Ok(Value::Long(i64::try_from(length)?))
}

fn char_index_of(text: &str, needle: &str) -> i64 {
    match text.find(needle) {
        Some(byte_idx) => text[..byte_idx].chars().count() as i64,
        None => -1,
    }
}

/// `fn:substring(text, begin, end)` with JSTL's forgiving index rules: a negative begin
/// is treated as zero, a negative end or one past the string means "to the end", and
/// `begin > end` yields an empty string.
fn substring_fn(args: &[Value]) -> anyhow::Result<Value> {
    let chars: Vec<char> = string_arg(args, 0).chars().collect();
    let len = chars.len() as i64;
    let begin = long_arg(args, 1).max(0);
    let mut end = long_arg(args, 2);
    if end < 0 || end > len {
        end = len;
    }
    if begin >= end {
        return Ok(Value::from(""));
    }
    Ok(Value::String(
        chars[begin as usize..end as usize].iter().collect(),
    ))
}

fn split_fn(args: &[Value]) -> anyhow::Result<Value> {
    let text = string_arg(args, 0);
    let delimiters = string_arg(args, 1);
    if text.is_empty() {
        return Ok(Value::list([""]));
    }
    if delimiters.is_empty() {
        return Ok(Value::list([text]));
    }
    Ok(Value::list(
        text.split(|ch: char| delimiters.contains(ch))
            .filter(|token| !token.is_empty()),
    ))
}

fn join_fn(args: &[Value]) -> anyhow::Result<Value> {
    let separator = string_arg(args, 1);
    let items = match args.first() {
        Some(Value::List(items)) => items.iter().map(coerce::to_string).collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    Ok(Value::String(items.join(separator)))
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#039;"),
            '"' => escaped.push_str("&#034;"),
            other => escaped.push(other),
        }
    }
    escaped
}
