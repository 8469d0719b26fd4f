//! The resolution context expressions are parsed and evaluated against.
//!
//! An [`ElContext`] bundles everything an expression needs from its environment:
//!
//! - the resolver chain used for identifiers, properties and method calls
//! - the default [`VariableResolver`] holding top level variables
//! - a [`VariableMapper`] binding names to other expressions at parse time
//! - the [`FunctionMapper`] for `prefix:name(...)` calls
//! - an optional [`ImportHandler`] and named implicit objects
//! - the stack of lambda argument frames for the evaluation in progress
//!
//! A context is meant to be owned by one evaluation at a time. Parsed trees are
//! shared, contexts are not.

use std::collections::HashMap;
use std::sync::Arc;

use crate::expression::ValueExpression;
use crate::functions::FunctionMapper;
use crate::resolver::{
    CollectionResolver, CompositeResolver, MethodResolver, ObjectResolver, Resolver,
    VariableResolver,
};
use crate::value::Value;

/// Binds variable names to expressions.
///
/// A name bound here is an alias: when an expression is parsed, an identifier with
/// this name is replaced by the bound expression.
#[derive(Debug, Clone, Default)]
pub struct VariableMapper {
    variables: HashMap<String, Arc<ValueExpression>>,
}

impl VariableMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a name, returning the previous binding.
    pub fn set_variable(
        &mut self,
        name: impl Into<String>,
        expression: ValueExpression,
    ) -> Option<Arc<ValueExpression>> {
        self.variables.insert(name.into(), Arc::new(expression))
    }

    pub fn resolve_variable(&self, name: &str) -> Option<Arc<ValueExpression>> {
        self.variables.get(name).cloned()
    }
}

/// Resolves imported names (static members, type handles) to opaque values.
#[derive(Debug, Clone, Default)]
pub struct ImportHandler {
    imports: HashMap<String, Value>,
}

impl ImportHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.imports.insert(name.into(), value.into());
    }

    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.imports.get(name)
    }
}

/// The environment for parsing and evaluating expressions.
pub struct ElContext {
    resolver: Arc<CompositeResolver>,
    variables: Arc<VariableResolver>,
    variable_mapper: VariableMapper,
    functions: FunctionMapper,
    imports: Option<ImportHandler>,
    implicit_objects: HashMap<String, Value>,
    lambda_scopes: Vec<HashMap<String, Value>>,
}

impl Default for ElContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ElContext {
    /// Creates a context with the built-in resolvers and the standard `fn:` functions.
    ///
    /// Resolvers are consulted in this order: top level variables, host objects,
    /// lists and maps, then the built-in string and collection methods.
    pub fn new() -> Self {
        let variables = Arc::new(VariableResolver::new());
        let resolvers: Vec<Arc<dyn Resolver>> = vec![
            Arc::clone(&variables) as Arc<dyn Resolver>,
            Arc::new(ObjectResolver),
            Arc::new(CollectionResolver),
            Arc::new(MethodResolver),
        ];

        Self {
            resolver: Arc::new(CompositeResolver::new(resolvers)),
            variables,
            variable_mapper: VariableMapper::new(),
            functions: FunctionMapper::standard(),
            imports: None,
            implicit_objects: HashMap::new(),
            lambda_scopes: Vec::new(),
        }
    }

    /// Adds a resolver in front of the chain, so it is consulted first.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        Arc::make_mut(&mut self.resolver).push_front(Arc::new(resolver));
        self
    }

    /// Replaces the function mapper.
    pub fn with_functions(mut self, functions: FunctionMapper) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_import_handler(mut self, imports: ImportHandler) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Registers a read only implicit object, e.g. a container scope.
    pub fn with_implicit_object(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.implicit_objects.insert(name.into(), value.into());
        self
    }

    /// Binds a name in the variable mapper.
    pub fn with_variable_mapping(mut self, name: impl Into<String>, expression: ValueExpression) -> Self {
        self.variable_mapper.set_variable(name, expression);
        self
    }

    /// The resolver chain.
    pub fn resolver(&self) -> Arc<CompositeResolver> {
        Arc::clone(&self.resolver)
    }

    /// Top level variables.
    pub fn variables(&self) -> &VariableResolver {
        &self.variables
    }

    pub fn variable_mapper(&self) -> &VariableMapper {
        &self.variable_mapper
    }

    pub fn variable_mapper_mut(&mut self) -> &mut VariableMapper {
        &mut self.variable_mapper
    }

    pub fn functions(&self) -> &FunctionMapper {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionMapper {
        &mut self.functions
    }

    pub fn import_handler(&self) -> Option<&ImportHandler> {
        self.imports.as_ref()
    }

    pub fn implicit_object(&self, name: &str) -> Option<&Value> {
        self.implicit_objects.get(name)
    }

    pub fn is_implicit_object(&self, name: &str) -> bool {
        self.implicit_objects.contains_key(name)
    }

    /// Pushes a frame of lambda arguments. Frames nest, inner names shadow outer ones.
    pub fn enter_lambda_scope(&mut self, arguments: HashMap<String, Value>) {
        log::trace!(
            "entering lambda scope {} with {:?}",
            self.lambda_scopes.len() + 1,
            arguments.keys().collect::<Vec<_>>()
        );
        self.lambda_scopes.push(arguments);
    }

    /// Pops the innermost frame of lambda arguments.
    pub fn exit_lambda_scope(&mut self) {
        log::trace!("exiting lambda scope {}", self.lambda_scopes.len());
        self.lambda_scopes.pop();
    }

    /// Looks a lambda argument up, innermost frame first.
    pub fn lambda_argument(&self, name: &str) -> Option<&Value> {
        self.lambda_scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
    }

    pub fn is_lambda_argument(&self, name: &str) -> bool {
        self.lambda_argument(name).is_some()
    }

    /// All lambda arguments currently visible, with inner frames overriding outer ones.
    pub fn lambda_arguments(&self) -> HashMap<String, Value> {
        let mut visible = HashMap::new();
        for frame in &self.lambda_scopes {
            visible.extend(frame.iter().map(|(name, value)| (name.clone(), value.clone())));
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_scopes_nest_and_shadow() {
        let mut ctx = ElContext::new();
        assert!(!ctx.is_lambda_argument("x"));

        ctx.enter_lambda_scope(HashMap::from([
            ("x".to_string(), Value::Long(1)),
            ("y".to_string(), Value::Long(2)),
        ]));
        ctx.enter_lambda_scope(HashMap::from([("x".to_string(), Value::Long(10))]));

        assert_eq!(ctx.lambda_argument("x"), Some(&Value::Long(10)));
        assert_eq!(ctx.lambda_argument("y"), Some(&Value::Long(2)));
        assert_eq!(ctx.lambda_arguments().get("x"), Some(&Value::Long(10)));

        ctx.exit_lambda_scope();
        assert_eq!(ctx.lambda_argument("x"), Some(&Value::Long(1)));

        ctx.exit_lambda_scope();
        assert!(ctx.lambda_argument("y").is_none());
    }

    #[test]
    fn import_handler_resolves_names() {
        let mut imports = ImportHandler::new();
        imports.import("MAX", Value::Long(i64::MAX));
        let ctx = ElContext::new().with_import_handler(imports);

        let handler = ctx.import_handler().unwrap();
        assert_eq!(handler.resolve("MAX"), Some(&Value::Long(i64::MAX)));
        assert!(handler.resolve("MIN").is_none());
    }
}
