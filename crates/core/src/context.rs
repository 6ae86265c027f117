//! Lexical scopes: variables, macros, function namespaces and the base URL.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use xtemplate_dom::NodeRef;
use xtemplate_expr::{FunctionLibrary, Resolver, Value};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Can't assign to constant - {0}")]
    ConstantReassignment(String),

    #[error("Duplicate macro - {0}")]
    DuplicateMacro(String),
}

#[derive(Debug, Clone)]
enum Binding {
    Variable(Value),
    Constant(Value),
}

impl Binding {
    fn value(&self) -> &Value {
        match self {
            Binding::Variable(v) | Binding::Constant(v) => v,
        }
    }
}

/// One lexical level of the scope chain.
#[derive(Clone)]
pub struct Context {
    anchor: NodeRef,
    variables: HashMap<String, Binding>,
    macros: HashMap<String, NodeRef>,
    namespaces: HashMap<String, Arc<dyn FunctionLibrary>>,
    base_url: Option<Url>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("anchor", &self.anchor)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .field("namespaces", &self.namespaces.keys().collect::<Vec<_>>())
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .finish()
    }
}

impl Context {
    pub fn new(anchor: NodeRef, base_url: Option<Url>) -> Self {
        Context {
            anchor,
            variables: HashMap::new(),
            macros: HashMap::new(),
            namespaces: HashMap::new(),
            base_url,
        }
    }

    pub fn anchor(&self) -> &NodeRef {
        &self.anchor
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, url: Option<Url>) {
        self.base_url = url;
    }

    /// Binds or rebinds a variable. A constant bound in this same scope can't be replaced.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        if let Some(Binding::Constant(_)) = self.variables.get(name) {
            return Err(ScopeError::ConstantReassignment(name.to_string()));
        }
        self.variables
            .insert(name.to_string(), Binding::Variable(value));
        Ok(())
    }

    pub fn set_constant(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        if let Some(Binding::Constant(_)) = self.variables.get(name) {
            return Err(ScopeError::ConstantReassignment(name.to_string()));
        }
        self.variables
            .insert(name.to_string(), Binding::Constant(value));
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(Binding::value)
    }

    pub fn register_macro(&mut self, name: &str, element: NodeRef) -> Result<(), ScopeError> {
        if self.macros.contains_key(name) {
            return Err(ScopeError::DuplicateMacro(name.to_string()));
        }
        self.macros.insert(name.to_string(), element);
        Ok(())
    }

    pub fn add_namespace(&mut self, uri: &str, library: Arc<dyn FunctionLibrary>) {
        self.namespaces.insert(uri.to_string(), library);
    }
}

/// The chain of active scopes, innermost last. The root scope is never popped.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Context>,
}

impl ScopeStack {
    pub fn new(root: Context) -> Self {
        ScopeStack { scopes: vec![root] }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Opens a child scope anchored at `anchor`, inheriting the current base URL.
    pub fn push(&mut self, anchor: NodeRef) {
        let base_url = self.current().base_url.clone();
        self.scopes.push(Context::new(anchor, base_url));
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        } else {
            log::warn!("Attempt to pop the root scope ignored");
        }
    }

    pub fn current(&self) -> &Context {
        // The stack is created with a root scope that `pop` never removes.
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Context {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.current().base_url()
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        self.current_mut().set_variable(name, value)
    }

    pub fn set_constant(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        self.current_mut().set_constant(name, value)
    }

    /// Innermost binding of `name`, if any.
    pub fn resolve_variable(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.variable(name))
    }

    pub fn register_macro(&mut self, name: &str, element: NodeRef) -> Result<(), ScopeError> {
        self.current_mut().register_macro(name, element)
    }

    pub fn resolve_macro(&self, name: &str) -> Option<&NodeRef> {
        self.scopes.iter().rev().find_map(|s| s.macros.get(name))
    }

    pub fn add_namespace(&mut self, uri: &str, library: Arc<dyn FunctionLibrary>) {
        self.current_mut().add_namespace(uri, library);
    }

    pub fn resolve_function_library(&self, uri: &str) -> Option<Arc<dyn FunctionLibrary>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.namespaces.get(uri))
            .cloned()
    }

    /// Resolves a namespace prefix through the physical ancestry of the current
    /// scope's anchor node, independent of the scope chain.
    pub fn resolve_namespace_prefix(&self, prefix: &str) -> Option<String> {
        self.current()
            .anchor
            .lookup_namespace(Some(prefix))
            .filter(|uri| !uri.is_empty())
    }
}

impl Resolver for ScopeStack {
    fn resolve(&self, identifier: &str) -> Option<Value> {
        self.resolve_variable(identifier).cloned()
    }

    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        self.resolve_namespace_prefix(prefix)
    }

    fn resolve_namespace(&self, uri: &str) -> Option<Arc<dyn FunctionLibrary>> {
        self.resolve_function_library(uri)
    }
}
