//! Variable scopes visible to expression evaluation

use std::collections::BTreeMap;

use super::value::Value;

/// A named set of variables, such as "Global" or "Symbol".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionScope {
    name: String,
    variables: BTreeMap<String, Value>,
}

impl ExpressionScope {
    pub fn new(name: impl Into<String>) -> Self {
        ExpressionScope {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_variable(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }
}

/// Stack of scopes; later scopes shadow earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionContext {
    scopes: Vec<ExpressionScope>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, scope: ExpressionScope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Option<ExpressionScope> {
        self.scopes.pop()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn last_scope_mut(&mut self) -> Option<&mut ExpressionScope> {
        self.scopes.last_mut()
    }

    /// Index of the topmost scope with the given name.
    pub fn index_of_scope(&self, name: &str) -> Option<usize> {
        self.scopes.iter().rposition(|s| s.name == name)
    }

    pub fn scope_mut(&mut self, index: usize) -> Option<&mut ExpressionScope> {
        self.scopes.get_mut(index)
    }

    /// Set a variable in the topmost scope, creating one if the stack is empty.
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        if self.scopes.is_empty() {
            self.scopes.push(ExpressionScope::new("Global"));
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.set_variable(name, value);
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.variable(name))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_scopes_shadow_earlier() {
        let mut ctx = ExpressionContext::new();
        ctx.push_scope(ExpressionScope::new("Global").with_variable("size", 1.0));
        ctx.push_scope(ExpressionScope::new("Symbol").with_variable("size", 2.0));
        assert_eq!(ctx.variable("size"), Some(&Value::Number(2.0)));

        let popped = ctx.pop_scope().unwrap();
        assert_eq!(popped.name(), "Symbol");
        assert_eq!(ctx.variable("size"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn set_variable_on_empty_stack_creates_scope() {
        let mut ctx = ExpressionContext::new();
        ctx.set_variable("value", "x");
        assert_eq!(ctx.scope_count(), 1);
        assert!(ctx.has_variable("value"));
        assert_eq!(ctx.index_of_scope("Global"), Some(0));
    }
}
