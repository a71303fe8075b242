//! Element scopes and namespace resolution
//!
//! Stack-based prefix resolution: each open element owns a scope holding
//! its resolved tag name and any `xmlns`/`xmlns:p` bindings it declared.
//! Lookups walk the stack top-down, so inner declarations shadow outer
//! ones.

use std::collections::HashMap;

use super::name::DataName;

/// Per-element record: the resolved tag name plus the namespace bindings
/// declared on that element. The empty prefix holds the default namespace.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub tag_name: DataName,
    bindings: HashMap<String, String>,
}

impl Scope {
    /// Create an empty scope; the tag name is filled in at emission time.
    pub fn new() -> Self {
        Scope::default()
    }

    /// Record a namespace declaration on this scope.
    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Look up a binding declared on this scope.
    pub fn binding(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// True when this scope declares the prefix.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.bindings.contains_key(prefix)
    }
}

/// Stack of scopes forming the visible namespace environment.
#[derive(Debug, Default)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub fn new() -> Self {
        ScopeChain::default()
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// True while any element is open.
    pub fn has_scope(&self) -> bool {
        !self.scopes.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The innermost open scope.
    pub fn top_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    /// Resolve a prefix to its nearest binding, or the empty string when
    /// the prefix is unbound.
    pub fn resolve_namespace(&self, prefix: &str) -> &str {
        for scope in self.scopes.iter().rev() {
            if let Some(uri) = scope.binding(prefix) {
                return uri;
            }
        }
        ""
    }

    /// True when any open scope binds the prefix.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains_prefix(prefix))
    }

    /// True when any open scope carries the tag name.
    pub fn contains_tag(&self, name: &DataName) -> bool {
        self.scopes.iter().rev().any(|s| s.tag_name == *name)
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_scope(tag: &str) -> Scope {
        let mut scope = Scope::new();
        scope.tag_name = DataName::local(tag);
        scope
    }

    #[test]
    fn test_resolve_unbound_is_empty() {
        let chain = ScopeChain::new();
        assert_eq!(chain.resolve_namespace("x"), "");
        assert!(!chain.contains_prefix("x"));
    }

    #[test]
    fn test_depth_tracking() {
        let mut chain = ScopeChain::new();
        assert!(!chain.has_scope());
        chain.push(named_scope("a"));
        chain.push(named_scope("b"));
        assert!(chain.has_scope());
        assert_eq!(chain.depth(), 2);
        chain.pop();
        chain.pop();
        assert!(!chain.has_scope());
        assert!(chain.pop().is_none());
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut chain = ScopeChain::new();
        let mut scope = Scope::new();
        scope.bind("svg", "http://www.w3.org/2000/svg");
        chain.push(scope);

        assert_eq!(chain.resolve_namespace("svg"), "http://www.w3.org/2000/svg");
        assert!(chain.contains_prefix("svg"));
    }

    #[test]
    fn test_scope_pop_unbinds() {
        let mut chain = ScopeChain::new();
        let mut scope = Scope::new();
        scope.bind("x", "urn:a");
        chain.push(scope);
        assert_eq!(chain.resolve_namespace("x"), "urn:a");

        chain.pop();
        assert_eq!(chain.resolve_namespace("x"), "");
    }

    #[test]
    fn test_shadow_binding() {
        let mut chain = ScopeChain::new();
        let mut outer = Scope::new();
        outer.bind("ns", "urn:outer");
        chain.push(outer);

        let mut inner = Scope::new();
        inner.bind("ns", "urn:inner");
        chain.push(inner);
        assert_eq!(chain.resolve_namespace("ns"), "urn:inner");

        chain.pop();
        assert_eq!(chain.resolve_namespace("ns"), "urn:outer");
    }

    #[test]
    fn test_default_namespace_uses_empty_prefix() {
        let mut chain = ScopeChain::new();
        let mut scope = Scope::new();
        scope.bind("", "urn:default");
        chain.push(scope);

        assert_eq!(chain.resolve_namespace(""), "urn:default");
        assert!(chain.contains_prefix(""));
    }

    #[test]
    fn test_contains_tag() {
        let mut chain = ScopeChain::new();
        chain.push(named_scope("a"));
        chain.push(named_scope("b"));

        assert!(chain.contains_tag(&DataName::local("a")));
        assert!(chain.contains_tag(&DataName::local("b")));
        assert!(!chain.contains_tag(&DataName::local("c")));
    }
}
