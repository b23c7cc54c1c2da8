use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::ParseErrorKind;
use crate::types::TypeDescriptor;

// ── Namespace ─────────────────────────────────────────────────────────────

/// A markup namespace: a URI, the prefixes bound to it by default, and the
/// types it exposes.
#[derive(Debug, Clone)]
pub struct Namespace {
    uri: String,
    prefixes: IndexSet<String>,
    types: IndexMap<String, Arc<TypeDescriptor>>,
}

impl Namespace {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), prefixes: IndexSet::new(), types: IndexMap::new() }
    }

    /// Bind `prefix` to this namespace in every document. `""` is the default prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into());
        self
    }

    pub fn with_type(mut self, ty: Arc<TypeDescriptor>) -> Self {
        self.add_type(ty);
        self
    }

    pub fn add_type(&mut self, ty: Arc<TypeDescriptor>) {
        if ty.namespace() != self.uri {
            log::warn!(
                "type `{}` declares namespace `{}` but is registered in `{}`",
                ty.name(),
                ty.namespace(),
                self.uri
            );
        }
        self.types.insert(ty.name().to_string(), ty);
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    pub fn type_named(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }
}

// ── TypeRegistry ──────────────────────────────────────────────────────────

/// Append-only directory of namespaces and the types they expose.
///
/// Populated before any parsing, then shared read-only (`Arc<TypeRegistry>`)
/// across loads.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    namespaces: IndexMap<String, Namespace>,
    prefixes: HashMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, ns: Namespace) -> Self {
        self.add_namespace(ns);
        self
    }

    /// Register `ns`. Adding a URI twice merges the types and prefixes.
    ///
    /// A prefix already bound to another namespace keeps its first binding.
    pub fn add_namespace(&mut self, ns: Namespace) {
        for prefix in &ns.prefixes {
            match self.prefixes.get(prefix) {
                Some(existing) if existing != &ns.uri => {
                    log::warn!(
                        "prefix `{}` is already bound to `{}`; ignoring binding to `{}`",
                        prefix,
                        existing,
                        ns.uri
                    );
                }
                _ => {
                    self.prefixes.insert(prefix.clone(), ns.uri.clone());
                }
            }
        }
        match self.namespaces.get_mut(&ns.uri) {
            Some(existing) => {
                existing.prefixes.extend(ns.prefixes);
                for ty in ns.types.into_values() {
                    existing.add_type(ty);
                }
            }
            None => {
                self.namespaces.insert(ns.uri.clone(), ns);
            }
        }
    }

    pub fn namespace(&self, uri: &str) -> Option<&Namespace> {
        self.namespaces.get(uri)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    pub fn namespace_for_prefix(&self, prefix: &str) -> Result<&Namespace, ParseErrorKind> {
        self.prefixes
            .get(prefix)
            .and_then(|uri| self.namespaces.get(uri))
            .ok_or_else(|| ParseErrorKind::UnknownType { prefix: prefix.to_string(), name: String::new() })
    }

    pub fn type_for_prefix(&self, prefix: &str, name: &str) -> Result<Arc<TypeDescriptor>, ParseErrorKind> {
        self.namespace_for_prefix(prefix)
            .ok()
            .and_then(|ns| ns.type_named(name))
            .cloned()
            .ok_or_else(|| unknown_type(prefix, name))
    }
}

fn unknown_type(prefix: &str, name: &str) -> ParseErrorKind {
    ParseErrorKind::UnknownType { prefix: prefix.to_string(), name: name.to_string() }
}

// ── NamespaceScope ────────────────────────────────────────────────────────

/// Prefix bindings declared by a document, layered over the registry's
/// default bindings. Later (inner) declarations shadow earlier ones.
#[derive(Debug)]
pub struct NamespaceScope<'r> {
    registry: &'r TypeRegistry,
    bindings: Vec<(String, String)>,
}

impl<'r> NamespaceScope<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, bindings: Vec::new() }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    pub fn declare(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.push((prefix.into(), uri.into()));
    }

    /// Number of live declarations, for [`truncate`](Self::truncate).
    pub fn depth(&self) -> usize {
        self.bindings.len()
    }

    /// Drop the declarations made after `depth` (leaving an element).
    pub fn truncate(&mut self, depth: usize) {
        self.bindings.truncate(depth);
    }

    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .or_else(|| self.registry.namespace_for_prefix(prefix).ok().map(Namespace::uri))
    }

    pub fn type_for_prefix(&self, prefix: &str, name: &str) -> Result<Arc<TypeDescriptor>, ParseErrorKind> {
        let declared = self.bindings.iter().rev().find(|(p, _)| p == prefix);
        match declared {
            Some((_, uri)) => self
                .registry
                .namespace(uri)
                .and_then(|ns| ns.type_named(name))
                .cloned()
                .ok_or_else(|| unknown_type(prefix, name)),
            None => self.registry.type_for_prefix(prefix, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    fn ty(ns: &str, name: &str) -> Arc<TypeDescriptor> {
        TypeDescriptor::builder::<Marker>(ns, name).build()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn registry_is_shareable_across_threads() {
        assert_send_sync::<TypeRegistry>();
        assert_send_sync::<TypeDescriptor>();
        assert_send_sync::<crate::member::Member>();
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_namespace(Namespace::new("root").with_prefix("").with_type(ty("root", "Window")))
            .with_namespace(Namespace::new("another").with_type(ty("another", "Foreigner")))
    }

    #[test]
    fn type_for_default_prefix() {
        let reg = registry();
        assert_eq!(reg.type_for_prefix("", "Window").unwrap().name(), "Window");
        assert_eq!(reg.namespace_for_prefix("").unwrap().uri(), "root");
    }

    #[test]
    fn unknown_prefix_and_name_fail_with_unknown_type() {
        let reg = registry();
        assert_eq!(
            reg.type_for_prefix("x", "Foreigner").unwrap_err(),
            ParseErrorKind::UnknownType { prefix: "x".into(), name: "Foreigner".into() }
        );
        assert!(matches!(
            reg.type_for_prefix("", "Missing"),
            Err(ParseErrorKind::UnknownType { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn re_adding_a_namespace_merges() {
        let mut reg = registry();
        reg.add_namespace(Namespace::new("another").with_prefix("a").with_type(ty("another", "Second")));
        let ns = reg.namespace("another").unwrap();
        assert_eq!(ns.types().count(), 2);
        assert_eq!(reg.type_for_prefix("a", "Foreigner").unwrap().name(), "Foreigner");
    }

    #[test]
    fn first_prefix_binding_wins() {
        let mut reg = registry();
        reg.add_namespace(Namespace::new("other").with_prefix("").with_type(ty("other", "Window")));
        assert_eq!(reg.type_for_prefix("", "Window").unwrap().namespace(), "root");
    }

    #[test]
    fn scope_declarations_shadow_and_unwind() {
        let reg = registry();
        let mut scope = NamespaceScope::new(&reg);
        assert!(scope.type_for_prefix("x", "Foreigner").is_err());

        let depth = scope.depth();
        scope.declare("x", "another");
        assert_eq!(scope.uri_for_prefix("x"), Some("another"));
        assert_eq!(scope.type_for_prefix("x", "Foreigner").unwrap().namespace(), "another");

        scope.declare("", "another");
        assert!(scope.type_for_prefix("", "Window").is_err());

        scope.truncate(depth);
        assert_eq!(scope.uri_for_prefix("x"), None);
        assert_eq!(scope.type_for_prefix("", "Window").unwrap().namespace(), "root");
    }
}
