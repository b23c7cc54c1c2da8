//! Type descriptors: the explicit, registration-time replacement for runtime
//! reflection.
//!
//! A host describes each markup-visible type once with a [`TypeBuilder`],
//! giving typed closures for every property, event, attached member and
//! callback method. The builder erases them to `dyn Any` accessors so the
//! parser and object builder never need to know the concrete Rust type.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::error::BuildError;
use crate::instance::{Callback, Instance};
use crate::member::Member;
use crate::value::{FromValue, Value, ValueType};

pub(crate) type FactoryFn = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;
pub(crate) type SetterFn = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), BuildError> + Send + Sync>;
pub(crate) type GetterFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
pub(crate) type SubscribeFn =
    Arc<dyn Fn(&mut dyn Any, Callback) -> Result<(), BuildError> + Send + Sync>;
pub(crate) type AttachedSetterFn =
    Arc<dyn Fn(&Instance, Value) -> Result<(), BuildError> + Send + Sync>;
pub(crate) type AttachedGetterFn = Arc<dyn Fn(&Instance) -> Option<Value> + Send + Sync>;
pub(crate) type AttachedSubscribeFn =
    Arc<dyn Fn(&Instance, Callback) -> Result<(), BuildError> + Send + Sync>;
pub(crate) type MethodFn =
    Arc<dyn Fn(&mut dyn Any, &[Value]) -> Result<(), BuildError> + Send + Sync>;
pub(crate) type HookFn = Arc<dyn Fn(&mut dyn Any) -> Result<(), BuildError> + Send + Sync>;

// ── TypeKey ───────────────────────────────────────────────────────────────

/// Identity of a registered type: owning namespace plus local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub namespace: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.name)
    }
}

// ── Accessors ─────────────────────────────────────────────────────────────

pub struct PropertyAccessor {
    pub(crate) value_type: ValueType,
    /// Collection members receive one setter call per item.
    pub(crate) collection: bool,
    pub(crate) setter: SetterFn,
    pub(crate) getter: Option<GetterFn>,
}

pub struct EventAccessor {
    pub(crate) subscribe: SubscribeFn,
}

pub struct AttachedPropertyAccessor {
    pub(crate) value_type: ValueType,
    pub(crate) setter: AttachedSetterFn,
    pub(crate) getter: AttachedGetterFn,
}

pub struct AttachedEventAccessor {
    pub(crate) subscribe: AttachedSubscribeFn,
}

// ── TypeDescriptor ────────────────────────────────────────────────────────

/// Everything the engine knows about one instantiable type.
///
/// Immutable once built. The only interior state is the resolved-member
/// cache, which never changes what a lookup returns.
pub struct TypeDescriptor {
    key: TypeKey,
    rust_type: &'static str,
    factory: Option<FactoryFn>,
    properties: IndexMap<String, Arc<PropertyAccessor>>,
    events: IndexMap<String, Arc<EventAccessor>>,
    attached_properties: IndexMap<String, Arc<AttachedPropertyAccessor>>,
    attached_events: IndexMap<String, Arc<AttachedEventAccessor>>,
    methods: IndexMap<String, MethodFn>,
    content_property: Option<String>,
    name_property: Option<String>,
    initialized: Option<HookFn>,
    members: RwLock<HashMap<(bool, String), Member>>,
}

impl TypeDescriptor {
    /// Start describing `T` as `name` inside namespace `namespace`.
    pub fn builder<T: Any>(namespace: impl Into<String>, name: impl Into<String>) -> TypeBuilder<T> {
        TypeBuilder::new(TypeKey::new(namespace, name))
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    /// Name of the Rust type this descriptor was built for.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some()
    }

    /// Run the parameterless constructor.
    pub fn instantiate(&self) -> Result<Box<dyn Any>, BuildError> {
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| BuildError::NotInstantiable { type_name: self.key.name.clone() })?;
        Ok(factory())
    }

    pub fn property(&self, name: &str) -> Option<&Arc<PropertyAccessor>> {
        self.properties.get(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn event(&self, name: &str) -> Option<&Arc<EventAccessor>> {
        self.events.get(name)
    }

    pub fn attached_property(&self, name: &str) -> Option<&Arc<AttachedPropertyAccessor>> {
        self.attached_properties.get(name)
    }

    pub fn attached_event(&self, name: &str) -> Option<&Arc<AttachedEventAccessor>> {
        self.attached_events.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub(crate) fn method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    /// The member that receives nested content when no property element names one.
    pub fn content_property(&self) -> Option<&str> {
        self.content_property.as_deref()
    }

    /// The property whose value registers the instance in the namescope.
    pub fn name_property(&self) -> Option<&str> {
        self.name_property.as_deref()
    }

    pub(crate) fn run_initialized(&self, instance: &Instance) -> Result<(), BuildError> {
        match &self.initialized {
            Some(hook) => instance.with_object_mut(|object| hook(object)),
            None => Ok(()),
        }
    }

    pub(crate) fn cached_member(&self, attached: bool, name: &str) -> Option<Member> {
        let cache = self.members.read().ok()?;
        cache.get(&(attached, name.to_string())).cloned()
    }

    pub(crate) fn cache_member(&self, attached: bool, member: &Member) {
        if let Ok(mut cache) = self.members.write() {
            cache.insert((attached, member.name().to_string()), member.clone());
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("rust_type", &self.rust_type)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("content", &self.content_property)
            .finish_non_exhaustive()
    }
}

// ── TypeBuilder ───────────────────────────────────────────────────────────

/// Describes a Rust type `T` for the registry.
///
/// ```rust,ignore
/// let button = TypeDescriptor::builder::<Button>("urn:demo", "Button")
///     .default_constructor()
///     .property("Label", ValueType::Text, |b: &mut Button, v: String| b.label = v)
///     .event("Click", |b: &mut Button, cb| b.click.push(cb))
///     .content("Label")
///     .build();
/// ```
pub struct TypeBuilder<T> {
    key: TypeKey,
    factory: Option<FactoryFn>,
    properties: IndexMap<String, PropertyAccessor>,
    events: IndexMap<String, Arc<EventAccessor>>,
    attached_properties: IndexMap<String, Arc<AttachedPropertyAccessor>>,
    attached_events: IndexMap<String, Arc<AttachedEventAccessor>>,
    methods: IndexMap<String, MethodFn>,
    content_property: Option<String>,
    name_property: Option<String>,
    initialized: Option<HookFn>,
    _marker: PhantomData<fn() -> T>,
}

fn downcast<'o, T: Any>(object: &'o mut dyn Any, key: &TypeKey) -> Result<&'o mut T, BuildError> {
    object.downcast_mut::<T>().ok_or_else(|| {
        BuildError::Host(format!("instance of `{}` is not a `{}`", key.name, type_name::<T>()))
    })
}

fn extract<V: FromValue>(member: &str, value: Value) -> Result<V, BuildError> {
    V::from_value(value).map_err(|found| BuildError::TypeMismatch {
        member: member.to_string(),
        expected: V::EXPECTED,
        found: found.kind_name(),
    })
}

impl<T: Any> TypeBuilder<T> {
    fn new(key: TypeKey) -> Self {
        Self {
            key,
            factory: None,
            properties: IndexMap::new(),
            events: IndexMap::new(),
            attached_properties: IndexMap::new(),
            attached_events: IndexMap::new(),
            methods: IndexMap::new(),
            content_property: None,
            name_property: None,
            initialized: None,
            _marker: PhantomData,
        }
    }

    pub fn constructor(mut self, make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.factory = Some(Arc::new(move || Box::new(make()) as Box<dyn Any>));
        self
    }

    pub fn property<V, F>(self, name: &str, value_type: ValueType, set: F) -> Self
    where
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.insert_property(name, value_type, false, set)
    }

    /// A property that accepts many values, one setter call each.
    pub fn collection<V, F>(self, name: &str, item_type: ValueType, add: F) -> Self
    where
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.insert_property(name, item_type, true, add)
    }

    fn insert_property<V, F>(mut self, name: &str, value_type: ValueType, collection: bool, set: F) -> Self
    where
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let member = format!("{}.{}", key.name, name);
        let setter: SetterFn = Arc::new(move |object: &mut dyn Any, value: Value| {
            let target = downcast::<T>(object, &key)?;
            set(target, extract::<V>(&member, value)?);
            Ok(())
        });
        self.properties.insert(
            name.to_string(),
            PropertyAccessor { value_type, collection, setter, getter: None },
        );
        self
    }

    /// Make an already-declared property readable.
    pub fn getter(mut self, name: &str, get: impl Fn(&T) -> Option<Value> + Send + Sync + 'static) -> Self {
        match self.properties.get_mut(name) {
            Some(property) => {
                property.getter = Some(Arc::new(move |object: &dyn Any| object.downcast_ref::<T>().and_then(&get)));
            }
            None => log::warn!("getter for undeclared property `{}.{}` ignored", self.key.name, name),
        }
        self
    }

    pub fn event<F>(mut self, name: &str, subscribe: F) -> Self
    where
        F: Fn(&mut T, Callback) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let subscribe: SubscribeFn = Arc::new(move |object: &mut dyn Any, callback: Callback| {
            subscribe(downcast::<T>(object, &key)?, callback);
            Ok(())
        });
        self.events.insert(name.to_string(), Arc::new(EventAccessor { subscribe }));
        self
    }

    /// An attached property whose values are stored on the target instance.
    ///
    /// Read them back with [`Instance::attached`].
    pub fn attached_property(mut self, name: &str, value_type: ValueType) -> Self {
        let owner = self.key.clone();
        let member = name.to_string();
        let setter: AttachedSetterFn = {
            let (owner, member) = (owner.clone(), member.clone());
            Arc::new(move |target: &Instance, value: Value| {
                target.set_attached(&owner, &member, value);
                Ok(())
            })
        };
        let getter: AttachedGetterFn = Arc::new(move |target: &Instance| target.attached(&owner, &member));
        self.attached_properties.insert(
            name.to_string(),
            Arc::new(AttachedPropertyAccessor { value_type, setter, getter }),
        );
        self
    }

    /// An attached property with host-defined storage.
    pub fn attached_property_with<V, G, S>(mut self, name: &str, value_type: ValueType, get: G, set: S) -> Self
    where
        V: FromValue,
        G: Fn(&Instance) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&Instance, V) + Send + Sync + 'static,
    {
        let member = format!("{}.{}", self.key.name, name);
        let setter: AttachedSetterFn = Arc::new(move |target: &Instance, value: Value| {
            set(target, extract::<V>(&member, value)?);
            Ok(())
        });
        self.attached_properties.insert(
            name.to_string(),
            Arc::new(AttachedPropertyAccessor { value_type, setter, getter: Arc::new(get) }),
        );
        self
    }

    pub fn attached_event<F>(mut self, name: &str, subscribe: F) -> Self
    where
        F: Fn(&Instance, Callback) + Send + Sync + 'static,
    {
        let subscribe: AttachedSubscribeFn = Arc::new(move |target: &Instance, callback: Callback| {
            subscribe(target, callback);
            Ok(())
        });
        self.attached_events.insert(name.to_string(), Arc::new(AttachedEventAccessor { subscribe }));
        self
    }

    /// A method markup can bind to by name when this type is the root.
    pub fn method<F>(mut self, name: &str, call: F) -> Self
    where
        F: Fn(&mut T, &[Value]) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let method: MethodFn = Arc::new(move |object: &mut dyn Any, args: &[Value]| {
            call(downcast::<T>(object, &key)?, args);
            Ok(())
        });
        self.methods.insert(name.to_string(), method);
        self
    }

    /// Mark `name` as the content receptacle. A later call replaces an earlier one.
    pub fn content(mut self, name: &str) -> Self {
        self.content_property = Some(name.to_string());
        self
    }

    pub fn name_property(mut self, name: &str) -> Self {
        self.name_property = Some(name.to_string());
        self
    }

    /// Run `hook` once the instance and its whole subtree are built.
    pub fn on_initialized(mut self, hook: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        let key = self.key.clone();
        self.initialized = Some(Arc::new(move |object: &mut dyn Any| {
            hook(downcast::<T>(object, &key)?);
            Ok(())
        }));
        self
    }

    pub fn build(self) -> Arc<TypeDescriptor> {
        for (label, declared) in [("content", &self.content_property), ("name", &self.name_property)] {
            if let Some(name) = declared {
                if !self.properties.contains_key(name) {
                    log::warn!("{} property `{}.{}` is not declared", label, self.key.name, name);
                }
            }
        }
        Arc::new(TypeDescriptor {
            key: self.key,
            rust_type: type_name::<T>(),
            factory: self.factory,
            properties: self.properties.into_iter().map(|(n, p)| (n, Arc::new(p))).collect(),
            events: self.events,
            attached_properties: self.attached_properties,
            attached_events: self.attached_events,
            methods: self.methods,
            content_property: self.content_property,
            name_property: self.name_property,
            initialized: self.initialized,
            members: RwLock::new(HashMap::new()),
        })
    }
}

impl<T: Any + Default> TypeBuilder<T> {
    /// Use `T::default()` as the parameterless constructor.
    pub fn default_constructor(self) -> Self {
        self.constructor(T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Panel {
        title: String,
        children: Vec<Instance>,
    }

    fn panel() -> Arc<TypeDescriptor> {
        TypeDescriptor::builder::<Panel>("urn:test", "Panel")
            .default_constructor()
            .property("Title", ValueType::Text, |p: &mut Panel, v: String| p.title = v)
            .getter("Title", |p: &Panel| Some(Value::Text(p.title.clone())))
            .collection("Children", ValueType::Object, |p: &mut Panel, v: Instance| p.children.push(v))
            .attached_property("Dock", ValueType::Text)
            .content("Title")
            .content("Children")
            .build()
    }

    #[test]
    fn later_content_declaration_replaces_earlier() {
        assert_eq!(panel().content_property(), Some("Children"));
    }

    #[test]
    fn setter_reports_type_mismatch() {
        let ty = panel();
        let mut object = ty.instantiate().unwrap();
        let setter = &ty.property("Title").unwrap().setter;
        let err = setter(object.as_mut(), Value::Integer(3)).unwrap_err();
        assert_eq!(
            err,
            BuildError::TypeMismatch { member: "Panel.Title".into(), expected: "text", found: "integer" }
        );
        setter(object.as_mut(), Value::Text("Main".into())).unwrap();
        let getter = ty.property("Title").unwrap().getter.as_ref().unwrap();
        assert_eq!(getter(object.as_ref()), Some(Value::Text("Main".into())));
    }

    #[test]
    fn missing_constructor_is_not_instantiable() {
        let ty = TypeDescriptor::builder::<Panel>("urn:test", "Abstract").build();
        assert!(!ty.is_instantiable());
        assert_eq!(
            ty.instantiate().unwrap_err(),
            BuildError::NotInstantiable { type_name: "Abstract".into() }
        );
    }

    #[test]
    fn descriptors_compare_by_key() {
        assert_eq!(*panel(), *panel());
        assert_eq!(panel().rust_type(), type_name::<Panel>());
    }
}
