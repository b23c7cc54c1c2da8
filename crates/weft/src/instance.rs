use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::BuildError;
use crate::types::{MethodFn, TypeDescriptor, TypeKey};
use crate::value::Value;

// ── Instance ──────────────────────────────────────────────────────────────

struct InstanceInner {
    object: RefCell<Box<dyn Any>>,
    ty: Arc<TypeDescriptor>,
    /// Values assigned through attached properties, keyed by owner type and name.
    attached: RefCell<HashMap<(TypeKey, String), Value>>,
}

/// A shared handle to one object in a constructed graph.
///
/// Cloning the handle does not clone the object.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    pub fn new(ty: Arc<TypeDescriptor>, object: Box<dyn Any>) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                object: RefCell::new(object),
                ty,
                attached: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn type_descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.inner.ty
    }

    pub fn is<T: Any>(&self) -> bool {
        (**self.inner.object.borrow()).is::<T>()
    }

    /// Borrow the object as `T`. `None` if it is some other type.
    ///
    /// Panics if the object is currently mutably borrowed.
    pub fn borrow<T: Any>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.inner.object.borrow(), |b| (**b).downcast_ref::<T>()).ok()
    }

    /// Mutably borrow the object as `T`. `None` if it is some other type.
    ///
    /// Panics if the object is currently borrowed.
    pub fn borrow_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.inner.object.borrow_mut(), |b| (**b).downcast_mut::<T>()).ok()
    }

    /// `None` if the object is currently mutably borrowed.
    pub(crate) fn with_object<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> Option<R> {
        let guard = self.inner.object.try_borrow().ok()?;
        Some(f(&**guard))
    }

    pub(crate) fn with_object_mut<R>(
        &self,
        f: impl FnOnce(&mut dyn Any) -> Result<R, BuildError>,
    ) -> Result<R, BuildError> {
        let mut guard = self.inner.object.try_borrow_mut().map_err(|_| {
            BuildError::InstanceBorrowed { type_name: self.inner.ty.name().to_string() }
        })?;
        f(&mut **guard)
    }

    /// Read a value stored through an attached property of `owner`.
    pub fn attached(&self, owner: &TypeKey, name: &str) -> Option<Value> {
        self.inner.attached.borrow().get(&(owner.clone(), name.to_string())).cloned()
    }

    pub fn set_attached(&self, owner: &TypeKey, name: &str, value: Value) {
        self.inner.attached.borrow_mut().insert((owner.clone(), name.to_string()), value);
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance { inner: Rc::downgrade(&self.inner) }
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>", self.inner.ty.key())
    }
}

/// A non-owning [`Instance`] handle.
#[derive(Clone)]
pub struct WeakInstance {
    inner: Weak<InstanceInner>,
}

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.inner.upgrade().map(|inner| Instance { inner })
    }

    fn ptr_eq(&self, other: &WeakInstance) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

// ── Callback ──────────────────────────────────────────────────────────────

/// A method of the root instance, bound by name from markup.
///
/// The binding holds the root weakly, so a callback stored inside the graph
/// does not keep the graph alive.
#[derive(Clone)]
pub struct Callback {
    name: String,
    target: WeakInstance,
    method: MethodFn,
}

impl Callback {
    pub(crate) fn new(name: impl Into<String>, target: WeakInstance, method: MethodFn) -> Self {
        Self { name: name.into(), target, method }
    }

    /// The method name this callback was bound from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<Instance> {
        self.target.upgrade()
    }

    pub fn invoke(&self, args: &[Value]) -> Result<(), BuildError> {
        let target = self
            .target
            .upgrade()
            .ok_or_else(|| BuildError::CallbackTargetDropped { name: self.name.clone() })?;
        target.with_object_mut(|object| (self.method)(object, args))
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.target.ptr_eq(&other.target)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish_non_exhaustive()
    }
}
