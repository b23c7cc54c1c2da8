use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{BuildError, ParseErrorKind};
use crate::instance::{Callback, Instance};
use crate::types::{
    AttachedEventAccessor, AttachedPropertyAccessor, EventAccessor, PropertyAccessor, TypeDescriptor,
    TypeKey,
};
use crate::value::{FromValue, Value, ValueType};

/// How a member is reached.
#[derive(Clone)]
pub enum MemberKind {
    StandardProperty(Arc<PropertyAccessor>),
    StandardEvent(Arc<EventAccessor>),
    /// Defined by an owner type, set on some other instance.
    AttachedProperty(Arc<AttachedPropertyAccessor>),
    AttachedEvent(Arc<AttachedEventAccessor>),
}

/// A resolved, assignable member of a type.
///
/// Two members are equal when their owner type and name match, whatever
/// their kind.
#[derive(Clone)]
pub struct Member {
    owner: TypeKey,
    name: String,
    kind: MemberKind,
}

impl Member {
    /// A property (preferred) or event declared on `ty` itself.
    pub fn from_standard(ty: &TypeDescriptor, name: &str) -> Result<Member, ParseErrorKind> {
        let kind = if let Some(property) = ty.property(name) {
            MemberKind::StandardProperty(Arc::clone(property))
        } else if let Some(event) = ty.event(name) {
            MemberKind::StandardEvent(Arc::clone(event))
        } else {
            return Err(ParseErrorKind::UnknownMember {
                type_name: ty.name().to_string(),
                token: name.to_string(),
            });
        };
        Ok(Member { owner: ty.key().clone(), name: name.to_string(), kind })
    }

    /// A member `owner` attaches to other instances.
    ///
    /// An attached property registration is the owner's `Get<name>`/`Set<name>`
    /// accessor pair, so it wins; otherwise `name` is looked up as an
    /// attached event.
    pub fn from_attached(owner: &TypeDescriptor, name: &str) -> Result<Member, ParseErrorKind> {
        let kind = match owner.attached_property(name) {
            Some(property) => MemberKind::AttachedProperty(Arc::clone(property)),
            None => match owner.attached_event(name) {
                Some(event) => MemberKind::AttachedEvent(Arc::clone(event)),
                None => {
                    return Err(ParseErrorKind::UnknownMember {
                        type_name: owner.name().to_string(),
                        token: format!("{}.{}", owner.name(), name),
                    });
                }
            },
        };
        Ok(Member { owner: owner.key().clone(), name: name.to_string(), kind })
    }

    pub fn owner(&self) -> &TypeKey {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.kind, MemberKind::AttachedProperty(_) | MemberKind::AttachedEvent(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, MemberKind::StandardEvent(_) | MemberKind::AttachedEvent(_))
    }

    pub fn is_attached_property(&self) -> bool {
        matches!(self.kind, MemberKind::AttachedProperty(_))
    }

    pub fn is_attached_event(&self) -> bool {
        matches!(self.kind, MemberKind::AttachedEvent(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(&self.kind, MemberKind::StandardProperty(p) if p.collection)
    }

    /// The type raw markup values are converted to before assignment.
    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            MemberKind::StandardProperty(p) => p.value_type.clone(),
            MemberKind::AttachedProperty(p) => p.value_type.clone(),
            MemberKind::StandardEvent(_) | MemberKind::AttachedEvent(_) => ValueType::Callback,
        }
    }

    /// Assign (or, for events, subscribe) `value` on `target`.
    ///
    /// Attached members go through the owner's accessor; the target's own
    /// members are never consulted.
    pub fn assign(&self, target: &Instance, value: Value) -> Result<(), BuildError> {
        match &self.kind {
            MemberKind::StandardProperty(p) => target.with_object_mut(|object| (p.setter)(object, value)),
            MemberKind::StandardEvent(e) => {
                let callback = self.callback(value)?;
                target.with_object_mut(|object| (e.subscribe)(object, callback))
            }
            MemberKind::AttachedProperty(p) => (p.setter)(target, value),
            MemberKind::AttachedEvent(e) => (e.subscribe)(target, self.callback(value)?),
        }
    }

    /// Read the member back, when it is a readable property.
    pub fn get_value(&self, target: &Instance) -> Option<Value> {
        match &self.kind {
            MemberKind::StandardProperty(p) => {
                let getter = p.getter.as_ref()?;
                target.with_object(|object| getter(object)).flatten()
            }
            MemberKind::AttachedProperty(p) => (p.getter)(target),
            MemberKind::StandardEvent(_) | MemberKind::AttachedEvent(_) => None,
        }
    }

    fn callback(&self, value: Value) -> Result<Callback, BuildError> {
        Callback::from_value(value).map_err(|found| BuildError::TypeMismatch {
            member: self.to_string(),
            expected: Callback::EXPECTED,
            found: found.kind_name(),
        })
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner.name, self.name)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MemberKind::StandardProperty(_) => "property",
            MemberKind::StandardEvent(_) => "event",
            MemberKind::AttachedProperty(_) => "attached property",
            MemberKind::AttachedEvent(_) => "attached event",
        };
        write!(f, "Member({self} {kind})")
    }
}
