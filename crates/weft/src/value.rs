use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::instance::{Callback, Instance};

// ── Enumerations ──────────────────────────────────────────────────────────

/// A named enumeration a member can be typed as.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    name: String,
    members: Vec<(String, i64)>,
}

impl EnumDescriptor {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (S, i64)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            members: members.into_iter().map(|(n, d)| (n.into(), d)).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, i64)> {
        self.members.iter().map(|(n, d)| (n.as_str(), *d))
    }

    /// Look up a member by its exact (case-sensitive) name.
    pub fn parse(self: &Arc<Self>, raw: &str) -> Option<EnumValue> {
        self.members.iter().find(|(n, _)| n == raw).map(|(n, d)| EnumValue {
            ty: Arc::clone(self),
            name: n.clone(),
            discriminant: *d,
        })
    }
}

/// One member of an [`EnumDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    ty: Arc<EnumDescriptor>,
    name: String,
    discriminant: i64,
}

impl EnumValue {
    pub fn enumeration(&self) -> &Arc<EnumDescriptor> {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discriminant(&self) -> i64 {
        self.discriminant
    }
}

// ── ValueType ─────────────────────────────────────────────────────────────

/// The declared type of a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Float,
    Text,
    /// A bound reference to a method on the root instance.
    Callback,
    /// Another instance from the same object graph.
    Object,
    Enum(Arc<EnumDescriptor>),
    /// A host-defined type; values come from a converter registered for it.
    Custom(String),
}

impl ValueType {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer => f.write_str("integer"),
            ValueType::Float => f.write_str("float"),
            ValueType::Text => f.write_str("text"),
            ValueType::Callback => f.write_str("callback"),
            ValueType::Object => f.write_str("object"),
            ValueType::Enum(e) => write!(f, "enum {}", e.name()),
            ValueType::Custom(name) => f.write_str(name),
        }
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

/// A converted value ready to be assigned to a member.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Enum(EnumValue),
    Callback(Callback),
    Object(Instance),
    Custom(Rc<dyn Any>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Enum(_) => "enum",
            Value::Callback(_) => "callback",
            Value::Object(_) => "object",
            Value::Custom(_) => "custom",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn downcast_custom<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "Integer({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Enum(e) => write!(f, "Enum({}::{})", e.enumeration().name(), e.name()),
            Value::Callback(c) => write!(f, "Callback({})", c.name()),
            Value::Object(i) => write!(f, "Object({:?})", i),
            Value::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Callback(a), Value::Callback(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Custom(a), Value::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ── FromValue ─────────────────────────────────────────────────────────────

/// Typed extraction used by the closures registered on a type builder.
///
/// On mismatch the value itself is handed back so the caller can report
/// what was actually found.
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "32-bit integer";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(v) => i32::try_from(v).map_err(|_| Value::Integer(v)),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(other),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "text";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for EnumValue {
    const EXPECTED: &'static str = "enum";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Enum(e) => Ok(e),
            other => Err(other),
        }
    }
}

impl FromValue for Callback {
    const EXPECTED: &'static str = "callback";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Callback(c) => Ok(c),
            other => Err(other),
        }
    }
}

impl FromValue for Instance {
    const EXPECTED: &'static str = "object";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(i) => Ok(i),
            other => Err(other),
        }
    }
}
