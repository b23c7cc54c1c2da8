//! Raw markup strings to typed [`Value`]s.
//!
//! Dispatch order, first match wins:
//!
//! | Target                 | Result                                           |
//! |------------------------|--------------------------------------------------|
//! | `Integer` / `Float`    | parsed as `i64` / `f64`                          |
//! | `Callback`             | root method of that name, bound weakly           |
//! | registered custom type | whatever the registered converter returns        |
//! | `Enum`                 | exact-name member                                |
//! | anything else          | `Value::Text(raw)`                               |

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::instance::Callback;
use crate::registry::TypeRegistry;
use crate::value::{Value, ValueType};

/// What a registered converter gets to work with.
pub struct ConverterContext<'a> {
    pub target: &'a ValueType,
    pub raw: &'a str,
    pub registry: &'a TypeRegistry,
    pub build_context: &'a BuildContext,
}

pub type ConverterFn = Arc<dyn Fn(&ConverterContext<'_>) -> Result<Value, BuildError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ValueConverter {
    converters: HashMap<ValueType, ConverterFn>,
}

impl ValueConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `convert` for exactly `target`, replacing any earlier one.
    pub fn add(
        &mut self,
        target: ValueType,
        convert: impl Fn(&ConverterContext<'_>) -> Result<Value, BuildError> + Send + Sync + 'static,
    ) {
        self.converters.insert(target, Arc::new(convert));
    }

    pub fn with(
        mut self,
        target: ValueType,
        convert: impl Fn(&ConverterContext<'_>) -> Result<Value, BuildError> + Send + Sync + 'static,
    ) -> Self {
        self.add(target, convert);
        self
    }

    pub fn has_converter(&self, target: &ValueType) -> bool {
        self.converters.contains_key(target)
    }

    pub fn convert(
        &self,
        raw: &str,
        target: &ValueType,
        registry: &TypeRegistry,
        ctx: &BuildContext,
    ) -> Result<Value, BuildError> {
        match target {
            ValueType::Integer => raw.trim().parse::<i64>().map(Value::Integer).map_err(|_| failed(target, raw)),
            ValueType::Float => raw.trim().parse::<f64>().map(Value::Float).map_err(|_| failed(target, raw)),
            ValueType::Callback => bind_callback(raw, ctx).map(Value::Callback),
            _ => {
                if let Some(convert) = self.converters.get(target) {
                    return convert(&ConverterContext { target, raw, registry, build_context: ctx });
                }
                match target {
                    ValueType::Enum(descriptor) => descriptor.parse(raw).map(Value::Enum).ok_or_else(|| {
                        BuildError::InvalidEnumValue { name: raw.to_string(), target: descriptor.name().to_string() }
                    }),
                    _ => Ok(Value::Text(raw.to_string())),
                }
            }
        }
    }
}

fn bind_callback(name: &str, ctx: &BuildContext) -> Result<Callback, BuildError> {
    let unresolved = || BuildError::UnresolvedCallback { name: name.to_string() };
    let root = ctx.root().ok_or_else(unresolved)?;
    let method = root.type_descriptor().method(name).ok_or_else(unresolved)?;
    Ok(Callback::new(name, root.downgrade(), Arc::clone(method)))
}

fn failed(target: &ValueType, raw: &str) -> BuildError {
    BuildError::ValueConversion { target: target.to_string(), raw: raw.to_string() }
}
