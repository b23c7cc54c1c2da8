//! Declarative object composition from angle-bracket markup.
//!
//! A host registers its types once, then loads markup documents into live
//! object graphs: elements become instances, attributes become member
//! assignments, nested elements become member values.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`registry`] | `TypeRegistry`, `Namespace`, `NamespaceScope` |
//! | [`types`] | `TypeDescriptor`, `TypeBuilder`, `TypeKey` |
//! | [`member`] | `Member`, `MemberKind` |
//! | [`resolver`] | `resolve_member`, `resolve_property_element` |
//! | [`parser`] | `ProtoParser`, the lazy `Instructions` stream |
//! | [`instruction`] | `Instruction` |
//! | [`tree`] | `ConstructionNode`, folded from instructions |
//! | [`convert`] | `ValueConverter`, `ConverterContext` |
//! | [`builder`] | `ObjectBuilder`, `InstanceCreator` |
//! | [`context`] | `BuildContext`, `Namescope`, lifecycle hooks |
//! | [`loader`] | `Loader`, `ConstructionResult` |
//! | [`value`] / [`instance`] | the dynamic value and object model |
//! | [`error`] | `ParseError`, `BuildError`, `LoadError` |
//! | [`logging`] | `init_logging` |
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use weft::{Loader, Namespace, TypeDescriptor, TypeRegistry, ValueType};
//!
//! #[derive(Default)]
//! struct Label {
//!     text: String,
//! }
//!
//! let label = TypeDescriptor::builder::<Label>("urn:demo", "Label")
//!     .default_constructor()
//!     .property("Text", ValueType::Text, |l: &mut Label, v: String| l.text = v)
//!     .content("Text")
//!     .build();
//! let registry = TypeRegistry::new()
//!     .with_namespace(Namespace::new("urn:demo").with_prefix("").with_type(label));
//!
//! let loader = Loader::new(Arc::new(registry));
//! let result = loader.load("<Label>Hello</Label>").unwrap();
//! assert_eq!(result.root().borrow::<Label>().unwrap().text, "Hello");
//! ```

pub mod builder;
pub mod context;
pub mod convert;
pub mod error;
pub mod instance;
pub mod instruction;
pub mod loader;
pub mod logging;
pub mod member;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod tree;
pub mod types;
pub mod value;

#[cfg(test)]
mod testing;

pub use builder::{DefaultInstanceCreator, InstanceCreator, ObjectBuilder};
pub use context::{BuildContext, InstanceLifecycleSignaler, LifecycleListener, Namescope};
pub use convert::{ConverterContext, ValueConverter};
pub use error::{BuildError, LoadError, ParseError, ParseErrorKind, Position};
pub use instance::{Callback, Instance, WeakInstance};
pub use instruction::Instruction;
pub use loader::{ConstructionResult, Loader};
pub use member::{Member, MemberKind};
pub use parser::ProtoParser;
pub use registry::{Namespace, NamespaceScope, TypeRegistry};
pub use tree::{ConstructionNode, ContentNode, PropertyNode};
pub use types::{TypeBuilder, TypeDescriptor, TypeKey};
pub use value::{EnumDescriptor, EnumValue, FromValue, Value, ValueType};
