use std::fmt;
use std::sync::Arc;

use crate::member::Member;
use crate::types::TypeDescriptor;

/// One step of the flat construction program the parser produces.
///
/// Order is significant: a prefix declaration precedes the `ElementStart` of
/// the element that declares it, and that element's attributes follow it.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    NamespacePrefixDeclaration { prefix: String, namespace: String },
    ElementStart { ty: Arc<TypeDescriptor>, is_empty: bool },
    ElementEnd,
    Attribute { member: Member, value: String },
    /// Opens an explicit `Owner.Member` nested value.
    PropertyElementStart { owner: Arc<TypeDescriptor>, member: Member },
    Text(String),
}

impl Instruction {
    pub fn prefix_declaration(prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::NamespacePrefixDeclaration { prefix: prefix.into(), namespace: namespace.into() }
    }

    pub fn element(ty: &Arc<TypeDescriptor>, is_empty: bool) -> Self {
        Self::ElementStart { ty: Arc::clone(ty), is_empty }
    }

    pub fn attribute(member: Member, value: impl Into<String>) -> Self {
        Self::Attribute { member, value: value.into() }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::NamespacePrefixDeclaration { prefix, namespace } => {
                write!(f, "xmlns {prefix:?} = {namespace:?}")
            }
            Instruction::ElementStart { ty, is_empty } => {
                write!(f, "start {}{}", ty.key(), if *is_empty { " (empty)" } else { "" })
            }
            Instruction::ElementEnd => f.write_str("end"),
            Instruction::Attribute { member, value } => write!(f, "attr {member} = {value:?}"),
            Instruction::PropertyElementStart { member, .. } => write!(f, "member {member}"),
            Instruction::Text(text) => write!(f, "text {text:?}"),
        }
    }
}
