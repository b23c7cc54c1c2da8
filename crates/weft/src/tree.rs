//! The construction tree: the instruction stream folded back into nesting.

use std::sync::Arc;

use crate::error::{ParseError, ParseErrorKind};
use crate::instruction::Instruction;
use crate::member::Member;
use crate::types::TypeDescriptor;

/// One element awaiting construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionNode {
    pub ty: Arc<TypeDescriptor>,
    pub is_empty: bool,
    /// `(prefix, namespace)` pairs declared on this element.
    pub prefix_declarations: Vec<(String, String)>,
    pub attributes: Vec<(Member, String)>,
    pub children: Vec<ContentNode>,
}

/// A child of an element, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    /// Bare nested element, destined for the content member.
    Element(ConstructionNode),
    /// Bare significant text, destined for the content member.
    Text(String),
    Property(PropertyNode),
}

/// An explicit `Owner.Member` property element.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub owner: Arc<TypeDescriptor>,
    pub member: Member,
    pub prefix_declarations: Vec<(String, String)>,
    pub values: Vec<ConstructionNode>,
    /// Trimmed trailing text; empty when there was none.
    pub text: String,
}

enum Open {
    Element(ConstructionNode),
    Property(PropertyNode),
}

impl ConstructionNode {
    pub fn new(ty: Arc<TypeDescriptor>) -> Self {
        Self {
            ty,
            is_empty: false,
            prefix_declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Fold an instruction stream into its root node.
    ///
    /// The first error from the stream is returned as-is; a stream that is
    /// not a single balanced element is `UnbalancedStructure`.
    pub fn from_instructions<I>(instructions: I) -> Result<ConstructionNode, ParseError>
    where
        I: IntoIterator<Item = Result<Instruction, ParseError>>,
    {
        let mut stack: Vec<Open> = Vec::new();
        let mut declarations: Vec<(String, String)> = Vec::new();
        let mut root: Option<ConstructionNode> = None;

        for instruction in instructions {
            let instruction = instruction?;
            if root.is_some() {
                return Err(ParseError::unbalanced("instructions after the root element closed"));
            }
            match instruction {
                Instruction::NamespacePrefixDeclaration { prefix, namespace } => {
                    declarations.push((prefix, namespace));
                }
                Instruction::ElementStart { ty, is_empty } => {
                    let mut node = ConstructionNode::new(ty);
                    node.is_empty = is_empty;
                    node.prefix_declarations = std::mem::take(&mut declarations);
                    stack.push(Open::Element(node));
                }
                Instruction::Attribute { member, value } => match stack.last_mut() {
                    Some(Open::Element(node)) if node.children.is_empty() => node.attributes.push((member, value)),
                    _ => return Err(ParseError::unbalanced("attribute outside an element start")),
                },
                Instruction::PropertyElementStart { owner, member } => match stack.last() {
                    Some(Open::Element(_)) => stack.push(Open::Property(PropertyNode {
                        owner,
                        member,
                        prefix_declarations: std::mem::take(&mut declarations),
                        values: Vec::new(),
                        text: String::new(),
                    })),
                    _ => return Err(ParseError::unbalanced("property element outside an element")),
                },
                Instruction::Text(text) => match stack.last_mut() {
                    Some(Open::Element(node)) => node.children.push(ContentNode::Text(text)),
                    Some(Open::Property(property)) => property.text.push_str(&text),
                    None => return Err(ParseError::unbalanced("text outside the root element")),
                },
                Instruction::ElementEnd => {
                    let closed = stack.pop().ok_or_else(|| ParseError::unbalanced("unmatched element end"))?;
                    match (closed, stack.last_mut()) {
                        (Open::Element(node), None) => root = Some(node),
                        (Open::Element(node), Some(Open::Element(parent))) => {
                            parent.children.push(ContentNode::Element(node));
                        }
                        (Open::Element(node), Some(Open::Property(property))) => property.values.push(node),
                        (Open::Property(property), Some(Open::Element(parent))) => {
                            parent.children.push(ContentNode::Property(property));
                        }
                        (Open::Property(_), _) => {
                            return Err(ParseError::unbalanced("property element outside an element"));
                        }
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(ParseError::unbalanced("instruction stream ended inside an element"));
        }
        root.ok_or_else(|| {
            ParseError::unplaced(ParseErrorKind::InvalidRootElement { found: "an empty instruction stream".into() })
        })
    }

    /// Flatten back into instructions, in the order the parser emits them.
    pub fn to_instructions(&self) -> Vec<Instruction> {
        let mut out = Vec::new();
        self.emit(&mut out);
        out
    }

    fn emit(&self, out: &mut Vec<Instruction>) {
        for (prefix, namespace) in &self.prefix_declarations {
            out.push(Instruction::prefix_declaration(prefix, namespace));
        }
        out.push(Instruction::element(&self.ty, self.is_empty));
        for (member, value) in &self.attributes {
            out.push(Instruction::attribute(member.clone(), value));
        }
        for child in &self.children {
            match child {
                ContentNode::Element(node) => node.emit(out),
                ContentNode::Text(text) => out.push(Instruction::text(text)),
                ContentNode::Property(property) => {
                    for (prefix, namespace) in &property.prefix_declarations {
                        out.push(Instruction::prefix_declaration(prefix, namespace));
                    }
                    out.push(Instruction::PropertyElementStart {
                        owner: Arc::clone(&property.owner),
                        member: property.member.clone(),
                    });
                    for value in &property.values {
                        value.emit(out);
                    }
                    out.push(Instruction::text(&property.text));
                    out.push(Instruction::ElementEnd);
                }
            }
        }
        out.push(Instruction::ElementEnd);
    }

    /// Number of elements in this subtree, property-element values included.
    pub fn element_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| match child {
                ContentNode::Element(node) => node.element_count(),
                ContentNode::Text(_) => 0,
                ContentNode::Property(property) => property.values.iter().map(Self::element_count).sum(),
            })
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ProtoParser;
    use crate::testing;

    fn fold(src: &str) -> Result<ConstructionNode, ParseError> {
        let reg = testing::registry();
        ConstructionNode::from_instructions(ProtoParser::new(&reg).parse(src))
    }

    #[test]
    fn folds_children_in_document_order() {
        let root = fold(
            r#"<StackPanel Name="panel"><Button Label="a"/>loose<StackPanel.Children><Button/></StackPanel.Children></StackPanel>"#,
        )
        .unwrap();
        assert_eq!(root.ty.name(), "StackPanel");
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.children.len(), 3);
        assert!(matches!(&root.children[0], ContentNode::Element(n) if n.ty.name() == "Button"));
        assert_eq!(root.children[1], ContentNode::Text("loose".into()));
        match &root.children[2] {
            ContentNode::Property(p) => {
                assert_eq!(p.member.name(), "Children");
                assert_eq!(p.values.len(), 1);
                assert!(p.text.is_empty());
            }
            other => panic!("expected property element, got {other:?}"),
        }
        assert_eq!(root.element_count(), 3);
    }

    #[test]
    fn declarations_stay_with_their_element() {
        let root = fold(r#"<Window xmlns:x="another"><Window.Content><Button xmlns:y="root"/></Window.Content></Window>"#)
            .unwrap();
        assert_eq!(root.prefix_declarations, vec![("x".to_string(), "another".to_string())]);
        let ContentNode::Property(p) = &root.children[0] else { panic!("expected property element") };
        assert_eq!(p.values[0].prefix_declarations, vec![("y".to_string(), "root".to_string())]);
    }

    #[test]
    fn round_trips_the_parser_stream() {
        let reg = testing::registry();
        let src = r#"<Window xmlns:x="another" Title="Main" x:Foreigner.Property="v"><Window.Content><Button Label="ok"/></Window.Content></Window>"#;
        let parsed: Vec<_> = ProtoParser::new(&reg).parse(src).collect::<Result<_, _>>().unwrap();
        let root = ConstructionNode::from_instructions(parsed.clone().into_iter().map(Ok)).unwrap();
        assert_eq!(root.to_instructions(), parsed);
    }

    #[test]
    fn parse_errors_pass_through() {
        let err = fold("<Window><Slider/></Window>").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownType { .. }));
        assert!(err.pos.is_some());
    }

    #[test]
    fn trailing_content_keeps_the_parser_position() {
        let err = fold("<Window/>\n<Window/>").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnbalancedStructure { .. }));
        assert_eq!(err.pos.map(|p| p.line), Some(2));
    }

    #[test]
    fn unbalanced_streams_are_rejected() {
        let reg = testing::registry();
        let window = reg.type_for_prefix("", "Window").unwrap();
        let open_only = vec![Ok(Instruction::element(&window, false))];
        assert!(matches!(
            ConstructionNode::from_instructions(open_only).unwrap_err().kind,
            ParseErrorKind::UnbalancedStructure { .. }
        ));
        let extra_end = vec![
            Ok(Instruction::element(&window, true)),
            Ok(Instruction::ElementEnd),
            Ok(Instruction::ElementEnd),
        ];
        assert!(matches!(
            ConstructionNode::from_instructions(extra_end).unwrap_err().kind,
            ParseErrorKind::UnbalancedStructure { .. }
        ));
        assert!(matches!(
            ConstructionNode::from_instructions(Vec::new()).unwrap_err().kind,
            ParseErrorKind::InvalidRootElement { .. }
        ));
    }
}
