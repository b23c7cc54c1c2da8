//! Turns a [`ConstructionNode`] tree into live [`Instance`]s.

use std::collections::HashSet;
use std::sync::Arc;

use crate::context::BuildContext;
use crate::convert::ValueConverter;
use crate::error::BuildError;
use crate::instance::Instance;
use crate::member::Member;
use crate::registry::TypeRegistry;
use crate::tree::{ConstructionNode, ContentNode, PropertyNode};
use crate::types::{TypeDescriptor, TypeKey};
use crate::value::Value;

// ── InstanceCreator ───────────────────────────────────────────────────────

/// Allocates the object behind each element.
pub trait InstanceCreator {
    fn create(&self, ty: &Arc<TypeDescriptor>) -> Result<Instance, BuildError>;
}

/// Calls the descriptor's parameterless constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInstanceCreator;

impl InstanceCreator for DefaultInstanceCreator {
    fn create(&self, ty: &Arc<TypeDescriptor>) -> Result<Instance, BuildError> {
        Ok(Instance::new(Arc::clone(ty), ty.instantiate()?))
    }
}

// ── ObjectBuilder ─────────────────────────────────────────────────────────

pub struct ObjectBuilder<'a> {
    registry: &'a TypeRegistry,
    converter: &'a ValueConverter,
    creator: &'a dyn InstanceCreator,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry, converter: &'a ValueConverter, creator: &'a dyn InstanceCreator) -> Self {
        Self { registry, converter, creator }
    }

    /// Build `node` and its subtree depth-first. The first failure aborts
    /// the whole pass.
    pub fn build(&self, node: &ConstructionNode, ctx: &mut BuildContext) -> Result<Instance, BuildError> {
        let ty = &node.ty;
        let instance = self.creator.create(ty)?;
        ctx.set_root(&instance);
        ctx.signaler.created(&instance);

        let mut assigned = Assigned::new(ty);

        for (member, raw) in &node.attributes {
            let value = self.converter.convert(raw, &member.value_type(), self.registry, ctx)?;
            assigned.assign(&instance, member, value)?;
        }

        for child in &node.children {
            match child {
                ContentNode::Element(child) => {
                    let member = content_member(ty)?;
                    let value = Value::Object(self.build(child, ctx)?);
                    assigned.assign(&instance, &member, value)?;
                }
                ContentNode::Text(text) => {
                    let member = content_member(ty)?;
                    let value = self.converter.convert(text, &member.value_type(), self.registry, ctx)?;
                    assigned.assign(&instance, &member, value)?;
                }
                ContentNode::Property(property) => self.apply_property(&instance, property, &mut assigned, ctx)?,
            }
        }

        if let Some(name) = assigned.name.take() {
            ctx.namescope.register(name, instance.clone())?;
        }

        ty.run_initialized(&instance)?;
        ctx.signaler.completed(&instance);
        Ok(instance)
    }

    fn apply_property(
        &self,
        instance: &Instance,
        property: &PropertyNode,
        assigned: &mut Assigned,
        ctx: &mut BuildContext,
    ) -> Result<(), BuildError> {
        let member = &property.member;
        for value in &property.values {
            let value = Value::Object(self.build(value, ctx)?);
            assigned.assign(instance, member, value)?;
        }
        if property.values.is_empty() || !property.text.is_empty() {
            let value = self.converter.convert(&property.text, &member.value_type(), self.registry, ctx)?;
            assigned.assign(instance, member, value)?;
        }
        Ok(())
    }
}

fn content_member(ty: &TypeDescriptor) -> Result<Member, BuildError> {
    let no_content = || BuildError::NoContentMember { type_name: ty.name().to_string() };
    let name = ty.content_property().ok_or_else(no_content)?;
    match ty.cached_member(false, name) {
        Some(member) => Ok(member),
        None => {
            let member = Member::from_standard(ty, name).map_err(|_| no_content())?;
            ty.cache_member(false, &member);
            Ok(member)
        }
    }
}

/// Scalar members already given a value on one instance, plus the runtime
/// name once it is seen.
struct Assigned {
    name_property: Option<String>,
    owner: TypeKey,
    members: HashSet<Member>,
    name: Option<String>,
}

impl Assigned {
    fn new(ty: &TypeDescriptor) -> Self {
        Self {
            name_property: ty.name_property().map(str::to_string),
            owner: ty.key().clone(),
            members: HashSet::new(),
            name: None,
        }
    }

    fn assign(&mut self, target: &Instance, member: &Member, value: Value) -> Result<(), BuildError> {
        if !member.is_collection() && !member.is_event() && !self.members.insert(member.clone()) {
            return Err(BuildError::DuplicateContent { member: member.to_string() });
        }
        if !member.is_attached()
            && member.owner() == &self.owner
            && self.name_property.as_deref() == Some(member.name())
        {
            self.name = Some(match &value {
                Value::Text(text) => text.clone(),
                Value::Integer(v) => v.to_string(),
                other => {
                    return Err(BuildError::TypeMismatch {
                        member: member.to_string(),
                        expected: "text",
                        found: other.kind_name(),
                    });
                }
            });
        }
        member.assign(target, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ProtoParser;
    use crate::testing::{self, Button, StackPanel, Window};

    fn build(src: &str) -> Result<(Instance, BuildContext), BuildError> {
        let reg = testing::registry();
        let node = ConstructionNode::from_instructions(ProtoParser::new(&reg).parse(src)).unwrap();
        let converter = ValueConverter::new();
        let mut ctx = BuildContext::default();
        let root = ObjectBuilder::new(&reg, &converter, &DefaultInstanceCreator).build(&node, &mut ctx)?;
        Ok((root, ctx))
    }

    #[test]
    fn attributes_are_converted_and_assigned() {
        let (root, _) = build(r#"<Window Title="Main" Width="640" Opacity="0.5" State="Maximized"/>"#).unwrap();
        let window = root.borrow::<Window>().unwrap();
        assert_eq!(window.title, "Main");
        assert_eq!(window.width, 640);
        assert_eq!(window.opacity, 0.5);
        assert_eq!(window.state.as_ref().map(|s| s.name()), Some("Maximized"));
    }

    #[test]
    fn first_instance_fills_root_slot() {
        let (root, ctx) = build("<Window><Button/></Window>").unwrap();
        assert!(ctx.root().unwrap().ptr_eq(&root));
    }

    #[test]
    fn bare_child_goes_to_content_member() {
        let (root, _) = build(r#"<Window><Button Label="ok"/></Window>"#).unwrap();
        let window = root.borrow::<Window>().unwrap();
        let content = window.content.as_ref().unwrap();
        assert_eq!(content.borrow::<Button>().unwrap().label, "ok");
    }

    #[test]
    fn bare_text_converts_to_content_type() {
        let (root, _) = build("<Button>Press me</Button>").unwrap();
        assert_eq!(root.borrow::<Button>().unwrap().label, "Press me");
    }

    #[test]
    fn commented_text_fills_a_scalar_content_member_once() {
        let (root, _) = build("<Button>Press <!-- c --> me</Button>").unwrap();
        assert_eq!(root.borrow::<Button>().unwrap().label, "Press  me");

        let (root, _) = build("<Button>a <![CDATA[<b>]]></Button>").unwrap();
        assert_eq!(root.borrow::<Button>().unwrap().label, "a <b>");
    }

    #[test]
    fn property_element_text_and_values() {
        let (root, _) = build("<Window><Window.Title>Main</Window.Title><Window.Content><Button/></Window.Content></Window>")
            .unwrap();
        let window = root.borrow::<Window>().unwrap();
        assert_eq!(window.title, "Main");
        assert!(window.content.as_ref().unwrap().is::<Button>());
    }

    #[test]
    fn empty_property_element_assigns_empty_text() {
        let (root, _) = build(r#"<Window><Window.Title/></Window>"#).unwrap();
        assert_eq!(root.borrow::<Window>().unwrap().title, "");
    }

    #[test]
    fn collections_take_every_child_in_order() {
        let (root, _) = build(
            r#"<StackPanel><Button Label="a"/><Button Label="b"/><StackPanel.Children><Button Label="c"/></StackPanel.Children></StackPanel>"#,
        )
        .unwrap();
        let panel = root.borrow::<StackPanel>().unwrap();
        let labels: Vec<String> =
            panel.children.iter().map(|c| c.borrow::<Button>().unwrap().label.clone()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn second_item_for_scalar_member_is_duplicate_content() {
        let err = build("<Window><Button/><Button/></Window>").unwrap_err();
        assert_eq!(err, BuildError::DuplicateContent { member: "Window.Content".into() });

        let err = build(r#"<Window Title="a"><Window.Title>b</Window.Title></Window>"#).unwrap_err();
        assert_eq!(err, BuildError::DuplicateContent { member: "Window.Title".into() });
    }

    #[test]
    fn content_without_receptacle_fails() {
        let err = build("<Window><Window.Content><Grid>text</Grid></Window.Content></Window>").unwrap_err();
        assert_eq!(err, BuildError::NoContentMember { type_name: "Grid".into() });
    }

    #[test]
    fn object_for_text_member_is_type_mismatch() {
        let err = build("<Button><Button/></Button>").unwrap_err();
        assert_eq!(
            err,
            BuildError::TypeMismatch { member: "Button.Label".into(), expected: "text", found: "object" }
        );
    }

    #[test]
    fn names_register_in_the_namescope() {
        let (root, ctx) = build(
            r#"<Window Name="main"><StackPanel Name="panel"><Button Name="ok"/></StackPanel></Window>"#,
        )
        .unwrap();
        assert!(ctx.namescope.get("main").unwrap().ptr_eq(&root));
        assert!(ctx.namescope.get("ok").unwrap().is::<Button>());
        assert_eq!(ctx.namescope.len(), 3);
    }

    #[test]
    fn duplicate_names_fail() {
        let err = build(r#"<StackPanel><Button Name="x"/><Button Name="x"/></StackPanel>"#).unwrap_err();
        assert_eq!(err, BuildError::DuplicateName { name: "x".into() });
    }

    #[test]
    fn initialized_hook_runs_after_members() {
        let (root, _) = build(r#"<Button Label="ok"/>"#).unwrap();
        let button = root.borrow::<Button>().unwrap();
        assert_eq!(button.initialized_with.as_deref(), Some("ok"));
    }

    #[test]
    fn type_without_constructor_is_not_instantiable() {
        let err = build("<Window><Shape/></Window>").unwrap_err();
        assert_eq!(err, BuildError::NotInstantiable { type_name: "Shape".into() });
    }

    struct Counting {
        created: std::cell::Cell<usize>,
    }

    impl InstanceCreator for Counting {
        fn create(&self, ty: &Arc<TypeDescriptor>) -> Result<Instance, BuildError> {
            self.created.set(self.created.get() + 1);
            DefaultInstanceCreator.create(ty)
        }
    }

    #[test]
    fn custom_creator_is_used_for_every_element() {
        let reg = testing::registry();
        let node =
            ConstructionNode::from_instructions(ProtoParser::new(&reg).parse("<StackPanel><Button/><Button/></StackPanel>"))
                .unwrap();
        let creator = Counting { created: std::cell::Cell::new(0) };
        let converter = ValueConverter::new();
        ObjectBuilder::new(&reg, &converter, &creator).build(&node, &mut BuildContext::default()).unwrap();
        assert_eq!(creator.created.get(), 3);
    }
}
