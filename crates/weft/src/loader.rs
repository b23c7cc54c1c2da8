//! One-call entry point: markup text in, object graph out.

use std::sync::Arc;

use crate::builder::{DefaultInstanceCreator, InstanceCreator, ObjectBuilder};
use crate::context::{BuildContext, InstanceLifecycleSignaler, LifecycleListener, Namescope};
use crate::convert::ValueConverter;
use crate::error::{BuildError, LoadError, ParseError};
use crate::instance::Instance;
use crate::parser::{Instructions, ProtoParser};
use crate::registry::TypeRegistry;
use crate::tree::ConstructionNode;

// ── ConstructionResult ────────────────────────────────────────────────────

/// The root of a constructed graph and the names registered while building it.
#[derive(Debug, Clone)]
pub struct ConstructionResult {
    root: Instance,
    namescope: Namescope,
}

impl ConstructionResult {
    pub fn root(&self) -> &Instance {
        &self.root
    }

    pub fn namescope(&self) -> &Namescope {
        &self.namescope
    }

    /// Look up a named instance.
    pub fn find(&self, name: &str) -> Option<&Instance> {
        self.namescope.get(name)
    }

    pub fn into_parts(self) -> (Instance, Namescope) {
        (self.root, self.namescope)
    }
}

// ── Loader ────────────────────────────────────────────────────────────────

/// Parses and builds markup documents against a shared type registry.
///
/// ```rust,ignore
/// let loader = Loader::new(Arc::new(registry))
///     .with_converter(converter)
///     .with_listener(Arc::new(Tracker::default()));
/// let result = loader.load(include_str!("main.weft"))?;
/// ```
pub struct Loader {
    registry: Arc<TypeRegistry>,
    converter: ValueConverter,
    creator: Box<dyn InstanceCreator + Send + Sync>,
    listeners: InstanceLifecycleSignaler,
}

impl Loader {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            converter: ValueConverter::new(),
            creator: Box::new(DefaultInstanceCreator),
            listeners: InstanceLifecycleSignaler::default(),
        }
    }

    pub fn with_instance_creator(mut self, creator: impl InstanceCreator + Send + Sync + 'static) -> Self {
        self.creator = Box::new(creator);
        self
    }

    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn LifecycleListener + Send + Sync>) -> Self {
        self.listeners.add(listener);
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The raw instruction stream for `text`.
    pub fn instructions<'s, 't>(&'s self, text: &'t str) -> Instructions<'s, 't> {
        ProtoParser::new(&self.registry).parse(text)
    }

    /// Parse `text` into a construction tree without building anything.
    pub fn parse(&self, text: &str) -> Result<ConstructionNode, ParseError> {
        ConstructionNode::from_instructions(self.instructions(text))
    }

    /// Build a parsed tree with a fresh context.
    pub fn construct(&self, node: &ConstructionNode) -> Result<ConstructionResult, BuildError> {
        let mut ctx = BuildContext::new(self.listeners.clone());
        let builder = ObjectBuilder::new(&self.registry, &self.converter, self.creator.as_ref());
        let root = builder.build(node, &mut ctx)?;
        Ok(ConstructionResult { root, namescope: ctx.into_namescope() })
    }

    pub fn load(&self, text: &str) -> Result<ConstructionResult, LoadError> {
        let node = self.parse(text)?;
        let result = self.construct(&node)?;
        log::debug!(
            "loaded {:?}: {} elements, {} named",
            result.root,
            node.element_count(),
            result.namescope.len()
        );
        Ok(result)
    }
}
