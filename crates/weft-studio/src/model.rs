//! The demo widget model studio registers with the engine.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft::{
    BuildError, Callback, EnumDescriptor, EnumValue, Instance, LifecycleListener, Namespace,
    TypeDescriptor, TypeKey, TypeRegistry, Value, ValueConverter, ValueType,
};

pub const NAMESPACE: &str = "urn:weft:studio";

// ── Widgets ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Console {
    pub title: String,
    pub content: Option<Instance>,
    pub loaded: Vec<Callback>,
}

#[derive(Default)]
pub struct Column {
    pub gap: i64,
    pub children: Vec<Instance>,
}

#[derive(Default)]
pub struct Button {
    pub name: String,
    pub label: String,
    pub click: Vec<Callback>,
}

#[derive(Default)]
pub struct Text {
    pub name: String,
    pub value: String,
    pub size: f64,
    pub color: Option<Rgba>,
}

/// Owner of the `Dock.Side` attached property.
pub struct Dock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    /// `#rrggbb` or `#rrggbbaa`.
    pub fn parse(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        let channel = |i: usize| hex.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok());
        match hex.len() {
            6 => Some(Rgba(channel(0)?, channel(2)?, channel(4)?, 0xff)),
            8 => Some(Rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

fn side() -> Arc<EnumDescriptor> {
    EnumDescriptor::new("Side", [("Top", 0), ("Bottom", 1), ("Left", 2), ("Right", 3)])
}

fn console() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Console>(NAMESPACE, "Console")
        .default_constructor()
        .property("Title", ValueType::Text, |c: &mut Console, v: String| c.title = v)
        .property("Content", ValueType::Object, |c: &mut Console, v: Instance| c.content = Some(v))
        .event("Loaded", |c: &mut Console, cb| c.loaded.push(cb))
        .method("launch_sequence", |_: &mut Console, _args| {
            println!("  [LAUNCH] T-03 .. T-02 .. T-01 .. liftoff confirmed");
        })
        .method("run_diagnostics", |_: &mut Console, _args| {
            println!("  [DIAGNOSTICS] all subsystems nominal");
        })
        .method("console_ready", |c: &mut Console, _args| {
            println!("  [READY] {}", c.title);
        })
        .content("Content")
        .build()
}

fn column() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Column>(NAMESPACE, "Column")
        .default_constructor()
        .property("Gap", ValueType::Integer, |c: &mut Column, v: i64| c.gap = v)
        .collection("Children", ValueType::Object, |c: &mut Column, v: Instance| c.children.push(v))
        .content("Children")
        .build()
}

fn button() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Button>(NAMESPACE, "Button")
        .default_constructor()
        .property("Name", ValueType::Text, |b: &mut Button, v: String| b.name = v)
        .property("Label", ValueType::Text, |b: &mut Button, v: String| b.label = v)
        .event("Click", |b: &mut Button, cb| b.click.push(cb))
        .content("Label")
        .name_property("Name")
        .build()
}

fn text() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Text>(NAMESPACE, "Text")
        .default_constructor()
        .property("Name", ValueType::Text, |t: &mut Text, v: String| t.name = v)
        .property("Value", ValueType::Text, |t: &mut Text, v: String| t.value = v)
        .property("Size", ValueType::Float, |t: &mut Text, v: f64| t.size = v)
        .property("Color", ValueType::custom("Color"), |t: &mut Text, v: Value| {
            t.color = v.downcast_custom::<Rgba>().copied();
        })
        .content("Value")
        .name_property("Name")
        .build()
}

fn dock() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Dock>(NAMESPACE, "Dock")
        .attached_property("Side", ValueType::Enum(side()))
        .build()
}

pub fn registry() -> TypeRegistry {
    TypeRegistry::new().with_namespace(
        Namespace::new(NAMESPACE)
            .with_prefix("")
            .with_type(console())
            .with_type(column())
            .with_type(button())
            .with_type(text())
            .with_type(dock()),
    )
}

pub fn converter() -> ValueConverter {
    ValueConverter::new().with(ValueType::custom("Color"), |cx| {
        Rgba::parse(cx.raw)
            .map(|rgba| Value::Custom(Rc::new(rgba)))
            .ok_or_else(|| BuildError::ValueConversion { target: cx.target.to_string(), raw: cx.raw.to_string() })
    })
}

/// Where a widget was docked, if anywhere.
pub fn docked_side(instance: &Instance) -> Option<EnumValue> {
    let key = TypeKey::new(NAMESPACE, "Dock");
    match instance.attached(&key, "Side")? {
        Value::Enum(side) => Some(side),
        _ => None,
    }
}

// ── Census ────────────────────────────────────────────────────────────────

/// Counts instances as the builder reports them.
#[derive(Debug, Default)]
pub struct Census {
    created: AtomicUsize,
    completed: AtomicUsize,
}

impl Census {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

impl LifecycleListener for Census {
    fn instance_created(&self, _instance: &Instance) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    fn instance_completed(&self, instance: &Instance) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        log::trace!("completed {:?}", instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft::Loader;

    #[test]
    fn colors_parse_with_and_without_alpha() {
        assert_eq!(Rgba::parse("#ff8800"), Some(Rgba(0xff, 0x88, 0x00, 0xff)));
        assert_eq!(Rgba::parse("#00000080"), Some(Rgba(0, 0, 0, 0x80)));
        assert_eq!(Rgba::parse("ff8800"), None);
        assert_eq!(Rgba::parse("#ff88"), None);
    }

    #[test]
    fn embedded_document_loads() {
        let census = Arc::new(Census::default());
        let loader = Loader::new(Arc::new(registry())).with_converter(converter()).with_listener(census.clone());
        let result = loader.load(include_str!("../ui/main.weft")).unwrap();
        assert!(result.root().is::<Console>());
        assert!(result.find("launch").is_some());
        assert_eq!(census.created(), census.completed());

        let status = result.find("status").unwrap();
        assert_eq!(status.borrow::<Text>().unwrap().color, Some(Rgba(0x7f, 0xff, 0x7f, 0xff)));
        assert_eq!(docked_side(status).map(|s| s.name().to_string()), Some("Bottom".into()));
    }
}
