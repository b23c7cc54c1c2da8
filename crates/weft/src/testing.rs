//! Demo widget model shared by the unit tests.

use std::sync::Arc;

use crate::instance::{Callback, Instance};
use crate::registry::{Namespace, TypeRegistry};
use crate::types::{TypeDescriptor, TypeKey};
use crate::value::{EnumDescriptor, EnumValue, Value, ValueType};

pub const ROOT: &str = "root";
pub const ANOTHER: &str = "another";

pub fn window_state() -> Arc<EnumDescriptor> {
    EnumDescriptor::new("WindowState", [("Normal", 0), ("Minimized", 1), ("Maximized", 2)])
}

#[derive(Default)]
pub struct Window {
    pub name: String,
    pub title: String,
    pub width: i64,
    pub opacity: f64,
    pub state: Option<EnumValue>,
    pub content: Option<Instance>,
    pub loaded: Vec<Callback>,
    /// Root methods invoked through callbacks, by name.
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct Button {
    pub name: String,
    pub label: String,
    pub row: i64,
    pub click: Vec<Callback>,
    pub initialized_with: Option<String>,
}

#[derive(Default)]
pub struct StackPanel {
    pub name: String,
    pub children: Vec<Instance>,
}

#[derive(Default)]
pub struct Grid;

pub struct Mouse;

#[derive(Default)]
pub struct Foreigner;

pub struct Shape;

pub fn mouse_key() -> TypeKey {
    TypeKey::new(ROOT, "Mouse")
}

fn window() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Window>(ROOT, "Window")
        .default_constructor()
        .property("Name", ValueType::Text, |w: &mut Window, v: String| w.name = v)
        .property("Title", ValueType::Text, |w: &mut Window, v: String| w.title = v)
        .getter("Title", |w: &Window| Some(Value::Text(w.title.clone())))
        .property("Width", ValueType::Integer, |w: &mut Window, v: i64| w.width = v)
        .property("Opacity", ValueType::Float, |w: &mut Window, v: f64| w.opacity = v)
        .property("State", ValueType::Enum(window_state()), |w: &mut Window, v: EnumValue| w.state = Some(v))
        .property("Content", ValueType::Object, |w: &mut Window, v: Instance| w.content = Some(v))
        .event("Loaded", |w: &mut Window, cb| w.loaded.push(cb))
        .method("OnLoaded", |w: &mut Window, _args| w.calls.push("OnLoaded".into()))
        .method("OnClick", |w: &mut Window, _args| w.calls.push("OnClick".into()))
        .method("OnMouseDown", |w: &mut Window, _args| w.calls.push("OnMouseDown".into()))
        .content("Content")
        .name_property("Name")
        .build()
}

fn button() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Button>(ROOT, "Button")
        .default_constructor()
        .property("Name", ValueType::Text, |b: &mut Button, v: String| b.name = v)
        .property("Label", ValueType::Text, |b: &mut Button, v: String| b.label = v)
        .property("Row", ValueType::Integer, |b: &mut Button, v: i64| b.row = v)
        .event("Click", |b: &mut Button, cb| b.click.push(cb))
        .content("Label")
        .name_property("Name")
        .on_initialized(|b: &mut Button| b.initialized_with = Some(b.label.clone()))
        .build()
}

fn stack_panel() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<StackPanel>(ROOT, "StackPanel")
        .default_constructor()
        .property("Name", ValueType::Text, |p: &mut StackPanel, v: String| p.name = v)
        .collection("Children", ValueType::Object, |p: &mut StackPanel, v: Instance| p.children.push(v))
        .content("Children")
        .name_property("Name")
        .build()
}

fn grid() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Grid>(ROOT, "Grid")
        .default_constructor()
        .attached_property("Row", ValueType::Integer)
        .build()
}

fn mouse() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Mouse>(ROOT, "Mouse")
        .attached_event("Down", |target: &Instance, cb| {
            target.set_attached(&mouse_key(), "Down", Value::Callback(cb));
        })
        .build()
}

fn foreigner() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Foreigner>(ANOTHER, "Foreigner")
        .default_constructor()
        .attached_property("Property", ValueType::Text)
        .build()
}

fn shape() -> Arc<TypeDescriptor> {
    TypeDescriptor::builder::<Shape>(ROOT, "Shape").build()
}

/// A fresh registry: `ROOT` bound to the default prefix, `ANOTHER` unbound.
pub fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_namespace(
            Namespace::new(ROOT)
                .with_prefix("")
                .with_type(window())
                .with_type(button())
                .with_type(stack_panel())
                .with_type(grid())
                .with_type(mouse())
                .with_type(shape()),
        )
        .with_namespace(Namespace::new(ANOTHER).with_type(foreigner()))
}
