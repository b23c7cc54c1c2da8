mod model;

use std::sync::Arc;

use anyhow::{Context, Result};
use weft::logging::{init_logging, LoggingConfig};
use weft::{ConstructionNode, ContentNode, Loader};

use model::{Button, Census, Console};

const EMBEDDED: &str = include_str!("../ui/main.weft");

fn main() -> Result<()> {
    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║           WEFT STUDIO v0.1             ║");
    println!("  ║   markup  ·  instructions  ·  objects  ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    init_logging(LoggingConfig::default());

    let (origin, source) = match std::env::args().nth(1) {
        Some(path) => {
            let source = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            (path, source)
        }
        None => ("<embedded main.weft>".to_string(), EMBEDDED.to_string()),
    };

    let census = Arc::new(Census::default());
    let loader = Loader::new(Arc::new(model::registry()))
        .with_converter(model::converter())
        .with_listener(census.clone());

    let tree = loader.parse(&source).with_context(|| format!("parsing {origin}"))?;
    println!("  [TREE] {origin}");
    print_node(&tree, 2);
    println!();

    let result = loader.construct(&tree).with_context(|| format!("building {origin}"))?;
    println!("  [BUILD] {} instances created, {} completed", census.created(), census.completed());

    println!("  [NAMES]");
    for (name, instance) in result.namescope().iter() {
        let side = model::docked_side(instance).map(|s| format!(" docked {}", s.name())).unwrap_or_default();
        println!("    {name:<14} {}{side}", instance.type_descriptor().name());
    }
    println!();

    // ── Callbacks ─────────────────────────────────────────────────────────
    let loaded = result.root().borrow::<Console>().map(|c| c.loaded.clone()).unwrap_or_default();
    for callback in loaded {
        callback.invoke(&[]).with_context(|| format!("invoking {}", callback.name()))?;
    }
    for (name, instance) in result.namescope().iter() {
        let clicks = instance.borrow::<Button>().map(|b| b.click.clone()).unwrap_or_default();
        for callback in clicks {
            println!("  [CLICK] {name}");
            callback.invoke(&[]).with_context(|| format!("invoking {}", callback.name()))?;
        }
    }
    println!();
    Ok(())
}

fn print_node(node: &ConstructionNode, depth: usize) {
    let indent = " ".repeat(depth * 2);
    let attrs: Vec<String> = node.attributes.iter().map(|(m, v)| format!("{m}={v:?}")).collect();
    println!("{indent}{} {}", node.ty.name(), attrs.join(" "));
    for child in &node.children {
        match child {
            ContentNode::Element(child) => print_node(child, depth + 1),
            ContentNode::Text(text) => println!("{indent}  {text:?}"),
            ContentNode::Property(property) => {
                println!("{indent}  .{}", property.member);
                for value in &property.values {
                    print_node(value, depth + 2);
                }
                if !property.text.is_empty() {
                    println!("{indent}    {:?}", property.text);
                }
            }
        }
    }
}
