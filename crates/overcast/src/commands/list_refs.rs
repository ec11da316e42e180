use anyhow::Context;
use overcast_core::{WeakRefs, find_weak_refs, load_stack};
use std::path::Path;

const MISSING_VALUE: &str = "<missing value>";

pub fn handle(stack: &Path, tmpl: bool) -> anyhow::Result<()> {
    let stack = load_stack(stack)
        .with_context(|| format!("Failed to load stack {}", stack.display()))?;
    let refs = find_weak_refs(&stack);

    if tmpl {
        print!("{}", render_template(&refs));
    } else {
        print!("{}", render_listing(&refs));
    }
    Ok(())
}

fn join_or_none<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let names: Vec<&str> = names.map(String::as_str).collect();
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join("  ")
    }
}

fn render_listing(refs: &WeakRefs) -> String {
    format!(
        "Images:\n  {}\n\nFlavors:\n  {}\n",
        join_or_none(refs.images.iter()),
        join_or_none(refs.flavors.iter())
    )
}

/// INI skeleton for `--mappings`, one key per referenced image and flavor
fn render_template(refs: &WeakRefs) -> String {
    let mut out = String::new();
    for (section, names) in [("images", &refs.images), ("flavors", &refs.flavors)] {
        out.push_str(&format!("[{}]\n", section));
        for name in names {
            out.push_str(&format!("{} = {}\n", name, MISSING_VALUE));
        }
        out.push('\n');
    }
    out
}
