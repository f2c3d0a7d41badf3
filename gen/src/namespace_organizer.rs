use crate::gen::names;
use std::collections::BTreeMap;

/// Generated Rust code grouped into nested `pub mod` blocks, one per
/// namespace segment.
pub(crate) struct ModuleTree {
    entries: Vec<String>,
    children: BTreeMap<String, ModuleTree>,
}

impl ModuleTree {
    pub fn new() -> Self {
        ModuleTree {
            entries: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn push<'a>(&mut self, namespace: impl IntoIterator<Item = &'a String>, entry: String) {
        let mut node = self;
        for segment in namespace {
            node = node
                .children
                .entry(segment.clone())
                .or_insert_with(ModuleTree::new);
        }
        node.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.values().all(ModuleTree::is_empty)
    }

    /// Entries of a module come before its submodules, which are in
    /// alphabetical order.
    pub fn render(&self, out: &mut String) {
        for entry in &self.entries {
            out.push_str(entry);
            if !entry.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        for (segment, child) in &self.children {
            if child.is_empty() {
                continue;
            }
            let ident = names::rust_ident(segment).map_or_else(|_| segment.clone(), |ident| ident.to_string());
            out.push_str("pub mod ");
            out.push_str(&ident);
            out.push_str(" {\n");
            child.render(out);
            out.push_str("}\n\n");
        }
    }
}
