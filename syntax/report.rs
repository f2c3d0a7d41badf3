use crate::syntax::{Decl, SourceLoc};

/// Why one declaration got no bindings.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ItemError {
    /// Qualified name, as shown in the generated comment block.
    pub item: String,
    /// Where the declaration is, when the frontend recorded it.
    pub source_loc: Option<SourceLoc>,
    /// One entry per reason, any of which alone prevents bindings.
    pub messages: Vec<String>,
}

/// Per-declaration failures. Collecting instead of returning early keeps
/// sibling declarations generating.
pub struct Errors {
    errors: Vec<ItemError>,
}

impl Errors {
    pub fn new() -> Self {
        Errors { errors: Vec::new() }
    }

    pub fn error(&mut self, decl: &Decl, messages: Vec<String>) -> &ItemError {
        self.errors.push(ItemError {
            item: decl.qualified_name(),
            source_loc: decl.source_loc.clone(),
            messages,
        });
        &self.errors[self.errors.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<ItemError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ItemError> {
        self.errors
    }
}
