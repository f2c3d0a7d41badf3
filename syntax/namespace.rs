use serde::Deserialize;
use std::fmt::{self, Display};
use std::slice::Iter;

/// Enclosing C++ namespaces, or Rust module path, outermost first.
#[derive(Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
#[serde(transparent)]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    pub fn none() -> Self {
        Namespace {
            segments: Vec::new(),
        }
    }

    pub fn iter(&self) -> Iter<String> {
        self.segments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// `ns::inner::name`, or just `name` at global scope.
    pub fn qualify(&self, name: &str) -> String {
        let mut qualified = String::new();
        for segment in self {
            qualified.push_str(segment);
            qualified.push_str("::");
        }
        qualified.push_str(name);
        qualified
    }

    /// Replaces the outermost segment, for `namespace_rename`.
    pub fn renamed(&self, from: &str, to: &str) -> Self {
        let segments = self
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == 0 && segment == from {
                    to.to_owned()
                } else {
                    segment.clone()
                }
            })
            .collect();
        Namespace { segments }
    }
}

impl From<Vec<String>> for Namespace {
    fn from(segments: Vec<String>) -> Self {
        Namespace { segments }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, segment) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
