use std::fmt::{self, Display};

/// The C++ half of the runtime, as `#include`d by every generated C++ file.
pub static HEADER: &str = include_str!("../../include/crubit/support.h");

#[derive(Default, PartialEq)]
pub struct Includes {
    custom: Vec<String>,
    pub cstddef: bool,
    pub cstdint: bool,
    pub cstring: bool,
    pub memory: bool,
    pub optional: bool,
    pub tuple: bool,
    pub type_traits: bool,
    pub utility: bool,
}

impl Includes {
    pub fn new() -> Self {
        Includes::default()
    }

    /// A header spelled either `<system>` or as a quoted path. Repeats are
    /// ignored.
    pub fn insert(&mut self, include: impl Into<String>) {
        let include = include.into();
        if !self.custom.contains(&include) {
            self.custom.push(include);
        }
    }
}

impl Extend<String> for Includes {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for include in iter {
            self.insert(include);
        }
    }
}

impl Display for Includes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cstddef {
            writeln!(f, "#include <cstddef>")?;
        }
        if self.cstdint {
            writeln!(f, "#include <cstdint>")?;
        }
        if self.cstring {
            writeln!(f, "#include <cstring>")?;
        }
        if self.memory {
            writeln!(f, "#include <memory>")?;
        }
        if self.optional {
            writeln!(f, "#include <optional>")?;
        }
        if self.tuple {
            writeln!(f, "#include <tuple>")?;
        }
        if self.type_traits {
            writeln!(f, "#include <type_traits>")?;
        }
        if self.utility {
            writeln!(f, "#include <utility>")?;
        }
        for include in &self.custom {
            if include.starts_with('<') && include.ends_with('>') {
                writeln!(f, "#include {}", include)?;
            } else {
                writeln!(f, "#include \"{}\"", include.escape_default())?;
            }
        }
        if *self != Self::default() {
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Includes, HEADER};

    #[test]
    fn test_header_sections_are_guarded() {
        for guard in [
            "CRUBIT_V1_ENCODER",
            "CRUBIT_V1_ABI",
            "CRUBIT_V1_INTERNAL",
            "CRUBIT_V1_SPECIAL_MEMBERS",
            "CRUBIT_V1_SLOT",
            "CRUBIT_V1_RS_CHAR",
        ] {
            assert!(HEADER.contains(&format!("#ifndef {}\n", guard)));
            assert!(HEADER.contains(&format!("#endif // {}\n", guard)));
        }
    }

    #[test]
    fn test_display() {
        let mut includes = Includes::new();
        includes.cstdint = true;
        includes.insert("crubit/support.h");
        includes.insert("<vector>");
        includes.insert("crubit/support.h");
        assert_eq!(
            "#include <cstdint>\n#include \"crubit/support.h\"\n#include <vector>\n\n",
            includes.to_string(),
        );
    }
}
