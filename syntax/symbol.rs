use crate::syntax::namespace::Namespace;
use proc_macro2::{Ident, Span, TokenStream};
use quote::ToTokens;
use std::fmt::{self, Display, Write};

// A linker symbol consisting of escaped segments separated by "__".
// Example: __crubit_thunk_ns__Widget__resize__int
#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub struct Symbol(String);

impl Display for Symbol {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

impl ToTokens for Symbol {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        Ident::new(&self.0, Span::call_site()).to_tokens(tokens);
    }
}

impl Symbol {
    fn push(&mut self, segment: &str) {
        if !self.0.is_empty() {
            self.0.push_str("__");
        }
        escape(segment, &mut self.0);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait Segment {
    fn write(&self, symbol: &mut Symbol);
}

impl Segment for str {
    fn write(&self, symbol: &mut Symbol) {
        symbol.push(self);
    }
}

impl Segment for String {
    fn write(&self, symbol: &mut Symbol) {
        symbol.push(self);
    }
}

impl Segment for Namespace {
    fn write(&self, symbol: &mut Symbol) {
        for segment in self {
            symbol.push(segment);
        }
    }
}

impl<T> Segment for &'_ T
where
    T: ?Sized + Segment,
{
    fn write(&self, symbol: &mut Symbol) {
        (**self).write(symbol);
    }
}

/// Escapes an arbitrary name (e.g. `operator==`, or a type spelling like
/// `const int*`) into characters valid in a C identifier.
///
/// The escape is injective, and its output never contains `__` and never
/// ends in `_`. Joining escaped segments with `__` is therefore injective as
/// well: distinct segment lists cannot produce the same symbol.
fn escape(name: &str, out: &mut String) {
    for (index, ch) in name.chars().enumerate() {
        if ch == '_' {
            out.push_str("_u");
            continue;
        }

        let should_escape = if index == 0 {
            !unicode_ident::is_xid_start(ch)
        } else {
            !unicode_ident::is_xid_continue(ch)
        };
        if should_escape || !ch.is_ascii() {
            let _ = write!(out, "_{:x}h", ch as u32);
            continue;
        }

        out.push(ch);
    }
}

pub fn join(prefix: &str, segments: &[&dyn Segment]) -> Symbol {
    let mut symbol = Symbol(String::new());
    for segment in segments {
        segment.write(&mut symbol);
    }
    assert!(!symbol.0.is_empty());
    symbol.0.insert_str(0, prefix);
    symbol
}

#[cfg(test)]
mod tests {
    use super::join;
    use crate::syntax::namespace::Namespace;

    #[test]
    fn test_escape() {
        fn t(name: &str, expected: &str) {
            let actual = join("", &[&name]).to_string();
            assert_eq!(
                actual, expected,
                "Expecting `{name}` to mangle as `{expected}` but got `{actual}` instead.",
            );
        }

        t("foo", "foo");

        // Non-identifier characters like `=`.
        t("operator==", "operator_3dh_3dh");

        // Underscores are escaped too, so a name that looks like an escape
        // sequence does not collide with the previous case.
        t("operator_3dh_3dh", "operator_u3dh_u3dh");

        t("const int*", "const_20hint_2ah");
        t("1st", "_31hst");
    }

    #[test]
    fn test_segment_boundaries() {
        let a = join("p_", &[&"a_", &"b"]);
        let b = join("p_", &[&"a", &"_b"]);
        let c = join("p_", &[&"a__b"]);
        assert_eq!("p_a_u__b", a.to_string());
        assert_eq!("p_a___ub", b.to_string());
        assert_eq!("p_a_u_ub", c.to_string());

        let ns = Namespace::from(vec!["outer".to_owned(), "inner".to_owned()]);
        assert_eq!("p_outer__inner__f", join("p_", &[&ns, &"f"]).to_string());
    }
}
