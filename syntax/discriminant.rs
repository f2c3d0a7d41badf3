use crate::syntax::Atom;
use proc_macro2::{Literal, Punct, Spacing, TokenStream};
use quote::{ToTokens, TokenStreamExt};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use std::cmp::Ordering;
use std::fmt::{self, Display};

/// Enumerator value as written by the frontend. Stored as sign and
/// magnitude so that the whole `i64::MIN..=u64::MAX` range round-trips.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Discriminant {
    negative: bool,
    magnitude: u64,
}

impl Discriminant {
    pub const fn zero() -> Self {
        Discriminant {
            negative: false,
            magnitude: 0,
        }
    }

    const fn pos(u: u64) -> Self {
        Discriminant {
            negative: false,
            magnitude: u,
        }
    }

    const fn neg(i: i64) -> Self {
        Discriminant {
            negative: i < 0,
            magnitude: i.unsigned_abs(),
        }
    }

    /// Whether this is the most negative value of a signed `repr`, which C++
    /// has no literal for.
    pub fn is_min(self, repr: Atom) -> bool {
        match repr.integer_signedness() {
            Some(true) => {
                let shift = 64 - 8 * repr.size() as u32;
                self == Discriminant::neg(i64::MIN >> shift)
            }
            _ => false,
        }
    }

    /// Whether the value is representable in the given underlying type.
    /// Atoms that cannot back an enum accept nothing.
    pub fn fits(self, repr: Atom) -> bool {
        let Some(signed) = repr.integer_signedness() else {
            return false;
        };
        let shift = 64 - 8 * repr.size() as u32;
        let (min, max) = if signed {
            (
                Discriminant::neg(i64::MIN >> shift),
                Discriminant::pos((i64::MAX >> shift) as u64),
            )
        } else {
            (Discriminant::zero(), Discriminant::pos(u64::MAX >> shift))
        };
        min <= self && self <= max
    }
}

impl Display for Discriminant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}", self.magnitude)
    }
}

impl ToTokens for Discriminant {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        if self.negative {
            tokens.append(Punct::new('-', Spacing::Alone));
        }
        tokens.append(Literal::u64_unsuffixed(self.magnitude));
    }
}

impl Ord for Discriminant {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (true, true) => self.magnitude.cmp(&other.magnitude).reverse(),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.magnitude.cmp(&other.magnitude),
        }
    }
}

impl PartialOrd for Discriminant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for Discriminant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DiscriminantVisitor;

        impl Visitor<'_> for DiscriminantVisitor {
            type Value = Discriminant;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an integer enumerator value")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Discriminant, E> {
                Ok(Discriminant::neg(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Discriminant, E> {
                Ok(Discriminant::pos(value))
            }
        }

        deserializer.deserialize_any(DiscriminantVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Discriminant;
    use crate::syntax::Atom;

    fn parse(json: &str) -> Discriminant {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extremes() {
        assert_eq!("18446744073709551615", parse("18446744073709551615").to_string());
        assert_eq!("-9223372036854775808", parse("-9223372036854775808").to_string());
        assert!(parse("-1") < Discriminant::zero());
        assert!(parse("-2") < parse("-1"));
    }

    #[test]
    fn test_fits() {
        assert!(parse("255").fits(Atom::U8));
        assert!(!parse("256").fits(Atom::U8));
        assert!(!parse("-1").fits(Atom::U32));
        assert!(parse("-128").fits(Atom::I8));
        assert!(!parse("-129").fits(Atom::I8));
        assert!(!parse("0").fits(Atom::F32));
    }
}
