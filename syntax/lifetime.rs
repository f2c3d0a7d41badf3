use crate::syntax::map::OrderedMap;
use std::cell::Cell;
use std::fmt::{self, Debug};

/// A lifetime appearing in a function signature.
///
/// Variables are unique within one generator run; there is no process-wide
/// counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifetime {
    Static,
    Variable(u32),
}

impl Lifetime {
    pub fn is_static(self) -> bool {
        self == Lifetime::Static
    }
}

impl Debug for Lifetime {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lifetime::Static => formatter.write_str("'static"),
            Lifetime::Variable(id) => write!(formatter, "'{}", id),
        }
    }
}

/// Source of fresh lifetime variables.
pub struct LifetimeFactory {
    next: Cell<u32>,
}

impl LifetimeFactory {
    pub fn new() -> Self {
        LifetimeFactory { next: Cell::new(1) }
    }

    pub fn fresh(&self) -> Lifetime {
        let id = self.next.get();
        self.next.set(id + 1);
        Lifetime::Variable(id)
    }
}

/// Two-way mapping between lifetime names as written in annotations and
/// the lifetimes they denote, scoped to a single function.
///
/// `static` always denotes [`Lifetime::Static`] and is never stored.
pub struct LifetimeSymbolTable<'f> {
    factory: &'f LifetimeFactory,
    by_name: OrderedMap<String, Lifetime>,
    by_lifetime: OrderedMap<Lifetime, String>,
}

impl<'f> LifetimeSymbolTable<'f> {
    pub fn new(factory: &'f LifetimeFactory) -> Self {
        LifetimeSymbolTable {
            factory,
            by_name: OrderedMap::new(),
            by_lifetime: OrderedMap::new(),
        }
    }

    pub fn lookup_name(&self, name: &str) -> Option<Lifetime> {
        if name == "static" {
            return Some(Lifetime::Static);
        }
        self.by_name.get(name).copied()
    }

    /// Returns the lifetime already bound to `name`, or binds a fresh
    /// variable to it.
    pub fn lookup_name_and_maybe_declare(&mut self, name: &str) -> Lifetime {
        if let Some(lifetime) = self.lookup_name(name) {
            return lifetime;
        }
        let lifetime = self.factory.fresh();
        self.by_name.insert(name.to_owned(), lifetime);
        self.by_lifetime.insert(lifetime, name.to_owned());
        lifetime
    }

    pub fn lookup_lifetime(&self, lifetime: Lifetime) -> Option<&str> {
        match lifetime {
            Lifetime::Static => Some("static"),
            Lifetime::Variable(_) => self.by_lifetime.get(&lifetime).map(String::as_str),
        }
    }

    /// Returns the name of `lifetime`, inventing the first unused name from
    /// `a`, `b`, ..., `z`, `aa`, `ab`, ... if it has none yet.
    pub fn lookup_lifetime_and_maybe_declare(&mut self, lifetime: Lifetime) -> String {
        if let Some(name) = self.lookup_lifetime(lifetime) {
            return name.to_owned();
        }
        let mut n = 0;
        let name = loop {
            let candidate = generated_name(n);
            if !self.by_name.contains_key(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.by_name.insert(name.clone(), lifetime);
        self.by_lifetime.insert(lifetime, name.clone());
        name
    }

    /// Lifetime names in the order they were first bound.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn factory(&self) -> &'f LifetimeFactory {
        self.factory
    }
}

// 0 -> a, 25 -> z, 26 -> aa, 27 -> ab, ...
fn generated_name(mut n: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{generated_name, Lifetime, LifetimeFactory, LifetimeSymbolTable};

    #[test]
    fn test_static() {
        let factory = LifetimeFactory::new();
        let mut table = LifetimeSymbolTable::new(&factory);
        assert_eq!(Some(Lifetime::Static), table.lookup_name("static"));
        assert_eq!(Lifetime::Static, table.lookup_name_and_maybe_declare("static"));
        assert_eq!("static", table.lookup_lifetime_and_maybe_declare(Lifetime::Static));
        assert_eq!(0, table.names().count());
    }

    #[test]
    fn test_declare_once() {
        let factory = LifetimeFactory::new();
        let mut table = LifetimeSymbolTable::new(&factory);
        assert_eq!(None, table.lookup_name("a"));
        let a = table.lookup_name_and_maybe_declare("a");
        assert_eq!(a, table.lookup_name_and_maybe_declare("a"));
        assert_ne!(a, table.lookup_name_and_maybe_declare("b"));
        assert_eq!(Some("a"), table.lookup_lifetime(a));
    }

    #[test]
    fn test_generated_names_skip_taken() {
        let factory = LifetimeFactory::new();
        let mut table = LifetimeSymbolTable::new(&factory);
        table.lookup_name_and_maybe_declare("b");
        let fresh = factory.fresh();
        assert_eq!("a", table.lookup_lifetime_and_maybe_declare(fresh));
        let fresh = factory.fresh();
        assert_eq!("c", table.lookup_lifetime_and_maybe_declare(fresh));
    }

    #[test]
    fn test_generated_name_sequence() {
        assert_eq!("a", generated_name(0));
        assert_eq!("z", generated_name(25));
        assert_eq!("aa", generated_name(26));
        assert_eq!("ab", generated_name(27));
        assert_eq!("ba", generated_name(52));
    }
}
