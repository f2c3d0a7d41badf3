use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;

// Wrapper prohibits accidentally introducing iteration over the set, which
// could lead to nondeterministic generated code.
pub struct UnorderedSet<T>(HashSet<T>);

impl<T> UnorderedSet<T>
where
    T: Hash + Eq,
{
    pub fn new() -> Self {
        UnorderedSet(HashSet::new())
    }

    pub fn insert(&mut self, value: T) -> bool {
        self.0.insert(value)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.0.contains(value)
    }
}
