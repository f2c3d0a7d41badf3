pub(crate) use self::ordered::OrderedMap;
pub(crate) use self::unordered::UnorderedMap;

mod ordered {
    use indexmap::Equivalent;
    use std::hash::Hash;

    // Iterates in insertion order, so it may drive code generation.
    pub(crate) struct OrderedMap<K, V>(indexmap::IndexMap<K, V>);

    impl<K, V> OrderedMap<K, V> {
        pub(crate) fn new() -> Self {
            OrderedMap(indexmap::IndexMap::new())
        }

        pub(crate) fn keys(&self) -> indexmap::map::Keys<K, V> {
            self.0.keys()
        }
    }

    impl<K, V> OrderedMap<K, V>
    where
        K: Hash + Eq,
    {
        pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.0.insert(key, value)
        }

        pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            Q: ?Sized + Hash + Equivalent<K>,
        {
            self.0.get(key)
        }

        pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
        where
            Q: ?Sized + Hash + Equivalent<K>,
        {
            self.0.contains_key(key)
        }

        pub(crate) fn entry(&mut self, key: K) -> indexmap::map::Entry<K, V> {
            self.0.entry(key)
        }
    }
}

mod unordered {
    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    // Wrapper prohibits accidentally introducing iteration over the map, which
    // could lead to nondeterministic generated code.
    pub(crate) struct UnorderedMap<K, V>(HashMap<K, V>);

    impl<K, V> UnorderedMap<K, V> {
        pub(crate) fn new() -> Self {
            UnorderedMap(HashMap::new())
        }
    }

    impl<K, V> UnorderedMap<K, V>
    where
        K: Hash + Eq,
    {
        pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.0.insert(key, value)
        }

        pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: ?Sized + Hash + Eq,
        {
            self.0.contains_key(key)
        }

        pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: ?Sized + Hash + Eq,
        {
            self.0.get(key)
        }
    }
}
