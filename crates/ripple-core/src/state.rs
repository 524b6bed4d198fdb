//! Shallow-mergeable component state.

use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

/// State snapshot held by a component instance.
///
/// `merge` applies a partial update shallowly: every field present in the
/// partial replaces the same field of the snapshot, everything else is kept.
pub trait State: Clone + 'static {
    type Partial;

    fn merge(&mut self, partial: Self::Partial);
}

/// Object-like state: keys keep their first insertion order and a partial
/// map overwrites or adds entries.
impl<K, V, H> State for IndexMap<K, V, H>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
    H: BuildHasher + Clone + 'static,
{
    type Partial = IndexMap<K, V, H>;

    fn merge(&mut self, partial: Self::Partial) {
        self.extend(partial);
    }
}

impl State for () {
    type Partial = ();

    fn merge(&mut self, _partial: Self::Partial) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_map_merge_overwrites_and_appends() {
        let mut state: IndexMap<&str, i32> = IndexMap::from([("a", 0), ("b", 0)]);
        state.merge(IndexMap::from([("b", 2), ("c", 3)]));

        let entries: Vec<_> = state.into_iter().collect();
        assert_eq!(entries, vec![("a", 0), ("b", 2), ("c", 3)]);
    }
}
