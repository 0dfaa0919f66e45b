//! Generic keyed collection with symmetric-difference support, shared by
//! every reconciler (spec §3 "IndexedCollection", §4.4 "General contract").

use std::collections::BTreeMap;

/// The outcome of diffing a desired collection against a live one.
pub struct Diff<'a, K, V> {
    /// Present in desired, absent live: must be added.
    pub add: Vec<(&'a K, &'a V)>,
    /// Present live, absent desired: must be removed.
    pub remove: Vec<(&'a K, &'a V)>,
    /// Present in both but settings differ: must be changed/replaced.
    pub change: Vec<(&'a K, &'a V, &'a V)>,
    /// Present in both and identical: no operation.
    pub unchanged: Vec<(&'a K, &'a V)>,
}

/// A collection keyed by each subsystem's natural identifier (spec §3):
/// IP+prefix for addresses, the route 5-tuple, rule priority+family+
/// selectors, mac+dst for fdb, ip for neighbours, (ifname,subsystem) for
/// tc/sysctl. Keys are unique within one configuration (spec invariant).
#[derive(Clone, Debug, Default)]
pub struct IndexedCollection<K: Ord + Clone, V> {
    items: BTreeMap<K, V>,
}

impl<K: Ord + Clone, V> IndexedCollection<K, V> {
    pub fn new() -> Self {
        Self { items: BTreeMap::new() }
    }

    /// Insert `value` under `key`. Returns the previous value if `key` was
    /// already present, which callers should treat as a configuration error
    /// (spec invariant: keys unique within one configuration).
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.items.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.items.iter()
    }

    /// Compute the symmetric difference between `self` (desired) and `live`,
    /// using `eq` to decide whether a key present in both is "identical"
    /// (spec: "identical requires a match on a declared settings set").
    pub fn diff<'a>(&'a self, live: &'a IndexedCollection<K, V>, eq: impl Fn(&V, &V) -> bool) -> Diff<'a, K, V> {
        let mut add = Vec::new();
        let mut remove = Vec::new();
        let mut change = Vec::new();
        let mut unchanged = Vec::new();

        for (k, desired_v) in &self.items {
            match live.items.get(k) {
                None => add.push((k, desired_v)),
                Some(live_v) => {
                    if eq(desired_v, live_v) {
                        unchanged.push((k, desired_v));
                    } else {
                        change.push((k, desired_v, live_v));
                    }
                }
            }
        }
        for (k, live_v) in &live.items {
            if !self.items.contains_key(k) {
                remove.push((k, live_v));
            }
        }
        Diff { add, remove, change, unchanged }
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for IndexedCollection<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_partitions_add_remove_change_unchanged() {
        let mut desired: IndexedCollection<&str, i32> = IndexedCollection::new();
        desired.insert("a", 1);
        desired.insert("b", 2);
        desired.insert("c", 3);

        let mut live: IndexedCollection<&str, i32> = IndexedCollection::new();
        live.insert("a", 1); // unchanged
        live.insert("b", 20); // changed
        live.insert("d", 4); // removed

        let diff = desired.diff(&live, |a, b| a == b);
        assert_eq!(diff.add, vec![(&"c", &3)]);
        assert_eq!(diff.remove, vec![(&"d", &4)]);
        assert_eq!(diff.change, vec![(&"b", &2, &20)]);
        assert_eq!(diff.unchanged, vec![(&"a", &1)]);
    }

    #[test]
    fn apply_twice_yields_no_changes_second_time() {
        // property #13: re-running a reconciler against its own prior output
        // produces zero add/remove/change.
        let mut desired: IndexedCollection<&str, i32> = IndexedCollection::new();
        desired.insert("a", 1);
        let live = desired.clone();
        let diff = desired.diff(&live, |a, b| a == b);
        assert!(diff.add.is_empty());
        assert!(diff.remove.is_empty());
        assert!(diff.change.is_empty());
    }
}
