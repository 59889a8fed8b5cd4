//! Three-way diff between the remote population and the index.
//!
//! ```text
//! current  = {A: t1, B: t2}
//! indexed  = {A: t1, C: t3}
//!
//! to_add    = {B}      remote only
//! to_delete = {C}      index only
//! to_update = {}       both, timestamps differ
//! unchanged = {A}      both, timestamps equal
//! ```
//!
//! The four sets always partition `keys(current) ∪ keys(indexed)`.

use std::collections::{BTreeSet, HashMap};

/// Per-id outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub to_add: BTreeSet<String>,
    pub to_update: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl Classification {
    /// Whether applying this classification would mutate the index
    pub fn has_changes(&self) -> bool {
        !(self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty())
    }
}

/// Classify every id seen on either side.
pub fn classify<T: PartialEq>(
    current: &HashMap<String, T>,
    indexed: &HashMap<String, T>,
) -> Classification {
    let mut classification = Classification::default();

    for (id, modified) in current {
        match indexed.get(id) {
            None => {
                classification.to_add.insert(id.clone());
            }
            Some(indexed_modified) if indexed_modified != modified => {
                classification.to_update.insert(id.clone());
            }
            Some(_) => {
                classification.unchanged.insert(id.clone());
            }
        }
    }

    classification.to_delete = indexed
        .keys()
        .filter(|id| !current.contains_key(*id))
        .cloned()
        .collect();

    classification
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u32)]) -> HashMap<String, u32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn assert_partition(
        current: &HashMap<String, u32>,
        indexed: &HashMap<String, u32>,
        c: &Classification,
    ) {
        let all: BTreeSet<String> = current.keys().chain(indexed.keys()).cloned().collect();
        let mut union = BTreeSet::new();
        let mut total = 0;
        for part in [&c.to_add, &c.to_update, &c.to_delete, &c.unchanged] {
            total += part.len();
            union.extend(part.iter().cloned());
        }
        assert_eq!(union, all, "sets must cover every id");
        assert_eq!(total, all.len(), "sets must be disjoint");
    }

    #[test]
    fn test_mixed_add_delete_unchanged() {
        let current = map(&[("A", 1), ("B", 2)]);
        let indexed = map(&[("A", 1), ("C", 3)]);

        let c = classify(&current, &indexed);

        assert_eq!(c.to_add, set(&["B"]));
        assert_eq!(c.to_delete, set(&["C"]));
        assert!(c.to_update.is_empty());
        assert_eq!(c.unchanged, set(&["A"]));
        assert_partition(&current, &indexed, &c);
    }

    #[test]
    fn test_modified_timestamp_is_update() {
        let current = map(&[("A", 2)]);
        let indexed = map(&[("A", 1)]);

        let c = classify(&current, &indexed);

        assert_eq!(c.to_update, set(&["A"]));
        assert!(c.to_add.is_empty() && c.to_delete.is_empty() && c.unchanged.is_empty());
    }

    #[test]
    fn test_identical_maps_are_idempotent() {
        let m = map(&[("A", 1), ("B", 2), ("C", 3)]);
        let c = classify(&m, &m);

        assert!(!c.has_changes());
        assert_eq!(c.unchanged.len(), 3);
    }

    #[test]
    fn test_empty_sides() {
        let empty = HashMap::<String, u32>::new();
        let some = map(&[("A", 1), ("B", 1)]);

        let c = classify(&some, &empty);
        assert_eq!(c.to_add, set(&["A", "B"]));
        assert!(c.to_delete.is_empty());

        let c = classify(&empty, &some);
        assert_eq!(c.to_delete, set(&["A", "B"]));
        assert!(c.to_add.is_empty());

        assert_eq!(classify(&empty, &empty), Classification::default());
    }

    #[test]
    fn test_equal_sizes_still_diffed() {
        // Same cardinality, entirely different members
        let current = map(&[("A", 1), ("B", 1)]);
        let indexed = map(&[("C", 1), ("D", 1)]);

        let c = classify(&current, &indexed);
        assert_eq!(c.to_add, set(&["A", "B"]));
        assert_eq!(c.to_delete, set(&["C", "D"]));
    }

    #[test]
    fn test_more_indexed_than_current_still_adds_and_updates() {
        let current = map(&[("A", 2), ("N", 1)]);
        let indexed = map(&[("A", 1), ("X", 1), ("Y", 1), ("Z", 1)]);

        let c = classify(&current, &indexed);

        assert_eq!(c.to_add, set(&["N"]));
        assert_eq!(c.to_update, set(&["A"]));
        assert_eq!(c.to_delete, set(&["X", "Y", "Z"]));
        assert_partition(&current, &indexed, &c);
    }

    #[test]
    fn test_partition_over_generated_inputs() {
        // Deterministic pseudo-random population sweep
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..200 {
            let mut current = HashMap::new();
            let mut indexed = HashMap::new();
            for id in 0..(next() % 30) {
                let key = format!("f{}", id);
                match next() % 4 {
                    0 => {
                        current.insert(key, 1);
                    }
                    1 => {
                        indexed.insert(key, 1);
                    }
                    2 => {
                        current.insert(key.clone(), 1);
                        indexed.insert(key, 1);
                    }
                    _ => {
                        current.insert(key.clone(), 2);
                        indexed.insert(key, 1);
                    }
                }
            }

            let c = classify(&current, &indexed);
            assert_partition(&current, &indexed, &c);
            assert!(!classify(&current, &current).has_changes());
        }
    }
}
