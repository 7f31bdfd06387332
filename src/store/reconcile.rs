// src/store/reconcile.rs

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

/// Difference between the stored child rows of a parent and the child list a
/// request asks for.
#[derive(Debug)]
pub struct Reconciliation<'a, E, D> {
    /// Stored rows absent from the desired list (and duplicate stored rows).
    pub removed: Vec<&'a E>,
    /// Stored rows that are still wanted, paired with their desired entry.
    pub retained: Vec<(&'a E, &'a D)>,
    /// Desired entries with no stored counterpart.
    pub added: Vec<&'a D>,
}

/// Matches `desired` against `existing` by natural key.
///
/// A desired entry whose key is `None` is always new. Repeated desired keys
/// are collapsed to their first occurrence.
pub fn reconcile<'a, E, D, K>(
    existing: &'a [E],
    desired: &'a [D],
    existing_key: impl Fn(&E) -> K,
    desired_key: impl Fn(&D) -> Option<K>,
) -> Reconciliation<'a, E, D>
where
    K: Eq + Hash,
{
    let mut removed = Vec::new();
    let mut by_key: HashMap<K, &'a E> = HashMap::with_capacity(existing.len());
    for row in existing {
        let key = existing_key(row);
        if by_key.contains_key(&key) {
            removed.push(row);
        } else {
            by_key.insert(key, row);
        }
    }

    let mut retained = Vec::new();
    let mut added = Vec::new();
    let mut wanted: HashSet<K> = HashSet::with_capacity(desired.len());
    for entry in desired {
        let Some(key) = desired_key(entry) else {
            added.push(entry);
            continue;
        };
        if wanted.contains(&key) {
            continue;
        }
        match by_key.get(&key) {
            Some(row) => retained.push((*row, entry)),
            None => added.push(entry),
        }
        wanted.insert(key);
    }

    for row in existing {
        let key = existing_key(row);
        let is_first = by_key.get(&key).is_some_and(|kept| std::ptr::eq(*kept, row));
        if is_first && !wanted.contains(&key) {
            removed.push(row);
        }
    }

    Reconciliation {
        removed,
        retained,
        added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: u32,
        class_id: &'static str,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, class_id: "a" },
            Row { id: 2, class_id: "b" },
            Row { id: 3, class_id: "c" },
        ]
    }

    #[test]
    fn computes_delete_and_insert_sets() {
        let existing = rows();
        let desired = vec!["b", "c", "d"];
        let plan = reconcile(&existing, &desired, |r| r.class_id, |d| Some(*d));

        assert_eq!(plan.removed, vec![&existing[0]]);
        assert_eq!(plan.added, vec![&"d"]);
        let kept: Vec<_> = plan.retained.iter().map(|(r, _)| r.id).collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn unkeyed_entries_are_always_added() {
        let existing = rows();
        let desired: Vec<Option<&str>> = vec![None, Some("a"), None];
        let plan = reconcile(&existing, &desired, |r| r.class_id, |d| *d);

        assert_eq!(plan.added.len(), 2);
        assert_eq!(plan.retained.len(), 1);
        assert_eq!(plan.removed.len(), 2);
    }

    #[test]
    fn duplicate_desired_keys_collapse() {
        let existing: Vec<Row> = Vec::new();
        let desired = vec!["x", "x", "y"];
        let plan = reconcile(&existing, &desired, |r| r.class_id, |d| Some(*d));
        assert_eq!(plan.added, vec![&"x", &"y"]);
    }

    #[test]
    fn duplicate_stored_rows_are_pruned() {
        let existing = vec![
            Row { id: 1, class_id: "a" },
            Row { id: 2, class_id: "a" },
        ];
        let desired = vec!["a"];
        let plan = reconcile(&existing, &desired, |r| r.class_id, |d| Some(*d));

        assert_eq!(plan.removed, vec![&existing[1]]);
        assert_eq!(plan.retained.len(), 1);
        assert!(plan.added.is_empty());
    }

    #[test]
    fn empty_desired_removes_everything() {
        let existing = rows();
        let desired: Vec<&str> = Vec::new();
        let plan = reconcile(&existing, &desired, |r| r.class_id, |d| Some(*d));
        assert_eq!(plan.removed.len(), 3);
    }
}
