//! Entity trait: records with a stable identity.

use std::collections::BTreeMap;

/// A record identified by a stable, ordered key.
///
/// Catalog rows are keyed by database-assigned integers, so identifiers are
/// `Ord` as well as hashable; ordering by id is meaningful (newer rows sort
/// last).
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Index a collection of entities by id. Later duplicates replace earlier ones.
pub fn index_by_id<E, I>(items: I) -> BTreeMap<E::Id, E>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    items.into_iter().map(|e| (e.id(), e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        label: &'static str,
    }

    impl Entity for Row {
        type Id = i64;

        fn id(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn index_by_id_keeps_last_duplicate() {
        let index = index_by_id(vec![
            Row { id: 2, label: "a" },
            Row { id: 1, label: "b" },
            Row { id: 2, label: "c" },
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index[&2].label, "c");
        assert_eq!(index.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
