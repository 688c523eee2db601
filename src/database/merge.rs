use std::{collections::HashMap, hash::Hash};

/// Sums the amounts of entries sharing a key.
///
/// Every key appears once in the result, in the order it was first seen, so
/// output built from the result is stable for a given input order. The sums
/// themselves do not depend on input order.
pub fn merge_amounts<K, I>(entries: I) -> Vec<(K, i64)>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = (K, i64)>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut merged: Vec<(K, i64)> = vec![];

    for (key, amount) in entries {
        match positions.get(&key) {
            Some(&position) => merged[position].1 += amount,
            None => {
                positions.insert(key.clone(), merged.len());
                merged.push((key, amount));
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::merge_amounts;

    #[test]
    fn sums_entries_sharing_a_key() {
        let merged = merge_amounts(vec![("A", 3), ("B", 2), ("A", 4)]);

        assert_eq!(merged, vec![("A", 7), ("B", 2)]);
    }

    #[test]
    fn input_order_does_not_change_totals() {
        let forward: HashMap<_, _> = merge_amounts(vec![("A", 3), ("B", 2), ("A", 4)])
            .into_iter()
            .collect();
        let backward: HashMap<_, _> = merge_amounts(vec![("A", 4), ("B", 2), ("A", 3)])
            .into_iter()
            .collect();
        let shuffled: HashMap<_, _> = merge_amounts(vec![("B", 2), ("A", 4), ("A", 3)])
            .into_iter()
            .collect();

        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
        assert_eq!(forward.get("A"), Some(&7));
        assert_eq!(forward.get("B"), Some(&2));
    }

    #[test]
    fn empty_input_gives_empty_mapping() {
        let merged = merge_amounts(Vec::<(i32, i64)>::new());

        assert!(merged.is_empty());
    }

    #[test]
    fn keeps_first_seen_order() {
        let merged = merge_amounts(vec![
            (("Salt", "g"), 5),
            (("Milk", "ml"), 200),
            (("Salt", "g"), 10),
            (("Egg", "pcs"), 2),
        ]);

        assert_eq!(
            merged,
            vec![(("Salt", "g"), 15), (("Milk", "ml"), 200), (("Egg", "pcs"), 2)]
        );
    }
}
