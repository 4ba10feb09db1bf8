use std::{collections::BTreeMap, hash::Hash};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// Build a reverse lookup from class names to their position in an ordered class list
pub fn index_map(classes: &[String]) -> BTreeMap<String, usize> {
    invert_map(classes.iter().cloned().enumerate())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_index_map() {
        let classes = vec!["O".to_string(), "B_PER".to_string(), "I_PER".to_string()];

        let label2id = index_map(&classes);

        assert_eq!(label2id.get("O"), Some(&0));
        assert_eq!(label2id.get("B_PER"), Some(&1));
        assert_eq!(label2id.get("I_PER"), Some(&2));
    }

    #[test]
    fn test_index_map_keeps_last_duplicate() {
        let classes = vec!["O".to_string(), "O".to_string()];

        let label2id = index_map(&classes);

        assert_eq!(label2id.len(), 1);
        assert_eq!(label2id.get("O"), Some(&1));
    }
}
