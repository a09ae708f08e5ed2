//! Substring-searchable index from tags to asset IDs with stable pagination.

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// Index of (tag, id) associations supporting paginated substring search.
///
/// Tags are stored lowercased and matched by case-insensitive substring
/// containment; the empty query matches every association. Iteration order
/// is lexicographic by stored tag, insertion order within a tag, and stays
/// stable across calls on an unmodified index, which is what keeps
/// pagination consistent.
///
/// The index holds only IDs. Records are owned by the slot table; the two
/// are kept consistent by the bank, never by the index itself.
#[derive(Debug, Default)]
pub struct TagIndex {
    entries: BTreeMap<String, SmallVec<[u32; 4]>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an association. Duplicate tags are expected and all retained.
    pub fn insert(&mut self, tag: &str, id: u32) {
        self.entries.entry(tag.to_lowercase()).or_default().push(id);
    }

    /// Remove one specific association. No-op when the pair is not present.
    pub fn remove(&mut self, tag: &str, id: u32) {
        let key = tag.to_lowercase();
        if let Some(ids) = self.entries.get_mut(&key) {
            if let Some(pos) = ids.iter().position(|&entry| entry == id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    /// Total number of stored associations.
    pub fn len(&self) -> usize {
        self.entries.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of associations whose tag matches `query`.
    pub fn count_matches(&self, query: &str) -> usize {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|(tag, _)| tag.contains(&needle))
            .map(|(_, ids)| ids.len())
            .sum()
    }

    /// Paginated match listing: skip `skip` associations, yield at most
    /// `limit` IDs in index order.
    pub fn matches(&self, query: &str, skip: usize, limit: usize) -> Vec<u32> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|(tag, _)| tag.contains(&needle))
            .flat_map(|(_, ids)| ids.iter().copied())
            .skip(skip)
            .take(limit)
            .collect()
    }

    /// Distinct stored tags with their association counts, in index order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(tag, ids)| (tag.as_str(), ids.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagIndex {
        let mut index = TagIndex::new();
        index.insert("cat", 1);
        index.insert("cat", 3);
        index.insert("catapult", 5);
        index.insert("dog", 2);
        index
    }

    #[test]
    fn empty_query_matches_everything() {
        let index = sample();
        assert_eq!(index.count_matches(""), 4);
        assert_eq!(index.matches("", 0, 10), vec![1, 3, 5, 2]);
    }

    #[test]
    fn substring_containment_is_case_insensitive() {
        let index = sample();
        assert_eq!(index.count_matches("cat"), 3);
        assert_eq!(index.count_matches("CAT"), 3);
        assert_eq!(index.count_matches("pult"), 1);
        assert_eq!(index.count_matches("bird"), 0);
    }

    #[test]
    fn duplicate_tags_are_all_retained() {
        let index = sample();
        assert_eq!(index.matches("cat", 0, 10), vec![1, 3, 5]);
    }

    #[test]
    fn remove_takes_one_association_only() {
        let mut index = sample();
        index.remove("cat", 1);
        assert_eq!(index.matches("cat", 0, 10), vec![3, 5]);

        // Removing an absent pair is a silent no-op.
        index.remove("cat", 99);
        index.remove("bird", 1);
        assert_eq!(index.count_matches(""), 3);
    }

    #[test]
    fn remove_drops_emptied_tags() {
        let mut index = TagIndex::new();
        index.insert("cat", 1);
        index.remove("cat", 1);
        assert!(index.is_empty());
        assert_eq!(index.tags().count(), 0);
    }

    #[test]
    fn pagination_reproduces_the_full_listing() {
        let index = sample();
        let total = index.count_matches("");
        let full = index.matches("", 0, total);

        for skip in 0..total {
            let page = index.matches("", skip, 2);
            assert_eq!(page, full[skip..(skip + 2).min(total)].to_vec());
        }
        assert!(index.matches("", total, 2).is_empty());
    }

    #[test]
    fn skip_and_limit_clamp_near_the_end() {
        let index = sample();
        assert_eq!(index.matches("", 3, 10), vec![2]);
        assert!(index.matches("", 100, 10).is_empty());
        assert!(index.matches("", 0, 0).is_empty());
    }

    #[test]
    fn tags_lists_distinct_tags_with_counts() {
        let index = sample();
        let tags: Vec<(&str, usize)> = index.tags().collect();
        assert_eq!(tags, vec![("cat", 2), ("catapult", 1), ("dog", 1)]);
    }
}
