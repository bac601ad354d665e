//! Optimized collection types for Quarry.
//!
//! Resource caches, backend tables and task tables are keyed by paths, names
//! and ids and hit on every lookup, so they use AHash instead of SipHash.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert("textures/player.png", 1u64);
        assert_eq!(map.get("textures/player.png"), Some(&1));
    }

    #[test]
    fn test_hashset_ahash() {
        let mut set = HashSet::new();
        set.insert("wav");
        assert!(set.contains("wav"));
    }
}
