//! Faster (but not DoS-resistant) hashmaps for vocabularies and row sets
use farmhash;
use hash_hasher::HashBuildHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher, BuildHasherDefault};

/// Act like a farmhash
///
/// But since farmhash isn't a streaming hash we only compute the last bytes
/// so it's not really fulfilling the Hasher trait. But it's enough for string keys,
/// which write their bytes once followed by a single terminator byte that we fold in.
pub struct FarmHashLie (u64);

impl Default for FarmHashLie {
    #[inline]
    fn default() -> FarmHashLie { FarmHashLie(0) }
}

impl Hasher for FarmHashLie {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        // str hashing writes the content and then a 0xff terminator
        if bytes.len() == 1 && bytes[0] == 0xff {
            self.0 = self.0.rotate_left(1);
        } else {
            self.0 = farmhash::hash64(bytes);
        }
    }
}

pub type Farm = BuildHasherDefault<FarmHashLie>;
pub type FarmMap<X, Y> = HashMap<X, Y, Farm>;

pub fn new_farm<X: Hash+Eq, Y>() -> FarmMap<X, Y> {
    Default::default()
}

/// Sets of row indices, which are already good hashes of themselves
pub type PlainSet<X> = HashSet<X, HashBuildHasher>;

pub fn new_plain_set<X: Hash+Eq>() -> PlainSet<X> {
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farm_map_finds_words() {
        let mut map = new_farm();
        map.insert("cat".to_string(), 0usize);
        map.insert("dog".to_string(), 1);
        map.insert("category".to_string(), 2);
        assert_eq!(map.get("cat"), Some(&0));
        assert_eq!(map.get("dog"), Some(&1));
        assert_eq!(map.get("category"), Some(&2));
        assert_eq!(map.get("cow"), None);
    }

    #[test]
    fn plain_set_dedups_rows() {
        let mut set = new_plain_set();
        assert!(set.insert(4usize));
        assert!(!set.insert(4));
        assert!(set.insert(40));
        assert_eq!(set.len(), 2);
    }
}
