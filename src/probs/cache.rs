use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use sieve_cache::SieveCache;

use crate::error::Error;
use crate::ngram::NgramTable;
use crate::symbol::Symbol;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CacheType {
  #[default]
  None,
  /// Unbounded hash map, can be written to disk and preloaded
  Simple,
  /// Bounded, evicts with SIEVE when full
  Lru,
}

impl FromStr for CacheType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "none" | "" => Ok(Self::None),
      "simple" => Ok(Self::Simple),
      "lru" => Ok(Self::Lru),
      other => Err(Error::param(
        "probs_cache_type",
        format!("unknown cache type {:?}", other),
      )),
    }
  }
}

impl fmt::Display for CacheType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::None => write!(f, "none"),
      Self::Simple => write!(f, "simple"),
      Self::Lru => write!(f, "lru"),
    }
  }
}

enum Store {
  None,
  Simple(HashMap<Box<[Symbol]>, f32>),
  Lru(SieveCache<Box<[Symbol]>, f32>),
}

/// Memo of interpolated probabilities keyed by the full n-gram. Lives as long as the
/// table that owns it, so it carries over from one sentence to the next.
pub struct ProbCache {
  kind: CacheType,
  max_entries: usize,
  store: Store,
}

impl ProbCache {
  pub fn new(kind: CacheType, max_entries: usize) -> Self {
    Self {
      kind,
      max_entries,
      store: Self::empty_store(kind, max_entries),
    }
  }

  pub fn disabled() -> Self {
    Self::new(CacheType::None, 0)
  }

  fn empty_store(kind: CacheType, max_entries: usize) -> Store {
    match kind {
      CacheType::None => Store::None,
      CacheType::Simple => Store::Simple(HashMap::new()),
      CacheType::Lru => match SieveCache::new(max_entries.max(1)) {
        Ok(cache) => Store::Lru(cache),
        Err(_) => Store::None,
      },
    }
  }

  pub fn kind(&self) -> CacheType {
    self.kind
  }

  pub fn get(&mut self, key: &[Symbol]) -> Option<f32> {
    match &mut self.store {
      Store::None => None,
      Store::Simple(map) => map.get(key).copied(),
      Store::Lru(cache) => cache.get(key).copied(),
    }
  }

  pub fn insert(&mut self, key: &[Symbol], value: f32) {
    match &mut self.store {
      Store::None => {}
      Store::Simple(map) => {
        map.insert(key.into(), value);
      }
      Store::Lru(cache) => {
        cache.insert(key.into(), value);
      }
    }
  }

  pub fn len(&self) -> usize {
    match &self.store {
      Store::None => 0,
      Store::Simple(map) => map.len(),
      Store::Lru(cache) => cache.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&mut self) {
    self.store = Self::empty_store(self.kind, self.max_entries);
  }

  /// Snapshot of a simple cache as an n-gram table. Other cache kinds have nothing to save.
  pub fn to_table(&self, n: usize) -> Option<NgramTable> {
    match &self.store {
      Store::Simple(map) => {
        let mut table = NgramTable::new(n);
        for (k, v) in map.iter().filter(|(k, _)| k.len() == n) {
          table.set(k, *v);
        }
        Some(table)
      }
      _ => None,
    }
  }

  /// Preloads a previously written snapshot
  pub fn preload(&mut self, table: &NgramTable) {
    for (k, v) in table.iter() {
      self.insert(k, v);
    }
  }
}

impl fmt::Debug for ProbCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProbCache")
      .field("kind", &self.kind)
      .field("entries", &self.len())
      .finish()
  }
}
