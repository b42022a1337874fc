//! Bridge rules: the grammar of the head-driven model.
//!
//! A *kernel* joins a head constituent and its first modifier into a new constituent. An
//! *extension* attaches one more modifier to a constituent that already has a head. Both
//! are looked up by a key made of the categories and tags of the two adjoining entries.
//! Chains such as `S=VP=VBD` name the unary projections between a child and the new node,
//! top first.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// Which side the modifier attaches on. `Right` means the head is the left entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BranchDirection {
  Left,
  Right,
}

impl FromStr for BranchDirection {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "left" | "LEFT" | "L" => Ok(Self::Left),
      "right" | "RIGHT" | "R" => Ok(Self::Right),
      other => Err(Error::Format {
        origin: "<direction>".to_string(),
        line: 0,
        message: format!("unknown branch direction {:?}", other),
      }),
    }
  }
}

impl fmt::Display for BranchDirection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Left => write!(f, "left"),
      Self::Right => write!(f, "right"),
    }
  }
}

/// Index of a rule inside its table
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BridgeRef(pub u32);

/// A record type that can live in a [`BridgeTable`]
pub trait BridgeRecord: Copy + fmt::Debug {
  type Key: Copy + Eq + Hash + fmt::Debug;

  /// Symbols in the key, not counting the direction
  const KEY_FIELDS: usize;
  /// Symbols in a record, not counting the direction
  const FIELDS: usize;

  fn make_key(direction: BranchDirection, fields: &[Symbol]) -> Self::Key;
  fn from_fields(direction: BranchDirection, fields: &[Symbol]) -> Self;
  fn direction(&self) -> BranchDirection;
  fn fields(&self) -> Vec<Symbol>;
  fn key(&self) -> Self::Key;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KernelKey {
  pub direction: BranchDirection,
  pub head_category: Symbol,
  pub mod_category: Symbol,
  pub mod_tag: Symbol,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BridgeKernel {
  pub direction: BranchDirection,
  pub head_category: Symbol,
  pub mod_category: Symbol,
  pub mod_tag: Symbol,
  /// Category of the constituent being built
  pub category: Symbol,
  pub head_chain: Symbol,
  pub head_chain_front: Symbol,
  pub modifier_chain: Symbol,
  pub modifier_chain_front: Symbol,
}

impl BridgeRecord for BridgeKernel {
  type Key = KernelKey;

  const KEY_FIELDS: usize = 3;
  const FIELDS: usize = 8;

  fn make_key(direction: BranchDirection, f: &[Symbol]) -> KernelKey {
    KernelKey {
      direction,
      head_category: f[0],
      mod_category: f[1],
      mod_tag: f[2],
    }
  }

  fn from_fields(direction: BranchDirection, f: &[Symbol]) -> Self {
    Self {
      direction,
      head_category: f[0],
      mod_category: f[1],
      mod_tag: f[2],
      category: f[3],
      head_chain: f[4],
      head_chain_front: f[5],
      modifier_chain: f[6],
      modifier_chain_front: f[7],
    }
  }

  fn direction(&self) -> BranchDirection {
    self.direction
  }

  fn fields(&self) -> Vec<Symbol> {
    vec![
      self.head_category,
      self.mod_category,
      self.mod_tag,
      self.category,
      self.head_chain,
      self.head_chain_front,
      self.modifier_chain,
      self.modifier_chain_front,
    ]
  }

  fn key(&self) -> KernelKey {
    KernelKey {
      direction: self.direction,
      head_category: self.head_category,
      mod_category: self.mod_category,
      mod_tag: self.mod_tag,
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionKey {
  pub direction: BranchDirection,
  pub base_category: Symbol,
  pub base_head: Symbol,
  pub mod_category: Symbol,
  pub prev_edge: Symbol,
  pub mod_tag: Symbol,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BridgeExtension {
  pub direction: BranchDirection,
  pub base_category: Symbol,
  pub base_head: Symbol,
  pub mod_category: Symbol,
  pub prev_edge: Symbol,
  pub mod_tag: Symbol,
  pub modifier_chain: Symbol,
  pub modifier_chain_front: Symbol,
}

impl BridgeRecord for BridgeExtension {
  type Key = ExtensionKey;

  const KEY_FIELDS: usize = 5;
  const FIELDS: usize = 7;

  fn make_key(direction: BranchDirection, f: &[Symbol]) -> ExtensionKey {
    ExtensionKey {
      direction,
      base_category: f[0],
      base_head: f[1],
      mod_category: f[2],
      prev_edge: f[3],
      mod_tag: f[4],
    }
  }

  fn from_fields(direction: BranchDirection, f: &[Symbol]) -> Self {
    Self {
      direction,
      base_category: f[0],
      base_head: f[1],
      mod_category: f[2],
      prev_edge: f[3],
      mod_tag: f[4],
      modifier_chain: f[5],
      modifier_chain_front: f[6],
    }
  }

  fn direction(&self) -> BranchDirection {
    self.direction
  }

  fn fields(&self) -> Vec<Symbol> {
    vec![
      self.base_category,
      self.base_head,
      self.mod_category,
      self.prev_edge,
      self.mod_tag,
      self.modifier_chain,
      self.modifier_chain_front,
    ]
  }

  fn key(&self) -> ExtensionKey {
    ExtensionKey {
      direction: self.direction,
      base_category: self.base_category,
      base_head: self.base_head,
      mod_category: self.mod_category,
      prev_edge: self.prev_edge,
      mod_tag: self.mod_tag,
    }
  }
}

/// All bridges of one kind, stored flat and indexed by key
#[derive(Debug, Clone)]
pub struct BridgeTable<B: BridgeRecord> {
  bridges: Vec<B>,
  index: HashMap<B::Key, Range<u32>>,
}

pub type KernelTable = BridgeTable<BridgeKernel>;
pub type ExtensionTable = BridgeTable<BridgeExtension>;

impl<B: BridgeRecord> Default for BridgeTable<B> {
  fn default() -> Self {
    Self {
      bridges: Vec::new(),
      index: HashMap::new(),
    }
  }
}

impl<B: BridgeRecord> BridgeTable<B> {
  pub fn len(&self) -> usize {
    self.bridges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bridges.is_empty()
  }

  pub fn get(&self, r: BridgeRef) -> &B {
    &self.bridges[r.0 as usize]
  }

  /// Handles of every bridge stored under `key`. The range owns nothing, so callers can
  /// keep it while mutating other state.
  pub fn lookup(&self, key: &B::Key) -> impl Iterator<Item = BridgeRef> + use<B> {
    self.index.get(key).cloned().unwrap_or(0..0).map(BridgeRef)
  }

  /// Adds a bridge. Bridges sharing a key must be inserted together.
  pub fn push(&mut self, bridge: B) {
    let id = self.bridges.len() as u32;
    self.bridges.push(bridge);
    let range = self.index.entry(bridge.key()).or_insert(id..id);
    range.end = id + 1;
  }

  fn read_direction(reader: &mut SexpReader<'_>) -> Result<BranchDirection> {
    let atom = reader.atom()?;
    atom
      .parse::<BranchDirection>()
      .map_err(|_| reader.error(format!("unknown branch direction {:?}", atom)))
  }

  /// Reads `count` then `((dir key..) n (dir fields..)*)` groups
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    let groups = reader.count()?;
    let mut table = Self::default();
    for _ in 0..groups {
      reader.open()?;
      reader.open()?;
      let direction = Self::read_direction(reader)?;
      let mut fields = Vec::with_capacity(B::KEY_FIELDS);
      for _ in 0..B::KEY_FIELDS {
        fields.push(reader.symbol()?);
      }
      reader.close()?;
      let key = B::make_key(direction, &fields);
      if table.index.contains_key(&key) {
        return Err(reader.error(format!("duplicate key {:?}", key)));
      }

      let n = reader.count()?;
      for _ in 0..n {
        reader.open()?;
        let direction = Self::read_direction(reader)?;
        let mut fields = Vec::with_capacity(B::FIELDS);
        for _ in 0..B::FIELDS {
          fields.push(reader.symbol()?);
        }
        reader.close()?;
        let bridge = B::from_fields(direction, &fields);
        if bridge.key() != key {
          return Err(reader.error(format!("record {:?} does not match key {:?}", bridge, key)));
        }
        table.push(bridge);
      }
      reader.close()?;
    }
    Ok(table)
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    let mut reader = SexpReader::new(origin, text);
    let table = Self::read(&mut reader)?;
    if !reader.is_done() {
      return Err(reader.error("trailing input after bridge table"));
    }
    Ok(table)
  }
}

impl<B: BridgeRecord> FromStr for BridgeTable<B> {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse("<string>", s)
  }
}

fn write_fields(f: &mut fmt::Formatter<'_>, direction: BranchDirection, fields: &[Symbol]) -> fmt::Result {
  write!(f, "({}", direction)?;
  for s in fields {
    write!(f, " {}", s)?;
  }
  write!(f, ")")
}

impl<B: BridgeRecord> fmt::Display for BridgeTable<B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut groups = self.index.values().cloned().collect::<Vec<_>>();
    groups.sort_by_key(|range| {
      let first = &self.bridges[range.start as usize];
      (first.direction() == BranchDirection::Right, first.fields())
    });

    writeln!(f, "{}", groups.len())?;
    for range in groups {
      let first = self.bridges[range.start as usize];
      write!(f, "(")?;
      write_fields(f, first.direction(), &first.fields()[..B::KEY_FIELDS])?;
      write!(f, " {}", range.len())?;
      for id in range {
        let bridge = &self.bridges[id as usize];
        write!(f, " ")?;
        write_fields(f, bridge.direction(), &bridge.fields())?;
      }
      writeln!(f, ")")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const KERNELS: &str = "2
((left VBD NNP NNP) 2
  (left VBD NNP NNP S VP=VBD VP NPA=NNP NPA)
  (left VBD NNP NNP SQ VP=VBD VP NP=NNP NP))
((right TOPTAG S VBD) 1 (right TOPTAG S VBD TOPTAG TOPTAG TOPTAG S S))
";

  #[test]
  fn kernels_are_indexed_by_key() {
    let table = KERNELS.parse::<KernelTable>().unwrap();
    assert_eq!(table.len(), 3);

    let key = KernelKey {
      direction: BranchDirection::Left,
      head_category: "VBD".into(),
      mod_category: "NNP".into(),
      mod_tag: "NNP".into(),
    };
    let found = table.lookup(&key).map(|r| table.get(r).category).collect::<Vec<_>>();
    assert_eq!(found, vec![Symbol::new("S"), Symbol::new("SQ")]);

    let missing = KernelKey {
      direction: BranchDirection::Right,
      ..key
    };
    assert_eq!(table.lookup(&missing).count(), 0);
  }

  #[test]
  fn written_kernels_read_back() {
    let table = KERNELS.parse::<KernelTable>().unwrap();
    let again = table.to_string().parse::<KernelTable>().unwrap();
    assert_eq!(again.len(), table.len());
    assert_eq!(again.to_string(), table.to_string());
  }

  #[test]
  fn extensions_check_record_keys() {
    let good = "1\n((right S VP . -ADJ- .) 1 (right S VP . -ADJ- . . .))\n";
    let table = good.parse::<ExtensionTable>().unwrap();
    assert_eq!(table.get(BridgeRef(0)).modifier_chain_front, Symbol::new("."));

    let bad = "1\n((right S VP . -ADJ- .) 1 (right S VP , -ADJ- , , ,))\n";
    assert!(bad.parse::<ExtensionTable>().is_err());
  }
}
