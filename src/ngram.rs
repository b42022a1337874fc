use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// A map from fixed-length symbol sequences to floats (probabilities, lambdas or counts)
#[derive(Debug, Clone, PartialEq)]
pub struct NgramTable {
  n: usize,
  table: HashMap<Box<[Symbol]>, f32>,
}

impl NgramTable {
  pub fn new(n: usize) -> Self {
    Self {
      n,
      table: HashMap::new(),
    }
  }

  pub fn n(&self) -> usize {
    self.n
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  pub fn get(&self, ngram: &[Symbol]) -> Option<f32> {
    self.table.get(ngram).copied()
  }

  /// Value for `ngram`, or 0 if it was never seen
  pub fn lookup(&self, ngram: &[Symbol]) -> f32 {
    self.get(ngram).unwrap_or(0.0)
  }

  pub fn set(&mut self, ngram: &[Symbol], value: f32) {
    debug_assert_eq!(ngram.len(), self.n);
    self.table.insert(ngram.into(), value);
  }

  /// Accumulates `count` onto whatever is already stored for `ngram`
  pub fn add(&mut self, ngram: &[Symbol], count: f32) {
    debug_assert_eq!(ngram.len(), self.n);
    if let Some(v) = self.table.get_mut(ngram) {
      *v += count;
    } else {
      self.table.insert(ngram.into(), count);
    }
  }

  /// Drops every entry below `threshold`, returning how many were removed
  pub fn prune(&mut self, threshold: f32) -> usize {
    let before = self.table.len();
    self.table.retain(|_, v| *v >= threshold);
    before - self.table.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&[Symbol], f32)> {
    self.table.iter().map(|(k, v)| (&**k, *v))
  }

  /// Reads one count-prefixed table of `((s1 .. sn) value)` records
  pub fn read(reader: &mut SexpReader<'_>, n: usize) -> Result<Self> {
    let count = reader.count()?;
    let mut table = Self::new(n);
    table.table.reserve(count);
    for _ in 0..count {
      reader.open()?;
      let ngram = reader.symbols(n)?;
      let value = reader.float()?;
      reader.close()?;
      table.table.insert(ngram.into_boxed_slice(), value);
    }
    Ok(table)
  }

  /// Parses a whole string holding exactly one table
  pub fn parse(origin: &str, text: &str, n: usize) -> Result<Self> {
    let mut reader = SexpReader::new(origin, text);
    let table = Self::read(&mut reader, n)?;
    if !reader.is_done() {
      return Err(reader.error("trailing input after table"));
    }
    Ok(table)
  }
}

/// Infers `n` from the first record; an empty table gets `n = 0`
impl FromStr for NgramTable {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let mut probe = SexpReader::new("<string>", s);
    let count = probe.count()?;
    if count == 0 {
      return Ok(Self::new(0));
    }
    probe.open()?;
    probe.open()?;
    let mut n = 0;
    while probe.atom().is_ok() {
      n += 1;
    }
    Self::parse("<string>", s, n)
  }
}

/// Writes the table back in the format `read` expects, sorted so output is deterministic
impl fmt::Display for NgramTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut entries = self.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    writeln!(f, "{}", entries.len())?;
    for (ngram, value) in entries {
      write!(f, "((")?;
      for (i, s) in ngram.iter().enumerate() {
        if i > 0 {
          write!(f, " ")?;
        }
        write!(f, "{}", s)?;
      }
      writeln!(f, ") {})", value)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::symbols;

  #[test]
  fn accumulate_and_prune() {
    let mut t = NgramTable::new(2);
    let ab = symbols("a b");
    let bc = symbols("b c");
    t.add(&ab, 1.0);
    t.add(&ab, 2.0);
    t.add(&bc, 0.5);
    assert_eq!(t.lookup(&ab), 3.0);
    assert_eq!(t.prune(1.0), 1);
    assert_eq!(t.lookup(&bc), 0.0);
    assert_eq!(t.len(), 1);
  }

  #[test]
  fn written_table_reads_back() {
    let text = "3\n((NP NN) 0.5)\n((S VBD) 0.25)\n((TOPTAG TOPTAG) inf)\n";
    let t = text.parse::<NgramTable>().unwrap();
    assert_eq!(t.n(), 2);
    assert_eq!(t.lookup(&symbols("TOPTAG TOPTAG")), f32::MAX);

    let again = NgramTable::parse("again", &t.to_string(), 2).unwrap();
    assert_eq!(t, again);
  }

  #[test]
  fn wrong_arity_fails() {
    assert!(NgramTable::parse("t", "1\n((a b c) 1)", 2).is_err());
    assert!(NgramTable::parse("t", "2\n((a b) 1)", 2).is_err());
  }
}
