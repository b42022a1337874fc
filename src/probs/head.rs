use std::io::{self, Write};

use crate::error::Result;
use crate::ngram::NgramTable;
use crate::probs::{interpolate, write_tables, ProbCache};
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// P(H | P, hw, ht): probability of a head chain given the parent category and the
/// lexical head, backing off to (P, ht) and then P alone.
#[derive(Debug)]
pub struct HeadProbs {
  lambda_pwt: NgramTable,
  lambda_pt: NgramTable,
  hpwt: NgramTable,
  hpt: NgramTable,
  hp: NgramTable,
  cache: ProbCache,
}

impl HeadProbs {
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    Ok(Self {
      lambda_pwt: NgramTable::read(reader, 3)?,
      lambda_pt: NgramTable::read(reader, 2)?,
      hpwt: NgramTable::read(reader, 4)?,
      hpt: NgramTable::read(reader, 3)?,
      hp: NgramTable::read(reader, 2)?,
      cache: ProbCache::disabled(),
    })
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  pub fn set_cache(&mut self, cache: ProbCache) {
    self.cache = cache;
  }

  pub fn cache(&self) -> &ProbCache {
    &self.cache
  }

  pub fn cache_mut(&mut self) -> &mut ProbCache {
    &mut self.cache
  }

  pub fn lookup(&mut self, head: Symbol, parent: Symbol, hw: Symbol, ht: Symbol) -> f32 {
    let key = [head, parent, hw, ht];
    if let Some(p) = self.cache.get(&key) {
      return p;
    }

    let p = interpolate(
      &[
        (self.lambda_pwt.lookup(&[parent, hw, ht]), self.hpwt.lookup(&key)),
        (self.lambda_pt.lookup(&[parent, ht]), self.hpt.lookup(&[head, parent, ht])),
      ],
      self.hp.lookup(&[head, parent]),
    );
    self.cache.insert(&key, p);
    p
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
    write_tables(
      w,
      &[&self.lambda_pwt, &self.lambda_pt, &self.hpwt, &self.hpt, &self.hp],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::symbols;

  const HEAD: &str = "1\n((S left VBD) 0.5)\n0\n1\n((VP=VBD S left VBD) 0.8)\n0\n1\n((VP=VBD S) 0.4)\n";

  #[test]
  fn backs_off_to_parent() {
    let mut probs = HeadProbs::parse("head", HEAD).unwrap();
    let s = symbols("VP=VBD S left VBD");
    let p = probs.lookup(s[0], s[1], s[2], s[3]);
    // 0.5 * 0.8 + 0.5 * (0 * 0 + 1 * 0.4)
    assert!((p - 0.6).abs() < 1e-6);

    let unseen = Symbol::new("went");
    let p = probs.lookup(s[0], s[1], unseen, s[3]);
    assert!((p - 0.4).abs() < 1e-6);
  }

  #[test]
  fn cached_value_is_reused() {
    let mut probs = HeadProbs::parse("head", HEAD).unwrap();
    probs.set_cache(ProbCache::new(crate::probs::CacheType::Simple, 0));
    let s = symbols("VP=VBD S left VBD");
    let first = probs.lookup(s[0], s[1], s[2], s[3]);
    assert_eq!(probs.cache().len(), 1);
    assert_eq!(probs.lookup(s[0], s[1], s[2], s[3]), first);
  }
}
