use std::io::{self, Write};

use crate::error::Result;
use crate::ngram::NgramTable;
use crate::probs::{interpolate, write_tables, ProbCache};
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// P(M, mt | P, H, prev, hw, ht): probability of attaching a modifier chain with head tag
/// `mt` next to the previous edge `prev`. Premodifiers and postmodifiers each get their own
/// table. Asking for `(EXIT, EXIT, ..)` gives the probability of closing that side.
#[derive(Debug)]
pub struct ModifierProbs {
  lambda_phpwt: NgramTable,
  lambda_phpt: NgramTable,
  full: NgramTable,
  tag_only: NgramTable,
  unlexicalized: NgramTable,
  cache: ProbCache,
}

impl ModifierProbs {
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    Ok(Self {
      lambda_phpwt: NgramTable::read(reader, 5)?,
      lambda_phpt: NgramTable::read(reader, 4)?,
      full: NgramTable::read(reader, 7)?,
      tag_only: NgramTable::read(reader, 6)?,
      unlexicalized: NgramTable::read(reader, 5)?,
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

  #[allow(clippy::too_many_arguments)]
  pub fn lookup(
    &mut self,
    modifier: Symbol,
    mod_tag: Symbol,
    parent: Symbol,
    head: Symbol,
    prev: Symbol,
    hw: Symbol,
    ht: Symbol,
  ) -> f32 {
    let key = [modifier, mod_tag, parent, head, prev, hw, ht];
    if let Some(p) = self.cache.get(&key) {
      return p;
    }

    let p = interpolate(
      &[
        (
          self.lambda_phpwt.lookup(&[parent, head, prev, hw, ht]),
          self.full.lookup(&key),
        ),
        (
          self.lambda_phpt.lookup(&[parent, head, prev, ht]),
          self
            .tag_only
            .lookup(&[modifier, mod_tag, parent, head, prev, ht]),
        ),
      ],
      self
        .unlexicalized
        .lookup(&[modifier, mod_tag, parent, head, prev]),
    );
    self.cache.insert(&key, p);
    p
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
    write_tables(
      w,
      &[
        &self.lambda_phpwt,
        &self.lambda_phpt,
        &self.full,
        &self.tag_only,
        &self.unlexicalized,
      ],
    )
  }
}
