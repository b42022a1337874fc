use std::io::{self, Write};

use crate::error::Result;
use crate::ngram::NgramTable;
use crate::probs::{interpolate, write_tables, ProbCache};
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// P(mw | M, mt, P, H, hw, ht): probability of the modifier's head word. There is one
/// table per attachment side; at the bottom of the backoff chain the table averages its
/// own P(w | t) with the other side's to smooth sparse words.
#[derive(Debug)]
pub struct LexicalProbs {
  lambda_mtphwt: NgramTable,
  lambda_mtpht: NgramTable,
  lambda_mt: NgramTable,
  mtphwt: NgramTable,
  mtpht: NgramTable,
  mt: NgramTable,
  t: NgramTable,
  cache: ProbCache,
}

impl LexicalProbs {
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    Ok(Self {
      lambda_mtphwt: NgramTable::read(reader, 6)?,
      lambda_mtpht: NgramTable::read(reader, 5)?,
      lambda_mt: NgramTable::read(reader, 2)?,
      mtphwt: NgramTable::read(reader, 7)?,
      mtpht: NgramTable::read(reader, 6)?,
      mt: NgramTable::read(reader, 3)?,
      t: NgramTable::read(reader, 2)?,
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

  /// Maximum-likelihood P(word | tag), the last level of the backoff
  pub fn lookup_ml(&self, word: Symbol, tag: Symbol) -> f32 {
    self.t.lookup(&[word, tag])
  }

  #[allow(clippy::too_many_arguments)]
  pub fn lookup(
    &mut self,
    alt: &LexicalProbs,
    mod_word: Symbol,
    modifier: Symbol,
    mod_tag: Symbol,
    parent: Symbol,
    head: Symbol,
    hw: Symbol,
    ht: Symbol,
  ) -> f32 {
    let key = [mod_word, modifier, mod_tag, parent, head, hw, ht];
    if let Some(p) = self.cache.get(&key) {
      return p;
    }

    let base = 0.5 * (self.lookup_ml(mod_word, mod_tag) + alt.lookup_ml(mod_word, mod_tag));
    let p = interpolate(
      &[
        (
          self.lambda_mtphwt.lookup(&[modifier, mod_tag, parent, head, hw, ht]),
          self.mtphwt.lookup(&key),
        ),
        (
          self.lambda_mtpht.lookup(&[modifier, mod_tag, parent, head, ht]),
          self
            .mtpht
            .lookup(&[mod_word, modifier, mod_tag, parent, head, ht]),
        ),
        (
          self.lambda_mt.lookup(&[modifier, mod_tag]),
          self.mt.lookup(&[mod_word, modifier, mod_tag]),
        ),
      ],
      base,
    );
    self.cache.insert(&key, p);
    p
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
    write_tables(
      w,
      &[
        &self.lambda_mtphwt,
        &self.lambda_mtpht,
        &self.lambda_mt,
        &self.mtphwt,
        &self.mtpht,
        &self.mt,
        &self.t,
      ],
    )
  }
}
