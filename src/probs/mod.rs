//! Smoothed probability models consulted while scoring chart theories.
//!
//! Head, modifier and lexical models all interpolate a chain of increasingly general
//! estimates. Each level contributes `lambda * p + (1 - lambda) * rest`, where `rest` is
//! the interpolation of the levels below it; a missing lambda counts as zero.

pub mod cache;
pub mod head;
pub mod lexical;
pub mod modifier;
pub mod prior;

use std::io::{self, Write};

pub use cache::{CacheType, ProbCache};
pub use head::HeadProbs;
pub use lexical::LexicalProbs;
pub use modifier::ModifierProbs;
pub use prior::PriorProbTable;

use crate::ngram::NgramTable;

/// Folds `(lambda, p)` levels, most specific first, onto a base estimate
pub(crate) fn interpolate(levels: &[(f32, f32)], base: f32) -> f32 {
  levels
    .iter()
    .rev()
    .fold(base, |rest, &(lambda, p)| lambda * p + (1.0 - lambda) * rest)
}

pub(crate) fn write_tables<W: Write>(w: &mut W, tables: &[&NgramTable]) -> io::Result<()> {
  for table in tables {
    write!(w, "{}", table)?;
  }
  Ok(())
}
