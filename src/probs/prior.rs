use std::io::{self, Write};

use crate::error::Result;
use crate::ngram::NgramTable;
use crate::sexp::SexpReader;
use crate::symbol::Symbol;
use crate::utils::log_prob;

/// Prior probability of a constituent category together with its head tag
#[derive(Debug, Clone)]
pub struct PriorProbTable {
  table: NgramTable,
}

impl PriorProbTable {
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    Ok(Self {
      table: NgramTable::read(reader, 2)?,
    })
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  /// `ln P(category, tag)`, or `LOG_OF_ZERO` when the pair was never seen
  pub fn lookup(&self, category: Symbol, tag: Symbol) -> f32 {
    log_prob(self.table.lookup(&[category, tag]))
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
    write!(w, "{}", self.table)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::LOG_OF_ZERO;

  #[test]
  fn unseen_pair_is_log_zero() {
    let prior = PriorProbTable::parse("prior", "1\n((S VBD) 0.5)\n").unwrap();
    assert!((prior.lookup("S".into(), "VBD".into()) - 0.5f32.ln()).abs() < 1e-6);
    assert_eq!(prior.lookup("S".into(), "NN".into()), LOG_OF_ZERO);
  }
}
