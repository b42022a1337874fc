//! Word-level tables: tag dictionaries, the training vocabulary and the small lists that
//! switch decoder behaviour for particular words or categories.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::Result;
use crate::grammar::BranchDirection;
use crate::ngram::NgramTable;
use crate::sexp::SexpReader;
use crate::symbol::Symbol;

/// Possible part-of-speech tags for each word, in model order
#[derive(Debug, Clone, Default)]
pub struct PartOfSpeechTable {
  tags: HashMap<Symbol, Vec<Symbol>>,
}

impl PartOfSpeechTable {
  /// Reads `count` then `(word n tag..)` records
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    let count = reader.count()?;
    let mut tags = HashMap::with_capacity(count);
    for _ in 0..count {
      reader.open()?;
      let word = reader.symbol()?;
      let n = reader.count()?;
      let mut word_tags = Vec::with_capacity(n);
      for _ in 0..n {
        word_tags.push(reader.symbol()?);
      }
      reader.close()?;
      tags.insert(word, word_tags);
    }
    Ok(Self { tags })
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  /// Tags for `word`; empty when the word is unknown
  pub fn lookup(&self, word: Symbol) -> &[Symbol] {
    self.tags.get(&word).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn insert(&mut self, word: Symbol, tags: Vec<Symbol>) {
    self.tags.insert(word, tags);
  }

  pub fn len(&self) -> usize {
    self.tags.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }
}

impl fmt::Display for PartOfSpeechTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut words = self.tags.keys().copied().collect::<Vec<_>>();
    words.sort();
    writeln!(f, "{}", words.len())?;
    for word in words {
      let tags = self.lookup(word);
      write!(f, "({} {}", word, tags.len())?;
      for tag in tags {
        write!(f, " {}", tag)?;
      }
      writeln!(f, ")")?;
    }
    Ok(())
  }
}

/// Words seen in training
#[derive(Debug, Clone)]
pub struct VocabularyTable {
  counts: NgramTable,
}

impl VocabularyTable {
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    Ok(Self {
      counts: NgramTable::read(reader, 1)?,
    })
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  pub fn contains(&self, word: Symbol) -> bool {
    self.counts.get(&[word]).is_some()
  }

  pub fn count(&self, word: Symbol) -> f32 {
    self.counts.lookup(&[word])
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }
}

impl Default for VocabularyTable {
  fn default() -> Self {
    Self {
      counts: NgramTable::new(1),
    }
  }
}

/// A single tag per word. Used for the parser shortcuts (`NLC`/`NRC` markers and the
/// `PURE-PREPS`/`PURE-ADVERBS` switches).
#[derive(Debug, Clone, Default)]
pub struct TokenTagTable {
  tags: HashMap<Symbol, Symbol>,
}

impl TokenTagTable {
  /// Reads `count` then `(word TAG)` records
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    let count = reader.count()?;
    let mut tags = HashMap::with_capacity(count);
    for _ in 0..count {
      let record = reader.symbols(2)?;
      tags.insert(record[0], record[1]);
    }
    Ok(Self { tags })
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  pub fn lookup(&self, word: Symbol) -> Option<Symbol> {
    self.tags.get(&word).copied()
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }
}

/// Categories whose extensions condition on the neighbouring word rather than the head
#[derive(Debug, Clone, Default)]
pub struct SequentialBigrams {
  left: HashSet<Symbol>,
  right: HashSet<Symbol>,
}

impl SequentialBigrams {
  /// Reads `count` then `(left|right CATEGORY)` records
  pub fn read(reader: &mut SexpReader<'_>) -> Result<Self> {
    let count = reader.count()?;
    let mut bigrams = Self::default();
    for _ in 0..count {
      reader.open()?;
      let side = reader.atom()?;
      let category = reader.symbol()?;
      reader.close()?;
      match side.parse::<BranchDirection>() {
        Ok(BranchDirection::Left) => bigrams.left.insert(category),
        Ok(BranchDirection::Right) => bigrams.right.insert(category),
        Err(_) => return Err(reader.error(format!("unknown bigram side {:?}", side))),
      };
    }
    Ok(bigrams)
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    Self::read(&mut SexpReader::new(origin, text))
  }

  pub fn use_left(&self, category: Symbol) -> bool {
    self.left.contains(&category)
  }

  pub fn use_right(&self, category: Symbol) -> bool {
    self.right.contains(&category)
  }
}

/// Lower-cased words that may head a descriptor ("president", "company", ...)
#[derive(Debug, Clone, Default)]
pub struct DescriptorInventory {
  words: HashSet<Symbol>,
}

impl DescriptorInventory {
  /// One word per line, `#` starts a comment
  pub fn parse(text: &str) -> Self {
    let words = text
      .lines()
      .map(|line| line.split('#').next().unwrap_or("").trim())
      .filter(|line| !line.is_empty())
      .map(|w| Symbol::new(&w.to_lowercase()))
      .collect();
    Self { words }
  }

  pub fn contains(&self, word: Symbol) -> bool {
    self.words.contains(&word.to_lowercase())
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }
}
