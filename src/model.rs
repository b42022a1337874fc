//! Everything a decoder reads from disk, loaded once and owned by the decoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::grammar::{ExtensionTable, KernelTable};
use crate::lexicon::{
  DescriptorInventory, PartOfSpeechTable, SequentialBigrams, TokenTagTable, VocabularyTable,
};
use crate::ngram::NgramTable;
use crate::probs::{HeadProbs, LexicalProbs, ModifierProbs, PriorProbTable, ProbCache};
use crate::sexp::SexpReader;

#[derive(Debug)]
pub struct ParserModel {
  pub kernels: Arc<KernelTable>,
  pub extensions: Arc<ExtensionTable>,
  pub prior: PriorProbTable,
  pub head: HeadProbs,
  pub premods: ModifierProbs,
  pub postmods: ModifierProbs,
  pub left_lexical: LexicalProbs,
  pub right_lexical: LexicalProbs,
  pub pos: PartOfSpeechTable,
  pub aux_pos: PartOfSpeechTable,
  pub vocabulary: VocabularyTable,
  /// Per-word score adjustments, empty unless feature-adjusted parsing is on
  pub features: NgramTable,
  pub word_probs: NgramTable,
  pub bigrams: SequentialBigrams,
  pub shortcuts: TokenTagTable,
  pub inventory: DescriptorInventory,
}

fn read_text(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Runs `load` over the whole file and insists nothing is left over
fn load_file<T>(path: &Path, load: impl FnOnce(&mut SexpReader<'_>) -> Result<T>) -> Result<T> {
  let text = read_text(path)?;
  let mut reader = SexpReader::new(path.display().to_string(), &text);
  let value = load(&mut reader)?;
  if !reader.is_done() {
    return Err(reader.error("trailing input"));
  }
  debug!(path = %path.display(), "loaded model file");
  Ok(value)
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
  let mut s = prefix.as_os_str().to_owned();
  s.push(suffix);
  PathBuf::from(s)
}

impl ParserModel {
  /// Loads `<prefix>.kernels`, `<prefix>.extensions`, `<prefix>.prior`, `<prefix>.head`,
  /// `<prefix>.pre`, `<prefix>.post`, `<prefix>.left`, `<prefix>.right`, `<prefix>.pos`
  /// and `<prefix>.voc`, plus whatever optional tables `config` names.
  pub fn load(prefix: impl AsRef<Path>, config: &DecoderConfig) -> Result<Self> {
    let prefix = prefix.as_ref();
    let file = |suffix: &str| with_suffix(prefix, suffix);

    let features = if config.feature_adjusted_parse {
      load_file(&file(".feat"), |r| NgramTable::read(r, 1))?
    } else {
      NgramTable::new(1)
    };
    let word_prob_path = file(".voc.wordprob");
    let word_probs = if word_prob_path.exists() {
      load_file(&word_prob_path, |r| NgramTable::read(r, 1))?
    } else {
      NgramTable::new(1)
    };

    let mut model = Self {
      kernels: Arc::new(load_file(&file(".kernels"), KernelTable::read)?),
      extensions: Arc::new(load_file(&file(".extensions"), ExtensionTable::read)?),
      prior: load_file(&file(".prior"), PriorProbTable::read)?,
      head: load_file(&file(".head"), HeadProbs::read)?,
      premods: load_file(&file(".pre"), ModifierProbs::read)?,
      postmods: load_file(&file(".post"), ModifierProbs::read)?,
      left_lexical: load_file(&file(".left"), LexicalProbs::read)?,
      right_lexical: load_file(&file(".right"), LexicalProbs::read)?,
      pos: load_file(&file(".pos"), PartOfSpeechTable::read)?,
      vocabulary: load_file(&file(".voc"), VocabularyTable::read)?,
      aux_pos: match &config.aux_pos_table {
        Some(path) => load_file(path, PartOfSpeechTable::read)?,
        None => PartOfSpeechTable::default(),
      },
      bigrams: match &config.bigrams {
        Some(path) => load_file(path, SequentialBigrams::read)?,
        None => SequentialBigrams::default(),
      },
      shortcuts: match &config.shortcuts {
        Some(path) => load_file(path, TokenTagTable::read)?,
        None => TokenTagTable::default(),
      },
      inventory: match &config.inventory {
        Some(path) => DescriptorInventory::parse(&read_text(path)?),
        None => DescriptorInventory::default(),
      },
      features,
      word_probs,
    };
    model.apply_cache_settings(config);
    Ok(model)
  }

  /// Gives every probability table a fresh cache of the configured kind
  pub fn apply_cache_settings(&mut self, config: &DecoderConfig) {
    let cache = || ProbCache::new(config.cache_type, config.cache_max_entries);
    self.head.set_cache(cache());
    self.premods.set_cache(cache());
    self.postmods.set_cache(cache());
    self.left_lexical.set_cache(cache());
    self.right_lexical.set_cache(cache());
  }

  pub fn clear_caches(&mut self) {
    self.head.cache_mut().clear();
    self.premods.cache_mut().clear();
    self.postmods.cache_mut().clear();
    self.left_lexical.cache_mut().clear();
    self.right_lexical.cache_mut().clear();
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  //! The toy English model under `tests/data`, parsed from strings

  use super::*;

  pub const KERNELS: &str = include_str!("../tests/data/toy.kernels");
  pub const EXTENSIONS: &str = include_str!("../tests/data/toy.extensions");
  pub const PRIOR: &str = include_str!("../tests/data/toy.prior");
  pub const HEAD: &str = include_str!("../tests/data/toy.head");
  pub const PRE: &str = include_str!("../tests/data/toy.pre");
  pub const POST: &str = include_str!("../tests/data/toy.post");
  pub const LEFT: &str = include_str!("../tests/data/toy.left");
  pub const RIGHT: &str = include_str!("../tests/data/toy.right");
  pub const POS: &str = include_str!("../tests/data/toy.pos");
  pub const VOC: &str = include_str!("../tests/data/toy.voc");

  pub fn toy_model() -> ParserModel {
    ParserModel {
      kernels: Arc::new(KernelTable::parse("toy.kernels", KERNELS).unwrap()),
      extensions: Arc::new(ExtensionTable::parse("toy.extensions", EXTENSIONS).unwrap()),
      prior: PriorProbTable::parse("toy.prior", PRIOR).unwrap(),
      head: HeadProbs::parse("toy.head", HEAD).unwrap(),
      premods: ModifierProbs::parse("toy.pre", PRE).unwrap(),
      postmods: ModifierProbs::parse("toy.post", POST).unwrap(),
      left_lexical: LexicalProbs::parse("toy.left", LEFT).unwrap(),
      right_lexical: LexicalProbs::parse("toy.right", RIGHT).unwrap(),
      pos: PartOfSpeechTable::parse("toy.pos", POS).unwrap(),
      aux_pos: PartOfSpeechTable::default(),
      vocabulary: VocabularyTable::parse("toy.voc", VOC).unwrap(),
      features: NgramTable::new(1),
      word_probs: NgramTable::new(1),
      bigrams: SequentialBigrams::default(),
      shortcuts: TokenTagTable::default(),
      inventory: DescriptorInventory::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loads_toy_model_from_disk() {
    let prefix = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/toy");
    let model = ParserModel::load(prefix, &DecoderConfig::default()).unwrap();
    assert!(!model.kernels.is_empty());
    assert!(model.vocabulary.contains("John".into()));
    assert!(model.features.is_empty());
  }

  #[test]
  fn missing_file_names_the_path() {
    let err = ParserModel::load("/nonexistent/model", &DecoderConfig::default()).unwrap_err();
    match err {
      Error::Io { path, .. } => assert!(path.ends_with("model.kernels")),
      other => panic!("unexpected error {}", other),
    }
  }
}
