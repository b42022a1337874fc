//! The CYK chart decoder.
//!
//! Cells are filled bottom up, span by span. Every pair of adjoining entries is offered to
//! the kernel and extension tables, the resulting theories are scored, and the best few of
//! each cell survive a beam. The decoder never fails on a sentence: when the chart cannot
//! be completed it falls back to fragments, and when time runs out to a flat parse.

mod postprocess;
mod recover;
mod scoring;
mod seed;

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::chart::{Chart, ChartDisplay, ChartEntry, EntryArena, EntryIdx};
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::language::LanguageRules;
use crate::model::ParserModel;
use crate::ngram::NgramTable;
use crate::oracle::{CompositeOracle, SignificantConstitOracle};
use crate::parse_node::ParseNode;
use crate::probs::ProbCache;
use crate::symbol::Symbol;
use crate::tags::ParserTags;
use crate::utils::{is_punctuation, score_cmp, LOG_OF_ZERO};
use crate::word_features::{BasicWordFeatures, WordFeatures};

/// A span of tokens (inclusive) the parse has to respect, usually a name found upstream
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Constraint {
  pub left: usize,
  pub right: usize,
  /// A name label, or one of the reserved constraint kinds in [`ParserTags`]
  pub kind: Symbol,
  pub entity_type: Option<Symbol>,
}

impl Constraint {
  pub fn new(left: usize, right: usize, kind: impl Into<Symbol>) -> Self {
    Self {
      left,
      right,
      kind: kind.into(),
      entity_type: None,
    }
  }

  pub fn with_entity_type(mut self, entity_type: impl Into<Symbol>) -> Self {
    self.entity_type = Some(entity_type.into());
    self
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlattenReason {
  /// Long sentence with hardly any adjacent word pairs
  MostlyPunctuation,
  /// Tree depth too close to the sentence length
  TooDeep,
  DeepAndPunctuated,
}

/// How the returned parses were obtained
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
  Parsed,
  Fragmented,
  Default,
  SingleToken,
  Flattened(FlattenReason),
  TimedOut,
}

/// Result of decoding one sentence. `parses` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
  pub parses: Vec<ParseNode>,
  /// Ranking score of each parse
  pub scores: Vec<f32>,
  /// Significant constituents of each parse, as `(l,r)` spans
  pub significant: Vec<String>,
  /// Index of the parse with the highest inside score
  pub best: usize,
  pub outcome: DecodeOutcome,
}

impl Decoded {
  fn single(tree: ParseNode, outcome: DecodeOutcome) -> Self {
    Self {
      parses: vec![tree],
      scores: vec![0.0],
      significant: vec![String::new()],
      best: 0,
      outcome,
    }
  }

  pub fn best_parse(&self) -> &ParseNode {
    &self.parses[self.best]
  }

  pub fn best_score(&self) -> f32 {
    self.scores[self.best]
  }
}

/// Whether the two halves of a split may be closed off as complete constituents
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Closability {
  pub left: bool,
  pub right: bool,
}

impl Closability {
  pub const BOTH: Self = Self {
    left: true,
    right: true,
  };
}

/// Cache files written by [`ChartDecoder::write_caches`]: table name and key length
const CACHE_FILES: [(&str, usize); 5] = [("head", 4), ("pre", 7), ("post", 7), ("left", 7), ("right", 7)];

pub struct ChartDecoder {
  model: ParserModel,
  config: DecoderConfig,
  tags: ParserTags,
  language: Arc<dyn LanguageRules>,
  word_features: Box<dyn WordFeatures>,
  oracle: Box<dyn SignificantConstitOracle>,
  /// prior + lexical ML part of kernel ranking scores, keyed by (category, tag, word)
  partial_cache: ProbCache,

  arena: EntryArena,
  chart: Chart,
  /// Theories for the cell being filled
  theories: Vec<ChartEntry>,
  sentence: Vec<Symbol>,
  constraints: Vec<Constraint>,
  /// For each token, the index of the next no-cross punctuation mark (or the length)
  upper_bound: Vec<usize>,
  punct_or_conj: Vec<bool>,
  non_left_closable: Vec<bool>,
  non_right_closable: Vec<bool>,
  started: Instant,
}

impl ChartDecoder {
  /// A decoder with the basic word features and the composite significance oracle
  pub fn new(model: ParserModel, config: DecoderConfig, language: Arc<dyn LanguageRules>) -> Self {
    let oracle = CompositeOracle::new(
      Arc::clone(&language),
      model.inventory.clone(),
      Arc::clone(&model.kernels),
      Arc::clone(&model.extensions),
    );
    debug!(
      lambda = config.lambda,
      max_entries_per_cell = config.max_entries_per_cell,
      max_parser_seconds = config.max_parser_seconds,
      frag_prob = config.frag_prob,
      cache = %config.cache_type,
      kernels = model.kernels.len(),
      extensions = model.extensions.len(),
      "chart decoder ready"
    );

    Self {
      partial_cache: ProbCache::new(config.cache_type, config.cache_max_entries),
      model,
      config,
      tags: ParserTags::new(),
      language,
      word_features: Box::new(BasicWordFeatures),
      oracle: Box::new(oracle),
      arena: EntryArena::default(),
      chart: Chart::default(),
      theories: Vec::new(),
      sentence: Vec::new(),
      constraints: Vec::new(),
      upper_bound: Vec::new(),
      punct_or_conj: Vec::new(),
      non_left_closable: Vec::new(),
      non_right_closable: Vec::new(),
      started: Instant::now(),
    }
  }

  /// Loads the model at `prefix`, then any caches saved under the configured cache directory
  pub fn load(
    prefix: impl AsRef<Path>,
    config: DecoderConfig,
    language: Arc<dyn LanguageRules>,
  ) -> Result<Self> {
    let model = ParserModel::load(prefix, &config)?;
    let cache_dir = config.cache_dir.clone();
    let mut decoder = Self::new(model, config, language);
    if let Some(dir) = cache_dir {
      decoder.read_caches(&dir)?;
    }
    Ok(decoder)
  }

  pub fn with_word_features(mut self, features: impl WordFeatures + 'static) -> Self {
    self.word_features = Box::new(features);
    self
  }

  pub fn with_oracle(mut self, oracle: impl SignificantConstitOracle + 'static) -> Self {
    self.oracle = Box::new(oracle);
    self
  }

  pub fn model(&self) -> &ParserModel {
    &self.model
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  pub fn tags(&self) -> &ParserTags {
    &self.tags
  }

  /// Chart of the most recently decoded sentence
  pub fn chart_display(&self) -> ChartDisplay<'_> {
    self.chart.display(&self.arena)
  }

  pub fn decode(&mut self, sentence: &[Symbol], constraints: &[Constraint], collapse_np_labels: bool) -> Decoded {
    self.decode_with_pos(sentence, constraints, collapse_np_labels, None)
  }

  /// Like [`decode`](Self::decode), but each token may carry the POS tags an upstream
  /// tagger allows. A token's readings are narrowed to those tags when any of them match.
  pub fn decode_with_pos(
    &mut self,
    sentence: &[Symbol],
    constraints: &[Constraint],
    collapse_np_labels: bool,
    pos_constraints: Option<&[Vec<Symbol>]>,
  ) -> Decoded {
    self.start_sentence(sentence, constraints);
    let length = sentence.len();
    if length == 0 {
      return Decoded::single(ParseNode::new(self.tags.fragments, 0, 0), DecodeOutcome::Default);
    }
    if length == 1 {
      let tree = self.default_parse();
      return self.finish(Decoded::single(tree, DecodeOutcome::SingleToken), collapse_np_labels);
    }

    let flatten = self.config.flatten;
    let long = length > flatten.long_sentence_length;
    let bigram_ratio = if long { word_bigram_ratio(sentence) } else { 1.0 };
    if bigram_ratio < flatten.min_word_bigram_ratio {
      info!(length, bigram_ratio, "flattening long sentence that is mostly punctuation");
      let tree = self.completely_default_parse();
      let decoded = Decoded::single(tree, DecodeOutcome::Flattened(FlattenReason::MostlyPunctuation));
      return self.finish(decoded, collapse_np_labels);
    }

    self.started = Instant::now();
    let last_is_punct = self.language.is_sentence_ending_punctuation(sentence[length - 1]);
    self.init_punctuation_upper_bound();
    self.init_chart(pos_constraints);
    self.init_closability();

    if !self.fill_chart(last_is_punct) {
      let text = sentence.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(" ");
      warn!(
        sentence = %text,
        "parser timed out; returning a flat parse without descriptors or most pronouns"
      );
      let tree = self.default_parse();
      return self.finish(Decoded::single(tree, DecodeOutcome::TimedOut), collapse_np_labels);
    }

    let mut decoded = self
      .get_best_parse()
      .unwrap_or_else(|| Decoded::single(self.default_parse(), DecodeOutcome::Default));

    if long {
      let depth = decoded.parses[0].depth() as f64 / length as f64;
      let reason = if depth > flatten.deep_ratio {
        Some(FlattenReason::TooDeep)
      } else if depth > flatten.deep_punct_ratio && bigram_ratio < flatten.deep_punct_bigram_ratio {
        Some(FlattenReason::DeepAndPunctuated)
      } else {
        None
      };
      if let Some(reason) = reason {
        info!(length, depth_ratio = depth, bigram_ratio, ?reason, "flattening deep parse of long sentence");
        decoded = Decoded::single(self.completely_default_parse(), DecodeOutcome::Flattened(reason));
      }
    }

    self.finish(decoded, collapse_np_labels)
  }

  fn finish(&self, mut decoded: Decoded, collapse_np_labels: bool) -> Decoded {
    for parse in decoded.parses.iter_mut() {
      self.replace_words(parse);
      self.postprocess_parse(parse, collapse_np_labels);
    }
    decoded
  }

  fn start_sentence(&mut self, sentence: &[Symbol], constraints: &[Constraint]) {
    let length = sentence.len();
    self.arena.reset();
    self.chart.reset(length);
    self.theories.clear();
    self.sentence = sentence.to_vec();
    self.constraints = constraints.to_vec();
    self.upper_bound = vec![length; length];
    self.punct_or_conj = vec![false; length];
    self.non_left_closable = vec![false; length];
    self.non_right_closable = vec![false; length];
  }

  /// Runs the CYK loop. Returns false if the time budget ran out first.
  fn fill_chart(&mut self, last_is_punct: bool) -> bool {
    let length = self.sentence.len();
    for span in 2..=length {
      for start in 0..=(length - span) {
        if self.timed_out() {
          return false;
        }
        let end = start + span;
        self.theories.clear();

        for mid in (start + 1)..end {
          if end == length && last_is_punct && !(mid == length - 1 && start == 0) {
            continue;
          }
          if self.punctuation_crossing(start, end) {
            continue;
          }
          let closable = Closability {
            left: !self.crossing_constraint_violation(start, mid) && !self.non_left_closable[start],
            right: !self.crossing_constraint_violation(mid, end) && !self.non_right_closable[end - 1],
          };

          let lefts = self.chart.cell(start, mid - 1).to_vec();
          let rights = self.chart.cell(mid, end - 1).to_vec();
          for &left in &lefts {
            for &right in &rights {
              self.add_kernel_theories(left, right, closable);
              self.add_extension_theories(left, right, closable);
            }
          }
        }
        self.transfer_theories_to_chart(start, end - 1);
      }
    }
    true
  }

  fn timed_out(&self) -> bool {
    self.started.elapsed() >= self.config.time_budget()
  }

  /// Offers a scored theory to the cell being filled
  pub(crate) fn add_theory(&mut self, entry: ChartEntry) {
    if entry.ranking_score <= LOG_OF_ZERO {
      return;
    }
    let fast = self.config.fast_float_compare;

    let bigrams = &self.model.bigrams;
    if let Some(existing) = self.theories.iter_mut().find(|t| entry.same_theory(t, bigrams)) {
      if score_cmp(entry.ranking_score, existing.ranking_score, fast) == Ordering::Greater {
        *existing = entry;
      }
      return;
    }

    if self.theories.len() < self.config.max_entries_per_cell {
      self.theories.push(entry);
      return;
    }

    let lowest = self.theories.iter_mut().reduce(|lowest, t| {
      if score_cmp(t.ranking_score, lowest.ranking_score, fast) == Ordering::Less {
        t
      } else {
        lowest
      }
    });
    if let Some(lowest) = lowest {
      if score_cmp(entry.ranking_score, lowest.ranking_score, fast) == Ordering::Greater {
        *lowest = entry;
      }
    }
  }

  /// Commits the theories within `lambda` of the best one to cell `(start, last)`. A cell
  /// that produced no theories keeps whatever seeding put there.
  pub(crate) fn transfer_theories_to_chart(&mut self, start: usize, last: usize) {
    let fast = self.config.fast_float_compare;
    let Some(best) = self.theories.iter().map(|t| t.ranking_score).reduce(|best, s| {
      if score_cmp(s, best, fast) == Ordering::Greater { s } else { best }
    }) else {
      return;
    };

    let threshold = best + self.config.lambda;
    let capacity = self.config.max_entries_per_cell;
    let mut cell = Vec::with_capacity(self.theories.len().min(capacity));
    for theory in self.theories.drain(..) {
      if cell.len() < capacity && score_cmp(theory.ranking_score, threshold, fast) == Ordering::Greater {
        cell.push(self.arena.alloc(theory));
      }
    }
    self.chart.set_cell(start, last, cell);
  }

  fn init_punctuation_upper_bound(&mut self) {
    let length = self.sentence.len();
    self.upper_bound = vec![length; length];
    for i in (0..length.saturating_sub(1)).rev() {
      self.upper_bound[i] = if self.language.is_no_cross_punctuation(self.sentence[i + 1]) {
        i + 1
      } else {
        self.upper_bound[i + 1]
      };
    }
  }

  /// Whether the span `start..end` (exclusive) would swallow a no-cross punctuation mark
  /// without ending at a place where punctuation or a conjunction could attach
  pub(crate) fn punctuation_crossing(&self, start: usize, end: usize) -> bool {
    let length = self.sentence.len();
    let bound = self.upper_bound[start];
    if bound == length || bound + 1 >= end {
      return false;
    }
    if end == length || self.punct_or_conj[end] || self.punct_or_conj[end - 1] {
      return false;
    }
    true
  }

  /// Whether closing a constituent over `start..end` (exclusive) would cut a constraint span
  /// in two
  pub(crate) fn crossing_constraint_violation(&self, start: usize, end: usize) -> bool {
    self.constraints.iter().any(|c| {
      if start < c.left {
        c.left < end && end <= c.right
      } else if c.left < start {
        start <= c.right && c.right + 1 < end
      } else {
        false
      }
    })
  }

  /// Tokens flagged by the shortcut table may not start (NLC) or end (NRC) a constituent.
  /// With `PURE-PREPS`/`PURE-ADVERBS` set to NRC, tokens read only as prepositions or
  /// adverbs are also NRC, except particles right after a verb (or verb + pronoun).
  fn init_closability(&mut self) {
    let length = self.sentence.len();
    let lang = Arc::clone(&self.language);
    let nrc = Some(self.tags.non_right_closable);
    let nlc = Some(self.tags.non_left_closable);
    let block_preps = self.model.shortcuts.lookup(self.tags.pure_preps) == nrc;
    let block_adverbs = self.model.shortcuts.lookup(self.tags.pure_adverbs) == nrc;

    for nc in 0..length {
      let shortcut = self.model.shortcuts.lookup(self.sentence[nc]);
      if shortcut == nlc && nc > 1 && !lang.is_no_cross_punctuation(self.sentence[nc - 1]) {
        self.non_left_closable[nc] = true;
      }
      if self.upper_bound[nc] <= nc + 1 {
        continue;
      }

      let blocked = shortcut == nrc
        || (block_preps && self.diagonal_has_only(nc, |t| lang.is_preplike_pos_label(t)))
        || (block_adverbs && self.diagonal_has_only(nc, |t| lang.is_adverb_pos_label(t)));
      if !blocked {
        continue;
      }
      if self.diagonal_has(nc, |t| lang.is_particle_pos_label(t)) {
        let after_verb = nc > 0 && self.diagonal_has(nc - 1, |t| lang.is_verb_pos_label(t));
        let after_verb_pronoun = nc > 1
          && self.diagonal_has(nc - 1, |t| lang.is_pronoun_pos_label(t))
          && self.diagonal_has(nc - 2, |t| lang.is_verb_pos_label(t));
        if after_verb || after_verb_pronoun {
          continue;
        }
      }
      self.non_right_closable[nc] = true;
    }
  }

  fn diagonal_has(&self, index: usize, pred: impl Fn(Symbol) -> bool) -> bool {
    self
      .chart
      .cell(index, index)
      .iter()
      .any(|&e| pred(self.arena.get(e).head_tag))
  }

  fn diagonal_has_only(&self, index: usize, pred: impl Fn(Symbol) -> bool) -> bool {
    let cell = self.chart.cell(index, index);
    !cell.is_empty() && cell.iter().all(|&e| pred(self.arena.get(e).head_tag))
  }

  pub(crate) fn entry(&self, idx: EntryIdx) -> &ChartEntry {
    self.arena.get(idx)
  }

  /// Sum of word-probability scores, backing off to feature classes for unseen words.
  /// Used as a confidence measure alongside the parse.
  pub fn probability_of_words(&self, sentence: &[Symbol]) -> f32 {
    let table = &self.model.word_probs;
    sentence
      .iter()
      .enumerate()
      .map(|(i, &word)| {
        let score = table.lookup(&[word]);
        if score != 0.0 {
          return score;
        }
        let score = table.lookup(&[self.word_features.features(word, i == 0)]);
        if score != 0.0 {
          return score;
        }
        table.lookup(&[self.word_features.reduced_features(word, i == 0)])
      })
      .sum()
  }

  fn cache_path(&self, dir: &Path, table: &str) -> std::path::PathBuf {
    dir.join(format!("{}.{}.cache", self.config.decoder_case.as_str(), table))
  }

  /// Saves every simple probability cache under `dir`. Other cache kinds are skipped.
  pub fn write_caches(&self, dir: &Path) -> Result<()> {
    let caches = [
      self.model.head.cache(),
      self.model.premods.cache(),
      self.model.postmods.cache(),
      self.model.left_lexical.cache(),
      self.model.right_lexical.cache(),
    ];
    for ((name, n), cache) in CACHE_FILES.iter().zip(caches) {
      let Some(table) = cache.to_table(*n) else {
        continue;
      };
      let path = self.cache_path(dir, name);
      fs::write(&path, table.to_string()).map_err(|e| Error::io(&path, e))?;
      debug!(path = %path.display(), entries = table.len(), "wrote probability cache");
    }
    Ok(())
  }

  /// Preloads caches written by [`write_caches`](Self::write_caches). Missing files are
  /// skipped.
  pub fn read_caches(&mut self, dir: &Path) -> Result<()> {
    for (name, n) in CACHE_FILES {
      let path = self.cache_path(dir, name);
      if !path.exists() {
        continue;
      }
      let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
      let table = NgramTable::parse(&path.display().to_string(), &text, n)?;
      let cache = match name {
        "head" => self.model.head.cache_mut(),
        "pre" => self.model.premods.cache_mut(),
        "post" => self.model.postmods.cache_mut(),
        "left" => self.model.left_lexical.cache_mut(),
        _ => self.model.right_lexical.cache_mut(),
      };
      cache.preload(&table);
      debug!(path = %path.display(), entries = table.len(), "read probability cache");
    }
    Ok(())
  }

  /// Drops every cached probability. Bounds memory between documents.
  pub fn clear_caches(&mut self) {
    self.model.clear_caches();
    self.partial_cache.clear();
    self.theories = Vec::new();
  }
}

/// Adjacent word pairs over sentence length. A token counts as a word if it has a
/// non-punctuation character or a comma (commas suggest lists of names).
pub fn word_bigram_ratio(sentence: &[Symbol]) -> f64 {
  if sentence.is_empty() {
    return 0.0;
  }
  let mut prev_is_word = true;
  let mut bigrams = 0;
  for word in sentence {
    let is_word = word.as_str().chars().any(|c| !is_punctuation(c) || c == ',');
    if is_word && prev_is_word {
      bigrams += 1;
    }
    prev_is_word = is_word;
  }
  bigrams as f64 / sentence.len() as f64
}

#[cfg(test)]
fn toy_decoder(config: DecoderConfig) -> ChartDecoder {
  use crate::language::EnglishRules;
  use crate::model::fixtures::toy_model;

  let mut model = toy_model();
  model.apply_cache_settings(&config);
  ChartDecoder::new(model, config, Arc::new(EnglishRules::new()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::FlattenThresholds;
  use crate::symbol::symbols;

  fn decode(sentence: &str) -> Decoded {
    toy_decoder(DecoderConfig::default()).decode(&symbols(sentence), &[], false)
  }

  fn theory(decoder: &ChartDecoder, word: &str, ranking: f32) -> ChartEntry {
    let tags = decoder.tags();
    let mut e = ChartEntry::preterminal("NN".into(), "NN".into(), word.into(), tags.null, tags.adjacent, 0, 0);
    e.ranking_score = ranking;
    e
  }

  #[test]
  fn john_left() {
    let decoded = decode("John left .");
    assert_eq!(decoded.outcome, DecodeOutcome::Parsed);
    assert_eq!(decoded.best_parse().to_string(), "(S (NPA (NNP John)) (VP (VBD left)) (. .))");
  }

  #[test]
  fn transitive_sentence() {
    let decoded = decode("Mary saw the dog .");
    assert_eq!(
      decoded.best_parse().to_string(),
      "(S (NPA (NNP Mary)) (VP (VBD saw) (NP (NPA (DT the) (NN dog)))) (. .))"
    );
  }

  #[test]
  fn decoding_is_deterministic() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let sentence = symbols("Mary saw the dog .");
    let first = decoder.decode(&sentence, &[], false);
    let second = decoder.decode(&sentence, &[], false);
    assert_eq!(first, second);
  }

  #[test]
  fn every_parse_covers_every_token() {
    for text in ["John left .", "dog John", "the the the", "Zorblat saw Mary ."] {
      let sentence = symbols(text);
      let decoded = decode(text);
      for parse in &decoded.parses {
        assert_eq!(parse.leaves(), sentence, "{}", parse);
      }
    }
  }

  #[test]
  fn empty_sentence() {
    let decoded = decode("");
    assert_eq!(decoded.outcome, DecodeOutcome::Default);
    assert_eq!(decoded.best_parse().to_string(), "(FRAGMENTS)");
  }

  fn flatten_config(flatten: FlattenThresholds) -> DecoderConfig {
    DecoderConfig {
      flatten,
      ..DecoderConfig::default()
    }
  }

  #[test]
  fn typographic_punctuation_is_not_a_word() {
    let marks = ["—", "“", "”", "…", "«", "»", "·", "¿", "¡"];
    let text = marks.iter().cycle().take(45).copied().collect::<Vec<_>>().join(" ");
    let sentence = symbols(&text);
    assert!(word_bigram_ratio(&sentence) < 0.1);
    assert_eq!(word_bigram_ratio(&symbols("John , , Mary")), 1.0);

    let decoded = toy_decoder(DecoderConfig::default()).decode(&sentence, &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Flattened(FlattenReason::MostlyPunctuation));
    assert_eq!(decoded.best_parse().leaves(), sentence);
  }

  #[test]
  fn deep_parse_of_long_sentence_is_flattened() {
    let config = flatten_config(FlattenThresholds {
      long_sentence_length: 2,
      deep_ratio: 0.5,
      ..FlattenThresholds::default()
    });
    let sentence = symbols("Mary saw the dog .");
    let decoded = toy_decoder(config).decode(&sentence, &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Flattened(FlattenReason::TooDeep));
    assert_eq!(decoded.best_parse().label.as_str(), "FRAGMENTS");
    assert_eq!(decoded.best_parse().leaves(), sentence);
  }

  #[test]
  fn deep_and_punctuated_parse_is_flattened() {
    // 4 of 5 tokens start a word bigram, under the 0.9 bar
    let thresholds = FlattenThresholds {
      long_sentence_length: 2,
      deep_ratio: 100.0,
      deep_punct_ratio: 0.5,
      deep_punct_bigram_ratio: 0.9,
      ..FlattenThresholds::default()
    };
    let decoded = toy_decoder(flatten_config(thresholds)).decode(&symbols("Mary saw the dog ."), &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Flattened(FlattenReason::DeepAndPunctuated));

    let relaxed = FlattenThresholds {
      deep_punct_bigram_ratio: 0.5,
      ..thresholds
    };
    let decoded = toy_decoder(flatten_config(relaxed)).decode(&symbols("Mary saw the dog ."), &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Parsed);
  }

  #[test]
  fn single_token_without_constraint() {
    let decoded = decode("John");
    assert_eq!(decoded.outcome, DecodeOutcome::SingleToken);
    assert_eq!(decoded.best_parse().to_string(), "(FRAGMENTS (FRAGMENTS John))");
  }

  #[test]
  fn zero_budget_times_out_to_default_parse() {
    let config = DecoderConfig {
      max_parser_seconds: 0.0,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config);
    let sentence = symbols("John left .");
    let decoded = decoder.decode(&sentence, &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::TimedOut);
    assert_eq!(decoded.best_parse().leaves(), sentence);
    assert_eq!(decoded.best_parse().label.as_str(), "FRAGMENTS");
  }

  #[test]
  fn duplicate_theory_keeps_the_better_score() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.add_theory(theory(&decoder, "dog", -4.0));
    decoder.add_theory(theory(&decoder, "dog", -2.0));
    decoder.add_theory(theory(&decoder, "dog", -3.0));
    assert_eq!(decoder.theories.len(), 1);
    assert_eq!(decoder.theories[0].ranking_score, -2.0);
  }

  #[test]
  fn impossible_theories_are_dropped() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.add_theory(theory(&decoder, "dog", LOG_OF_ZERO));
    assert!(decoder.theories.is_empty());
  }

  #[test]
  fn full_cell_replaces_its_lowest_theory() {
    let config = DecoderConfig {
      max_entries_per_cell: 2,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config);
    decoder.add_theory(theory(&decoder, "a", -3.0));
    decoder.add_theory(theory(&decoder, "b", -5.0));
    decoder.add_theory(theory(&decoder, "c", -6.0));
    decoder.add_theory(theory(&decoder, "d", -1.0));
    let mut scores = decoder.theories.iter().map(|t| t.ranking_score).collect::<Vec<_>>();
    scores.sort_by(|a, b| b.total_cmp(a));
    assert_eq!(scores, vec![-1.0, -3.0]);
  }

  #[test]
  fn beam_keeps_theories_within_lambda() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("a b"), &[]);
    decoder.add_theory(theory(&decoder, "a", -1.0));
    decoder.add_theory(theory(&decoder, "b", -3.0));
    decoder.add_theory(theory(&decoder, "c", -8.0));
    decoder.transfer_theories_to_chart(0, 1);

    let kept = decoder
      .chart
      .cell(0, 1)
      .iter()
      .map(|&i| decoder.entry(i).ranking_score)
      .collect::<Vec<_>>();
    assert_eq!(kept, vec![-1.0, -3.0]);
    assert!(decoder.theories.is_empty());
  }

  #[test]
  fn empty_buffer_leaves_cell_alone() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("a b"), &[]);
    let seeded = decoder.arena.alloc(theory(&decoder, "a", -1.0));
    decoder.chart.push(0, 1, seeded);
    decoder.transfer_theories_to_chart(0, 1);
    assert_eq!(decoder.chart.cell(0, 1), &[seeded]);
  }

  #[test]
  fn punctuation_blocks_spans() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("a b , c d e"), &[]);
    decoder.init_punctuation_upper_bound();
    assert_eq!(decoder.upper_bound, vec![2, 2, 6, 6, 6, 6]);
    // "a b , c" would cross the comma and end mid-clause
    assert!(decoder.punctuation_crossing(0, 4));
    // stopping right before the comma is fine
    assert!(!decoder.punctuation_crossing(0, 2));
    assert!(!decoder.punctuation_crossing(0, 3));
    // reaching the end of the sentence is fine
    assert!(!decoder.punctuation_crossing(0, 6));
    decoder.punct_or_conj[4] = true;
    assert!(!decoder.punctuation_crossing(0, 4));
  }

  #[test]
  fn constraint_spans_cannot_be_cut() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("a b c d e"), &[Constraint::new(1, 2, "NPP")]);
    // starts before the name and ends inside it
    assert!(decoder.crossing_constraint_violation(0, 2));
    // covers the whole name
    assert!(!decoder.crossing_constraint_violation(0, 3));
    // starts inside the name and runs past it
    assert!(decoder.crossing_constraint_violation(2, 4));
    // ends exactly with the name
    assert!(!decoder.crossing_constraint_violation(2, 3));
    assert!(!decoder.crossing_constraint_violation(3, 5));
  }

  #[test]
  fn shortcut_tokens_are_not_closable() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.model.shortcuts = crate::lexicon::TokenTagTable::parse("s", "2\n(saw NRC)\n(dog NLC)\n").unwrap();
    let sentence = symbols("Mary saw the dog .");
    decoder.start_sentence(&sentence, &[]);
    decoder.init_punctuation_upper_bound();
    decoder.init_chart(None);
    decoder.init_closability();
    assert_eq!(decoder.non_right_closable, vec![false, true, false, false, false]);
    assert_eq!(decoder.non_left_closable, vec![false, false, false, true, false]);
  }

  #[test]
  fn bigram_ratio_counts_word_pairs() {
    assert_eq!(word_bigram_ratio(&symbols("a b c d")), 1.0);
    assert_eq!(word_bigram_ratio(&symbols("- - - -")), 0.0);
    assert_eq!(word_bigram_ratio(&symbols("a , b -")), 0.75);
  }

  #[test]
  fn mostly_punctuation_is_flattened() {
    let text = vec!["-"; 45].join(" ");
    let sentence = symbols(&text);
    let decoded = decode(&text);
    assert_eq!(decoded.outcome, DecodeOutcome::Flattened(FlattenReason::MostlyPunctuation));
    assert_eq!(decoded.best_parse().leaves(), sentence);
    assert_eq!(decoded.best_parse().postmods.len(), 44);
  }

  #[test]
  fn caches_survive_a_round_trip() {
    let config = DecoderConfig {
      cache_type: crate::probs::CacheType::Simple,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config.clone());
    decoder.decode(&symbols("John left ."), &[], false);
    assert!(!decoder.model().head.cache().is_empty());

    let dir = tempfile::tempdir().unwrap();
    decoder.write_caches(dir.path()).unwrap();
    assert!(dir.path().join("mixed.head.cache").exists());

    let mut fresh = toy_decoder(config);
    fresh.read_caches(dir.path()).unwrap();
    assert_eq!(fresh.model().head.cache().len(), decoder.model().head.cache().len());

    fresh.clear_caches();
    assert!(fresh.model().head.cache().is_empty());
  }

  #[test]
  fn word_probabilities_back_off_to_features() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.model.word_probs = NgramTable::parse("wp", "2\n((John) -2)\n((:lower) -7)\n", 1).unwrap();
    let score = decoder.probability_of_words(&symbols("John blorping"));
    assert_eq!(score, -9.0);
  }
}
