use std::sync::Arc;

use tracing::{debug, warn};

use crate::chart::ChartEntry;
use crate::symbol::Symbol;
use crate::utils::log_prob;

use super::{ChartDecoder, Constraint};

/// Readings kept for a single token, however many the lexicon lists
const MAX_TAGS_PER_WORD: usize = 50;

impl ChartDecoder {
  /// Fills the diagonal, plus one cell per usable constraint. Tokens covered by a
  /// constraint get no cell of their own.
  pub(crate) fn init_chart(&mut self, pos_constraints: Option<&[Vec<Symbol>]>) {
    let length = self.sentence.len();
    let mut constrained = vec![false; length];
    self.punct_or_conj = vec![false; length];

    let constraints = self.constraints.clone();
    for c in constraints {
      if c.right >= length || c.left > c.right {
        debug!(left = c.left, right = c.right, length, "ignoring constraint outside the sentence");
        continue;
      }
      // nested names are inserted after decoding
      if c.kind == self.tags.nested_name_constraint {
        continue;
      }
      if c.kind == self.tags.head_constraint && c.left != c.right {
        continue;
      }
      constrained[c.left..=c.right].fill(true);
      self.add_constraint_entry(c);
    }

    for (index, _) in constrained.iter().enumerate().filter(|(_, c)| !**c) {
      let allowed = pos_constraints.and_then(|p| p.get(index)).map(Vec::as_slice);
      self.init_chart_word(index, index == 0, allowed);
    }
  }

  /// Feature class of an unseen word: the fine class if the lexicon knows it, else the
  /// coarse one
  fn feature_word(&self, word: Symbol, first_word: bool) -> Symbol {
    let features = self.word_features.features(word, first_word);
    if !self.model.pos.lookup(features).is_empty() {
      return features;
    }
    self.word_features.reduced_features(word, first_word)
  }

  /// Seeds the cell `(left, right)` with readings of the constraint's last word. Head
  /// and core NP constraints prefer noun tags, names prefer name tags and fall back to
  /// the tags of a stand-in name word.
  fn add_constraint_entry(&mut self, c: Constraint) {
    let lang = Arc::clone(&self.language);
    let max = self.config.max_entries_per_cell;
    let original = self.sentence[c.right];
    let (word, unknown) = if self.model.vocabulary.contains(original) {
      (original, false)
    } else {
      (self.feature_word(original, false), true)
    };
    let tags = self.model.pos.lookup(word).to_vec();

    let mut readings: Vec<(Symbol, Symbol)> = Vec::new();
    let name_type;
    if c.kind == self.tags.head_constraint || lang.is_core_np_label(c.kind) {
      readings.extend(
        tags
          .iter()
          .filter(|&&t| lang.is_np_type_pos_tag(t))
          .take(max)
          .map(|&t| (t, word)),
      );
      if readings.is_empty() {
        readings.extend(tags.iter().take(max).map(|&t| (t, word)));
      }
      name_type = (c.kind != self.tags.head_constraint).then_some(c.kind);
    } else if c.kind == self.tags.date_constraint {
      readings.extend(tags.iter().take(max).map(|&t| (t, word)));
      name_type = Some(lang.date_label());
    } else {
      let et = c.entity_type;
      readings.extend(
        tags
          .iter()
          .filter(|&&t| lang.is_primary_name_pos_tag(t, et) || (!unknown && lang.is_secondary_name_pos_tag(t, et)))
          .take(max)
          .map(|&t| (t, word)),
      );
      if readings.is_empty() {
        if let Some(stand_in) = lang.default_name_word(self.config.decoder_case, et) {
          let stand_in = self.word_features.features(stand_in, false);
          readings.extend(
            self
              .model
              .pos
              .lookup(stand_in)
              .iter()
              .filter(|&&t| lang.is_primary_name_pos_tag(t, et))
              .take(max)
              .map(|&t| (t, stand_in)),
          );
        }
      }
      if readings.is_empty() {
        // this reading has no rules to join anything, so the parse will fragment here
        readings.push((lang.default_name_pos_tag(et), word));
      }
      name_type = Some(c.kind);
    }

    let entries = readings
      .into_iter()
      .map(|(tag, word)| self.word_entry(tag, word, original, c.left, c.right, name_type, true))
      .collect::<Vec<_>>();
    let cell = entries.into_iter().map(|e| self.arena.alloc(e)).collect();
    self.chart.set_cell(c.left, c.right, cell);
  }

  /// Seeds the diagonal cell of one token with every tag the lexicon allows it.
  /// Unknown words go through their feature class, with a few ways to borrow the tags of
  /// the lower-cased word instead.
  fn init_chart_word(&mut self, index: usize, first_word: bool, allowed: Option<&[Symbol]>) {
    let lang = Arc::clone(&self.language);
    let original = self.sentence[index];
    let mut word = original;
    let mut tags: Vec<Symbol>;

    if self.model.vocabulary.contains(original) {
      tags = self.model.pos.lookup(original).to_vec();
    } else {
      let lower = original.to_lowercase();
      word = self.feature_word(original, first_word);
      tags = self.model.pos.lookup(word).to_vec();

      let mut lower_tags = Vec::new();
      let mut use_lower_word = false;
      if self.config.lower_case_for_unknown && first_word && self.model.vocabulary.contains(lower) {
        lower_tags = self.model.pos.lookup(lower).to_vec();
        use_lower_word = !lower_tags.is_empty();
      }
      if lower_tags.is_empty() {
        let aux = self.model.aux_pos.lookup(lower);
        // only trust the auxiliary table when it agrees with the model somewhere
        if aux.iter().any(|t| tags.contains(t)) {
          lower_tags = aux.to_vec();
        }
      }

      if !lower_tags.is_empty() {
        let nnp = lang.proper_noun_label();
        let recased = lower.first_char() != original.first_char();
        if recased && !lower_tags.contains(&nnp) {
          lower_tags.push(nnp);
        } else if use_lower_word {
          word = lower;
        }
        tags = lower_tags;
      } else if self.config.constrain_known_nouns_and_verbs {
        let known_noun = lang.is_known_noun(lower);
        let known_verb = lang.is_known_verb(lower);
        if known_noun && !known_verb && tags.iter().any(|&t| lang.is_noun_pos_label(t)) {
          debug!(word = %lower, "removing verb tags");
          tags.retain(|&t| !lang.is_verb_pos_label(t));
        }
        if known_verb
          && !known_noun
          && !lang.is_potential_gerund(original)
          && tags.iter().any(|&t| lang.is_verb_pos_label(t))
        {
          debug!(word = %lower, "removing noun tags");
          tags.retain(|&t| !lang.is_noun_pos_label(t));
        }
      }

      let restricted = &self.config.unknown_pos_tags;
      if !restricted.is_empty() {
        if tags.is_empty() {
          tags = restricted.clone();
        } else if tags.len() >= restricted.len() {
          tags = restricted.iter().copied().filter(|t| tags.contains(t)).collect();
        }
      }
    }

    if let Some(allowed) = allowed {
      let good = tags
        .iter()
        .copied()
        .filter(|&t| allowed.iter().any(|&a| lang.convert_pos_tag(a) == t))
        .collect::<Vec<_>>();
      // a tagger that disagrees with every reading is ignored
      if !good.is_empty() && good.len() < tags.len() {
        tags = good;
      }
    }
    tags.truncate(MAX_TAGS_PER_WORD);

    if tags.iter().any(|&t| lang.is_basic_punctuation_or_conjunction(t)) {
      self.punct_or_conj[index] = true;
    }

    let entries = if tags.is_empty() {
      warn!(word = %original, features = %word, "word reduces to a feature class never seen in training");
      vec![self.word_entry(self.tags.unknown, word, original, index, index, None, false)]
    } else {
      tags
        .iter()
        .map(|&tag| self.word_entry(tag, word, original, index, index, None, true))
        .collect()
    };
    let cell = entries.into_iter().map(|e| self.arena.alloc(e)).collect();
    self.chart.set_cell(index, index, cell);
  }

  /// A preterminal reading of `word` as `tag`. Its inside score is the word's feature
  /// adjustment; the ranking adds the prior and the lexical ML so that lone words can be
  /// compared as fragments.
  #[allow(clippy::too_many_arguments)]
  fn word_entry(
    &self,
    tag: Symbol,
    word: Symbol,
    original: Symbol,
    left: usize,
    right: usize,
    name_type: Option<Symbol>,
    set_ranking: bool,
  ) -> ChartEntry {
    let mut entry = ChartEntry::preterminal(tag, tag, word, self.tags.null, self.tags.adjacent, left, right);
    let word_score = self.model.features.lookup(&[word]);
    entry.name_type = name_type;
    entry.inside_score = word_score;
    entry.ranking_score = if set_ranking {
      self.model.prior.lookup(tag, tag) + log_prob(self.lexical_ml(word, tag)) + word_score
    } else {
      word_score
    };
    entry.head_is_significant = name_type.is_some()
      || (self.language.is_np_type_pos_tag(tag) && self.oracle.is_possible_descriptor_head_word(original));
    entry
  }
}
