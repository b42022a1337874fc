use std::sync::Arc;

use crate::chart::{Bridge, ChartEntry, EntryIdx, SignificantConstits};
use crate::grammar::{BranchDirection, BridgeExtension, BridgeKernel, ExtensionKey, KernelKey};
use crate::symbol::Symbol;
use crate::utils::{log_prob, LOG_OF_ZERO};

use super::{ChartDecoder, Closability};

impl ChartDecoder {
  /// Builds, scores and offers every kernel that joins `left` and `right`, with either one
  /// as the head. Both sides have to be closable.
  pub(crate) fn add_kernel_theories(&mut self, left_idx: EntryIdx, right_idx: EntryIdx, closable: Closability) {
    if !(closable.left && closable.right) {
      return;
    }
    let kernels = Arc::clone(&self.model.kernels);

    let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
    let key = KernelKey {
      direction: BranchDirection::Right,
      head_category: left.category,
      mod_category: right.category,
      mod_tag: right.head_tag,
    };
    for r in kernels.lookup(&key) {
      let k = kernels.get(r);
      let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
      let left_significant = self.oracle.is_significant(&self.arena, left, k.head_chain);
      let right_significant = self.oracle.is_significant(&self.arena, right, k.modifier_chain);
      let mut entry = ChartEntry {
        category: k.category,
        head_constituent: k.head_chain_front,
        head_word: left.head_word,
        head_tag: left.head_tag,
        head_is_significant: left.head_is_significant,
        left_edge: self.tags.adjacent,
        right_edge: k.modifier_chain_front,
        left_tag: left.head_tag,
        left_word: left.head_word,
        right_tag: right.head_tag,
        right_word: right.head_word,
        name_type: None,
        is_pp_of_significant_constit: self.language.is_pp_label(k.category) && right_significant,
        left_child: Some(left_idx),
        right_child: Some(right_idx),
        bridge: Some(Bridge::Kernel(r)),
        left_token: left.left_token,
        right_token: right.right_token,
        inside_score: 0.0,
        ranking_score: 0.0,
        left_cap_score: 0.0,
        right_cap_score: 0.0,
        significant: SignificantConstits::combine(left_significant, left, right_significant, right),
      };
      self.score_kernel(&mut entry, k);
      self.add_theory(entry);
    }

    let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
    let key = KernelKey {
      direction: BranchDirection::Left,
      head_category: right.category,
      mod_category: left.category,
      mod_tag: left.head_tag,
    };
    for r in kernels.lookup(&key) {
      let k = kernels.get(r);
      let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
      let left_significant = self.oracle.is_significant(&self.arena, left, k.modifier_chain);
      let right_significant = self.oracle.is_significant(&self.arena, right, k.head_chain);
      let mut entry = ChartEntry {
        category: k.category,
        head_constituent: k.head_chain_front,
        head_word: right.head_word,
        head_tag: right.head_tag,
        head_is_significant: right.head_is_significant,
        left_edge: k.modifier_chain_front,
        right_edge: self.tags.adjacent,
        left_tag: left.head_tag,
        left_word: left.head_word,
        right_tag: right.head_tag,
        right_word: right.head_word,
        name_type: None,
        is_pp_of_significant_constit: false,
        left_child: Some(left_idx),
        right_child: Some(right_idx),
        bridge: Some(Bridge::Kernel(r)),
        left_token: left.left_token,
        right_token: right.right_token,
        inside_score: 0.0,
        ranking_score: 0.0,
        left_cap_score: 0.0,
        right_cap_score: 0.0,
        significant: SignificantConstits::combine(left_significant, left, right_significant, right),
      };
      self.score_kernel(&mut entry, k);
      self.add_theory(entry);
    }
  }

  /// Attaches `right` as a further postmodifier of `left`, and `left` as a further
  /// premodifier of `right`, wherever an extension allows it
  pub(crate) fn add_extension_theories(&mut self, left_idx: EntryIdx, right_idx: EntryIdx, closable: Closability) {
    let extensions = Arc::clone(&self.model.extensions);

    if closable.right {
      let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
      let key = ExtensionKey {
        direction: BranchDirection::Right,
        base_category: left.category,
        base_head: left.head_constituent,
        mod_category: right.category,
        prev_edge: left.right_edge,
        mod_tag: right.head_tag,
      };
      for r in extensions.lookup(&key) {
        let ext = extensions.get(r);
        let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
        let right_significant = self.oracle.is_significant(&self.arena, right, ext.modifier_chain);
        let mut entry = ChartEntry {
          right_edge: ext.modifier_chain_front,
          right_tag: right.right_tag,
          right_word: right.right_word,
          name_type: None,
          is_pp_of_significant_constit: self.language.is_pp_label(left.category) && right_significant,
          left_child: Some(left_idx),
          right_child: Some(right_idx),
          bridge: Some(Bridge::Extension(r)),
          right_token: right.right_token,
          significant: SignificantConstits::combine(false, left, right_significant, right),
          ..left.clone()
        };
        self.score_extension(&mut entry, ext);
        self.add_theory(entry);
      }
    }

    if closable.left {
      let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
      let key = ExtensionKey {
        direction: BranchDirection::Left,
        base_category: right.category,
        base_head: right.head_constituent,
        mod_category: left.category,
        prev_edge: right.left_edge,
        mod_tag: left.head_tag,
      };
      for r in extensions.lookup(&key) {
        let ext = extensions.get(r);
        let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
        let left_significant = self.oracle.is_significant(&self.arena, left, ext.modifier_chain);
        let mut entry = ChartEntry {
          left_edge: ext.modifier_chain_front,
          left_tag: left.left_tag,
          left_word: left.left_word,
          name_type: None,
          is_pp_of_significant_constit: false,
          left_child: Some(left_idx),
          right_child: Some(right_idx),
          bridge: Some(Bridge::Extension(r)),
          left_token: left.left_token,
          significant: SignificantConstits::combine(left_significant, left, false, right),
          ..right.clone()
        };
        self.score_extension(&mut entry, ext);
        self.add_theory(entry);
      }
    }
  }

  /// `P(head chain) * P(modifier chain) * P(modifier word)`, plus both children with their
  /// caps. The ranking score adds a prior on the head so that cells with different heads
  /// compete fairly.
  fn score_kernel(&mut self, entry: &mut ChartEntry, k: &BridgeKernel) {
    let (Some(left_idx), Some(right_idx)) = (entry.left_child, entry.right_child) else {
      return;
    };
    let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
    let model = &mut self.model;

    let head = model.head.lookup(k.head_chain, entry.category, entry.head_word, entry.head_tag);
    let (modifier, modifier_probs, lexical, alt) = match k.direction {
      BranchDirection::Left => (left, &mut model.premods, &mut model.left_lexical, &model.right_lexical),
      BranchDirection::Right => (right, &mut model.postmods, &mut model.right_lexical, &model.left_lexical),
    };
    let m = modifier_probs.lookup(
      k.modifier_chain,
      modifier.head_tag,
      entry.category,
      entry.head_constituent,
      self.tags.adjacent,
      entry.head_word,
      entry.head_tag,
    );
    let l = lexical.lookup(
      alt,
      modifier.head_word,
      k.modifier_chain_front,
      modifier.head_tag,
      entry.category,
      entry.head_constituent,
      entry.head_word,
      entry.head_tag,
    );

    let attachment = head * m * l;
    if attachment == 0.0 {
      entry.inside_score = LOG_OF_ZERO;
      entry.ranking_score = LOG_OF_ZERO;
    } else {
      entry.inside_score = attachment.ln()
        + left.inside_score
        + left.left_cap_score
        + left.right_cap_score
        + right.inside_score
        + right.left_cap_score
        + right.right_cap_score;
      entry.ranking_score = if entry.head_tag == self.tags.top_tag {
        entry.inside_score + self.model.prior.lookup(entry.category, entry.head_tag)
      } else {
        entry.inside_score + self.partial_ranking_score(entry.category, entry.head_tag, entry.head_word)
      };
    }

    self.cap_left(entry);
    self.cap_right(entry);
  }

  /// `P(modifier chain) * P(modifier word)` given the previous modifier on the same side.
  /// Categories listed in the sequential bigrams condition on the previous word and tag
  /// instead of the head's.
  fn score_extension(&mut self, entry: &mut ChartEntry, ext: &BridgeExtension) {
    let (Some(left_idx), Some(right_idx)) = (entry.left_child, entry.right_child) else {
      return;
    };
    let (left, right) = (self.arena.get(left_idx), self.arena.get(right_idx));
    let model = &mut self.model;

    let (modifier, prev_edge, prev_word, prev_tag, sequential) = match ext.direction {
      BranchDirection::Left => (
        left,
        right.left_edge,
        right.left_word,
        right.left_tag,
        model.bigrams.use_left(entry.category),
      ),
      BranchDirection::Right => (
        right,
        left.right_edge,
        left.right_word,
        left.right_tag,
        model.bigrams.use_right(entry.category),
      ),
    };
    let (modifier_probs, lexical, alt) = match ext.direction {
      BranchDirection::Left => (&mut model.premods, &mut model.left_lexical, &model.right_lexical),
      BranchDirection::Right => (&mut model.postmods, &mut model.right_lexical, &model.left_lexical),
    };
    let (word, tag) = if sequential {
      (prev_word, prev_tag)
    } else {
      (entry.head_word, entry.head_tag)
    };

    let m = modifier_probs.lookup(
      ext.modifier_chain,
      modifier.head_tag,
      entry.category,
      entry.head_constituent,
      prev_edge,
      word,
      tag,
    );
    let l = lexical.lookup(
      alt,
      modifier.head_word,
      ext.modifier_chain_front,
      modifier.head_tag,
      entry.category,
      entry.head_constituent,
      word,
      tag,
    );

    let attachment = m * l;
    if attachment == 0.0 {
      entry.inside_score = LOG_OF_ZERO;
      entry.ranking_score = LOG_OF_ZERO;
    } else {
      entry.inside_score = attachment.ln()
        + left.inside_score
        + right.inside_score
        + modifier.left_cap_score
        + modifier.right_cap_score;
      entry.ranking_score = entry.inside_score
        + self.model.prior.lookup(entry.category, entry.head_tag)
        + log_prob(self.lexical_ml(entry.head_word, entry.head_tag));
    }

    // the untouched side keeps the base's cap
    match ext.direction {
      BranchDirection::Left => {
        entry.right_cap_score = right.right_cap_score;
        self.cap_left(entry);
      }
      BranchDirection::Right => {
        entry.left_cap_score = left.left_cap_score;
        self.cap_right(entry);
      }
    }
  }

  /// Probability that no more premodifiers follow
  fn cap_left(&mut self, entry: &mut ChartEntry) {
    let exit = self.tags.exit;
    let p = self.model.premods.lookup(
      exit,
      exit,
      entry.category,
      entry.head_constituent,
      entry.left_edge,
      entry.head_word,
      entry.head_tag,
    );
    entry.left_cap_score = log_prob(p);
  }

  fn cap_right(&mut self, entry: &mut ChartEntry) {
    let exit = self.tags.exit;
    let p = self.model.postmods.lookup(
      exit,
      exit,
      entry.category,
      entry.head_constituent,
      entry.right_edge,
      entry.head_word,
      entry.head_tag,
    );
    entry.right_cap_score = log_prob(p);
  }

  /// `ln P(category, tag) + ln ML(word | tag)`, memoised
  fn partial_ranking_score(&mut self, category: Symbol, tag: Symbol, word: Symbol) -> f32 {
    let key = [category, tag, word];
    if let Some(score) = self.partial_cache.get(&key) {
      return score;
    }
    let score = self.model.prior.lookup(category, tag) + log_prob(self.lexical_ml(word, tag));
    self.partial_cache.insert(&key, score);
    score
  }

  /// Maximum-likelihood P(word | tag), averaged over both lexical tables
  pub(crate) fn lexical_ml(&self, word: Symbol, tag: Symbol) -> f32 {
    0.5 * (self.model.left_lexical.lookup_ml(word, tag) + self.model.right_lexical.lookup_ml(word, tag))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DecoderConfig;
  use crate::decoder::toy_decoder;
  use crate::symbol::symbols;

  fn seeded(sentence: &str) -> ChartDecoder {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols(sentence), &[]);
    decoder.init_punctuation_upper_bound();
    decoder.init_chart(None);
    decoder
  }

  fn only(decoder: &ChartDecoder, index: usize) -> EntryIdx {
    decoder.chart.cell(index, index)[0]
  }

  #[test]
  fn kernel_builds_sentence_from_subject_and_verb() {
    let mut decoder = seeded("John left");
    let (john, left) = (only(&decoder, 0), only(&decoder, 1));
    decoder.add_kernel_theories(john, left, Closability::BOTH);

    assert_eq!(decoder.theories.len(), 1);
    let s = &decoder.theories[0];
    assert_eq!(s.category.as_str(), "S");
    assert_eq!(s.head_constituent.as_str(), "VP");
    assert_eq!(s.head_word.as_str(), "left");
    assert_eq!(s.left_edge.as_str(), "NPA");
    assert_eq!(s.right_edge, decoder.tags().adjacent);
    assert_eq!((s.left_token, s.right_token), (0, 1));

    // head .7, premod .5, lexical ML(John|NNP) .3
    let expected = (0.7f32 * 0.5 * 0.3).ln();
    assert!((s.inside_score - expected).abs() < 1e-4, "{}", s.inside_score);
    // prior(S, VBD) .4 and ML(left|VBD) .2
    let ranking = expected + 0.4f32.ln() + 0.2f32.ln();
    assert!((s.ranking_score - ranking).abs() < 1e-4);
    assert!((s.left_cap_score - 0.9f32.ln()).abs() < 1e-4);
    assert!((s.right_cap_score - 0.5f32.ln()).abs() < 1e-4);
  }

  #[test]
  fn kernels_need_both_sides_closable() {
    let mut decoder = seeded("John left");
    let (john, left) = (only(&decoder, 0), only(&decoder, 1));
    let closable = Closability {
      left: true,
      right: false,
    };
    decoder.add_kernel_theories(john, left, closable);
    assert!(decoder.theories.is_empty());
  }

  #[test]
  fn extension_attaches_final_punctuation() {
    let mut decoder = seeded("John left .");
    let (john, left) = (only(&decoder, 0), only(&decoder, 1));
    decoder.add_kernel_theories(john, left, Closability::BOTH);
    decoder.transfer_theories_to_chart(0, 1);
    let s = decoder.chart.cell(0, 1)[0];
    let period = only(&decoder, 2);

    decoder.add_extension_theories(s, period, Closability::BOTH);
    assert_eq!(decoder.theories.len(), 1);
    let ext = &decoder.theories[0];
    let base = decoder.entry(s);
    assert_eq!(ext.category, base.category);
    assert_eq!(ext.left_edge, base.left_edge);
    assert_eq!(ext.right_edge.as_str(), ".");
    assert_eq!(ext.left_cap_score, base.left_cap_score);
    assert!((ext.right_cap_score - 0.9f32.ln()).abs() < 1e-4);
    let expected = (0.4f32 * 0.9).ln() + base.inside_score;
    assert!((ext.inside_score - expected).abs() < 1e-4);
  }

  #[test]
  fn right_extension_needs_right_closable() {
    let mut decoder = seeded("John left .");
    let (john, left) = (only(&decoder, 0), only(&decoder, 1));
    decoder.add_kernel_theories(john, left, Closability::BOTH);
    decoder.transfer_theories_to_chart(0, 1);
    let s = decoder.chart.cell(0, 1)[0];
    let period = only(&decoder, 2);
    let closable = Closability {
      left: true,
      right: false,
    };
    decoder.add_extension_theories(s, period, closable);
    assert!(decoder.theories.is_empty());
  }

  #[test]
  fn partial_ranking_is_cached_when_enabled() {
    let config = DecoderConfig {
      cache_type: crate::probs::CacheType::Simple,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config);
    let (s, vbd, left) = ("S".into(), "VBD".into(), "left".into());
    let score = decoder.partial_ranking_score(s, vbd, left);
    assert!((score - (0.4f32.ln() + 0.2f32.ln())).abs() < 1e-4);
    assert_eq!(decoder.partial_cache.len(), 1);
    assert_eq!(decoder.partial_ranking_score(s, vbd, left), score);
  }
}
