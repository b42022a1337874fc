//! Turning a filled chart into trees: the best complete analyses when there are any,
//! otherwise the best sequence of fragments, otherwise something flat.

use std::cmp::Ordering;
use std::mem;

use tracing::debug;

use crate::chart::{ChartEntry, EntryIdx};
use crate::parse_node::ParseNode;
use crate::utils::{score_cmp, LOG_OF_ZERO};

use super::{ChartDecoder, Closability, DecodeOutcome, Decoded};

/// Parses scoring this far below the best one are not returned
const MULTIPLE_PARSE_WINDOW: f32 = 10.0;
/// Log penalty per extra fragment when no fragment probability is configured
const DEFAULT_FRAGMENT_PENALTY: f32 = -100.0;

impl ChartDecoder {
  /// Caps every whole-sentence entry with the TOP symbol and returns the survivors. Falls
  /// back to the best run of fragments when no entry covers the sentence.
  pub(crate) fn get_best_parse(&mut self) -> Option<Decoded> {
    let last = self.sentence.len().checked_sub(1)?;
    let whole = self.chart.cell(0, last).to_vec();
    if whole.is_empty() {
      return self.best_fragmented_parse();
    }

    let top = ChartEntry::preterminal(
      self.tags.top_tag,
      self.tags.top_tag,
      self.tags.top_word,
      self.tags.null,
      self.tags.adjacent,
      0,
      0,
    );
    let top = self.arena.alloc(top);
    self.theories.clear();
    for &entry in &whole {
      self.add_kernel_theories(top, entry, Closability::BOTH);
    }

    if self.theories.is_empty() {
      debug!(entries = whole.len(), "no sentence entry takes the TOP symbol");
      let candidates = whole.iter().map(|&i| self.arena.get(i).clone()).collect();
      self.multiple_parses(candidates, false)
    } else {
      let candidates = mem::take(&mut self.theories);
      self.multiple_parses(candidates, true)
    }
  }

  /// Keeps the best candidate for each distinct set of significant constituents, then
  /// returns every keeper whose inside score is within the window of the best.
  /// With `below_top`, candidates are TOP theories and the tree is their sentence child.
  fn multiple_parses(&self, candidates: Vec<ChartEntry>, below_top: bool) -> Option<Decoded> {
    let fast = self.config.fast_float_compare;
    let mut keep = vec![true; candidates.len()];
    for m in 0..candidates.len() {
      if !keep[m] {
        continue;
      }
      for n in (m + 1)..candidates.len() {
        if !keep[n] || candidates[m].significant != candidates[n].significant {
          continue;
        }
        if score_cmp(candidates[m].inside_score, candidates[n].inside_score, fast) == Ordering::Less {
          keep[m] = false;
          break;
        }
        keep[n] = false;
      }
    }

    let mut highest = LOG_OF_ZERO;
    let mut highest_index = None;
    for (i, c) in candidates.iter().enumerate() {
      if keep[i] && score_cmp(c.inside_score, highest, fast) == Ordering::Greater {
        highest = c.inside_score;
        highest_index = Some(i);
      }
    }
    let highest_index = highest_index?;

    let mut decoded = Decoded {
      parses: Vec::new(),
      scores: Vec::new(),
      significant: Vec::new(),
      best: 0,
      outcome: DecodeOutcome::Parsed,
    };
    let floor = highest - MULTIPLE_PARSE_WINDOW;
    for (i, c) in candidates.iter().enumerate() {
      if !keep[i] || score_cmp(c.inside_score, floor, fast) != Ordering::Greater {
        continue;
      }
      let tree = if below_top {
        match c.right_child {
          Some(child) => self.entry_tree(child),
          None => continue,
        }
      } else {
        self.tree_of(c)
      };
      if i == highest_index {
        decoded.best = decoded.parses.len();
      }
      decoded.parses.push(tree);
      decoded.scores.push(c.ranking_score);
      decoded.significant.push(c.significant.to_string());
    }
    (!decoded.parses.is_empty()).then_some(decoded)
  }

  /// Covers the sentence with the best-ranked entries of adjoining cells, paying a
  /// penalty for every fragment after the first
  fn best_fragmented_parse(&self) -> Option<Decoded> {
    let length = self.sentence.len();
    let penalty = if self.config.frag_prob > 0.0 {
      (self.config.frag_prob as f32).ln()
    } else {
      DEFAULT_FRAGMENT_PENALTY
    };

    // routes[j]: best cover of tokens 0..=j
    let mut routes: Vec<Option<(f32, ParseNode)>> = vec![None; length];
    for i in 0..length {
      let previous = match i {
        0 => None,
        _ => match &routes[i - 1] {
          Some((score, _)) => Some(*score),
          None => continue,
        },
      };
      for j in i..length {
        let Some(best) = self.best_entry(i, j) else {
          continue;
        };
        let entry = self.arena.get(best);
        let score = match previous {
          None => entry.ranking_score,
          Some(previous) => penalty + previous + entry.ranking_score,
        };
        let current = routes[j].as_ref().map_or(LOG_OF_ZERO, |(s, _)| *s);
        if score <= current {
          continue;
        }

        let tree = self.tree_of(entry);
        let fragment = if j == length - 1 {
          tree
        } else {
          let mut wrapper = ParseNode::with_head(self.tags.fragments, tree);
          wrapper.start = i;
          wrapper.end = j;
          wrapper
        };
        let route = match i {
          0 => fragment,
          _ => {
            let Some((_, before)) = &routes[i - 1] else {
              continue;
            };
            let mut route = before.clone();
            route.end = j;
            route.postmods.push(fragment);
            route
          }
        };
        routes[j] = Some((score, route));
      }
    }

    let (score, tree) = routes.pop().flatten()?;
    debug!(score, fragments = tree.postmods.len() + 1, "fragmented parse");
    Some(Decoded {
      parses: vec![tree],
      scores: vec![score],
      significant: vec![String::new()],
      best: 0,
      outcome: DecodeOutcome::Fragmented,
    })
  }

  /// Highest ranked entry of a cell. The first one wins ties.
  fn best_entry(&self, start: usize, last: usize) -> Option<EntryIdx> {
    let fast = self.config.fast_float_compare;
    self.chart.cell(start, last).iter().copied().reduce(|best, i| {
      let (a, b) = (self.arena.get(i), self.arena.get(best));
      if score_cmp(a.ranking_score, b.ranking_score, fast) == Ordering::Greater { i } else { best }
    })
  }

  /// Best entry of the smallest non-empty cell starting at `start`, with its last token
  fn smallest_fragment_from(&self, start: usize) -> Option<(usize, ParseNode)> {
    (start..self.sentence.len()).find_map(|last| self.best_entry(start, last).map(|i| (last, self.entry_tree(i))))
  }

  /// A flat parse made of the smallest fragments the chart has, left to right. One-token
  /// names get a name node of their own.
  pub(crate) fn default_parse(&self) -> ParseNode {
    let length = self.sentence.len();
    if length == 1 {
      let named = self
        .constraints
        .iter()
        .any(|c| c.kind != self.tags.head_constraint && c.left == 0 && c.right == 0);
      if named {
        let word = ParseNode::leaf(self.sentence[0], 0);
        let proper = ParseNode::with_head(self.language.proper_noun_label(), word);
        let mut name = ParseNode::with_head(self.language.name_label(), proper);
        name.is_name = true;
        return name;
      }
    }

    let Some((last, head)) = self.smallest_fragment_from(0) else {
      return self.completely_default_parse();
    };
    let mut next = last + 1;
    let mut tree = ParseNode::new(self.tags.fragments, 0, length.saturating_sub(1));
    tree.head = Some(Box::new(head));
    while next < length {
      let Some((last, fragment)) = self.smallest_fragment_from(next) else {
        debug!(token = next, "gap in the chart, falling back to a completely flat parse");
        return self.completely_default_parse();
      };
      next = last + 1;
      tree.postmods.push(fragment);
    }
    tree
  }

  /// One FRAGMENTS node per word, ignoring the chart altogether
  pub(crate) fn completely_default_parse(&self) -> ParseNode {
    let length = self.sentence.len();
    let mut tree = ParseNode::new(self.tags.fragments, 0, length.saturating_sub(1));
    let mut words = self.sentence.iter().enumerate();
    if let Some((_, &first)) = words.next() {
      tree.head = Some(Box::new(ParseNode::with_head(self.tags.fragments, ParseNode::leaf(first, 0))));
    }
    tree.postmods = words
      .map(|(j, &w)| ParseNode::with_head(self.tags.fragments, ParseNode::leaf(w, j)))
      .collect();
    tree
  }

  fn entry_tree(&self, idx: EntryIdx) -> ParseNode {
    self.tree_of(self.arena.get(idx))
  }

  fn tree_of(&self, entry: &ChartEntry) -> ParseNode {
    entry.to_parse_node(&self.arena, &self.model.kernels, &self.model.extensions)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DecoderConfig;
  use crate::decoder::{toy_decoder, Constraint};
  use crate::symbol::symbols;

  #[test]
  fn unconnected_words_become_fragments() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let decoded = decoder.decode(&symbols("dog John"), &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Fragmented);
    assert_eq!(decoded.best_parse().to_string(), "(FRAGMENTS (NN dog) (NNP John))");
    assert_eq!(decoded.significant, vec![String::new()]);
    // one penalty on top of both word rankings
    let words = (0.1f32.ln() + 0.3f32.ln()) * 2.0;
    assert!((decoded.best_score() - (words - 100.0)).abs() < 1e-3);
  }

  #[test]
  fn fragment_probability_sets_the_penalty() {
    let config = DecoderConfig {
      frag_prob: 0.5,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config);
    let decoded = decoder.decode(&symbols("dog John"), &[], false);
    let words = (0.1f32.ln() + 0.3f32.ln()) * 2.0;
    assert!((decoded.best_score() - (words + 0.5f32.ln())).abs() < 1e-3);
  }

  #[test]
  fn fragments_keep_complete_phrases_together() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let decoded = decoder.decode(&symbols("the dog John"), &[], false);
    assert_eq!(decoded.outcome, DecodeOutcome::Fragmented);
    assert_eq!(
      decoded.best_parse().to_string(),
      "(FRAGMENTS (NPA (DT the) (NN dog)) (NNP John))"
    );
  }

  #[test]
  fn one_word_name_gets_a_name_node() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let name = Constraint::new(0, 0, "NPP").with_entity_type("ORG");
    let decoded = decoder.decode(&symbols("Acme"), &[name], false);
    assert_eq!(decoded.outcome, DecodeOutcome::SingleToken);
    assert_eq!(decoded.best_parse().to_string(), "(NPP (NNP Acme))");
    assert!(decoded.best_parse().is_name);
  }

  #[test]
  fn head_constraint_does_not_make_a_name() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let head = decoder.tags().head_constraint;
    let decoded = decoder.decode(&symbols("Acme"), &[Constraint::new(0, 0, head)], false);
    assert_eq!(decoded.best_parse().to_string(), "(FRAGMENTS (FRAGMENTS Acme))");
  }

  #[test]
  fn default_parse_uses_smallest_fragments() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("the dog left"), &[]);
    decoder.init_punctuation_upper_bound();
    decoder.init_chart(None);
    assert!(decoder.fill_chart(false));

    let tree = decoder.default_parse();
    assert_eq!(tree.to_string(), "(FRAGMENTS (DT the) (NN dog) (VBD left))");
    assert_eq!((tree.start, tree.end), (0, 2));
  }

  #[test]
  fn completely_default_parse_is_flat() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("a b c"), &[]);
    let tree = decoder.completely_default_parse();
    assert_eq!(tree.to_string(), "(FRAGMENTS (FRAGMENTS a) (FRAGMENTS b) (FRAGMENTS c))");
    assert_eq!(tree.postmods[1].start, 2);
  }

  #[test]
  fn duplicates_by_significance_keep_the_best_inside() {
    let decoder = toy_decoder(DecoderConfig::default());
    let tags = *decoder.tags();
    let noun = |word: &str, inside: f32| {
      let mut e = ChartEntry::preterminal("NN".into(), "NN".into(), word.into(), tags.null, tags.adjacent, 0, 0);
      e.inside_score = inside;
      e.ranking_score = inside - 1.0;
      e
    };
    let decoded = decoder
      .multiple_parses(vec![noun("a", -5.0), noun("b", -2.0), noun("c", -3.0)], false)
      .unwrap();
    assert_eq!(decoded.parses.len(), 1);
    assert_eq!(decoded.best_parse().to_string(), "(NN b)");
    assert_eq!(decoded.best_score(), -3.0);
  }

  #[test]
  fn distinct_significance_gives_several_parses() {
    let decoder = toy_decoder(DecoderConfig::default());
    let tags = *decoder.tags();
    let noun = |word: &str, inside: f32, span: Option<usize>| {
      let mut e = ChartEntry::preterminal("NN".into(), "NN".into(), word.into(), tags.null, tags.adjacent, 0, 0);
      e.inside_score = inside;
      e.ranking_score = inside;
      if let Some(i) = span {
        let mut part = e.clone();
        part.left_token = i;
        part.right_token = i;
        e.significant = crate::chart::SignificantConstits::combine(false, &e, true, &part);
      }
      e
    };
    let candidates = vec![noun("a", -4.0, None), noun("b", -2.0, Some(0)), noun("c", -30.0, Some(1))];
    let decoded = decoder.multiple_parses(candidates, false).unwrap();
    assert_eq!(decoded.parses.len(), 2);
    assert_eq!(decoded.best, 1);
    assert_eq!(decoded.significant, vec![String::new(), "(0,0)".to_string()]);
  }
}
