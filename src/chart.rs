use std::fmt;

use crate::grammar::{BranchDirection, BridgeRef, ExtensionTable, KernelTable};
use crate::lexicon::SequentialBigrams;
use crate::parse_node::ParseNode;
use crate::symbol::Symbol;

/// Index type for the entry arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryIdx(pub u32);

/// The rule that built a non-preterminal entry
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Bridge {
  Kernel(BridgeRef),
  Extension(BridgeRef),
}

/// Token spans inside an entry that were judged significant, in surface order.
/// Two theories with the same list are interchangeable as far as the caller cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignificantConstits(Vec<(usize, usize)>);

impl SignificantConstits {
  pub fn new() -> Self {
    Self::default()
  }

  /// The constituents of both children, plus each child's own span when it is significant
  pub fn combine(
    left_significant: bool,
    left: &ChartEntry,
    right_significant: bool,
    right: &ChartEntry,
  ) -> Self {
    let mut spans = Vec::with_capacity(left.significant.0.len() + right.significant.0.len() + 2);
    spans.extend_from_slice(&left.significant.0);
    if left_significant {
      spans.push((left.left_token, left.right_token));
    }
    spans.extend_from_slice(&right.significant.0);
    if right_significant {
      spans.push((right.left_token, right.right_token));
    }
    Self(spans)
  }

  pub fn spans(&self) -> &[(usize, usize)] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for SignificantConstits {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (l, r) in &self.0 {
      write!(f, "({},{})", l, r)?;
    }
    Ok(())
  }
}

/// One analysis of the tokens `left_token..=right_token`
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
  pub category: Symbol,
  pub head_constituent: Symbol,
  pub head_word: Symbol,
  pub head_tag: Symbol,
  pub head_is_significant: bool,
  /// Outermost modifier label on each side, or the adjacency marker when none yet
  pub left_edge: Symbol,
  pub right_edge: Symbol,
  pub left_tag: Symbol,
  pub left_word: Symbol,
  pub right_tag: Symbol,
  pub right_word: Symbol,
  pub name_type: Option<Symbol>,
  pub is_pp_of_significant_constit: bool,
  pub left_child: Option<EntryIdx>,
  pub right_child: Option<EntryIdx>,
  pub bridge: Option<Bridge>,
  pub left_token: usize,
  pub right_token: usize,
  pub inside_score: f32,
  pub ranking_score: f32,
  pub left_cap_score: f32,
  pub right_cap_score: f32,
  pub significant: SignificantConstits,
}

impl ChartEntry {
  /// A single-word reading. Scores start at zero; the caller fills them in.
  pub fn preterminal(
    category: Symbol,
    tag: Symbol,
    word: Symbol,
    null: Symbol,
    adjacent: Symbol,
    left_token: usize,
    right_token: usize,
  ) -> Self {
    Self {
      category,
      head_constituent: null,
      head_word: word,
      head_tag: tag,
      head_is_significant: false,
      left_edge: adjacent,
      right_edge: adjacent,
      left_tag: tag,
      left_word: word,
      right_tag: tag,
      right_word: word,
      name_type: None,
      is_pp_of_significant_constit: false,
      left_child: None,
      right_child: None,
      bridge: None,
      left_token,
      right_token,
      inside_score: 0.0,
      ranking_score: 0.0,
      left_cap_score: 0.0,
      right_cap_score: 0.0,
      significant: SignificantConstits::new(),
    }
  }

  pub fn is_preterminal(&self) -> bool {
    self.bridge.is_none()
  }

  /// Equality used to collapse duplicate theories in a cell
  pub fn same_theory(&self, other: &ChartEntry, bigrams: &SequentialBigrams) -> bool {
    if self.category != other.category
      || self.head_constituent != other.head_constituent
      || self.head_word != other.head_word
      || self.head_tag != other.head_tag
      || self.left_edge != other.left_edge
      || self.right_edge != other.right_edge
      || self.name_type != other.name_type
      || self.significant != other.significant
    {
      return false;
    }
    if bigrams.use_left(self.category)
      && (self.left_word != other.left_word || self.left_tag != other.left_tag)
    {
      return false;
    }
    if bigrams.use_right(self.category)
      && (self.right_word != other.right_word || self.right_tag != other.right_tag)
    {
      return false;
    }
    true
  }

  /// Rebuilds the tree this entry stands for. Leaves carry the head word symbols the chart
  /// saw, which may be feature classes; the decoder swaps the real words back in afterwards.
  pub fn to_parse_node(
    &self,
    arena: &EntryArena,
    kernels: &KernelTable,
    extensions: &ExtensionTable,
  ) -> ParseNode {
    let children = self.left_child.zip(self.right_child);
    match (self.bridge, children) {
      (Some(Bridge::Kernel(r)), Some((l, rt))) => {
        let kernel = kernels.get(r);
        let (left, right) = (arena.get(l), arena.get(rt));
        let (head, modifier) = match kernel.direction {
          BranchDirection::Right => (left, right),
          BranchDirection::Left => (right, left),
        };
        let head_node = expand_chain(
          kernel.head_chain,
          head,
          head.to_parse_node(arena, kernels, extensions),
        );
        let mod_node = expand_chain(
          kernel.modifier_chain,
          modifier,
          modifier.to_parse_node(arena, kernels, extensions),
        );

        let mut node = ParseNode::new(self.category, self.left_token, self.right_token);
        node.head = Some(Box::new(head_node));
        match kernel.direction {
          BranchDirection::Right => node.postmods.push(mod_node),
          BranchDirection::Left => node.premods.push(mod_node),
        }
        node
      }
      (Some(Bridge::Extension(r)), Some((l, rt))) => {
        let extension = extensions.get(r);
        let (left, right) = (arena.get(l), arena.get(rt));
        let (base, modifier) = match extension.direction {
          BranchDirection::Right => (left, right),
          BranchDirection::Left => (right, left),
        };
        let mut node = base.to_parse_node(arena, kernels, extensions);
        node.start = self.left_token;
        node.end = self.right_token;
        let mod_node = expand_chain(
          extension.modifier_chain,
          modifier,
          modifier.to_parse_node(arena, kernels, extensions),
        );
        match extension.direction {
          BranchDirection::Right => node.postmods.push(mod_node),
          BranchDirection::Left => node.premods.push(mod_node),
        }
        node
      }
      _ => self.preterminal_node(),
    }
  }

  fn preterminal_node(&self) -> ParseNode {
    match self.name_type {
      Some(name_type) => {
        let mut node = ParseNode::with_head(
          name_type,
          ParseNode::preterminal(self.head_tag, self.head_word, self.right_token),
        );
        node.start = self.left_token;
        node.is_name = true;
        node.premods = (self.left_token..self.right_token)
          .rev()
          .map(|i| ParseNode::preterminal(self.head_tag, self.head_word, i))
          .collect();
        node
      }
      None => ParseNode::preterminal(self.category, self.head_word, self.left_token),
    }
  }
}

/// Wraps `node` in the unary projections named by `chain` (`A=B=C`, top first). The bottom
/// label is skipped when it is the child itself.
fn expand_chain(chain: Symbol, child: &ChartEntry, node: ParseNode) -> ParseNode {
  let labels = chain.as_str().split('=').collect::<Vec<_>>();
  let mut labels = labels.iter().rev().peekable();
  if labels
    .peek()
    .is_some_and(|l| **l == child.category.as_str() || **l == node.label.as_str())
  {
    labels.next();
  }
  labels.fold(node, |inner, label| ParseNode::with_head(Symbol::new(label), inner))
}

/// Storage for every committed entry of the current sentence. Reset between sentences
/// instead of freeing entries one by one.
#[derive(Debug, Default, Clone)]
pub struct EntryArena {
  entries: Vec<ChartEntry>,
}

impl EntryArena {
  pub fn alloc(&mut self, entry: ChartEntry) -> EntryIdx {
    let idx = EntryIdx(self.entries.len() as u32);
    self.entries.push(entry);
    idx
  }

  pub fn get(&self, idx: EntryIdx) -> &ChartEntry {
    &self.entries[idx.0 as usize]
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn reset(&mut self) {
    self.entries.clear();
  }
}

/// Cells indexed by first and last token (inclusive)
#[derive(Debug, Default, Clone)]
pub struct Chart {
  length: usize,
  cells: Vec<Vec<EntryIdx>>,
}

impl Chart {
  pub fn new(length: usize) -> Self {
    let mut chart = Self::default();
    chart.reset(length);
    chart
  }

  pub fn reset(&mut self, length: usize) {
    self.length = length;
    for cell in self.cells.iter_mut() {
      cell.clear();
    }
    self.cells.resize(length * length, Vec::new());
  }

  pub fn len(&self) -> usize {
    self.length
  }

  pub fn is_empty(&self) -> bool {
    self.length == 0
  }

  pub fn cell(&self, start: usize, last: usize) -> &[EntryIdx] {
    &self.cells[start * self.length + last]
  }

  pub fn push(&mut self, start: usize, last: usize, idx: EntryIdx) {
    self.cells[start * self.length + last].push(idx);
  }

  pub fn set_cell(&mut self, start: usize, last: usize, entries: Vec<EntryIdx>) {
    self.cells[start * self.length + last] = entries;
  }

  pub fn display<'a>(&'a self, arena: &'a EntryArena) -> ChartDisplay<'a> {
    ChartDisplay { chart: self, arena }
  }
}

pub struct ChartDisplay<'a> {
  chart: &'a Chart,
  arena: &'a EntryArena,
}

impl fmt::Display for ChartDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.chart.len();
    for span in 1..=n {
      for start in 0..=(n - span) {
        let last = start + span - 1;
        let cell = self.chart.cell(start, last);
        if cell.is_empty() {
          continue;
        }
        writeln!(f, "{}..{}:", start, last)?;
        for idx in cell {
          let e = self.arena.get(*idx);
          writeln!(
            f,
            "  {} <{} {}> inside={:.3} rank={:.3} {}",
            e.category, e.head_word, e.head_tag, e.inside_score, e.ranking_score, e.significant
          )?;
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tags::ParserTags;

  fn word(tags: &ParserTags, tag: &str, w: &str, i: usize) -> ChartEntry {
    ChartEntry::preterminal(tag.into(), tag.into(), w.into(), tags.null, tags.adjacent, i, i)
  }

  #[test]
  fn significant_spans_keep_surface_order() {
    let tags = ParserTags::new();
    let mut a = word(&tags, "NNP", "Acme", 0);
    a.significant = SignificantConstits(vec![(0, 0)]);
    let b = word(&tags, "NNP", "Corp", 1);
    let sc = SignificantConstits::combine(true, &a, true, &b);
    assert_eq!(sc.spans(), &[(0, 0), (0, 0), (1, 1)]);
    assert_eq!(sc.to_string(), "(0,0)(0,0)(1,1)");
  }

  #[test]
  fn same_theory_honours_bigrams() {
    let tags = ParserTags::new();
    let bigrams = SequentialBigrams::parse("b", "1\n(left NN)\n").unwrap();
    let a = word(&tags, "NN", "dog", 0);
    let mut b = a.clone();
    b.ranking_score = -3.0;
    assert!(a.same_theory(&b, &bigrams));
    b.left_word = "cat".into();
    assert!(!a.same_theory(&b, &bigrams));
    assert!(a.same_theory(&b, &SequentialBigrams::default()));
  }

  #[test]
  fn name_entries_expand_to_one_preterminal_per_token() {
    let tags = ParserTags::new();
    let mut e = ChartEntry::preterminal("NNP".into(), "NNP".into(), "Corp".into(), tags.null, tags.adjacent, 0, 1);
    e.name_type = Some("NPP".into());
    let node = e.to_parse_node(&EntryArena::default(), &KernelTable::default(), &ExtensionTable::default());
    assert!(node.is_name);
    assert_eq!((node.start, node.end), (0, 1));
    assert_eq!(node.to_string(), "(NPP (NNP Corp) (NNP Corp))");
  }

  #[test]
  fn chains_wrap_from_the_bottom() {
    let tags = ParserTags::new();
    let e = word(&tags, "VBD", "left", 1);
    let node = expand_chain("S=VP=VBD".into(), &e, e.preterminal_node());
    assert_eq!(node.to_string(), "(S (VP (VBD left)))");
  }

  #[test]
  fn chart_cells_reset() {
    let mut chart = Chart::new(3);
    chart.push(0, 2, EntryIdx(4));
    assert_eq!(chart.cell(0, 2), &[EntryIdx(4)]);
    chart.reset(2);
    assert!(chart.cell(0, 1).is_empty());
    assert_eq!(chart.len(), 2);
  }
}
