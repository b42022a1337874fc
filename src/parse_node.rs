use std::fmt;

use crate::symbol::Symbol;

/// A node of a decoded tree. Leaves hold words and have no head; every other node has a
/// head child plus modifiers on either side, each list ordered from the head outwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
  pub label: Symbol,
  pub head: Option<Box<ParseNode>>,
  /// Left modifiers, nearest the head first
  pub premods: Vec<ParseNode>,
  /// Right modifiers, nearest the head first
  pub postmods: Vec<ParseNode>,
  /// First token covered, inclusive
  pub start: usize,
  /// Last token covered, inclusive
  pub end: usize,
  pub is_name: bool,
}

impl ParseNode {
  pub fn new(label: Symbol, start: usize, end: usize) -> Self {
    Self {
      label,
      head: None,
      premods: Vec::new(),
      postmods: Vec::new(),
      start,
      end,
      is_name: false,
    }
  }

  pub fn leaf(word: Symbol, index: usize) -> Self {
    Self::new(word, index, index)
  }

  /// A node whose only child is `head`, covering the same tokens
  pub fn with_head(label: Symbol, head: ParseNode) -> Self {
    let mut node = Self::new(label, head.start, head.end);
    node.head = Some(Box::new(head));
    node
  }

  /// `(tag word)`
  pub fn preterminal(tag: Symbol, word: Symbol, index: usize) -> Self {
    Self::with_head(tag, Self::leaf(word, index))
  }

  pub fn is_leaf(&self) -> bool {
    self.head.is_none()
  }

  /// A node directly above a single leaf
  pub fn is_preterminal(&self) -> bool {
    self.premods.is_empty()
      && self.postmods.is_empty()
      && self.head.as_ref().is_some_and(|h| h.is_leaf())
  }

  /// Children in surface order
  pub fn children(&self) -> impl Iterator<Item = &ParseNode> {
    self
      .premods
      .iter()
      .rev()
      .chain(self.head.as_deref())
      .chain(self.postmods.iter())
  }

  /// Words at the leaves, left to right
  pub fn leaves(&self) -> Vec<Symbol> {
    let mut out = Vec::new();
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      if node.is_leaf() {
        out.push(node.label);
      } else {
        let before = stack.len();
        stack.extend(node.children());
        stack[before..].reverse();
      }
    }
    out
  }

  /// Number of nodes on the longest path from here to a leaf, counting both ends
  pub fn depth(&self) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(self, 1)];
    while let Some((node, depth)) = stack.pop() {
      deepest = deepest.max(depth);
      stack.extend(node.children().map(|c| (c, depth + 1)));
    }
    deepest
  }

  pub fn node_count(&self) -> usize {
    let mut count = 0;
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      count += 1;
      stack.extend(node.children());
    }
    count
  }
}

enum Step<'a> {
  Open(&'a ParseNode, bool),
  Close,
}

/// Bracketed form, e.g. `(S (NPA (NNP John)) (VP (VBD left)) (. .))`
impl fmt::Display for ParseNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut stack = vec![Step::Open(self, false)];
    while let Some(step) = stack.pop() {
      match step {
        Step::Close => write!(f, ")")?,
        Step::Open(node, spaced) => {
          if spaced {
            write!(f, " ")?;
          }
          if node.is_leaf() {
            write!(f, "{}", node.label)?;
            continue;
          }
          write!(f, "({}", node.label)?;
          stack.push(Step::Close);
          let before = stack.len();
          stack.extend(node.children().map(|c| Step::Open(c, true)));
          stack[before..].reverse();
        }
      }
    }
    Ok(())
  }
}
