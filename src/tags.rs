use crate::symbol::Symbol;

/// Reserved symbols the decoder and the trained model agree on
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParserTags {
  pub top_tag: Symbol,
  pub top_word: Symbol,
  pub fragments: Symbol,
  pub list: Symbol,
  pub adjacent: Symbol,
  pub exit: Symbol,
  /// Head constituent of preterminals
  pub null: Symbol,
  pub unknown: Symbol,
  pub head_constraint: Symbol,
  pub date_constraint: Symbol,
  pub nested_name_constraint: Symbol,
  pub non_left_closable: Symbol,
  pub non_right_closable: Symbol,
  pub pure_preps: Symbol,
  pub pure_adverbs: Symbol,
}

impl ParserTags {
  pub fn new() -> Self {
    Self {
      top_tag: Symbol::new("TOPTAG"),
      top_word: Symbol::new("TOPWORD"),
      fragments: Symbol::new("FRAGMENTS"),
      list: Symbol::new("LIST"),
      adjacent: Symbol::new("-ADJ-"),
      exit: Symbol::new("-EXIT-"),
      null: Symbol::new("-NULL-"),
      unknown: Symbol::new("-UNKNOWN-"),
      head_constraint: Symbol::new("HEAD-CONSTRAINT"),
      date_constraint: Symbol::new("DATE-CONSTRAINT"),
      nested_name_constraint: Symbol::new("NESTED-NAME-CONSTRAINT"),
      non_left_closable: Symbol::new("NLC"),
      non_right_closable: Symbol::new("NRC"),
      pure_preps: Symbol::new("PURE-PREPS"),
      pure_adverbs: Symbol::new("PURE-ADVERBS"),
    }
  }
}

impl Default for ParserTags {
  fn default() -> Self {
    Self::new()
  }
}
