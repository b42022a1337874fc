//! Language-dependent knowledge the decoder needs: which tags are nouns, how names are
//! tagged, which punctuation blocks attachment. A decoder gets one implementation at
//! construction time.

use std::collections::HashSet;

use crate::config::DecoderCase;
use crate::parse_node::ParseNode;
use crate::symbol::Symbol;
use crate::utils::is_punctuation;

pub trait LanguageRules: Send + Sync {
  /// Punctuation that constituents may not span across
  fn is_no_cross_punctuation(&self, word: Symbol) -> bool;
  fn is_sentence_ending_punctuation(&self, word: Symbol) -> bool;
  fn is_basic_punctuation_or_conjunction(&self, tag: Symbol) -> bool;

  fn is_np_type_label(&self, label: Symbol) -> bool;
  fn is_pp_label(&self, label: Symbol) -> bool;
  fn is_np_type_pos_tag(&self, tag: Symbol) -> bool;
  fn is_noun_pos_label(&self, tag: Symbol) -> bool;
  fn is_verb_pos_label(&self, tag: Symbol) -> bool;
  fn is_adverb_pos_label(&self, tag: Symbol) -> bool;
  fn is_pronoun_pos_label(&self, tag: Symbol) -> bool;
  fn is_particle_pos_label(&self, tag: Symbol) -> bool;
  fn is_preplike_pos_label(&self, tag: Symbol) -> bool;

  fn np_label(&self) -> Symbol;
  fn core_np_label(&self) -> Symbol;
  fn proper_noun_label(&self) -> Symbol;
  fn name_label(&self) -> Symbol;
  fn date_label(&self) -> Symbol;

  fn is_core_np_label(&self, label: Symbol) -> bool {
    label == self.core_np_label()
  }

  /// Tag of a possessive marker, for languages that have one
  fn possessive_tag(&self) -> Option<Symbol> {
    None
  }

  fn is_primary_name_pos_tag(&self, tag: Symbol, entity_type: Option<Symbol>) -> bool;
  fn is_secondary_name_pos_tag(&self, tag: Symbol, entity_type: Option<Symbol>) -> bool;
  fn default_name_pos_tag(&self, entity_type: Option<Symbol>) -> Symbol;
  /// A stand-in word whose tags are borrowed by names made of unknown words
  fn default_name_word(&self, case: DecoderCase, entity_type: Option<Symbol>) -> Option<Symbol>;

  /// Spelling of `word` as it should appear as a tree leaf
  fn leaf_symbol(&self, word: Symbol) -> Symbol {
    word
  }

  fn is_known_noun(&self, _word: Symbol) -> bool {
    false
  }

  fn is_known_verb(&self, _word: Symbol) -> bool {
    false
  }

  fn is_potential_gerund(&self, _word: Symbol) -> bool {
    false
  }

  fn is_truly_unknown_word(&self, _word: Symbol) -> bool {
    true
  }

  /// Maps a tag from an upstream POS tagger to the parser's tag set
  fn convert_pos_tag(&self, tag: Symbol) -> Symbol {
    tag
  }

  /// Language-specific repairs applied to each decoded node before its children
  fn modify_parse(&self, _node: &mut ParseNode) {}
}

fn set(tags: &[&str]) -> HashSet<Symbol> {
  tags.iter().map(|t| Symbol::new(t)).collect()
}

/// Penn Treebank rules for English
#[derive(Debug, Clone)]
pub struct EnglishRules {
  no_cross: HashSet<Symbol>,
  sentence_end: HashSet<Symbol>,
  punct_or_conj: HashSet<Symbol>,
  np_labels: HashSet<Symbol>,
  np_pos: HashSet<Symbol>,
  nouns: HashSet<Symbol>,
  verbs: HashSet<Symbol>,
  adverbs: HashSet<Symbol>,
  pronouns: HashSet<Symbol>,
  primary_name: HashSet<Symbol>,
  secondary_name: HashSet<Symbol>,
  pp: Symbol,
  particle: Symbol,
  preplike: HashSet<Symbol>,
  np: Symbol,
  npa: Symbol,
  nnp: Symbol,
  npp: Symbol,
  date: Symbol,
  possessive: Symbol,
  comma: Symbol,
  known_nouns: HashSet<Symbol>,
  known_verbs: HashSet<Symbol>,
}

impl EnglishRules {
  pub fn new() -> Self {
    Self {
      no_cross: set(&[",", ";", "-", ".", "--"]),
      sentence_end: set(&[".", "?", "!"]),
      punct_or_conj: set(&[",", ":", ".", "CC"]),
      np_labels: set(&["NP", "NPA", "NPP", "NPPOS"]),
      np_pos: set(&["NN", "NNS", "NNP", "NNPS"]),
      nouns: set(&["NN", "NNS", "NNP", "NNPS"]),
      verbs: set(&["VB", "VBD", "VBG", "VBN", "VBP", "VBZ"]),
      adverbs: set(&["RB", "RBR", "RBS"]),
      pronouns: set(&["PRP", "PRP$"]),
      primary_name: set(&["NNP", "NNPS"]),
      secondary_name: set(&["NN", "NNS", "JJ"]),
      pp: Symbol::new("PP"),
      particle: Symbol::new("RP"),
      preplike: set(&["IN", "TO"]),
      np: Symbol::new("NP"),
      npa: Symbol::new("NPA"),
      nnp: Symbol::new("NNP"),
      npp: Symbol::new("NPP"),
      date: Symbol::new("DATE"),
      possessive: Symbol::new("POS"),
      comma: Symbol::new(","),
      known_nouns: HashSet::new(),
      known_verbs: HashSet::new(),
    }
  }

  /// Adds a dictionary of known nouns and verbs (lower case), used when constraining the
  /// tags of unknown capitalised words
  pub fn with_lexicon(mut self, nouns: &[&str], verbs: &[&str]) -> Self {
    self.known_nouns = set(nouns);
    self.known_verbs = set(verbs);
    self
  }
}

impl Default for EnglishRules {
  fn default() -> Self {
    Self::new()
  }
}

impl LanguageRules for EnglishRules {
  fn is_no_cross_punctuation(&self, word: Symbol) -> bool {
    self.no_cross.contains(&word)
  }

  fn is_sentence_ending_punctuation(&self, word: Symbol) -> bool {
    self.sentence_end.contains(&word)
  }

  fn is_basic_punctuation_or_conjunction(&self, tag: Symbol) -> bool {
    self.punct_or_conj.contains(&tag)
  }

  fn is_np_type_label(&self, label: Symbol) -> bool {
    self.np_labels.contains(&label)
  }

  fn is_pp_label(&self, label: Symbol) -> bool {
    label == self.pp
  }

  fn is_np_type_pos_tag(&self, tag: Symbol) -> bool {
    self.np_pos.contains(&tag)
  }

  fn is_noun_pos_label(&self, tag: Symbol) -> bool {
    self.nouns.contains(&tag)
  }

  fn is_verb_pos_label(&self, tag: Symbol) -> bool {
    self.verbs.contains(&tag)
  }

  fn is_adverb_pos_label(&self, tag: Symbol) -> bool {
    self.adverbs.contains(&tag)
  }

  fn is_pronoun_pos_label(&self, tag: Symbol) -> bool {
    self.pronouns.contains(&tag)
  }

  fn is_particle_pos_label(&self, tag: Symbol) -> bool {
    tag == self.particle
  }

  fn is_preplike_pos_label(&self, tag: Symbol) -> bool {
    self.preplike.contains(&tag)
  }

  fn np_label(&self) -> Symbol {
    self.np
  }

  fn core_np_label(&self) -> Symbol {
    self.npa
  }

  fn proper_noun_label(&self) -> Symbol {
    self.nnp
  }

  fn name_label(&self) -> Symbol {
    self.npp
  }

  fn date_label(&self) -> Symbol {
    self.date
  }

  fn possessive_tag(&self) -> Option<Symbol> {
    Some(self.possessive)
  }

  fn is_primary_name_pos_tag(&self, tag: Symbol, _entity_type: Option<Symbol>) -> bool {
    self.primary_name.contains(&tag)
  }

  fn is_secondary_name_pos_tag(&self, tag: Symbol, _entity_type: Option<Symbol>) -> bool {
    self.secondary_name.contains(&tag)
  }

  fn default_name_pos_tag(&self, _entity_type: Option<Symbol>) -> Symbol {
    self.nnp
  }

  fn default_name_word(&self, case: DecoderCase, entity_type: Option<Symbol>) -> Option<Symbol> {
    let word = match entity_type.map(Symbol::as_str) {
      Some("PER") => "John",
      Some("ORG") => "Corporation",
      Some("GPE") | Some("LOC") => "Washington",
      _ => "Smith",
    };
    Some(match case {
      DecoderCase::Upper => Symbol::new(&word.to_uppercase()),
      DecoderCase::Lower => Symbol::new(&word.to_lowercase()),
      DecoderCase::Mixed => Symbol::new(word),
    })
  }

  fn leaf_symbol(&self, word: Symbol) -> Symbol {
    match word.as_str() {
      "(" => Symbol::new("-LRB-"),
      ")" => Symbol::new("-RRB-"),
      "[" => Symbol::new("-LSB-"),
      "]" => Symbol::new("-RSB-"),
      "{" => Symbol::new("-LCB-"),
      "}" => Symbol::new("-RCB-"),
      _ => word,
    }
  }

  fn is_known_noun(&self, word: Symbol) -> bool {
    self.known_nouns.contains(&word.to_lowercase())
  }

  fn is_known_verb(&self, word: Symbol) -> bool {
    self.known_verbs.contains(&word.to_lowercase())
  }

  fn is_potential_gerund(&self, word: Symbol) -> bool {
    let w = word.as_str();
    w.len() >= 3 && w.is_char_boundary(w.len() - 3) && w[w.len() - 3..].eq_ignore_ascii_case("ing")
  }

  fn is_truly_unknown_word(&self, word: Symbol) -> bool {
    let w = word.as_str();
    let punctuation = !w.is_empty() && w.chars().all(is_punctuation);
    !punctuation && !self.is_known_noun(word) && !self.is_known_verb(word)
  }

  /// Fixes `(NPA (NPP ..) (, ,) (NPP ..))` read with the second name as head, as in
  /// "city, state": the first name becomes the head and the rest move to postmods.
  fn modify_parse(&self, node: &mut ParseNode) {
    if node.label != self.npa || node.premods.len() != 2 {
      return;
    }
    let head_is_name = node.head.as_ref().is_some_and(|h| h.label == self.npp);
    if !head_is_name || node.premods[0].label != self.comma || node.premods[1].label != self.npp {
      return;
    }

    let mut premods = std::mem::take(&mut node.premods).into_iter();
    let (Some(comma), Some(first_name), Some(old_head)) = (premods.next(), premods.next(), node.head.take())
    else {
      return;
    };
    node.head = Some(Box::new(first_name));
    let mut postmods = vec![comma, *old_head];
    postmods.append(&mut node.postmods);
    node.postmods = postmods;
  }
}
