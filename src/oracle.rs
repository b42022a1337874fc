//! Decides which constituents are "significant": names, descriptors and the phrases that
//! contain them. Theories in a cell that agree on every significant span are collapsed
//! when the final parses are collected.

use std::sync::Arc;

use crate::chart::{Bridge, ChartEntry, EntryArena};
use crate::grammar::{BranchDirection, ExtensionTable, KernelTable};
use crate::language::LanguageRules;
use crate::lexicon::DescriptorInventory;
use crate::symbol::Symbol;

pub trait SignificantConstitOracle: Send + Sync {
  /// Whether `entry`, projected through `chain` into its parent, is significant
  fn is_significant(&self, arena: &EntryArena, entry: &ChartEntry, chain: Symbol) -> bool;

  fn is_possible_descriptor_head_word(&self, word: Symbol) -> bool;
}

/// Marks nothing. For languages without name or descriptor models.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

impl SignificantConstitOracle for NullOracle {
  fn is_significant(&self, _arena: &EntryArena, _entry: &ChartEntry, _chain: Symbol) -> bool {
    false
  }

  fn is_possible_descriptor_head_word(&self, _word: Symbol) -> bool {
    false
  }
}

/// Entries built from a name constraint
#[derive(Debug, Default, Clone, Copy)]
pub struct NameOracle;

impl NameOracle {
  pub fn is_name(&self, entry: &ChartEntry) -> bool {
    entry.name_type.is_some()
  }
}

/// Noun phrases that could describe an entity
pub struct DescriptorOracle {
  language: Arc<dyn LanguageRules>,
  inventory: DescriptorInventory,
}

impl DescriptorOracle {
  pub fn new(language: Arc<dyn LanguageRules>, inventory: DescriptorInventory) -> Self {
    Self { language, inventory }
  }

  pub fn is_possible_descriptor_head_word(&self, word: Symbol) -> bool {
    self.inventory.contains(word)
  }

  pub fn is_possible_descriptor(&self, arena: &EntryArena, entry: &ChartEntry, chain: Symbol) -> bool {
    let lang = &self.language;
    if !lang.is_np_type_label(chain_front(chain)) && !lang.is_np_type_label(entry.category) {
      return false;
    }
    if lang.is_np_type_pos_tag(entry.head_tag) && self.is_possible_descriptor_head_word(entry.head_word) {
      return true;
    }

    // possessive: the possessor is a name
    match (lang.possessive_tag(), entry.left_child) {
      (Some(pos), Some(possessor)) if entry.head_tag == pos => {
        arena.get(possessor).name_type.is_some()
      }
      _ => false,
    }
  }
}

/// Names, significant heads, noun phrases with a significant PP, and descriptors
pub struct CompositeOracle {
  language: Arc<dyn LanguageRules>,
  names: NameOracle,
  descriptors: DescriptorOracle,
  kernels: Arc<KernelTable>,
  extensions: Arc<ExtensionTable>,
}

impl CompositeOracle {
  pub fn new(
    language: Arc<dyn LanguageRules>,
    inventory: DescriptorInventory,
    kernels: Arc<KernelTable>,
    extensions: Arc<ExtensionTable>,
  ) -> Self {
    Self {
      descriptors: DescriptorOracle::new(language.clone(), inventory),
      language,
      names: NameOracle,
      kernels,
      extensions,
    }
  }

  fn direction(&self, entry: &ChartEntry) -> Option<BranchDirection> {
    match entry.bridge? {
      Bridge::Kernel(r) => Some(self.kernels.get(r).direction),
      Bridge::Extension(r) => Some(self.extensions.get(r).direction),
    }
  }

  /// Walks down through base children while modifiers attach on the right, looking for a
  /// PP whose object is significant
  fn has_significant_pp_modifier(&self, arena: &EntryArena, entry: &ChartEntry) -> bool {
    let mut current = entry;
    while let (Some(BranchDirection::Right), Some(base), Some(modifier)) =
      (self.direction(current), current.left_child, current.right_child)
    {
      if arena.get(modifier).is_pp_of_significant_constit {
        return true;
      }
      current = arena.get(base);
    }
    false
  }
}

impl SignificantConstitOracle for CompositeOracle {
  fn is_significant(&self, arena: &EntryArena, entry: &ChartEntry, chain: Symbol) -> bool {
    if self.names.is_name(entry) {
      return true;
    }
    if entry.head_is_significant && (!entry.is_preterminal() || chain != entry.head_tag) {
      return true;
    }
    if self.language.is_np_type_label(entry.category) && self.has_significant_pp_modifier(arena, entry) {
      return true;
    }
    self.descriptors.is_possible_descriptor(arena, entry, chain)
  }

  fn is_possible_descriptor_head_word(&self, word: Symbol) -> bool {
    self.descriptors.is_possible_descriptor_head_word(word)
  }
}

/// Top label of a chain such as `NP=NPA=NN`
pub fn chain_front(chain: Symbol) -> Symbol {
  match chain.as_str().split_once('=') {
    Some((front, _)) => Symbol::new(front),
    None => chain,
  }
}
