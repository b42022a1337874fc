use crate::symbol::Symbol;

/// Maps out-of-vocabulary words to feature classes the model was trained on
pub trait WordFeatures: Send + Sync {
  /// Fine-grained class: shape plus a few suffix cues
  fn features(&self, word: Symbol, first_word: bool) -> Symbol;
  /// Coarse class used when the fine one is unknown to the model
  fn reduced_features(&self, word: Symbol, first_word: bool) -> Symbol;
}

/// Orthographic classes for alphabetic languages
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicWordFeatures;

impl BasicWordFeatures {
  fn shape(word: &str, first_word: bool) -> &'static str {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
      return "empty";
    };

    if word.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') && first.is_ascii_digit() {
      "num"
    } else if word.chars().any(|c| c.is_ascii_digit()) {
      "hasdigit"
    } else if !word.chars().any(char::is_alphanumeric) {
      "punct"
    } else if word.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase) {
      "allcaps"
    } else if first.is_uppercase() {
      if first_word { "firstcap" } else { "initcap" }
    } else {
      "lower"
    }
  }

  fn suffix(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    ["ing", "ed", "ly", "ion", "er", "est", "s"]
      .into_iter()
      .find(|s| lower.len() > s.len() + 1 && lower.ends_with(s))
  }
}

impl WordFeatures for BasicWordFeatures {
  fn features(&self, word: Symbol, first_word: bool) -> Symbol {
    let w = word.as_str();
    let mut class = format!(":{}", Self::shape(w, first_word));
    if w.contains('-') {
      class.push_str("-hyph");
    }
    if let Some(suffix) = Self::suffix(w) {
      class.push('-');
      class.push_str(suffix);
    }
    Symbol::new(&class)
  }

  fn reduced_features(&self, word: Symbol, first_word: bool) -> Symbol {
    Symbol::new(&format!(":{}", Self::shape(word.as_str(), first_word)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shapes_and_suffixes() {
    let f = BasicWordFeatures;
    assert_eq!(f.features("Zorblat".into(), false).as_str(), ":initcap");
    assert_eq!(f.features("Zorblat".into(), true).as_str(), ":firstcap");
    assert_eq!(f.features("blorping".into(), false).as_str(), ":lower-ing");
    assert_eq!(f.features("IBM".into(), false).as_str(), ":allcaps");
    assert_eq!(f.features("1,200".into(), false).as_str(), ":num");
    assert_eq!(f.features("well-known".into(), false).as_str(), ":lower-hyph");
    assert_eq!(f.reduced_features("blorping".into(), false).as_str(), ":lower");
  }
}
