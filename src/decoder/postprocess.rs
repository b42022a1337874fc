use std::mem;

use tracing::debug;

use crate::parse_node::ParseNode;

use super::ChartDecoder;

impl ChartDecoder {
  /// Puts the sentence's words back on the leaves, in surface order. The chart only saw
  /// feature classes for unknown words.
  pub(crate) fn replace_words(&self, tree: &mut ParseNode) {
    let mut pos = 0;
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
      if node.is_leaf() {
        match self.sentence.get(pos) {
          Some(&word) => node.label = self.language.leaf_symbol(word),
          None => debug!(pos, label = %node.label, "more leaves than words"),
        }
        pos += 1;
        continue;
      }
      if pos == 0 && self.should_relabel_as_name(node) {
        node.label = self.language.name_label();
      }

      let ParseNode {
        head,
        premods,
        postmods,
        ..
      } = node;
      stack.extend(postmods.iter_mut().rev());
      if let Some(head) = head {
        stack.push(head.as_mut());
      }
      stack.extend(premods.iter_mut());
    }
  }

  /// A bare core NP over an unknown first word is most likely a name that lost its
  /// capitalisation cue by starting the sentence
  fn should_relabel_as_name(&self, node: &ParseNode) -> bool {
    let lang = &self.language;
    if !lang.is_core_np_label(node.label) || node.label == lang.name_label() {
      return false;
    }
    if !node.premods.is_empty() || !node.postmods.is_empty() {
      return false;
    }
    if !node.head.as_ref().is_some_and(|h| h.is_preterminal()) {
      return false;
    }
    let Some(&word) = self.sentence.first() else {
      return false;
    };
    let vocabulary = &self.model.vocabulary;
    !vocabulary.contains(word)
      && lang.is_truly_unknown_word(word)
      && !self.config.standalone_parser
      && !vocabulary.contains(lang.leaf_symbol(word))
  }

  /// Language repairs, nested names, then optionally every NP-type label collapsed to
  /// the plain NP label
  pub(crate) fn postprocess_parse(&self, tree: &mut ParseNode, collapse_np_labels: bool) {
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
      if node.head.is_none() {
        continue;
      }
      self.language.modify_parse(node);
      self.insert_nested_name_nodes(node);
      if collapse_np_labels && self.language.is_np_type_label(node.label) {
        node.label = self.language.np_label();
      }

      let ParseNode {
        head,
        premods,
        postmods,
        ..
      } = node;
      stack.extend(premods.iter_mut());
      if let Some(head) = head {
        stack.push(head.as_mut());
      }
      stack.extend(postmods.iter_mut());
    }
  }

  /// Wraps the tokens of each nested-name constraint inside this name in a name node of
  /// their own
  fn insert_nested_name_nodes(&self, node: &mut ParseNode) {
    if !node.is_name || node.label == self.tags.list {
      return;
    }
    let name_label = self.language.name_label();
    let nested = self
      .constraints
      .iter()
      .filter(|c| c.kind == self.tags.nested_name_constraint && node.start <= c.left && node.end >= c.right);

    for c in nested {
      let Some(head_end) = node.head.as_ref().map(|h| h.head.as_ref().map_or(h.end, |w| w.end)) else {
        continue;
      };

      if c.right == head_end {
        // the nested name ends with the head word
        let Some(head) = node.head.take() else {
          continue;
        };
        let mut inner = ParseNode::with_head(name_label, *head);
        if c.left < inner.start {
          match node.premods.iter().position(|p| c.left >= p.start) {
            Some(idx) => {
              let outer = node.premods.split_off(idx + 1);
              inner.premods = mem::replace(&mut node.premods, outer);
              if let Some(first) = inner.premods.last() {
                inner.start = first.start;
              }
            }
            None => debug!(left = c.left, right = c.right, "nested name starts outside its premodifiers"),
          }
        }
        node.head = Some(Box::new(inner));
        continue;
      }

      let head_span = |p: &ParseNode| p.head.as_ref().map_or((p.start, p.end), |h| (h.start, h.end));
      let Some(last) = node.premods.iter().position(|p| c.right >= head_span(p).1) else {
        debug!(left = c.left, right = c.right, "no premodifier ends inside the nested name");
        continue;
      };
      let Some(first) = node.premods[last..]
        .iter()
        .position(|p| c.left >= head_span(p).0)
        .map(|i| last + i)
      else {
        debug!(left = c.left, right = c.right, "no premodifier starts the nested name");
        continue;
      };

      let mut drained = node.premods.drain(last..=first);
      let Some(head) = drained.next() else {
        continue;
      };
      let mut inner = ParseNode::with_head(name_label, head);
      inner.premods = drained.collect();
      if let Some(outermost) = inner.premods.last() {
        inner.start = outermost.start;
      }
      node.premods.insert(last, inner);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DecoderConfig;
  use crate::decoder::{toy_decoder, Constraint};
  use crate::symbol::symbols;

  fn name(words: &[(&str, usize)]) -> ParseNode {
    let (last, rest) = words.split_last().unwrap();
    let mut node = ParseNode::with_head("NPP".into(), ParseNode::preterminal("NNP".into(), last.0.into(), last.1));
    node.premods = rest
      .iter()
      .rev()
      .map(|&(w, i)| ParseNode::preterminal("NNP".into(), w.into(), i))
      .collect();
    node.start = words[0].1;
    node.is_name = true;
    node
  }

  #[test]
  fn unknown_first_word_becomes_a_name() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let decoded = decoder.decode(&symbols("Zorblat left ."), &[], false);
    assert_eq!(decoded.best_parse().to_string(), "(S (NPP (NNP Zorblat)) (VP (VBD left)) (. .))");
  }

  #[test]
  fn standalone_parser_keeps_core_np() {
    let config = DecoderConfig {
      standalone_parser: true,
      ..DecoderConfig::default()
    };
    let mut decoder = toy_decoder(config);
    let decoded = decoder.decode(&symbols("Zorblat left ."), &[], false);
    assert_eq!(decoded.best_parse().to_string(), "(S (NPA (NNP Zorblat)) (VP (VBD left)) (. .))");
  }

  #[test]
  fn name_constraint_builds_name_node() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let constraints = [Constraint::new(0, 1, "NPP").with_entity_type("ORG")];
    let decoded = decoder.decode(&symbols("Acme Corp left ."), &constraints, false);
    assert_eq!(
      decoded.best_parse().to_string(),
      "(S (NPA (NPP (NNP Acme) (NNP Corp))) (VP (VBD left)) (. .))"
    );
    assert_eq!(decoded.significant[decoded.best], "(0,1)");
  }

  #[test]
  fn nested_name_inside_premodifiers() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let constraints = [
      Constraint::new(0, 1, "NPP").with_entity_type("ORG"),
      Constraint::new(0, 0, "NESTED-NAME-CONSTRAINT"),
    ];
    let decoded = decoder.decode(&symbols("Acme Corp left ."), &constraints, false);
    assert_eq!(
      decoded.best_parse().to_string(),
      "(S (NPA (NPP (NPP (NNP Acme)) (NNP Corp))) (VP (VBD left)) (. .))"
    );
  }

  #[test]
  fn nested_name_ending_at_the_head() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let sentence = symbols("New York Times");
    decoder.start_sentence(&sentence, &[Constraint::new(1, 2, "NESTED-NAME-CONSTRAINT")]);
    let mut node = name(&[("New", 0), ("York", 1), ("Times", 2)]);
    decoder.insert_nested_name_nodes(&mut node);
    assert_eq!(node.to_string(), "(NPP (NNP New) (NPP (NNP York) (NNP Times)))");
    assert_eq!(node.head.as_ref().map(|h| (h.start, h.end)), Some((1, 2)));
    assert_eq!(node.leaves(), sentence);
  }

  #[test]
  fn nested_names_need_a_name_node() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("New York"), &[Constraint::new(0, 0, "NESTED-NAME-CONSTRAINT")]);
    let mut node = name(&[("New", 0), ("York", 1)]);
    node.is_name = false;
    let before = node.clone();
    decoder.insert_nested_name_nodes(&mut node);
    assert_eq!(node, before);
  }

  #[test]
  fn collapsing_np_labels() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    let decoded = decoder.decode(&symbols("Mary saw the dog ."), &[], true);
    assert_eq!(
      decoded.best_parse().to_string(),
      "(S (NP (NNP Mary)) (VP (VBD saw) (NP (NP (DT the) (NN dog)))) (. .))"
    );
  }

  #[test]
  fn leaves_use_tree_spellings() {
    let mut decoder = toy_decoder(DecoderConfig::default());
    decoder.start_sentence(&symbols("( hi )"), &[]);
    let mut tree = decoder.completely_default_parse();
    decoder.replace_words(&mut tree);
    assert_eq!(tree.to_string(), "(FRAGMENTS (FRAGMENTS -LRB-) (FRAGMENTS hi) (FRAGMENTS -RRB-))");
  }
}
