use std::fs;
use std::sync::Arc;

use lexparse::probs::CacheType;
use lexparse::{symbols, ChartDecoder, Constraint, DecodeOutcome, DecoderConfig, EnglishRules, Params};

const MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/toy");

fn load(config: DecoderConfig) -> ChartDecoder {
  ChartDecoder::load(MODEL, config, Arc::new(EnglishRules::new())).unwrap()
}

fn best(decoder: &mut ChartDecoder, sentence: &str) -> String {
  decoder
    .decode(&symbols(sentence), &[], false)
    .best_parse()
    .to_string()
}

#[test]
fn parses_sentences_from_disk_model() {
  let mut decoder = load(DecoderConfig::default());
  assert_eq!(
    best(&mut decoder, "John left ."),
    "(S (NPA (NNP John)) (VP (VBD left)) (. .))"
  );
  assert_eq!(
    best(&mut decoder, "Mary saw the dog ."),
    "(S (NPA (NNP Mary)) (VP (VBD saw) (NP (NPA (DT the) (NN dog)))) (. .))"
  );
}

#[test]
fn unparseable_input_still_covers_every_word() {
  let mut decoder = load(DecoderConfig::default());
  let sentence = symbols("dog John , the");
  let decoded = decoder.decode(&sentence, &[], false);
  assert_ne!(decoded.outcome, DecodeOutcome::Parsed);
  assert_eq!(decoded.best_parse().label.as_str(), "FRAGMENTS");
  assert_eq!(decoded.best_parse().leaves(), sentence);
}

#[test]
fn name_constraints_survive_decoding() {
  let mut decoder = load(DecoderConfig::default());
  let constraints = [Constraint::new(0, 1, "NPP").with_entity_type("ORG")];
  let decoded = decoder.decode(&symbols("Acme Corp left ."), &constraints, true);
  assert_eq!(
    decoded.best_parse().to_string(),
    "(S (NP (NP (NNP Acme) (NNP Corp))) (VP (VBD left)) (. .))"
  );
}

#[test]
fn settings_come_from_a_params_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("decoder.par");
  fs::write(
    &path,
    "# toy settings\nparser_lambda: -8\nparser_max_entries_per_cell: 4\nprobs_cache_type: lru\n",
  )
  .unwrap();

  let config = DecoderConfig::from_params(&Params::read_file(&path).unwrap()).unwrap();
  assert_eq!(config.max_entries_per_cell, 4);
  assert_eq!(config.cache_type, CacheType::Lru);

  let mut decoder = load(config);
  assert_eq!(
    best(&mut decoder, "John left ."),
    "(S (NPA (NNP John)) (VP (VBD left)) (. .))"
  );
}

#[test]
fn saved_caches_are_preloaded() {
  let dir = tempfile::tempdir().unwrap();
  let config = DecoderConfig {
    cache_type: CacheType::Simple,
    ..DecoderConfig::default()
  };

  let mut decoder = load(config.clone());
  let first = decoder.decode(&symbols("Mary saw the dog ."), &[], false);
  assert!(!decoder.model().head.cache().is_empty());
  decoder.write_caches(dir.path()).unwrap();

  let written = fs::read_dir(dir.path()).unwrap().count();
  assert_eq!(written, 5);

  let reloaded = load(DecoderConfig {
    cache_dir: Some(dir.path().to_path_buf()),
    ..config
  });
  assert_eq!(
    reloaded.model().head.cache().len(),
    decoder.model().head.cache().len()
  );

  let mut reloaded = reloaded;
  let second = reloaded.decode(&symbols("Mary saw the dog ."), &[], false);
  assert_eq!(first.parses, second.parses);
}

#[test]
fn uncached_tables_write_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let mut decoder = load(DecoderConfig::default());
  decoder.decode(&symbols("John left ."), &[], false);
  decoder.write_caches(dir.path()).unwrap();
  assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
