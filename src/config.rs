//! Decoder settings and the `key: value` parameter files they are read from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::probs::CacheType;
use crate::symbol::Symbol;

regex_static!(PARAM_LINE, r"^\s*([A-Za-z0-9_.\-]+)\s*:\s*(.*?)\s*$");
regex_static!(COMMENT, r"(?:^|\s)#.*$");

/// A flat parameter file. Blank lines and `#` comments are ignored; later keys win.
#[derive(Debug, Clone, Default)]
pub struct Params {
  values: HashMap<String, String>,
}

impl Params {
  pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Self::parse(&path.display().to_string(), &text)
  }

  pub fn parse(origin: &str, text: &str) -> Result<Self> {
    let mut values = HashMap::new();
    for (i, line) in text.lines().enumerate() {
      let line = COMMENT.replace(line, "");
      if line.trim().is_empty() {
        continue;
      }
      let caps = PARAM_LINE.captures(&line).ok_or_else(|| Error::Format {
        origin: origin.to_string(),
        line: i + 1,
        message: format!("expected `key: value`, found {:?}", line.trim()),
      })?;
      values.insert(caps[1].to_string(), caps[2].to_string());
    }
    Ok(Self { values })
  }

  pub fn set(&mut self, key: &str, value: &str) {
    self.values.insert(key.to_string(), value.to_string());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
    match self.get(key) {
      None => Ok(None),
      Some(v) => v
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::param(key, format!("cannot parse {:?}", v))),
    }
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
    match self.get(key).map(str::to_ascii_lowercase).as_deref() {
      None => Ok(None),
      Some("true") | Some("yes") | Some("1") => Ok(Some(true)),
      Some("false") | Some("no") | Some("0") => Ok(Some(false)),
      Some(v) => Err(Error::param(key, format!("{:?} is not a boolean", v))),
    }
  }

  pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
    self.get_parsed(key)
  }

  pub fn get_usize(&self, key: &str) -> Result<Option<usize>> {
    self.get_parsed(key)
  }

  pub fn get_path(&self, key: &str) -> Option<PathBuf> {
    self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
  }

  /// Whitespace- or comma-separated symbols
  pub fn get_symbols(&self, key: &str) -> Vec<Symbol> {
    self
      .get(key)
      .map(|v| {
        v.split(|c: char| c.is_whitespace() || c == ',')
          .filter(|s| !s.is_empty())
          .map(Symbol::new)
          .collect()
      })
      .unwrap_or_default()
  }
}

/// Casing the model was trained on. Selects the default name word and names cache files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DecoderCase {
  Upper,
  Lower,
  #[default]
  Mixed,
}

impl DecoderCase {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Upper => "upper",
      Self::Lower => "lower",
      Self::Mixed => "mixed",
    }
  }
}

impl FromStr for DecoderCase {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "upper" => Ok(Self::Upper),
      "lower" => Ok(Self::Lower),
      "mixed" => Ok(Self::Mixed),
      other => Err(Error::param("parser_case_type", format!("unknown case {:?}", other))),
    }
  }
}

/// Guards against pathological output on long sentences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenThresholds {
  /// Sentences longer than this are checked at all
  pub long_sentence_length: usize,
  /// Below this word-bigram ratio the chart is skipped entirely
  pub min_word_bigram_ratio: f64,
  /// Tree depth / length above which the parse is flattened
  pub deep_ratio: f64,
  /// Lower depth ratio that flattens when the sentence is also punctuation-heavy
  pub deep_punct_ratio: f64,
  pub deep_punct_bigram_ratio: f64,
}

impl Default for FlattenThresholds {
  fn default() -> Self {
    Self {
      long_sentence_length: 40,
      min_word_bigram_ratio: 0.1,
      deep_ratio: 0.8,
      deep_punct_ratio: 0.7,
      deep_punct_bigram_ratio: 0.4,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
  /// Beam width: theories scoring below `best + lambda` are not committed
  pub lambda: f32,
  pub max_entries_per_cell: usize,
  pub max_parser_seconds: f64,
  /// Probability of starting a new fragment, 0 for a flat -100 penalty
  pub frag_prob: f64,
  pub cache_type: CacheType,
  pub cache_max_entries: usize,
  pub cache_dir: Option<PathBuf>,
  pub feature_adjusted_parse: bool,
  pub lower_case_for_unknown: bool,
  pub constrain_known_nouns_and_verbs: bool,
  pub unknown_pos_tags: Vec<Symbol>,
  pub shortcuts: Option<PathBuf>,
  pub bigrams: Option<PathBuf>,
  pub inventory: Option<PathBuf>,
  pub aux_pos_table: Option<PathBuf>,
  pub decoder_case: DecoderCase,
  pub fast_float_compare: bool,
  pub standalone_parser: bool,
  pub flatten: FlattenThresholds,
}

impl Default for DecoderConfig {
  fn default() -> Self {
    Self {
      lambda: -5.0,
      max_entries_per_cell: 10,
      max_parser_seconds: 6000.0,
      frag_prob: 0.0,
      cache_type: CacheType::None,
      cache_max_entries: 1000,
      cache_dir: None,
      feature_adjusted_parse: false,
      lower_case_for_unknown: false,
      constrain_known_nouns_and_verbs: false,
      unknown_pos_tags: Vec::new(),
      shortcuts: None,
      bigrams: None,
      inventory: None,
      aux_pos_table: None,
      decoder_case: DecoderCase::Mixed,
      fast_float_compare: false,
      standalone_parser: false,
      flatten: FlattenThresholds::default(),
    }
  }
}

impl DecoderConfig {
  pub fn from_params(params: &Params) -> Result<Self> {
    let d = Self::default();
    let flatten = FlattenThresholds {
      long_sentence_length: params
        .get_usize("parser_long_sentence_length")?
        .unwrap_or(d.flatten.long_sentence_length),
      min_word_bigram_ratio: params
        .get_f64("parser_min_word_bigram_ratio")?
        .unwrap_or(d.flatten.min_word_bigram_ratio),
      deep_ratio: params.get_f64("parser_deep_ratio")?.unwrap_or(d.flatten.deep_ratio),
      deep_punct_ratio: params
        .get_f64("parser_deep_punct_ratio")?
        .unwrap_or(d.flatten.deep_punct_ratio),
      deep_punct_bigram_ratio: params
        .get_f64("parser_deep_punct_bigram_ratio")?
        .unwrap_or(d.flatten.deep_punct_bigram_ratio),
    };

    let config = Self {
      lambda: params.get_f64("parser_lambda")?.map(|v| v as f32).unwrap_or(d.lambda),
      max_entries_per_cell: params
        .get_usize("parser_max_entries_per_cell")?
        .unwrap_or(d.max_entries_per_cell),
      max_parser_seconds: params
        .get_f64("max_parser_seconds")?
        .unwrap_or(d.max_parser_seconds),
      frag_prob: params.get_f64("parser_frag_prob")?.unwrap_or(d.frag_prob),
      cache_type: params.get_parsed("probs_cache_type")?.unwrap_or(d.cache_type),
      cache_max_entries: params
        .get_usize("probs_cache_max_k_entries")?
        .map(|k| k * 1000)
        .unwrap_or(d.cache_max_entries),
      cache_dir: params.get_path("probs_cache_dir"),
      feature_adjusted_parse: params
        .get_bool("feature_adjusted_parse")?
        .unwrap_or(d.feature_adjusted_parse),
      lower_case_for_unknown: params
        .get_bool("lower_case_for_unknown")?
        .unwrap_or(d.lower_case_for_unknown),
      constrain_known_nouns_and_verbs: params
        .get_bool("constrain_known_nouns_and_verbs")?
        .unwrap_or(d.constrain_known_nouns_and_verbs),
      unknown_pos_tags: params.get_symbols("unknown_pos_tags"),
      shortcuts: params.get_path("parser_shortcuts"),
      bigrams: params.get_path("bigrams"),
      inventory: params.get_path("inventory"),
      aux_pos_table: params.get_path("aux_pos_table"),
      decoder_case: params.get_parsed("parser_case_type")?.unwrap_or(d.decoder_case),
      fast_float_compare: params
        .get_bool("parser_fast_float_compare")?
        .unwrap_or(d.fast_float_compare),
      standalone_parser: params.get_bool("standalone_parser")?.unwrap_or(d.standalone_parser),
      flatten,
    };

    if config.max_entries_per_cell == 0 {
      return Err(Error::param("parser_max_entries_per_cell", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&config.frag_prob) {
      return Err(Error::param("parser_frag_prob", "must be a probability"));
    }
    Ok(config)
  }

  pub fn time_budget(&self) -> Duration {
    Duration::try_from_secs_f64(self.max_parser_seconds).unwrap_or(Duration::MAX)
  }
}
