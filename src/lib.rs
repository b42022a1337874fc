#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod utils;

pub mod chart;
pub mod config;
pub mod decoder;
pub mod error;
pub mod grammar;
pub mod language;
pub mod lexicon;
pub mod model;
pub mod ngram;
pub mod oracle;
pub mod parse_node;
pub mod probs;
pub mod sexp;
pub mod symbol;
pub mod tags;
pub mod word_features;

pub use crate::config::{DecoderConfig, Params};
pub use crate::decoder::{ChartDecoder, Constraint, DecodeOutcome, Decoded, FlattenReason};
pub use crate::error::{Error, Result};
pub use crate::language::{EnglishRules, LanguageRules};
pub use crate::model::ParserModel;
pub use crate::parse_node::ParseNode;
pub use crate::symbol::{symbols, Symbol};
pub use crate::utils::Err;
