//! Token-level reader for the bracketed, count-prefixed format all model tables share.
//!
//! A table looks like
//!
//! ```text
//! 2
//! ((S VP) 0.25)
//! ((NP NN) 0.5)
//! ```
//!
//! Readers pull tokens one at a time, so a file holding several tables back to back is
//! read by handing the same `SexpReader` to each table's loader in turn.

use crate::error::{Error, Result};
use crate::symbol::Symbol;

regex_static!(TOKEN, r"^\s*(?:(\()|(\))|([^\s()]+))");

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
  Open,
  Close,
  Atom(&'a str),
}

pub struct SexpReader<'a> {
  origin: String,
  text: &'a str,
  pos: usize,
}

impl<'a> SexpReader<'a> {
  /// `origin` names the text in error messages, usually a file path
  pub fn new(origin: impl Into<String>, text: &'a str) -> Self {
    Self {
      origin: origin.into(),
      text,
      pos: 0,
    }
  }

  fn scan(&self) -> Option<(Token<'a>, usize)> {
    let rest = &self.text[self.pos..];
    let caps = TOKEN.captures(rest)?;
    let end = caps.get(0)?.end();
    let token = if caps.get(1).is_some() {
      Token::Open
    } else if caps.get(2).is_some() {
      Token::Close
    } else {
      Token::Atom(caps.get(3)?.as_str())
    };
    Some((token, end))
  }

  pub fn peek(&self) -> Option<Token<'a>> {
    self.scan().map(|(t, _)| t)
  }

  pub fn next_token(&mut self) -> Option<Token<'a>> {
    let (token, len) = self.scan()?;
    self.pos += len;
    Some(token)
  }

  /// True once only whitespace remains
  pub fn is_done(&self) -> bool {
    self.text[self.pos..].trim().is_empty()
  }

  pub fn error(&self, message: impl Into<String>) -> Error {
    Error::Format {
      origin: self.origin.clone(),
      line: self.text[..self.pos].matches('\n').count() + 1,
      message: message.into(),
    }
  }

  pub fn open(&mut self) -> Result<()> {
    match self.next_token() {
      Some(Token::Open) => Ok(()),
      other => Err(self.error(format!("expected '(', found {}", describe(other)))),
    }
  }

  pub fn close(&mut self) -> Result<()> {
    match self.next_token() {
      Some(Token::Close) => Ok(()),
      other => Err(self.error(format!("expected ')', found {}", describe(other)))),
    }
  }

  pub fn atom(&mut self) -> Result<&'a str> {
    match self.next_token() {
      Some(Token::Atom(a)) => Ok(a),
      other => Err(self.error(format!("expected an atom, found {}", describe(other)))),
    }
  }

  pub fn symbol(&mut self) -> Result<Symbol> {
    self.atom().map(Symbol::new)
  }

  pub fn float(&mut self) -> Result<f32> {
    let atom = self.atom()?;
    parse_float(atom).ok_or_else(|| self.error(format!("{:?} is not a number", atom)))
  }

  pub fn count(&mut self) -> Result<usize> {
    let atom = self.atom()?;
    atom
      .parse::<usize>()
      .map_err(|_| self.error(format!("{:?} is not a count", atom)))
  }

  /// Reads `(a b c ...)` with exactly `n` atoms
  pub fn symbols(&mut self, n: usize) -> Result<Vec<Symbol>> {
    self.open()?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
      out.push(self.symbol()?);
    }
    self.close()?;
    Ok(out)
  }
}

fn describe(token: Option<Token<'_>>) -> String {
  match token {
    None => "end of input".to_string(),
    Some(Token::Open) => "'('".to_string(),
    Some(Token::Close) => "')'".to_string(),
    Some(Token::Atom(a)) => format!("{:?}", a),
  }
}

/// Numbers in model files. `inf` stands for the largest finite score.
pub fn parse_float(s: &str) -> Option<f32> {
  if s == "inf" {
    return Some(f32::MAX);
  }
  if s.eq_ignore_ascii_case("nan") || s.to_ascii_lowercase().contains("inf") {
    return None;
  }
  s.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_nested_records() {
    let mut r = SexpReader::new("test", "1\n((a b) inf)\n");
    assert_eq!(r.count().unwrap(), 1);
    r.open().unwrap();
    assert_eq!(r.symbols(2).unwrap(), vec![Symbol::new("a"), Symbol::new("b")]);
    assert_eq!(r.float().unwrap(), f32::MAX);
    r.close().unwrap();
    assert!(r.is_done());
  }

  #[test]
  fn reports_line_of_bad_number() {
    let mut r = SexpReader::new("probs", "1\n((a) x)");
    r.count().unwrap();
    r.open().unwrap();
    r.symbols(1).unwrap();
    match r.float() {
      Err(Error::Format { origin, line, .. }) => {
        assert_eq!(origin, "probs");
        assert_eq!(line, 2);
      }
      other => panic!("expected format error, got {:?}", other),
    }
  }

  #[test]
  fn arity_mismatch_is_an_error() {
    let mut r = SexpReader::new("t", "(a b c)");
    assert!(r.symbols(2).is_err());
  }
}
