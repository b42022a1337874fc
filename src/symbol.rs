use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Append-only intern table shared by the whole process
#[derive(Default)]
struct Interner {
  ids: HashMap<&'static str, u32>,
  names: Vec<&'static str>,
}

lazy_static! {
  static ref INTERNER: RwLock<Interner> = RwLock::new(Interner::default());
}

/// An interned string. Copying and comparing a symbol never touches the string itself.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl Symbol {
  pub fn new(name: &str) -> Self {
    if let Some(&id) = INTERNER
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .ids
      .get(name)
    {
      return Self(id);
    }

    let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
    // another thread may have won the race between the two locks
    if let Some(&id) = interner.ids.get(name) {
      return Self(id);
    }
    let leaked: &'static str = Box::leak(name.to_string().into_boxed_str());
    let id = interner.names.len() as u32;
    interner.names.push(leaked);
    interner.ids.insert(leaked, id);
    Self(id)
  }

  pub fn as_str(self) -> &'static str {
    INTERNER
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .names[self.0 as usize]
  }

  pub fn to_lowercase(self) -> Self {
    let s = self.as_str();
    if s.chars().any(char::is_uppercase) {
      Self::new(&s.to_lowercase())
    } else {
      self
    }
  }

  pub fn first_char(self) -> Option<char> {
    self.as_str().chars().next()
  }
}

impl From<&str> for Symbol {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl PartialOrd for Symbol {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Orders by text, so anything sorted by symbol is stable across runs
impl Ord for Symbol {
  fn cmp(&self, other: &Self) -> Ordering {
    if self.0 == other.0 {
      Ordering::Equal
    } else {
      self.as_str().cmp(other.as_str())
    }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self.as_str())
  }
}

/// Interns every word of a whitespace-separated sentence
pub fn symbols(sentence: &str) -> Vec<Symbol> {
  sentence.split_whitespace().map(Symbol::new).collect()
}
