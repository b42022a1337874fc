use std::cmp::Ordering;
use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Score used in place of `ln(0)`. Anything at or below this is treated as impossible.
pub const LOG_OF_ZERO: f32 = -10000.0;

const FCMP_EPSILON: f64 = 0.000001;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: regex::Regex = regex::Regex::new($pattern).unwrap();
    }
  };
}

/// Natural log of a probability, with zero mapped to `LOG_OF_ZERO`
///
/// ```
/// use lexparse::utils::{log_prob, LOG_OF_ZERO};
///
/// assert_eq!(log_prob(0.0), LOG_OF_ZERO);
/// assert_eq!(log_prob(1.0), 0.0);
/// ```
pub fn log_prob(p: f32) -> f32 {
  if p <= 0.0 { LOG_OF_ZERO } else { p.ln() }
}

/// Approximate float comparison, equal when the two values are within a relative epsilon
/// of each other (scaled by the binary exponent of the larger magnitude).
///
/// ```
/// use std::cmp::Ordering;
/// use lexparse::utils::fcmp;
///
/// assert_eq!(fcmp(-12.0, -12.0000001), Ordering::Equal);
/// assert_eq!(fcmp(-12.0, -11.0), Ordering::Less);
/// assert_eq!(fcmp(3.0, 0.0), Ordering::Greater);
/// ```
pub fn fcmp(a: f32, b: f32) -> Ordering {
  let (x1, x2) = (a as f64, b as f64);
  let max = if x1.abs() > x2.abs() { x1 } else { x2 };
  let exponent = if max == 0.0 || !max.is_finite() {
    0
  } else {
    // frexp: max = m * 2^e with 0.5 <= |m| < 1
    max.abs().log2().floor() as i32 + 1
  };
  let delta = FCMP_EPSILON * 2f64.powi(exponent);
  let difference = x1 - x2;

  if difference > delta {
    Ordering::Greater
  } else if difference < -delta {
    Ordering::Less
  } else {
    Ordering::Equal
  }
}

/// A graphic character that is neither a letter, a digit nor whitespace, so typographic
/// marks like `—` and `«` count along with the ASCII ones
///
/// ```
/// use lexparse::utils::is_punctuation;
///
/// assert!(is_punctuation('.'));
/// assert!(is_punctuation('…'));
/// assert!(!is_punctuation('é'));
/// ```
pub fn is_punctuation(c: char) -> bool {
  c.is_ascii_punctuation() || !(c.is_alphanumeric() || c.is_whitespace() || c.is_control())
}

/// Compares two scores, either exactly or with `fcmp` depending on `fast`
pub fn score_cmp(a: f32, b: f32, fast: bool) -> Ordering {
  if fast {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
  } else {
    fcmp(a, b)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fcmp_respects_magnitude() {
    assert_eq!(fcmp(10000.0, 10000.001), Ordering::Equal);
    assert_eq!(fcmp(0.0001, 0.0002), Ordering::Less);
    assert_eq!(fcmp(0.0, 0.0), Ordering::Equal);
  }

  #[test]
  fn typographic_marks_are_punctuation() {
    for c in ['—', '“', '”', '…', '«', '»', '·', '¿', '¡', ','] {
      assert!(is_punctuation(c), "{}", c);
    }
    for c in ['a', 'Ж', '7', ' ', '\t'] {
      assert!(!is_punctuation(c), "{:?}", c);
    }
  }

  #[test]
  fn score_cmp_fast_is_exact() {
    assert_eq!(score_cmp(1.0, 1.0000001, true), Ordering::Less);
    assert_eq!(score_cmp(1.0, 1.0000001, false), Ordering::Equal);
  }
}
