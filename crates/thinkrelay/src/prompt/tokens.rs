//! Token counting.
//!
//! Exact tokenization is model-specific; the budgeter only needs a
//! deterministic, monotone estimate.

use super::CollaboratorError;

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Estimates the number of tokens in a string.
pub trait TokenCounter {
    fn count(&self, text: &str) -> Result<usize, CollaboratorError>;
}

impl<T: TokenCounter + ?Sized> TokenCounter for &T {
    fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        (**self).count(text)
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for Box<T> {
    fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        (**self).count(text)
    }
}

/// Byte-length / ratio estimate, rounded down.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioCounter {
    chars_per_token: f64,
}

impl CharRatioCounter {
    /// Create a counter with a calibrated chars-per-token ratio. Non-positive
    /// or non-finite ratios fall back to the default.
    pub fn with_ratio(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    pub fn estimate(&self, text: &str) -> usize {
        (text.len() as f64 / self.chars_per_token) as usize
    }
}

impl Default for CharRatioCounter {
    fn default() -> Self {
        Self::with_ratio(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenCounter for CharRatioCounter {
    fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        Ok(self.estimate(text))
    }
}

/// Wraps an infallible closure as a [`TokenCounter`].
pub struct FnCounter<F> {
    f: F,
}

impl<F> FnCounter<F>
where
    F: Fn(&str) -> usize,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> TokenCounter for FnCounter<F>
where
    F: Fn(&str) -> usize,
{
    fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        Ok((self.f)(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ratio_estimate() {
        let counter = CharRatioCounter::default();
        assert_eq!(counter.count(&"a".repeat(35)).unwrap(), 10);
        assert_eq!(counter.count("").unwrap(), 0);
    }

    #[test]
    fn calibrated_ratio_lowers_estimate() {
        let default = CharRatioCounter::default();
        let calibrated = CharRatioCounter::with_ratio(4.0);
        let text = "a".repeat(40_000);
        assert!(calibrated.estimate(&text) < default.estimate(&text));
    }

    #[test]
    fn invalid_ratio_falls_back_to_default() {
        assert_eq!(
            CharRatioCounter::with_ratio(0.0).chars_per_token(),
            DEFAULT_CHARS_PER_TOKEN
        );
        assert_eq!(
            CharRatioCounter::with_ratio(f64::NAN).chars_per_token(),
            DEFAULT_CHARS_PER_TOKEN
        );
    }

    #[test]
    fn estimate_is_monotone_under_removal() {
        let counter = CharRatioCounter::default();
        let text = "The quick brown fox jumps over the lazy dog.".repeat(20);
        let mut prev = counter.estimate(&text);
        for cut in (0..text.len()).rev().step_by(7) {
            let now = counter.estimate(&text[..cut]);
            assert!(now <= prev);
            prev = now;
        }
    }

    #[test]
    fn closure_counter() {
        let counter = FnCounter::new(|s: &str| s.len() / 4);
        assert_eq!(counter.count("12345678").unwrap(), 2);
    }
}
