use crate::error::{ExtractError, Result};
use crate::vocab::Vocabulary;

use regex::bytes::{NoExpand, Regex};
use std::num::IntErrorKind;

/// Full-match pattern for number-looking tokens: optional sign, digits, optional decimal point, digits.
pub const NUMERIC_PATTERN: &str = r"^[-+]?[0-9]*\.?[0-9]+$";
const DIGIT_PATTERN: &str = r"[0-9]";

#[derive(Clone, Debug)]
pub struct ResolverOptions {
    pub preindexed: bool,
    pub oov_id: usize,
    pub digit_fallback: Option<String>,
    pub numeric_pattern: String,
}

impl ResolverOptions {
    pub fn new(preindexed: bool, oov_id: usize) -> Self {
        Self {
            preindexed,
            oov_id,
            digit_fallback: None,
            numeric_pattern: NUMERIC_PATTERN.to_string(),
        }
    }

    pub fn with_digit_fallback(mut self, replacement: Option<String>) -> Self {
        self.digit_fallback = replacement;
        self
    }

    pub fn with_numeric_pattern(mut self, pattern: &str) -> Self {
        self.numeric_pattern = pattern.to_string();
        self
    }
}

/// Maps corpus tokens to vocabulary ids.
pub struct WordResolver<'v> {
    vocab: &'v Vocabulary,
    preindexed: bool,
    oov_id: usize,
    digit_fallback: Option<String>,
    numeric: Regex,
    digit: Regex,
}

impl<'v> WordResolver<'v> {

    pub fn new(vocab: &'v Vocabulary, options: ResolverOptions) -> Result<WordResolver<'v>> {

        let numeric = Regex::new(&options.numeric_pattern).map_err(|e| {
            ExtractError::Config(format!("invalid numeric pattern {:?}: {}", options.numeric_pattern, e))
        })?;
        let digit = Regex::new(DIGIT_PATTERN).map_err(|e| ExtractError::Config(e.to_string()))?;

        Ok(Self {
            vocab,
            preindexed: options.preindexed,
            oov_id: options.oov_id,
            digit_fallback: options.digit_fallback,
            numeric,
            digit,
        })
    }

    /// Tokens are raw line bytes. In word mode bytes that are not valid UTF-8 simply miss the
    /// lookup; in pre-indexed mode they are a parse error.
    pub fn resolve<T: AsRef<[u8]> + ?Sized>(&self, token: &T) -> Result<usize> {

        let token = token.as_ref();
        if self.preindexed {
            return read_index(token, self.vocab.len());
        }

        if let Some(id) = self.vocab.id_of(token) {
            return Ok(id);
        }

        if let Some(replacement) = &self.digit_fallback {
            if self.numeric.is_match(token) {
                let digified = self.digit.replace_all(token, NoExpand(replacement.as_bytes()));
                if let Some(id) = self.vocab.id_of(&digified) {
                    return Ok(id);
                }
            }
        }

        Ok(self.oov_id)
    }
}

/// Parses a pre-indexed corpus token, which must be a base-10 id inside `[0, vocab_size)`.
pub fn read_index<T: AsRef<[u8]> + ?Sized>(token: &T, vocab_size: usize) -> Result<usize> {

    let bytes = token.as_ref();
    let token = std::str::from_utf8(bytes).map_err(|_| ExtractError::Parse {
        location: "token".to_string(),
        token: String::from_utf8_lossy(bytes).into_owned(),
    })?;

    let index = match token.trim().parse::<i128>() {
        Ok(index) => index,
        Err(e) => {
            let index = match e.kind() {
                IntErrorKind::PosOverflow => i128::MAX,
                IntErrorKind::NegOverflow => i128::MIN,
                _ => return Err(ExtractError::Parse { location: "token".to_string(), token: token.to_string() }),
            };
            return Err(ExtractError::Range { location: "token".to_string(), index, vocab_size });
        }
    };

    if index < 0 || index >= vocab_size as i128 {
        return Err(ExtractError::Range { location: "token".to_string(), index, vocab_size });
    }
    Ok(index as usize)
}
