//! Token estimation and budgeting for context packs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::context as context_constants;

// =============================================================================
// Budget
// =============================================================================

/// Size limits for one generation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Budget {
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
    pub max_facts: usize,
}

impl Budget {
    pub fn new(max_input_tokens: usize, max_output_tokens: usize, max_facts: usize) -> Self {
        Self {
            max_input_tokens,
            max_output_tokens,
            max_facts,
        }
    }

    /// Character ceiling for the rendered facts block
    pub fn soft_char_limit(&self) -> usize {
        self.max_input_tokens * context_constants::CHARS_PER_TOKEN as usize
    }
}

// =============================================================================
// Token Counting
// =============================================================================

/// Character-based token estimate.
///
/// Cyrillic text tokenizes denser than Latin text, so when more than
/// [`CYRILLIC_THRESHOLD`](context_constants::CYRILLIC_THRESHOLD) of the
/// letters are Cyrillic a smaller chars-per-token ratio applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    pub fn count(&self, text: &str) -> usize {
        let mut chars = 0usize;
        let mut letters = 0usize;
        let mut cyrillic = 0usize;
        for ch in text.chars() {
            chars += 1;
            if ch.is_alphabetic() {
                letters += 1;
                if matches!(ch, '\u{0400}'..='\u{04FF}') {
                    cyrillic += 1;
                }
            }
        }
        if chars == 0 {
            return 0;
        }

        let ratio = if letters > 0
            && cyrillic as f64 / letters as f64 > context_constants::CYRILLIC_THRESHOLD
        {
            context_constants::CHARS_PER_TOKEN_CYRILLIC
        } else {
            context_constants::CHARS_PER_TOKEN
        };
        (chars as f64 / ratio).ceil() as usize
    }
}

/// Running token allowance for greedy selection
#[derive(Debug)]
pub struct TokenBudget {
    max_tokens: usize,
    current_tokens: usize,
    counter: TokenCounter,
}

impl TokenBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            current_tokens: 0,
            counter: TokenCounter,
        }
    }

    pub fn count(&self, content: &str) -> usize {
        self.counter.count(content)
    }

    /// Reserve `tokens` unconditionally; returns false when that overruns the limit
    pub fn reserve(&mut self, tokens: usize) -> bool {
        self.current_tokens += tokens;
        self.current_tokens <= self.max_tokens
    }

    /// Add content only if it fits
    pub fn try_add(&mut self, content: &str) -> bool {
        let tokens = self.count(content);
        if self.current_tokens + tokens <= self.max_tokens {
            self.current_tokens += tokens;
            true
        } else {
            debug!(
                "Cannot add {} tokens, would exceed budget: {}/{}",
                tokens,
                self.current_tokens + tokens,
                self.max_tokens
            );
            false
        }
    }

    pub fn current(&self) -> usize {
        self.current_tokens
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.current_tokens)
    }
}
