//! Post-processing of raw model output.
//!
//! Every stage output goes through [`ResponsePostProcessor::process`]:
//!
//! 1. [`clean`](ResponsePostProcessor::clean) strips instruction and
//!    control tokens
//! 2. the final stage is cut to the word budget
//! 3. [`format_for_stage`](ResponsePostProcessor::format_for_stage) adds
//!    light markdown structure
//!
//! All of it is synchronous and allocation-light; the only suspension
//! point in a chain is the backend call.

mod format;
mod rules;
mod trim;

pub use format::StageFormatter;
pub use rules::{compile_rules, CleanupRule};
pub use trim::{trim_to_word_budget, word_count};

use crate::config::ChainConfig;
use crate::core::StageRole;
use crate::errors::ConfigError;

/// Returned by `clean` when nothing survives cleanup.
pub const FALLBACK_RESPONSE: &str = "I don't have a response for that.";

/// Cleans, trims and formats model output.
#[derive(Debug, Clone)]
pub struct ResponsePostProcessor {
    rules: Vec<CleanupRule>,
    formatter: StageFormatter,
    word_budget: usize,
}

impl ResponsePostProcessor {
    /// Creates a post-processor with the built-in rules and a 750-word budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_rules(compile_rules(&[])?, 750)
    }

    /// Creates a post-processor from chain configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if an extra cleanup pattern is invalid.
    pub fn from_config(config: &ChainConfig) -> Result<Self, ConfigError> {
        Self::with_rules(
            compile_rules(&config.extra_cleanup_patterns)?,
            config.word_budget,
        )
    }

    fn with_rules(rules: Vec<CleanupRule>, word_budget: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            rules,
            formatter: StageFormatter::new()?,
            word_budget,
        })
    }

    /// Returns the final-stage word budget.
    #[must_use]
    pub fn word_budget(&self) -> usize {
        self.word_budget
    }

    /// Returns the cleanup rules in application order.
    #[must_use]
    pub fn rules(&self) -> &[CleanupRule] {
        &self.rules
    }

    /// Strips control tokens and surrounding whitespace.
    ///
    /// Idempotent. Never returns empty text: if nothing survives, the
    /// result is [`FALLBACK_RESPONSE`].
    #[must_use]
    pub fn clean(&self, raw: &str) -> String {
        // Rules only remove text, so every pass that changes something
        // shrinks it and the loop reaches a fixpoint.
        let mut current = raw.trim().to_string();
        loop {
            let next = self
                .rules
                .iter()
                .fold(current.clone(), |text, rule| rule.apply(&text))
                .trim()
                .to_string();
            if next.len() >= current.len() {
                break;
            }
            current = next;
        }

        if current.is_empty() {
            FALLBACK_RESPONSE.to_string()
        } else {
            current
        }
    }

    /// Truncates `text` to `budget` words; see [`trim_to_word_budget`].
    #[must_use]
    pub fn trim_to_word_budget(&self, text: &str, budget: usize) -> String {
        trim_to_word_budget(text, budget)
    }

    /// Applies the stage's markdown structuring. Idempotent.
    #[must_use]
    pub fn format_for_stage(&self, text: &str, role: StageRole) -> String {
        self.formatter.format(text, role)
    }

    /// Runs the full pipeline for one stage's raw output.
    ///
    /// The final stage is trimmed before formatting so its markdown
    /// survives, then re-checked in case formatting added words.
    #[must_use]
    pub fn process(&self, role: StageRole, raw: &str) -> String {
        let cleaned = self.clean(raw);
        if role != StageRole::Final {
            return self.format_for_stage(&cleaned, role);
        }

        let trimmed = trim_to_word_budget(&cleaned, self.word_budget);
        let formatted = self.format_for_stage(&trimmed, role);
        if word_count(&formatted) > self.word_budget {
            trim_to_word_budget(&formatted, self.word_budget)
        } else {
            formatted
        }
    }
}
