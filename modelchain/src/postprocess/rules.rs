//! Declarative cleanup rules for raw model output.

use crate::errors::ConfigError;
use regex::Regex;

/// One pattern removal applied by [`clean`](super::ResponsePostProcessor::clean).
#[derive(Debug, Clone)]
pub struct CleanupRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl CleanupRule {
    /// Compiles a rule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if the pattern is not a valid regex.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            pattern: compiled,
            replacement: replacement.into(),
        })
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Applies the rule to `text`.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Built-in rules as `(name, pattern)`; each match is removed.
///
/// Block rules come first so a whole system or instruction turn goes
/// before its stray delimiters are considered.
pub(crate) const BUILTIN_RULES: &[(&str, &str)] = &[
    ("sys_block", r"(?s)<<SYS>>.*?<</SYS>>"),
    ("inst_block", r"(?s)\[INST\].*?\[/INST\]"),
    ("sys_marker", r"<</?SYS>>"),
    ("sentence_marker", r"</?s>"),
    ("assistant_tag", r"(?i)</?assistant>"),
    ("system_tag", r"(?i)</?system>"),
    ("user_tag", r"(?i)</?user>"),
    ("inst_marker", r"\[/?INST\]"),
    ("python_marker", r"\[/?PYTHON\]"),
    ("code_marker", r"\[/?CODE\]"),
    ("html_marker", r"\[/?HTML\]"),
    ("javascript_marker", r"\[/?JAVASCRIPT\]"),
    ("response_marker", r"\[/?RESPONSE\]"),
    ("special_token", r"<\|[^|>]*\|>"),
];

/// Compiles the built-in rules followed by `extra` patterns.
///
/// # Errors
///
/// Returns [`ConfigError::Pattern`] for the first pattern that fails to
/// compile.
pub fn compile_rules(extra: &[String]) -> Result<Vec<CleanupRule>, ConfigError> {
    let builtin = BUILTIN_RULES
        .iter()
        .map(|(name, pattern)| CleanupRule::new(*name, pattern, ""));
    let custom = extra
        .iter()
        .enumerate()
        .map(|(i, pattern)| CleanupRule::new(format!("custom_{i}"), pattern, ""));
    builtin.chain(custom).collect()
}
