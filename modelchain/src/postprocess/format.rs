//! Stage-specific markdown structuring.

use crate::core::StageRole;
use crate::errors::ConfigError;
use regex::{Captures, Regex};

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Applies light, idempotent markdown structure per stage role.
#[derive(Debug, Clone)]
pub struct StageFormatter {
    line_breaks: Regex,
    idea_number: Regex,
    roman_heading: Regex,
    letter_heading: Regex,
    numbered_point: Regex,
    excess_newlines: Regex,
    emphasis: Regex,
    heading_spacing: Regex,
    section_heading: Regex,
}

impl StageFormatter {
    /// Compiles the formatter's patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if a pattern fails to compile.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            line_breaks: compile(r"\n+")?,
            idea_number: compile(r"^\d+\.\s*")?,
            roman_heading: compile(r"^[IVX]+\.\s")?,
            letter_heading: compile(r"^[A-Z]\.\s")?,
            numbered_point: compile(r"^\d+\.\s")?,
            excess_newlines: compile(r"\n{3,}")?,
            emphasis: compile(
                r"(?i)(\*\*)?\b(important|key|critical|essential|significant)\b(\*\*)?",
            )?,
            heading_spacing: compile(r"(?m)^(#+)[ \t]*([^#\s][^\n]*)")?,
            section_heading: compile(r"\n(#+[ \t][^\n]+)\n")?,
        })
    }

    /// Formats `text` for presentation as the output of `role`.
    #[must_use]
    pub fn format(&self, text: &str, role: StageRole) -> String {
        let text = text.trim();
        match role {
            StageRole::Ideas => self.format_ideas(text),
            StageRole::Outline => self.format_outline(text),
            StageRole::Draft => self.format_draft(text),
            StageRole::Final => self.format_final(text),
            StageRole::Quality => text.to_string(),
        }
    }

    /// Numbers each idea in bold unless the model already used bold.
    fn format_ideas(&self, text: &str) -> String {
        if text.contains("**") {
            return text.to_string();
        }
        let ideas: Vec<String> = self
            .line_breaks
            .split(text)
            .map(|line| self.idea_number.replace(line.trim(), "").into_owned())
            .filter(|idea| !idea.is_empty())
            .enumerate()
            .map(|(i, idea)| format!("**{}.** {idea}", i + 1))
            .collect();
        if ideas.is_empty() {
            return text.to_string();
        }
        ideas.join("\n\n")
    }

    /// Promotes outline markers to headings unless headings already exist.
    fn format_outline(&self, text: &str) -> String {
        if text.contains("##") {
            return text.to_string();
        }
        self.line_breaks
            .split(text)
            .map(|line| {
                if self.roman_heading.is_match(line) {
                    format!("## {line}")
                } else if self.letter_heading.is_match(line) {
                    format!("### {line}")
                } else if self.numbered_point.is_match(line) {
                    format!("- {line}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_draft(&self, text: &str) -> String {
        let spaced = self.excess_newlines.replace_all(text, "\n\n");
        self.emphasis
            .replace_all(&spaced, |caps: &Captures<'_>| {
                // Leave words that already touch bold markers alone.
                if caps.get(1).is_some() || caps.get(3).is_some() {
                    caps[0].to_string()
                } else {
                    format!("**{}**", &caps[2])
                }
            })
            .into_owned()
    }

    fn format_final(&self, text: &str) -> String {
        let mut out = self
            .heading_spacing
            .replace_all(text, "${1} ${2}")
            .into_owned();
        if !out.contains("---") {
            out = self
                .section_heading
                .replace_all(&out, "\n\n---\n\n${1}\n\n")
                .into_owned();
        }
        self.excess_newlines.replace_all(&out, "\n\n").into_owned()
    }
}
