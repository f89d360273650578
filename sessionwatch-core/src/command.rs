//! Heuristic shell command classification
//!
//! The session monitor counts command frequency by a normalized base token
//! rather than the raw command line. Classification is a replaceable
//! strategy so a stricter parser can be swapped in without touching the
//! aggregation core; the default implementation is best-effort string
//! matching and never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structural form of a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandForm {
    /// A single command with arguments
    Simple,
    /// Stages joined with `|`
    Piped,
    /// Commands joined with `&&`, `||`, or `;`
    Chained,
    /// Input or output redirection (`>`, `>>`, `<`)
    Redirected,
}

/// A normalized view of a raw command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// First meaningful token with `sudo`/`su` prefixes stripped
    pub base: String,
    /// Structural classification
    pub form: CommandForm,
}

/// Strategy for turning raw command lines into [`ParsedCommand`]s
pub trait CommandClassifier: Send + Sync {
    /// Classifies a raw command line. Must not fail; unparseable input
    /// yields an empty base token.
    fn classify(&self, raw: &str) -> ParsedCommand;
}

/// Default classifier: strips privilege-escalation prefixes and detects
/// piped, chained, and redirected forms by pattern matching.
#[derive(Debug)]
pub struct ShellCommandClassifier {
    chain: Regex,
    separators: Regex,
}

impl ShellCommandClassifier {
    /// Creates the default classifier
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: Regex::new(r"&&|\|\||;").expect("static chain pattern compiles"),
            separators: Regex::new(r"&&|\|\||;|\||>>|>|<").expect("static separator pattern compiles"),
        }
    }

    /// Strips leading `sudo`/`su` tokens (with their flags) from a stage
    fn strip_privilege_prefix<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
        let mut rest = tokens;
        while let Some((&first, tail)) = rest.split_first() {
            if first == "sudo" || first == "su" {
                rest = tail;
                // Skip the escalation command's own flags (e.g. -u, -c, -E);
                // -u/--user consume a username argument as well
                while let Some((&next, tail)) = rest.split_first() {
                    if next == "-u" || next == "--user" {
                        rest = tail.split_first().map_or(&[][..], |(_, t)| t);
                    } else if next.starts_with('-') {
                        rest = tail;
                    } else {
                        break;
                    }
                }
            } else {
                break;
            }
        }
        rest.to_vec()
    }
}

impl Default for ShellCommandClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandClassifier for ShellCommandClassifier {
    fn classify(&self, raw: &str) -> ParsedCommand {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ParsedCommand {
                base: String::new(),
                form: CommandForm::Simple,
            };
        }

        let form = if self.chain.is_match(trimmed) {
            CommandForm::Chained
        } else if trimmed.contains('|') {
            CommandForm::Piped
        } else if trimmed.contains('>') || trimmed.contains('<') {
            CommandForm::Redirected
        } else {
            CommandForm::Simple
        };

        // Base token comes from the first stage only
        let first_stage = self
            .separators
            .split(trimmed)
            .next()
            .unwrap_or(trimmed)
            .trim();
        let tokens: Vec<&str> = first_stage.split_whitespace().collect();
        let stripped = Self::strip_privilege_prefix(&tokens);
        let base = stripped
            .first()
            .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
            .unwrap_or_default()
            .to_string();

        ParsedCommand { base, form }
    }
}
