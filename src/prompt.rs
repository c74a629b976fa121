//! Interactive confirmation gate
//!
//! The pipeline never talks to the terminal directly; it goes through the
//! ConfirmationGate capability so tests can script answers. The terminal
//! implementation reads stdin line by line. A closed stdin maps to
//! PromptError::Aborted, the same identity the pipeline uses for Ctrl-C.

use crate::domain::{clean_version, GroupedUpdates, PackageSelection};
use crate::error::PromptError;
use colored::Colorize;
use std::io::{BufRead, Write};

/// Yes/no and multi-select prompts, injected into the pipeline
pub trait ConfirmationGate: Send + Sync {
    /// Ask a yes/no question; default answer is no
    fn confirm(&self, message: &str) -> Result<bool, PromptError>;

    /// Let the user pick packages out of the grouped candidates.
    ///
    /// Returned selections are in the order the user picked them.
    fn select_updates(
        &self,
        grouped: &GroupedUpdates,
    ) -> Result<Vec<PackageSelection>, PromptError>;
}

/// Gate backed by the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalGate;

impl TerminalGate {
    pub fn new() -> Self {
        Self
    }

    fn read_line(&self) -> Result<String, PromptError> {
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            // stdin closed mid-prompt
            return Err(PromptError::Aborted);
        }
        Ok(line.trim().to_string())
    }
}

impl ConfirmationGate for TerminalGate {
    fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        print!("{} [y/N] ", message);
        std::io::stdout().flush()?;

        let answer = self.read_line()?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn select_updates(
        &self,
        grouped: &GroupedUpdates,
    ) -> Result<Vec<PackageSelection>, PromptError> {
        let items: Vec<_> = grouped.iter_ordered().collect();

        println!();
        for (index, (bump, update)) in items.iter().enumerate() {
            let label = match bump {
                crate::domain::VersionBumpType::Patch => format!("{}", bump).green(),
                crate::domain::VersionBumpType::Minor => format!("{}", bump).yellow(),
                crate::domain::VersionBumpType::Major => format!("{}", bump).red(),
            };
            println!("  {:>3}. [{}] {}", index + 1, label, update);
        }
        println!();
        print!("Select packages to update (numbers, 'a' for all, empty for none): ");
        std::io::stdout().flush()?;

        let answer = self.read_line()?;
        let indices = parse_selection(&answer, items.len());

        Ok(indices
            .into_iter()
            .map(|i| {
                let (_, update) = items[i];
                PackageSelection::new(&update.name, clean_version(&update.new_version))
            })
            .collect())
    }
}

/// Parse a selection answer into zero-based indices.
///
/// Accepts whitespace/comma separated 1-based numbers, or `a`/`all`.
/// Out-of-range and unparsable tokens are ignored; duplicates keep their
/// first position so the result preserves the order the user typed.
fn parse_selection(input: &str, count: usize) -> Vec<usize> {
    let input = input.trim();
    if input.is_empty() {
        return Vec::new();
    }
    if input.eq_ignore_ascii_case("a") || input.eq_ignore_ascii_case("all") {
        return (0..count).collect();
    }

    let mut seen = vec![false; count];
    let mut indices = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if let Ok(n) = token.parse::<usize>() {
            if n >= 1 && n <= count && !seen[n - 1] {
                seen[n - 1] = true;
                indices.push(n - 1);
            }
        }
    }
    indices
}
