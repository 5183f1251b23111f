//! Interactive confirmation
//!
//! Prompts are only shown on a TTY; without one every question is declined.

use anyhow::Result;
use std::io::{self, Write};

use readlater_core::DuplicateResolver;

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}

/// Asks on the terminal whether a saved link should change category
pub struct PromptResolver;

impl DuplicateResolver for PromptResolver {
    fn confirm_move(&self, url: &str, existing_category: &str, target_category: &str) -> bool {
        let question = format!(
            "'{}' is already saved in '{}'. Move it to '{}'?",
            url, existing_category, target_category
        );
        match confirm(&question) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}
