//! Terminal confirmation for `prompt` install mode.

use std::io::IsTerminal;

use dialoguer::Confirm;

use recipes_sync::Prompter;

/// Asks on stderr when both stdin and stderr are terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }

    fn confirm(&self, question: &str) -> Result<bool, String> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| e.to_string())
    }
}
