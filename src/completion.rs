//! # Shell Completion Module
//!
//! This module provides shell completion functionality for Moodmix, including:
//! - Generation of completion scripts for various shells
//! - Dynamic completion of library items for `reorder` and `distribution`
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! moodmix completion bash > ~/.local/share/bash-completion/completions/moodmix
//!
//! # Generate zsh completions
//! moodmix completion zsh > ~/.config/zsh/completions/_moodmix
//! ```

use crate::cli::Shell;
use crate::library::Library;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Every library item, sorted and deduplicated.
///
/// A missing or unreadable library yields no completions rather than an
/// error, so a broken library never breaks the shell.
#[must_use]
pub fn get_item_completions(library_path: &Path) -> Vec<String> {
    let Ok(library) = Library::load(library_path) else {
        return Vec::new();
    };

    let mut completions: Vec<String> = library
        .iter()
        .flat_map(|(_, items)| items.iter().cloned())
        .collect();
    completions.sort();
    completions.dedup();
    completions
}

/// Quote an item for the given shell. Fish handles escaping itself.
#[must_use]
pub fn format_completion(item: &str, shell: Option<Shell>) -> String {
    match shell {
        Some(Shell::Fish) => item.to_string(),
        _ if item.contains([' ', '\t', '\n']) => format!("\"{}\"", item.replace('"', "\\\"")),
        _ => item.to_string(),
    }
}

/// Print item completions, one per line.
pub fn print_item_completions(library_path: &Path, shell: Option<Shell>) -> Result<()> {
    let mut out = io::stdout().lock();
    for item in get_item_completions(library_path) {
        writeln!(out, "{}", format_completion(&item, shell))?;
    }
    Ok(())
}
