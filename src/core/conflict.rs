//! Conflict resolution for pre-existing output.
//!
//! Every output unit (a directory or a file) that already exists is put to a
//! [`ConflictResolver`] before any worker touches it. The interactive
//! resolver reads from a terminal, so the orchestrator only ever calls
//! resolvers from its control thread.

use std::io::{BufRead, BufReader, Stderr, Stdin, Write};
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// What to do with output that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "lower")]
pub enum ConflictPolicy {
    /// Destroy and recreate existing output
    Replace,
    /// Leave existing output untouched
    Skip,
    /// Prompt for every existing unit
    Ask,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self::Ask
    }
}

/// Decision for one output unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    Replace,
    Skip,
}

#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Failed to read answer for {path}: {source}")]
    Prompt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Input closed while asking about {0}")]
    InputClosed(String),

    #[error("Declined to replace {0}")]
    Declined(String),
}

/// Decides the fate of an existing output unit
pub trait ConflictResolver: Send + Sync {
    fn decide(&self, unit: &Path) -> Result<ConflictDecision, ConflictError>;
}

/// Resolver that answers every unit the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedResolver(pub ConflictDecision);

impl ConflictResolver for FixedResolver {
    fn decide(&self, _unit: &Path) -> Result<ConflictDecision, ConflictError> {
        Ok(self.0)
    }
}

/// Resolver that asks a yes/no question per unit
pub struct PromptResolver<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead + Send, W: Write + Send> PromptResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    /// Ask a yes/no question; anything but "y"/"yes" is a no
    pub fn confirm(&self, question: &str, subject: &Path) -> Result<bool, ConflictError> {
        let subject_str = subject.display().to_string();
        let prompt_err = |source| ConflictError::Prompt {
            path: subject_str.clone(),
            source,
        };

        let mut guard = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let (input, output) = &mut *guard;

        write!(output, "{} (y/n): ", question).map_err(prompt_err)?;
        output.flush().map_err(prompt_err)?;

        let mut answer = String::new();
        let read = input.read_line(&mut answer).map_err(prompt_err)?;
        if read == 0 {
            return Err(ConflictError::InputClosed(subject_str));
        }

        let answer = answer.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

impl PromptResolver<BufReader<Stdin>, Stderr> {
    /// Prompt on the process terminal
    pub fn terminal() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead + Send, W: Write + Send> ConflictResolver for PromptResolver<R, W> {
    fn decide(&self, unit: &Path) -> Result<ConflictDecision, ConflictError> {
        let question = format!("{} already exists. Replace it?", unit.display());
        if self.confirm(&question, unit)? {
            Ok(ConflictDecision::Replace)
        } else {
            info!(unit = %unit.display(), "Keeping existing output");
            Ok(ConflictDecision::Skip)
        }
    }
}

/// Build the resolver for a policy
pub fn resolver_for(policy: ConflictPolicy) -> Box<dyn ConflictResolver> {
    match policy {
        ConflictPolicy::Replace => Box::new(FixedResolver(ConflictDecision::Replace)),
        ConflictPolicy::Skip => Box::new(FixedResolver(ConflictDecision::Skip)),
        ConflictPolicy::Ask => Box::new(PromptResolver::terminal()),
    }
}
