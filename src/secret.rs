//! Store password input

use crate::error::Result;

/// Password value that asks for the password interactively.
pub const PROMPT_SENTINEL: &str = "-";

/// Source of the credential store password when it is not given
/// on the command line.
pub trait SecretProvider {
    /// # Errors
    ///
    /// Returns an error if the password cannot be read.
    fn provide_password(&self) -> Result<String>;
}

/// Prompts on the terminal without echoing input.
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    prompt: String,
}

impl TerminalPrompt {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new("Please insert database password: ")
    }
}

impl SecretProvider for TerminalPrompt {
    fn provide_password(&self) -> Result<String> {
        Ok(rpassword::prompt_password(&self.prompt)?)
    }
}

/// Replace the [`PROMPT_SENTINEL`] with a password from `provider`.
///
/// Any other value, or no value, is returned unchanged and the
/// provider is not called.
///
/// # Errors
///
/// Propagates the provider's error.
pub fn resolve_password(
    password: Option<String>,
    provider: &dyn SecretProvider,
) -> Result<Option<String>> {
    match password {
        Some(p) if p == PROMPT_SENTINEL => provider.provide_password().map(Some),
        other => Ok(other),
    }
}
