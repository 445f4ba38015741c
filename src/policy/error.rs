//! Error types for the policy engine
//!
//! This module defines the errors that can occur while configuring policies
//! or executing policy actions against Discord.

use poise::serenity_prelude::RoleId;
use thiserror::Error;

/// Errors that can occur during policy operations
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Unrecognized punishment action name in a configuration command
    #[error("Invalid action: {0}. Use mute, kick, or ban")]
    InvalidAction(String),

    /// No punishment policy configured for the role
    #[error("No punishment policy for role {0}")]
    PolicyNotFound(RoleId),

    /// Discord API error
    #[error("Discord API error: {0}")]
    Platform(#[from] Box<poise::serenity_prelude::Error>),

    /// Generic error
    #[error("Policy error: {0}")]
    Other(String),
}

impl From<poise::serenity_prelude::Error> for PolicyError {
    fn from(error: poise::serenity_prelude::Error) -> Self {
        Self::Platform(Box::new(error))
    }
}

/// Convert a string into a PolicyError
impl From<String> for PolicyError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

/// Result type for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;
