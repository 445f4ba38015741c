//! Action execution boundary
//!
//! The engine decides; the executor acts. `DiscordExecutor` performs
//! directives over the Discord HTTP API. Platform failures are returned to
//! the caller, which logs them once and moves on — they never alter engine
//! state.

use crate::policy::{Directive, PolicyAction, PolicyResult};
use poise::serenity_prelude::Http;
use std::sync::Arc;
use tracing::info;

/// Boundary between the reconciliation engine and the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Attempt a directive against the platform.
    ///
    /// # Errors
    /// Returns a `PolicyError::Platform` when the API call fails (missing
    /// permissions, vanished member or role, rate limit). The engine treats
    /// a failure as a dropped attempt.
    async fn execute(&self, directive: Directive) -> PolicyResult<()>;
}

/// Executor backed by the Discord HTTP API
pub struct DiscordExecutor {
    http: Arc<Http>,
}

impl DiscordExecutor {
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ActionExecutor for DiscordExecutor {
    async fn execute(&self, directive: Directive) -> PolicyResult<()> {
        let Directive {
            guild_id,
            user_id,
            role_id,
            action,
            reason,
        } = directive;

        match action {
            // Mute strips the punishing role itself, it is not a timeout.
            PolicyAction::RemoveRole | PolicyAction::Mute => {
                self.http
                    .remove_member_role(guild_id, user_id, role_id, Some(reason))
                    .await?;
            }
            PolicyAction::Kick => {
                self.http.kick_member(guild_id, user_id, Some(reason)).await?;
            }
            PolicyAction::Ban => {
                self.http.ban_user(guild_id, user_id, 0, Some(reason)).await?;
            }
        }

        info!(
            target: crate::POLICY_TARGET,
            guild_id = %guild_id,
            user_id = %user_id,
            role_id = %role_id,
            action = %action,
            "Policy action applied"
        );
        Ok(())
    }
}
