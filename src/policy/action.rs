//! Policy action types
//!
//! This module defines the punitive actions a punishment policy can carry and
//! the directives the engine hands to the action executor.

use crate::policy::PolicyError;
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audit log reason for conflict stripping found by a sweep
pub const REASON_CONFLICT_SWEEP: &str = "Trigger role conflict";
/// Audit log reason for conflict stripping on a role-change event
pub const REASON_TRIGGER_ADDED: &str = "Trigger role added";
/// Audit log reason for a punishment fired by a sweep
pub const REASON_PUNISHMENT: &str = "Punishment role triggered";
/// Audit log reason for a zero-delay punishment fired on a role-change event
pub const REASON_IMMEDIATE_PUNISHMENT: &str = "Immediate punishment role triggered";

/// Punitive action attached to a punishment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PunishmentAction {
    /// Strip the punishing role from the member
    Mute,
    /// Kick the member from the guild
    Kick,
    /// Ban the member from the guild
    Ban,
}

impl fmt::Display for PunishmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mute => write!(f, "mute"),
            Self::Kick => write!(f, "kick"),
            Self::Ban => write!(f, "ban"),
        }
    }
}

impl FromStr for PunishmentAction {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mute" => Ok(Self::Mute),
            "kick" => Ok(Self::Kick),
            "ban" => Ok(Self::Ban),
            _ => Err(PolicyError::InvalidAction(s.to_string())),
        }
    }
}

/// Concrete action the executor performs against Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyAction {
    /// Remove a role from the member (conflict stripping)
    RemoveRole,
    /// Strip the punishing role from the member
    Mute,
    /// Kick the member from the guild
    Kick,
    /// Ban the member from the guild
    Ban,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveRole => write!(f, "remove-role"),
            Self::Mute => write!(f, "mute"),
            Self::Kick => write!(f, "kick"),
            Self::Ban => write!(f, "ban"),
        }
    }
}

impl From<PunishmentAction> for PolicyAction {
    fn from(action: PunishmentAction) -> Self {
        match action {
            PunishmentAction::Mute => Self::Mute,
            PunishmentAction::Kick => Self::Kick,
            PunishmentAction::Ban => Self::Ban,
        }
    }
}

/// A single enforcement decision addressed to the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    /// Guild in which to act
    pub guild_id: GuildId,
    /// Member to act on
    pub user_id: UserId,
    /// Role the decision is about (the role to strip, or the punishing role)
    pub role_id: RoleId,
    /// What to do
    pub action: PolicyAction,
    /// Audit log reason forwarded to Discord
    pub reason: &'static str,
}
