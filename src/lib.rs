pub mod commands;
pub mod data;
pub mod handlers;
pub mod logging;
pub mod policy;

// Log targets used across the bot
pub const BOT_NAME: &str = "role_warden";
pub const COMMAND_TARGET: &str = "role_warden::command";
pub const ERROR_TARGET: &str = "role_warden::error";
pub const EVENT_TARGET: &str = "role_warden::handlers";
pub const POLICY_TARGET: &str = "role_warden::policy";

pub use data::{Data, DataInner};
pub use policy::{PolicyStore, PunishmentAction, PunishmentPolicy, ReconcilerService};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
