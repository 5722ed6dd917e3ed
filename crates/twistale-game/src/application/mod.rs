//! Application layer for the game room context.

pub mod command_handlers;
pub mod query_handlers;
pub mod services;
