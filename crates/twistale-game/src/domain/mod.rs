//! Domain layer for the game room context.

pub mod commands;
pub mod model;
pub mod progression;
pub mod room_id;
pub mod stories;
pub mod views;

#[cfg(test)]
pub(crate) mod fixtures;
