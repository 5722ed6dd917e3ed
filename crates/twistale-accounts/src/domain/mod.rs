//! Domain layer for the accounts context.

pub mod commands;
