//! Route modules organized by bounded context.

pub mod auth;
pub mod blobs;
pub mod health;
pub mod rooms;
