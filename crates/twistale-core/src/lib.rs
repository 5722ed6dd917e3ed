//! Shared abstractions for the Twistale crates.
//!
//! This crate defines the traits and types every context depends on: the
//! error taxonomy, deterministic time and randomness, and the collaborator
//! seams (document store, blob store, authentication, preferences). It
//! contains no infrastructure code.

pub mod auth;
pub mod blob;
pub mod clock;
pub mod command;
pub mod document;
pub mod error;
pub mod preferences;
pub mod rng;
