//! Twistale accounts context: registration, sign-in and session lookup.

pub mod application;
pub mod domain;
