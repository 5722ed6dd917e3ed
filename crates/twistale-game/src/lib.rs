//! Game room context for Twistale.
//!
//! Responsible for room lifecycle, round progression, hint selection and
//! story assembly for the alternating writing/drawing party game.

pub mod application;
pub mod domain;
