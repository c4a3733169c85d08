//! Move resolution and engine orchestration for a chess board front end.
//!
//! - [`domain`]: squares, notation, move resolution and engine protocols
//! - [`models`]: the game session, move ledger and background search
//! - [`app`]: the line-oriented terminal driver

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
