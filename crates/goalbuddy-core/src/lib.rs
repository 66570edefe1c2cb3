//! # goalbuddy-core
//!
//! Core types, traits, configuration, and error handling for the GoalBuddy bot.

pub mod config;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod session;
pub mod state;
pub mod traits;
pub mod validate;
