//! # goalbuddy-channels
//!
//! Messaging platform integrations for GoalBuddy.

pub mod telegram;
