//! # goalbuddy-sheets
//!
//! Spreadsheet persistence for GoalBuddy: a row-store trait with Google
//! Sheets and in-memory backends, and the `Store` adapter the conversation
//! controller talks to.

pub mod backend;
pub mod google;
pub mod memory;
pub mod store;

pub use backend::SheetBackend;
pub use google::GoogleSheets;
pub use memory::MemorySheet;
pub use store::{RecordKey, RetryPolicy, Store, UserRecord};
