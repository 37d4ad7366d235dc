// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Sable agents.
//!
//! - [`MemoryDb`]: SQLite table of user memories with FTS5 keyword search
//! - [`MemoryManager`]: a model tool loop that adds, updates and (when
//!   allowed) deletes or clears memories, either from a finished run or from
//!   an explicit task
//! - [`UpdateUserMemoryTool`]: lets the agent trigger the manager itself
//! - [`MemoryContextProvider`] and [`SessionSummaryProvider`]: system
//!   message sections for memories and the running session summary

pub mod manager;
pub mod provider;
pub mod store;
pub mod summary;
pub mod tool;
pub mod types;

pub use manager::{MemoryInput, MemoryManager, MemoryOp, MemoryUpdate};
pub use provider::MemoryContextProvider;
pub use store::MemoryDb;
pub use summary::{SessionSummarizer, SessionSummaryProvider, load_summary, persist_summary};
pub use tool::UpdateUserMemoryTool;
pub use types::{DEFAULT_USER_ID, SessionSummary, UserMemory};
