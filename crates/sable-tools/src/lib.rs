// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools the model can call.
//!
//! [`Tool`] and [`ToolRegistry`] are the seam between the agent run loop and
//! anything invocable: the built-in toolkits here, plus knowledge search,
//! memory and team delegation tools defined in their own crates.

pub mod builtin;
pub mod tool;

pub use builtin::{NextAction, ReasoningLog, ReasoningStep, Toolbox, build_tools};
pub use tool::{Tool, ToolOutput, ToolRegistry, optional_str, required_str};
