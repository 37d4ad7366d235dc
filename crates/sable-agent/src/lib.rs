// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent runtime for Sable.
//!
//! An [`Agent`] combines a model, tools, a context engine and optional
//! session storage and memory. [`Agent::run`] and [`Agent::run_stream`]
//! drive the model/tool loop; [`Agent::print_response`] renders a run on the
//! terminal. A [`Team`] puts a leader agent in front of member agents.
//!
//! [`build_agent`] and [`build_team`] assemble everything from config.

pub mod agent;
pub mod event;
pub mod factory;
pub mod print;
pub mod shutdown;
pub mod team;

pub use agent::{Agent, AgentBuilder};
pub use event::{EventSource, RunEvent, RunResponse, RunStream, ToolCallRecord};
pub use factory::{
    AdapterFactory, ConfigAdapters, build_agent, build_agent_with_knowledge, build_knowledge,
    build_team, open_storage,
};
pub use print::ResponsePrinter;
pub use shutdown::install_signal_handler;
pub use team::{SharedContext, Team, TeamBuilder, TeamMember, member_id};
