// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in toolkits, enabled per `[tools.*]` section.

pub mod duckduckgo;
pub mod python;
pub mod reasoning;
pub mod yfinance;

use sable_config::model::ToolsConfig;
use sable_core::SableError;
use tracing::debug;

use crate::tool::ToolRegistry;
pub use reasoning::{NextAction, ReasoningLog, ReasoningStep};

/// Tools built from one `ToolsConfig`.
#[derive(Debug, Default, Clone)]
pub struct Toolbox {
    pub registry: ToolRegistry,
    /// Present when the reasoning toolkit is enabled.
    pub reasoning: Option<ReasoningLog>,
}

/// Instantiates every enabled toolkit.
pub fn build_tools(config: &ToolsConfig) -> Result<Toolbox, SableError> {
    let mut toolbox = Toolbox::default();
    if config.python.enabled {
        python::register(&mut toolbox.registry, &config.python);
    }
    if config.duckduckgo.enabled {
        duckduckgo::register(&mut toolbox.registry, &config.duckduckgo)?;
    }
    if config.yfinance.enabled {
        yfinance::register(&mut toolbox.registry, &config.yfinance)?;
    }
    if config.reasoning.enabled {
        toolbox.reasoning = Some(reasoning::register(
            &mut toolbox.registry,
            &config.reasoning,
        ));
    }
    debug!(tools = ?toolbox.registry, "built-in tools ready");
    Ok(toolbox)
}
