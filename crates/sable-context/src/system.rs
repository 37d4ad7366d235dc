// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System message: either a fixed prompt loaded from config, or one
//! generated from the agent's description, instructions and flags.

use chrono::{DateTime, Local};
use sable_config::model::AgentConfig;
use sable_core::SableError;
use tracing::{info, warn};

/// Inputs of a generated system message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptTemplate {
    /// Opening paragraph.
    pub description: Option<String>,
    /// Rendered as `<your_role>` for team members.
    pub role: Option<String>,
    pub instructions: Vec<String>,
    pub markdown: bool,
    pub add_datetime: bool,
}

impl PromptTemplate {
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            description: config.description.clone(),
            role: config.role.clone(),
            instructions: config.instructions.clone(),
            markdown: config.markdown,
            add_datetime: config.add_datetime_to_instructions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PromptSource {
    Fixed(String),
    Generated(PromptTemplate),
}

/// The system message of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrompt {
    source: PromptSource,
}

impl SystemPrompt {
    /// Loads the system message for an agent.
    ///
    /// # Priority
    /// 1. `config.system_prompt_file` -- read from disk
    /// 2. `config.system_prompt` -- inline string
    /// 3. Generated from description, instructions and flags
    pub async fn from_agent(config: &AgentConfig) -> Result<Self, SableError> {
        if let Some(ref file_path) = config.system_prompt_file {
            match tokio::fs::read_to_string(file_path).await {
                Ok(content) => {
                    let trimmed = content.trim();
                    if !trimmed.is_empty() {
                        info!(path = file_path.as_str(), "loaded system prompt from file");
                        return Ok(Self::fixed(trimmed));
                    }
                }
                Err(e) => {
                    warn!(
                        path = file_path.as_str(),
                        error = %e,
                        "failed to read system prompt file, falling back"
                    );
                }
            }
        }

        if let Some(ref prompt) = config.system_prompt
            && !prompt.is_empty()
        {
            return Ok(Self::fixed(prompt.clone()));
        }

        Ok(Self::generated(PromptTemplate::from_agent(config)))
    }

    /// A prompt used verbatim. Tool instructions are not added to it.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            source: PromptSource::Fixed(text.into()),
        }
    }

    pub fn generated(template: PromptTemplate) -> Self {
        Self {
            source: PromptSource::Generated(template),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.source, PromptSource::Fixed(_))
    }

    /// Renders the message.
    ///
    /// `tool_instructions` join the agent's own instructions; `sections`
    /// (from context providers) follow the generated blocks and are also
    /// appended to fixed prompts.
    pub fn render(
        &self,
        tool_instructions: &[String],
        sections: &[String],
        now: DateTime<Local>,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();
        match &self.source {
            PromptSource::Fixed(text) => parts.push(text.clone()),
            PromptSource::Generated(template) => {
                render_template(template, tool_instructions, now, &mut parts)
            }
        }
        parts.extend(sections.iter().filter(|s| !s.trim().is_empty()).cloned());
        parts.join("\n\n")
    }
}

fn render_template(
    template: &PromptTemplate,
    tool_instructions: &[String],
    now: DateTime<Local>,
    parts: &mut Vec<String>,
) {
    if let Some(description) = template.description.as_deref().map(str::trim)
        && !description.is_empty()
    {
        parts.push(description.to_string());
    }

    if let Some(role) = &template.role {
        parts.push(format!("<your_role>\n{role}\n</your_role>"));
    }

    let instructions: Vec<&str> = template
        .instructions
        .iter()
        .chain(tool_instructions)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !instructions.is_empty() {
        parts.push(tagged_list("instructions", &instructions));
    }

    let mut additional = Vec::new();
    if template.markdown {
        additional.push("Use markdown to format your answers.".to_string());
    }
    if template.add_datetime {
        additional.push(format!(
            "The current time is {}.",
            now.format("%Y-%m-%d %H:%M:%S %Z")
        ));
    }
    if !additional.is_empty() {
        let refs: Vec<&str> = additional.iter().map(String::as_str).collect();
        parts.push(tagged_list("additional_information", &refs));
    }
}

/// `<tag>` block holding one `- ` bullet per item. Multi-line items are
/// kept intact under their bullet.
pub fn tagged_list(tag: &str, items: &[&str]) -> String {
    let mut out = format!("<{tag}>\n");
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
    out.push_str(&format!("</{tag}>"));
    out
}
