// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of a run: `print_response`.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sable_core::SableError;
use sable_tools::ReasoningStep;

use crate::agent::Agent;
use crate::event::{RunEvent, RunResponse, RunStream};

/// Writes run events to a terminal-like sink.
pub struct ResponsePrinter<W: Write> {
    out: W,
    show_tool_calls: bool,
    line_start: bool,
}

fn io_err(e: std::io::Error) -> SableError {
    SableError::Internal(format!("failed to write response: {e}"))
}

/// `name(key=value, ...)` with keys sorted and string values unquoted.
fn format_call(name: &str, input: &serde_json::Value) -> String {
    let args = match input {
        serde_json::Value::Object(map) => {
            let mut args: Vec<String> = map
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => format!("{k}={s}"),
                    other => format!("{k}={other}"),
                })
                .collect();
            args.sort();
            args.join(", ")
        }
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    format!("{name}({args})")
}

impl<W: Write> ResponsePrinter<W> {
    pub fn new(out: W, show_tool_calls: bool) -> Self {
        Self {
            out,
            show_tool_calls,
            line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        write!(self.out, "{text}")?;
        self.line_start = text.ends_with('\n');
        self.out.flush()
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if !self.line_start {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{line}")?;
        self.line_start = true;
        self.out.flush()
    }

    /// Renders one event. Returns the response on `RunCompleted`.
    pub fn event(&mut self, event: RunEvent) -> Result<Option<RunResponse>, SableError> {
        match event {
            RunEvent::Content(text) => self.write_text(&text).map_err(io_err)?,
            RunEvent::ToolCallStarted { name, input, .. } if self.show_tool_calls => {
                let line = format!("  - Running: {}", format_call(&name, &input));
                self.write_line(&line.dimmed().to_string()).map_err(io_err)?;
            }
            RunEvent::ToolCallCompleted {
                name,
                output,
                is_error: true,
                ..
            } if self.show_tool_calls => {
                let first = output.lines().next().unwrap_or_default();
                let line = format!("  - {name} failed: {first}");
                self.write_line(&line.red().dimmed().to_string()).map_err(io_err)?;
            }
            RunEvent::ReasoningStep(step) if self.show_tool_calls => {
                let detail = match &step {
                    ReasoningStep::Think { thought, .. } => thought.as_str(),
                    ReasoningStep::Analyze { analysis, .. } => analysis.as_str(),
                };
                let line = format!("  Reasoning: {}\n    {detail}", step.title());
                self.write_line(&line.dimmed().italic().to_string()).map_err(io_err)?;
            }
            RunEvent::MemberResponse { member, content } => {
                self.write_line(&format!("{}", format!("{member}:").bold().cyan()))
                    .map_err(io_err)?;
                self.write_line(content.trim_end()).map_err(io_err)?;
            }
            RunEvent::RunCompleted(response) => {
                if !self.line_start {
                    writeln!(self.out).map_err(io_err)?;
                    self.line_start = true;
                }
                return Ok(Some(response));
            }
            _ => {}
        }
        Ok(None)
    }

    /// Prints events as they arrive.
    pub async fn stream(&mut self, mut events: RunStream) -> Result<RunResponse, SableError> {
        while let Some(event) = events.next().await {
            if let Some(response) = self.event(event?)? {
                return Ok(response);
            }
        }
        Err(SableError::Internal("run ended without a response".into()))
    }

    /// Waits behind a spinner, then prints everything at once.
    pub async fn buffered(&mut self, mut events: RunStream) -> Result<RunResponse, SableError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut collected = Vec::new();
        let mut failure = None;
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if let RunEvent::ToolCallStarted { name, .. } = &event {
                        spinner.set_message(format!("Running {name}..."));
                    }
                    collected.push(event);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        spinner.finish_and_clear();

        if let Some(e) = failure {
            return Err(e);
        }
        let mut response = None;
        for event in collected {
            if let Some(done) = self.event(event)? {
                response = Some(done);
            }
        }
        response.ok_or_else(|| SableError::Internal("run ended without a response".into()))
    }
}

impl Agent {
    /// Runs and prints the answer to stdout. With `stream` the text appears
    /// as it is generated; otherwise a spinner runs until the answer is ready.
    pub async fn print_response(
        &self,
        input: &str,
        stream: bool,
    ) -> Result<RunResponse, SableError> {
        let mut printer = ResponsePrinter::new(std::io::stdout(), self.show_tool_calls());
        self.write_response(input, stream, &mut printer).await
    }

    /// [`print_response`](Self::print_response) into any printer.
    pub async fn write_response<W: Write>(
        &self,
        input: &str,
        stream: bool,
        printer: &mut ResponsePrinter<W>,
    ) -> Result<RunResponse, SableError> {
        let events = self.spawn_run(input.to_string(), stream);
        if stream {
            printer.stream(events).await
        } else {
            printer.buffered(events).await
        }
    }
}
