// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Python toolkit: run code, write and run scripts, read and list files in a
//! working directory, and optionally install packages.
//!
//! Code runs in a `python3` subprocess whose working directory is
//! `base_dir`. Source is passed on stdin to a small driver so a named
//! variable can be read back after execution.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sable_config::model::PythonToolsConfig;
use sable_core::SableError;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::tool::{Tool, ToolOutput, ToolRegistry, optional_str, required_str};

/// Marks the line carrying the requested variable's value.
const RESULT_MARKER: &str = "__sable_result__:";

/// Reads source from stdin, executes it, then prints `RESULT_MARKER` + repr
/// of the variable named by argv[1] (if any).
const DRIVER: &str = r#"import sys
_src = sys.stdin.read()
_name = sys.argv[1] if len(sys.argv) > 1 else "<agent>"
_var = sys.argv[2] if len(sys.argv) > 2 else ""
_ns = {"__name__": "__main__"}
exec(compile(_src, _name, "exec"), _ns)
if _var:
    sys.stdout.flush()
    if _var in _ns:
        print("\n__sable_result__:" + str(_ns[_var]))
    else:
        print("\n__sable_result__:Variable " + _var + " not found")
"#;

const INSTRUCTIONS: &str = "You can run Python code with `run_python_code` or persist it with \
`save_to_file_and_run`. Set `variable_to_return` to read a result back, and print anything \
else you need to see.";

/// Shared state of the toolkit.
#[derive(Debug)]
pub struct PythonEnv {
    base_dir: PathBuf,
    python_bin: String,
    timeout: Duration,
}

impl PythonEnv {
    pub fn new(config: &PythonToolsConfig) -> Self {
        Self {
            base_dir: PathBuf::from(&config.base_dir),
            python_bin: config.python_bin.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Resolves `file_name` inside `base_dir`, rejecting absolute paths and `..`.
    fn resolve(&self, file_name: &str) -> Result<PathBuf, SableError> {
        let path = Path::new(file_name);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if file_name.is_empty() || escapes {
            return Err(SableError::Tool {
                message: format!("file name '{file_name}' must be relative to the working directory"),
                source: None,
            });
        }
        Ok(self.base_dir.join(path))
    }

    async fn ensure_base_dir(&self) -> Result<(), SableError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| tool_io_error("failed to create working directory", e))
    }

    /// Executes `source` and returns the tool output.
    async fn run_source(
        &self,
        source: &str,
        display_name: &str,
        variable: Option<&str>,
    ) -> Result<ToolOutput, SableError> {
        self.ensure_base_dir().await?;

        let mut command = tokio::process::Command::new(&self.python_bin);
        command
            .arg("-c")
            .arg(DRIVER)
            .arg(display_name)
            .arg(variable.unwrap_or_default())
            .current_dir(&self.base_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| SableError::Tool {
            message: format!("failed to start {}: {e}", self.python_bin),
            source: Some(Box::new(e)),
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .await
                .map_err(|e| tool_io_error("failed to send code to python", e))?;
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| tool_io_error("python process failed", e))?,
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "Python execution timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(status = ?output.status.code(), "python finished");

        if !output.status.success() {
            return Ok(ToolOutput::error(format!("Error running python code:\n{stderr}")));
        }

        if let Some((printed, value)) = stdout.rsplit_once(RESULT_MARKER) {
            let printed = printed.trim_end();
            let value = value.trim_end();
            return Ok(ToolOutput::ok(if printed.is_empty() {
                value.to_string()
            } else {
                format!("{value}\n\nOutput:\n{printed}")
            }));
        }

        let printed = stdout.trim_end();
        Ok(ToolOutput::ok(if printed.is_empty() {
            "successfully ran python code".to_string()
        } else {
            printed.to_string()
        }))
    }
}

fn tool_io_error(context: &str, e: std::io::Error) -> SableError {
    SableError::Tool {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Registers the python tools; `pip_install_package` only when enabled.
pub fn register(registry: &mut ToolRegistry, config: &PythonToolsConfig) {
    let env = Arc::new(PythonEnv::new(config));
    registry.register(Arc::new(RunPythonCode(env.clone())));
    registry.register(Arc::new(SaveToFileAndRun(env.clone())));
    registry.register(Arc::new(ReadFile(env.clone())));
    registry.register(Arc::new(ListFiles(env.clone())));
    if config.pip_install {
        registry.register(Arc::new(PipInstallPackage(env)));
    }
}

pub struct RunPythonCode(pub Arc<PythonEnv>);

#[async_trait]
impl Tool for RunPythonCode {
    fn name(&self) -> &str {
        "run_python_code"
    }

    fn description(&self) -> &str {
        "Run Python code in the working directory and optionally return the value of a variable"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "description": "The Python code to run"},
                "variable_to_return": {"type": "string", "description": "Variable whose value is returned"}
            },
            "required": ["code"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let code = required_str(&input, "code")?;
        self.0
            .run_source(code, "<agent>", optional_str(&input, "variable_to_return"))
            .await
    }

    fn instructions(&self) -> Option<String> {
        Some(INSTRUCTIONS.to_string())
    }
}

pub struct SaveToFileAndRun(pub Arc<PythonEnv>);

#[async_trait]
impl Tool for SaveToFileAndRun {
    fn name(&self) -> &str {
        "save_to_file_and_run"
    }

    fn description(&self) -> &str {
        "Save Python code to a file in the working directory, run it, and optionally return a variable"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_name": {"type": "string", "description": "Relative file name, e.g. analysis.py"},
                "code": {"type": "string"},
                "variable_to_return": {"type": "string"},
                "overwrite": {"type": "boolean", "default": true}
            },
            "required": ["file_name", "code"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let file_name = required_str(&input, "file_name")?;
        let code = required_str(&input, "code")?;
        let overwrite = input["overwrite"].as_bool().unwrap_or(true);

        let path = self.0.resolve(file_name)?;
        if !overwrite && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(ToolOutput::error(format!("File {file_name} already exists")));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| tool_io_error("failed to create directory", e))?;
        }
        tokio::fs::write(&path, code)
            .await
            .map_err(|e| tool_io_error("failed to write file", e))?;
        info!(path = %path.display(), "saved python file");

        self.0
            .run_source(code, file_name, optional_str(&input, "variable_to_return"))
            .await
    }

    fn instructions(&self) -> Option<String> {
        Some(INSTRUCTIONS.to_string())
    }
}

pub struct ReadFile(pub Arc<PythonEnv>);

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the working directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"file_name": {"type": "string"}},
            "required": ["file_name"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let file_name = required_str(&input, "file_name")?;
        let path = self.0.resolve(file_name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ToolOutput::ok(content)),
            Err(e) => Ok(ToolOutput::error(format!("Error reading file {file_name}: {e}"))),
        }
    }
}

pub struct ListFiles(pub Arc<PythonEnv>);

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List the files in the working directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _input: serde_json::Value) -> Result<ToolOutput, SableError> {
        self.0.ensure_base_dir().await?;
        let mut entries = tokio::fs::read_dir(&self.0.base_dir)
            .await
            .map_err(|e| tool_io_error("failed to list directory", e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| tool_io_error("failed to list directory", e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(ToolOutput::ok(serde_json::to_string(&names).unwrap_or_default()))
    }
}

pub struct PipInstallPackage(pub Arc<PythonEnv>);

/// Package specs such as `pandas`, `numpy==1.26.4` or `requests[socks]`.
fn is_package_spec(spec: &str) -> bool {
    let mut chars = spec.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || "._-[],=<>!~".contains(c))
}

#[async_trait]
impl Tool for PipInstallPackage {
    fn name(&self) -> &str {
        "pip_install_package"
    }

    fn description(&self) -> &str {
        "Install a Python package with pip"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"package_name": {"type": "string"}},
            "required": ["package_name"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let package = required_str(&input, "package_name")?;
        if !is_package_spec(package) {
            return Ok(ToolOutput::error(format!("Invalid package name: {package}")));
        }
        info!(package, "installing python package");
        let output = tokio::process::Command::new(&self.0.python_bin)
            .args(["-m", "pip", "install", package])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| tool_io_error("failed to run pip", e))?;
        if output.status.success() {
            Ok(ToolOutput::ok(format!("successfully installed package {package}")))
        } else {
            Ok(ToolOutput::error(format!(
                "Error installing package {package}:\n{}",
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}
