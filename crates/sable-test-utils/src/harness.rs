// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration tests.
//!
//! `TestHarness` owns a temp directory, a [`SableConfig`] whose storage,
//! memory, knowledge and python paths all point into it, and the mock
//! adapters an agent is assembled from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sable_config::SableConfig;
use sable_core::SableError;

use crate::mock_adapters::{MockEmbedder, MockReranker};
use crate::mock_provider::{MockProvider, MockTurn};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    turns: Vec<MockTurn>,
    dimensions: usize,
    configure: Vec<Box<dyn FnOnce(&mut SableConfig)>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            dimensions: 32,
            configure: Vec::new(),
        }
    }

    /// Plain text answers played back in order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.turns.extend(responses.into_iter().map(MockTurn::Text));
        self
    }

    pub fn with_turns(mut self, turns: Vec<MockTurn>) -> Self {
        self.turns.extend(turns);
        self
    }

    /// Embedding width for the mock embedder and the knowledge config.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Adjust the generated config after paths have been filled in.
    pub fn configure(mut self, f: impl FnOnce(&mut SableConfig) + 'static) -> Self {
        self.configure.push(Box::new(f));
        self
    }

    pub fn build(self) -> Result<TestHarness, SableError> {
        let temp_dir = tempfile::TempDir::new().map_err(SableError::storage)?;
        let root = temp_dir.path();
        let db_file = path_string(&root.join("agent.db"));

        let mut config = SableConfig::default();
        config.agent.system_prompt = None;
        config.storage.db_file = db_file.clone();
        config.memory.db_file = db_file;
        config.knowledge.vector_db.uri = path_string(&root.join("knowledge"));
        config.knowledge.vector_db.embedder.dimensions = self.dimensions;
        config.tools.python.base_dir = path_string(&root.join("python"));
        for f in self.configure {
            f(&mut config);
        }

        Ok(TestHarness {
            provider: Arc::new(MockProvider::with_turns(self.turns)),
            embedder: Arc::new(MockEmbedder::new(self.dimensions)),
            reranker: Arc::new(MockReranker::new()),
            config,
            temp_dir,
        })
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub reranker: Arc<MockReranker>,
    pub config: SableConfig,
    /// Kept alive so the directory is removed on drop.
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Root of the temp directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A path inside the temp directory.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }
}
