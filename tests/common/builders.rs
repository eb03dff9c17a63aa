//! Test environment builders

use pipeline_services::{ServiceConfig, Services};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Services plus the temporary directory backing its resource paths
pub struct TestEnv {
    pub dir: TempDir,
    pub services: Services,
}

impl TestEnv {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dot_dir(&self) -> PathBuf {
        self.dir.path().join("dots")
    }
}

/// Builder for a service whose stream, config and model directories live in
/// a fresh temporary directory
pub struct TestEnvBuilder {
    files: Vec<String>,
    max_sources: Option<u32>,
    dot_dumps: bool,
}

impl TestEnvBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            max_sources: None,
            dot_dumps: false,
        }
    }

    /// Create an empty resource file (stream, infer config or model)
    pub fn file(mut self, name: &str) -> Self {
        self.files.push(name.to_string());
        self
    }

    pub fn max_sources(mut self, max: u32) -> Self {
        self.max_sources = Some(max);
        self
    }

    pub fn dot_dumps(mut self) -> Self {
        self.dot_dumps = true;
        self
    }

    pub fn config(&self, dir: &Path) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.stream_dir = dir.to_path_buf();
        config.config_dir = dir.to_path_buf();
        config.model_dir = dir.to_path_buf();
        if let Some(max) = self.max_sources {
            config.max_sources_in_use = max;
        }
        if self.dot_dumps {
            config.dot_dump_dir = Some(dir.join("dots"));
        }
        config
    }

    pub fn build(self) -> TestEnv {
        let dir = TempDir::new().expect("temp dir");
        for file in &self.files {
            std::fs::write(dir.path().join(file), b"").expect("resource file");
        }
        let services = Services::new(self.config(dir.path()));
        TestEnv { dir, services }
    }
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_builder() {
        let env = TestEnvBuilder::new()
            .file("clip.mp4")
            .max_sources(2)
            .dot_dumps()
            .build();

        assert!(env.path().join("clip.mp4").is_file());
        assert_eq!(env.services.num_sources_in_use_max(), 2);
        assert_eq!(env.services.config().dot_dump_dir, Some(env.dot_dir()));
    }
}
