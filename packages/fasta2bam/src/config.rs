//! Tool locations and the fixed simulation/alignment parameters.
//!
//! Everything has a default matching the usual tool names on `PATH`, so a
//! config file is only needed to point at other binaries or tweak the
//! read model.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// External executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub simulator: PathBuf,
    pub aligner: PathBuf,
    pub sorter: PathBuf,
    /// Used for CRAM conversion and indexing
    pub samtools: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            simulator: PathBuf::from("art_illumina"),
            aligner: PathBuf::from("bwa"),
            sorter: PathBuf::from("bamsormadup"),
            samtools: PathBuf::from("samtools"),
        }
    }
}

/// Read simulator model/library parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub read_length: u32,
    pub fragment_mean: u32,
    pub fragment_stddev: u32,
    /// Sequencing system profile tag
    pub platform: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            read_length: 150,
            fragment_mean: 500,
            fragment_stddev: 20,
            platform: "HS25".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Read group header line, tab escapes kept literal
    pub read_group: String,
    /// Input bases per batch, fixed so output does not depend on thread count
    pub batch_size: u64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            read_group: "@RG\\tID:INSILICO\\tSM:NORMAL".to_string(),
            batch_size: 400_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tools: ToolPaths,
    pub simulator: SimulatorConfig,
    pub aligner: AlignerConfig,
}

impl PipelineConfig {
    /// Load from a YAML file, or JSON when the file ends in `.json`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content).map_err(PipelineError::config)?
        } else {
            serde_yaml::from_str(&content).map_err(PipelineError::config)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let tools = [
            ("simulator", &self.tools.simulator),
            ("aligner", &self.tools.aligner),
            ("sorter", &self.tools.sorter),
            ("samtools", &self.tools.samtools),
        ];
        for (name, path) in tools {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::config(format!("tools.{} is empty", name)));
            }
        }

        if self.simulator.read_length == 0 {
            return Err(PipelineError::config("simulator.read_length must be > 0"));
        }
        if self.simulator.fragment_mean < self.simulator.read_length {
            return Err(PipelineError::config(format!(
                "simulator.fragment_mean ({}) is shorter than read_length ({})",
                self.simulator.fragment_mean, self.simulator.read_length
            )));
        }
        if self.simulator.platform.is_empty() {
            return Err(PipelineError::config("simulator.platform is empty"));
        }
        if !self.aligner.read_group.starts_with("@RG") {
            return Err(PipelineError::config(
                "aligner.read_group must start with @RG",
            ));
        }
        if self.aligner.batch_size == 0 {
            return Err(PipelineError::config("aligner.batch_size must be > 0"));
        }
        Ok(())
    }
}
