use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::executor::{ReadPair, WorkerInvoker};
use crate::partition::WorkUnit;
use crate::process::{describe, with_suffix, ToolStatus};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Runs one ART-Illumina paired-end simulation per work unit
pub struct ArtIlluminaInvoker {
    config: Arc<PipelineConfig>,
    fasta_input: PathBuf,
    /// Worker prefixes are derived from this path
    prefix_base: PathBuf,
}

impl ArtIlluminaInvoker {
    pub fn new(config: Arc<PipelineConfig>, fasta_input: PathBuf, prefix_base: PathBuf) -> Self {
        Self {
            config,
            fasta_input,
            prefix_base,
        }
    }

    /// Arguments shared by every worker
    pub fn common_args(&self) -> Vec<OsString> {
        let sim = &self.config.simulator;
        let mut args: Vec<OsString> = [
            "-q", // quiet
            "-p", // paired-end
            "-na", // no alignment output
            "-ss",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(sim.platform.clone().into());
        args.push("-l".into());
        args.push(sim.read_length.to_string().into());
        args.push("-m".into());
        args.push(sim.fragment_mean.to_string().into());
        args.push("-s".into());
        args.push(sim.fragment_stddev.to_string().into());
        args.push("-i".into());
        args.push(self.fasta_input.clone().into());
        args
    }

    /// Unique per unit, so concurrent workers never share output files
    pub fn output_prefix(&self, unit: &WorkUnit) -> PathBuf {
        with_suffix(
            &self.prefix_base,
            &format!("{}_x{}_out", unit.index, unit.quantity),
        )
    }

    pub fn outputs_for(prefix: &Path) -> ReadPair {
        ReadPair {
            first: with_suffix(prefix, "1.fq"),
            second: with_suffix(prefix, "2.fq"),
        }
    }

    pub fn command(&self, unit: &WorkUnit) -> Command {
        let mut cmd = Command::new(&self.config.tools.simulator);
        cmd.args(self.common_args())
            .arg("-f")
            .arg(unit.quantity.to_string())
            .arg("-rs")
            .arg(unit.seed.to_string())
            .arg("-o")
            .arg(self.output_prefix(unit))
            .arg("--id")
            .arg(format!("{}_x{}_", unit.index, unit.quantity))
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }
}

#[async_trait]
impl WorkerInvoker for ArtIlluminaInvoker {
    async fn invoke(&self, unit: &WorkUnit) -> Result<ReadPair> {
        let mut cmd = self.command(unit);
        debug!("Worker {}: {}", unit.index, describe(&cmd));

        let status = cmd
            .status()
            .await
            .map_err(|source| PipelineError::WorkerLaunch {
                index: unit.index,
                source,
            })?;

        if let Some(status) = ToolStatus::from_exit(status) {
            return Err(PipelineError::WorkerFailed {
                index: unit.index,
                status,
            });
        }

        Ok(Self::outputs_for(&self.output_prefix(unit)))
    }
}
