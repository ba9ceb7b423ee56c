// Command builders and runners for the external tools

pub mod align;
pub mod index;
pub mod simulate;
pub mod sort;

pub use simulate::ArtIlluminaInvoker;
pub use sort::SortStatus;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::job::StageId;
use crate::process::{describe, ToolStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::info;

/// Everything a chain stage needs to build its command line
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<PipelineConfig>,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub threads: usize,
}

impl StageContext {
    pub fn threads_arg(&self) -> String {
        self.threads.max(1).to_string()
    }
}

/// Log, launch and wait for a single stage process.
/// `Ok(None)` on success, `Ok(Some(status))` when the tool failed.
pub(crate) async fn run_to_completion(
    stage: StageId,
    label: &str,
    cmd: &mut Command,
) -> Result<Option<ToolStatus>> {
    info!("{} with: {}", label, describe(cmd));

    let status = cmd
        .status()
        .await
        .map_err(|source| PipelineError::StageLaunch { stage, source })?;

    Ok(ToolStatus::from_exit(status))
}

pub(crate) fn launch_error(stage: StageId) -> impl FnOnce(std::io::Error) -> PipelineError {
    move |source| PipelineError::StageLaunch { stage, source }
}
