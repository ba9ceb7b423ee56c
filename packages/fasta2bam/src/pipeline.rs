use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::format::OutputFormat;
use crate::job::{JobOutcome, JobStateMachine, StageId};
use crate::merge::MergedOutput;
use crate::plan::ChainPlan;
use crate::process::{discard, with_suffix, ScratchGuard, ToolStatus};
use crate::stages::{align, index, sort, StageContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs align → sort/dedup → [convert] → index over a pair of read files
pub struct PipelineChain {
    config: Arc<PipelineConfig>,
}

impl PipelineChain {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Intermediate alignment stream written by the aligner
    pub fn intermediate_path(output: &Path) -> PathBuf {
        with_suffix(output, ".bwa.sam")
    }

    /// Run the chain for `output`, advancing `sm` through every stage.
    ///
    /// A stage exiting non-zero ends the chain with `JobOutcome::Failure`
    /// and marks the job failed; a stage that cannot be launched is an `Err`.
    /// The read pair is consumed: it is deleted once the aligner has run,
    /// whatever its exit status.
    pub async fn run(
        &self,
        sm: &mut JobStateMachine,
        reference: &Path,
        reads: &MergedOutput,
        output: &Path,
        threads: usize,
    ) -> Result<JobOutcome> {
        let format = OutputFormat::from_path(output)?;
        let plan = ChainPlan::for_format(format);
        info!("Pipeline chain for {} output:\n{}", format, plan.execution_plan());

        let ctx = StageContext {
            config: self.config.clone(),
            reference: reference.to_path_buf(),
            output: output.to_path_buf(),
            threads,
        };
        let intermediate = Self::intermediate_path(output);
        let mut intermediate_guard = Some(ScratchGuard::with_path(&intermediate));
        let mut piped_convert: Option<ToolStatus> = None;

        for node in plan.stages() {
            sm.advance(node.id)?;
            let start = Instant::now();

            let result = match node.id {
                StageId::Align => {
                    let result = align::run(&ctx, reads, &intermediate).await;
                    if result.is_ok() {
                        discard(&reads.pair_a).await;
                        discard(&reads.pair_b).await;
                    }
                    result
                }
                StageId::Sort => {
                    let result = sort::run(&ctx, &intermediate, node.output).await;
                    // Intermediate is fully consumed at this point
                    drop(intermediate_guard.take());
                    result.map(|status| {
                        piped_convert = status.convert;
                        status.sort
                    })
                }
                // Already ran concurrently with Sort
                StageId::Convert => Ok(piped_convert.take()),
                StageId::Index => index::run(&ctx).await,
                other => Err(PipelineError::InvalidPlan(format!(
                    "{} is not a chain stage",
                    other
                ))),
            };

            match result {
                Ok(None) => {
                    info!(
                        "Stage {} finished in {}ms",
                        node.name,
                        start.elapsed().as_millis()
                    );
                }
                Ok(Some(status)) => {
                    error!("Stage {} failed: {}", node.name, status);
                    sm.fail(node.id, status.to_string())?;
                    return Ok(JobOutcome::Failure {
                        stage: node.id,
                        status,
                    });
                }
                Err(e) => {
                    let stage = match &e {
                        PipelineError::StageLaunch { stage, .. } => *stage,
                        _ => node.id,
                    };
                    error!("Stage {} could not run: {}", stage, e);
                    sm.fail(stage, e.to_string())?;
                    return Err(e);
                }
            }
        }

        sm.complete(output.to_path_buf())?;
        Ok(JobOutcome::Success(output.to_path_buf()))
    }
}
