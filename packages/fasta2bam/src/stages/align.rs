use super::{launch_error, run_to_completion, StageContext};
use crate::error::Result;
use crate::job::StageId;
use crate::merge::MergedOutput;
use crate::process::ToolStatus;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub fn command(ctx: &StageContext, reads: &MergedOutput) -> Command {
    let aligner = &ctx.config.aligner;
    let mut cmd = Command::new(&ctx.config.tools.aligner);
    cmd.arg("mem")
        .arg("-Y") // soft-clip supplementary alignments
        .arg("-K")
        .arg(aligner.batch_size.to_string())
        .arg("-R")
        .arg(&aligner.read_group)
        .arg("-t")
        .arg(ctx.threads_arg())
        .arg(&ctx.reference)
        .arg(&reads.pair_a)
        .arg(&reads.pair_b);
    cmd
}

/// Align into `intermediate`. The aligner writes its own threads' output in
/// arbitrary interleaving, so it goes to a file that is complete before sorting.
pub async fn run(
    ctx: &StageContext,
    reads: &MergedOutput,
    intermediate: &Path,
) -> Result<Option<ToolStatus>> {
    let sink = tokio::fs::File::create(intermediate)
        .await
        .map_err(launch_error(StageId::Align))?
        .into_std()
        .await;

    let mut cmd = command(ctx, reads);
    cmd.stdin(Stdio::null()).stdout(Stdio::from(sink));

    run_to_completion(StageId::Align, "Aligning reads", &mut cmd).await
}
