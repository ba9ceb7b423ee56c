use super::{launch_error, run_to_completion, StageContext};
use crate::error::{PipelineError, Result};
use crate::job::StageId;
use crate::plan::StageSink;
use crate::process::{describe, with_suffix, ScratchGuard, ToolStatus};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Exit states of the sort stage and, when piped, the conversion it feeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStatus {
    pub sort: Option<ToolStatus>,
    pub convert: Option<ToolStatus>,
}

/// Prefix of the sort tool's own scratch files, unique to the output path
pub fn scratch_prefix(output: &Path) -> PathBuf {
    with_suffix(output, "bamsormadup_tmp_")
}

pub fn sort_command(ctx: &StageContext, piped: bool) -> Command {
    let mut tmpfile = std::ffi::OsString::from("tmpfile=");
    tmpfile.push(scratch_prefix(&ctx.output));

    let mut cmd = Command::new(&ctx.config.tools.sorter);
    cmd.arg("inputformat=sam")
        .arg("outputformat=bam")
        .arg(format!("threads={}", ctx.threads_arg()))
        .arg(tmpfile);
    if piped {
        // Uncompressed, the converter re-encodes anyway
        cmd.arg("level=0");
    }
    cmd
}

pub fn convert_command(ctx: &StageContext) -> Command {
    let mut cmd = Command::new(&ctx.config.tools.samtools);
    cmd.arg("view")
        .arg("-")
        .arg("-T")
        .arg(&ctx.reference)
        .arg("-o")
        .arg(&ctx.output)
        .arg("-@")
        .arg(ctx.threads_arg());
    cmd
}

/// Sort and mark duplicates of `intermediate`.
///
/// With a file sink the sorted BAM goes straight to the output path. With a
/// pipe sink the sort tool's stdout feeds the converter's stdin and both
/// processes run at the same time; the converter sees EOF once the sort tool
/// exits. The sort tool's scratch files are removed whatever the outcome.
pub async fn run(ctx: &StageContext, intermediate: &Path, sink: StageSink) -> Result<SortStatus> {
    let mut scratch = ScratchGuard::new();
    scratch.push_prefix(scratch_prefix(&ctx.output));

    let input = tokio::fs::File::open(intermediate)
        .await
        .map_err(launch_error(StageId::Sort))?
        .into_std()
        .await;

    match sink {
        StageSink::File => {
            let out = tokio::fs::File::create(&ctx.output)
                .await
                .map_err(launch_error(StageId::Sort))?
                .into_std()
                .await;
            let mut cmd = sort_command(ctx, false);
            cmd.stdin(Stdio::from(input)).stdout(Stdio::from(out));

            let sort = run_to_completion(StageId::Sort, "Sorting", &mut cmd).await?;
            Ok(SortStatus {
                sort,
                convert: None,
            })
        }
        StageSink::Pipe => run_piped(ctx, input).await,
    }
}

async fn run_piped(ctx: &StageContext, input: std::fs::File) -> Result<SortStatus> {
    let mut sort = sort_command(ctx, true);
    sort.stdin(Stdio::from(input)).stdout(Stdio::piped());
    info!("Sorting with: {}", describe(&sort));
    let mut sort_child = sort.spawn().map_err(launch_error(StageId::Sort))?;
    drop(sort);

    let sort_stdout = sort_child.stdout.take().ok_or_else(|| PipelineError::StageLaunch {
        stage: StageId::Sort,
        source: std::io::Error::new(std::io::ErrorKind::Other, "sort stdout was not captured"),
    })?;
    let pipe: Stdio = sort_stdout
        .try_into()
        .map_err(launch_error(StageId::Convert))?;

    let mut convert = convert_command(ctx);
    convert.stdin(pipe);
    info!("Converting with: {}", describe(&convert));
    let spawned = convert.spawn();
    // Release our handle on the pipe so the sort tool sees a closed reader if the converter dies
    drop(convert);

    let mut convert_child = match spawned {
        Ok(child) => child,
        Err(e) => {
            // Nothing reads the pipe any more; reap the sort process before bailing out
            if let Err(wait_err) = sort_child.wait().await {
                warn!("Could not reap sort process: {}", wait_err);
            }
            return Err(PipelineError::StageLaunch {
                stage: StageId::Convert,
                source: e,
            });
        }
    };

    let (sort_status, convert_status) = tokio::join!(sort_child.wait(), convert_child.wait());

    Ok(SortStatus {
        sort: ToolStatus::from_exit(sort_status?),
        convert: ToolStatus::from_exit(convert_status?),
    })
}
