use super::{run_to_completion, StageContext};
use crate::error::Result;
use crate::job::StageId;
use crate::process::ToolStatus;
use std::process::Stdio;
use tokio::process::Command;

pub fn command(ctx: &StageContext) -> Command {
    let mut cmd = Command::new(&ctx.config.tools.samtools);
    cmd.arg("index")
        .arg("-@")
        .arg(ctx.threads_arg())
        .arg(&ctx.output);
    cmd
}

/// Writes the sibling index (`.bai`/`.crai`) of the finished output
pub async fn run(ctx: &StageContext) -> Result<Option<ToolStatus>> {
    let mut cmd = command(ctx);
    cmd.stdin(Stdio::null());
    run_to_completion(StageId::Index, "Indexing", &mut cmd).await
}
