use crate::error::{PipelineError, Result};
use crate::executor::WorkerResult;
use crate::process::{discard, with_suffix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Final paired read files the worker outputs are concatenated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedOutput {
    pub pair_a: PathBuf,
    pub pair_b: PathBuf,
}

impl MergedOutput {
    pub fn new(pair_a: PathBuf, pair_b: PathBuf) -> Self {
        Self { pair_a, pair_b }
    }

    /// `<output>_1.fastq` and `<output>_2.fastq`, next to the alignment output
    pub fn for_output(output: &Path) -> Self {
        Self {
            pair_a: with_suffix(output, "_1.fastq"),
            pair_b: with_suffix(output, "_2.fastq"),
        }
    }
}

/// Concatenate worker outputs into `destination`, highest worker index first.
///
/// The reverse order is part of the output contract: runs with the same seed
/// produce byte-identical files.
///
/// Each worker's temporaries are deleted right after both of them were
/// copied. On failure, destinations keep whatever was written so far, and the
/// failing and not yet merged workers keep their temporaries.
pub async fn merge(results: &[WorkerResult], destination: &MergedOutput) -> Result<()> {
    let mut dst_a = create(&destination.pair_a).await?;
    let mut dst_b = create(&destination.pair_b).await?;

    let copied = copy_all(results, &mut dst_a, &mut dst_b, destination).await;

    // Flush on failure too: the partial destination holds everything copied
    let flushed_a = dst_a
        .flush()
        .await
        .map_err(|e| PipelineError::merge_io(&destination.pair_a, e));
    let flushed_b = dst_b
        .flush()
        .await
        .map_err(|e| PipelineError::merge_io(&destination.pair_b, e));
    copied?;
    flushed_a?;
    flushed_b?;

    info!(
        "Concatenated {} worker outputs into {} and {}",
        results.len(),
        destination.pair_a.display(),
        destination.pair_b.display()
    );
    Ok(())
}

async fn copy_all(
    results: &[WorkerResult],
    dst_a: &mut BufWriter<File>,
    dst_b: &mut BufWriter<File>,
    destination: &MergedOutput,
) -> Result<()> {
    for result in results.iter().rev() {
        debug!(
            "Merging worker {}: {} + {}",
            result.index,
            result.outputs.first.display(),
            result.outputs.second.display()
        );
        append(&result.outputs.first, dst_a, &destination.pair_a).await?;
        append(&result.outputs.second, dst_b, &destination.pair_b).await?;

        discard(&result.outputs.first).await;
        discard(&result.outputs.second).await;
    }
    Ok(())
}

async fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .await
        .map_err(|e| PipelineError::merge_io(path, e))?;
    Ok(BufWriter::new(file))
}

async fn append(source: &Path, dst: &mut BufWriter<File>, dst_path: &Path) -> Result<u64> {
    let mut src = File::open(source)
        .await
        .map_err(|e| PipelineError::merge_io(source, e))?;

    tokio::io::copy(&mut src, dst)
        .await
        .map_err(|e| PipelineError::merge_io(dst_path, e))
}
