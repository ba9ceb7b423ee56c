//! fasta2bam CLI
//!
//! # Usage
//!
//! ```bash
//! fasta2bam -i genome.fa -f reference.fa -o sample.cram -c 30 -p 8
//!
//! # Reproducible run with custom tool locations
//! fasta2bam -i genome.fa -f reference.fa -o sample.bam -c 10 -s 42 --config tools.yaml
//! ```

use anyhow::Context;
use clap::Parser;
use fasta2bam::{JobOrchestrator, JobOutcome, JobRequest, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fasta2bam")]
#[command(about = "Simulate paired-end reads from a FASTA and build an indexed BAM/CRAM", long_about = None)]
struct Cli {
    /// FASTA to simulate reads from
    #[arg(short = 'i', long)]
    fasta_input: PathBuf,

    /// Reference FASTA (bwa-indexed) to align against
    #[arg(short = 'f', long)]
    fasta_ref: PathBuf,

    /// Output path, ending in .bam or .cram
    #[arg(short, long)]
    output: PathBuf,

    /// Total coverage to simulate
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    coverage: u32,

    /// Simulation workers, also the thread count of every chain stage
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    processes: u64,

    /// Base seed; worker i uses seed + i. Random when omitted.
    #[arg(short, long)]
    seed: Option<u64>,

    /// YAML or JSON file overriding tool paths and parameters
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = JobRequest {
        fasta_input: cli.fasta_input,
        fasta_ref: cli.fasta_ref,
        output: cli.output,
        coverage: cli.coverage,
        processes: cli.processes as usize,
        seed: cli.seed.unwrap_or_else(|| rand::random::<u32>() as u64),
    };

    let orchestrator = JobOrchestrator::new(Arc::new(config));
    match orchestrator.execute_job(&request).await {
        Ok((_, JobOutcome::Success(path))) => {
            info!("Wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Ok((_, JobOutcome::Failure { stage, status })) => {
            error!("Stage {} failed: {}", stage, status);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{} error: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
