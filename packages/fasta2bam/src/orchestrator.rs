use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::executor::{WorkerPool, WorkerResult};
use crate::format::OutputFormat;
use crate::job::{Job, JobOutcome, JobStateMachine, StageId};
use crate::merge::{merge, MergedOutput};
use crate::partition::{partition, WorkUnit};
use crate::pipeline::PipelineChain;
use crate::stages::ArtIlluminaInvoker;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Rough size of simulated reads (both mates, FASTQ) per unit of coverage,
/// relative to the size of the simulated FASTA
const FASTQ_BYTES_PER_REF_BYTE: f64 = 2.25;

/// One end-to-end run: simulate reads from `fasta_input`, align them to `fasta_ref`
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub fasta_input: PathBuf,
    pub fasta_ref: PathBuf,
    pub output: PathBuf,
    pub coverage: u32,
    pub processes: usize,
    pub seed: u64,
}

impl JobRequest {
    /// Checks everything that can be checked before a process is launched
    pub fn validate(&self) -> Result<OutputFormat> {
        let format = OutputFormat::from_path(&self.output)?;
        if self.coverage < 1 {
            return Err(PipelineError::invalid_input("coverage must be at least 1"));
        }
        if self.processes < 1 {
            return Err(PipelineError::invalid_input(
                "process count must be at least 1",
            ));
        }
        let inputs = [
            ("input FASTA", &self.fasta_input),
            ("reference FASTA", &self.fasta_ref),
        ];
        for (what, path) in inputs {
            if !path.is_file() {
                return Err(PipelineError::invalid_input(format!(
                    "{} not found: {}",
                    what,
                    path.display()
                )));
            }
        }
        Ok(format)
    }
}

/// Simulation stage (partition → worker pool → ordered merge) followed by the pipeline chain
pub struct JobOrchestrator {
    config: Arc<PipelineConfig>,
}

impl JobOrchestrator {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute a job (main entry point)
    ///
    /// Stage failures of the chain come back as `JobOutcome::Failure`; worker,
    /// merge and launch failures as `Err`. Either way the returned or logged
    /// job is in a terminal state.
    pub async fn execute_job(&self, request: &JobRequest) -> Result<(Job, JobOutcome)> {
        let format = request.validate()?;
        let start_time = Instant::now();

        let available = num_cpus::get();
        if request.processes > available {
            warn!(
                "{} processes requested but only {} cores available",
                request.processes, available
            );
        }

        let mut sm = JobStateMachine::new(Job::new_queued(request.output.clone()));
        info!(
            "Starting job {}: {} -> {} ({}, coverage {}, seed {})",
            sm.job().id,
            request.fasta_input.display(),
            request.output.display(),
            format,
            request.coverage,
            request.seed
        );

        let reads = MergedOutput::for_output(&request.output);

        sm.advance(StageId::Simulate)?;
        let results = match self.simulate(request, &reads).await {
            Ok(results) => results,
            Err(e) => return Err(Self::abort(sm, StageId::Simulate, e)),
        };

        sm.advance(StageId::Merge)?;
        if let Err(e) = merge(&results, &reads).await {
            return Err(Self::abort(sm, StageId::Merge, e));
        }

        let chain = PipelineChain::new(self.config.clone());
        let outcome = chain
            .run(
                &mut sm,
                &request.fasta_ref,
                &reads,
                &request.output,
                request.processes,
            )
            .await?;

        let job = sm.into_job();
        match &outcome {
            JobOutcome::Success(path) => info!(
                "Job {} completed in {}ms: built {} from {}",
                job.id,
                start_time.elapsed().as_millis(),
                path.display(),
                request.fasta_ref.display()
            ),
            JobOutcome::Failure { stage, status } => {
                error!("Job {} failed at stage {}: {}", job.id, stage, status)
            }
        }

        Ok((job, outcome))
    }

    /// Run a job and flatten its outcome into the output path or an error
    pub async fn run(&self, request: &JobRequest) -> Result<PathBuf> {
        let (_, outcome) = self.execute_job(request).await?;
        outcome.into_result()
    }

    async fn simulate(
        &self,
        request: &JobRequest,
        reads: &MergedOutput,
    ) -> Result<Vec<WorkerResult>> {
        let units = partition(request.coverage, request.processes, request.seed)?;
        Self::log_partition(&units, &request.fasta_input).await;

        let invoker = Arc::new(ArtIlluminaInvoker::new(
            self.config.clone(),
            request.fasta_input.clone(),
            reads.pair_a.clone(),
        ));
        info!(
            "Simulating reads with common args: {}",
            invoker
                .common_args()
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );

        WorkerPool::new(request.processes)
            .execute(units, invoker)
            .await
    }

    async fn log_partition(units: &[WorkUnit], fasta_input: &Path) {
        let coverages: Vec<u32> = units.iter().map(|u| u.quantity).collect();
        info!(
            "Simulation workers: {}, with coverages: {:?}",
            units.len(),
            coverages
        );

        if let Ok(meta) = tokio::fs::metadata(fasta_input).await {
            let ref_gib = meta.len() as f64 / (1024.0 * 1024.0 * 1024.0);
            let expected: Vec<String> = coverages
                .iter()
                .map(|&c| format!("{:.2}", c as f64 * ref_gib * FASTQ_BYTES_PER_REF_BYTE))
                .collect();
            info!("Expected output per worker (GiB): {}", expected.join(", "));
        }
    }

    fn abort(mut sm: JobStateMachine, stage: StageId, e: PipelineError) -> PipelineError {
        error!("Job {} failed at stage {}: {}", sm.job().id, stage, e);
        if let Err(transition) = sm.fail(stage, e.to_string()) {
            warn!("Could not record failure: {}", transition);
        }
        e
    }
}
