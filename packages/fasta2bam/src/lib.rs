/*
 * fasta2bam - Synthetic Read Alignment Pipeline
 *
 * Simulates paired-end reads from a FASTA genome and turns them into an
 * indexed, coordinate-sorted, duplicate-marked BAM or CRAM.
 *
 * Architecture:
 * - Coverage partitioning across simulator workers
 * - Bounded worker pool with cooperative failure stop
 * - Ordered merge of worker outputs
 * - Pipeline chain: align → sort/dedup → [convert] → index
 * - Job state machine over the whole run
 */

// Public modules
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod job;
pub mod merge;
pub mod orchestrator;
pub mod partition;
pub mod pipeline;
pub mod plan;
pub mod process;
pub mod stages;

// Re-exports
pub use config::{AlignerConfig, PipelineConfig, SimulatorConfig, ToolPaths};
pub use error::{ErrorKind, PipelineError, Result};
pub use executor::{ReadPair, WorkerInvoker, WorkerPool, WorkerResult};
pub use format::OutputFormat;
pub use job::{Job, JobOutcome, JobState, JobStateMachine, StageId};
pub use merge::{merge, MergedOutput};
pub use orchestrator::{JobOrchestrator, JobRequest};
pub use partition::{partition, WorkUnit};
pub use pipeline::PipelineChain;
pub use plan::{ChainPlan, StageInput, StageNode, StageSink};
pub use process::{ScratchGuard, ToolStatus};
pub use stages::{ArtIlluminaInvoker, SortStatus, StageContext};
