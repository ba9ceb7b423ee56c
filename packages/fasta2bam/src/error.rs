use crate::job::StageId;
use crate::process::ToolStatus;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Simulation worker {index} failed: {status}")]
    WorkerFailed { index: usize, status: ToolStatus },

    #[error("Simulation worker {index} could not be launched: {source}")]
    WorkerLaunch {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Merge failed on {}: {source}", path.display())]
    MergeIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage {stage} failed: {status}")]
    StageFailed { stage: StageId, status: ToolStatus },

    #[error("Stage {stage} could not be launched: {source}")]
    StageLaunch {
        stage: StageId,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid stage wiring: {0}")]
    InvalidPlan(String),

    #[error("Worker task panicked: {0}")]
    Join(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn invalid_input<E: std::fmt::Display>(e: E) -> Self {
        Self::InvalidInput(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    pub fn merge_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::MergeIo {
            path: path.into(),
            source,
        }
    }

    /// Failure class reported to the user
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::Config(_) => ErrorKind::InvalidInput,
            PipelineError::WorkerFailed { .. } | PipelineError::WorkerLaunch { .. } => {
                ErrorKind::WorkerFailure
            }
            PipelineError::MergeIo { .. } => ErrorKind::MergeIoFailure,
            PipelineError::StageFailed { .. } | PipelineError::StageLaunch { .. } => {
                ErrorKind::StageFailure
            }
            _ => ErrorKind::Internal,
        }
    }
}

/// Error taxonomy of a job. None of these is retried; the caller re-runs the whole job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Bad parameters or output path, detected before any process starts
    InvalidInput,
    /// A simulation worker exited non-zero or could not be launched
    WorkerFailure,
    /// Concatenating worker outputs failed; partial outputs are left in place
    MergeIoFailure,
    /// A pipeline chain stage exited non-zero or could not be launched
    StageFailure,
    /// Anything else (state machine misuse, panicked tasks, plain IO)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::WorkerFailure => "worker_failure",
            ErrorKind::MergeIoFailure => "merge_io_failure",
            ErrorKind::StageFailure => "stage_failure",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "invalid_input" => Ok(ErrorKind::InvalidInput),
            "worker_failure" => Ok(ErrorKind::WorkerFailure),
            "merge_io_failure" => Ok(ErrorKind::MergeIoFailure),
            "stage_failure" => Ok(ErrorKind::StageFailure),
            "internal" => Ok(ErrorKind::Internal),
            _ => Err(PipelineError::parse(format!("Invalid error kind: {}", s))),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
