use crate::error::{PipelineError, Result};
use crate::process::ToolStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Simulate,
    Merge,
    Align,
    Sort,
    Convert,
    Index,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Simulate => "Simulate",
            StageId::Merge => "Merge",
            StageId::Align => "Align",
            StageId::Sort => "Sort",
            StageId::Convert => "Convert",
            StageId::Index => "Index",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "Simulate" => Ok(StageId::Simulate),
            "Merge" => Ok(StageId::Merge),
            "Align" => Ok(StageId::Align),
            "Sort" => Ok(StageId::Sort),
            "Convert" => Ok(StageId::Convert),
            "Index" => Ok(StageId::Index),
            _ => Err(PipelineError::parse(format!("Invalid stage ID: {}", s))),
        }
    }

    /// Stages allowed to run right after this one
    pub fn successors(&self) -> &'static [StageId] {
        match self {
            StageId::Simulate => &[StageId::Merge],
            StageId::Merge => &[StageId::Align],
            StageId::Align => &[StageId::Sort],
            StageId::Sort => &[StageId::Convert, StageId::Index],
            StageId::Convert => &[StageId::Index],
            StageId::Index => &[],
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state enum
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        queued_at: DateTime<Utc>,
    },
    Running {
        started_at: DateTime<Utc>,
        current_stage: StageId,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        output: PathBuf,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        failed_stage: StageId,
        error: String,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    pub fn current_stage(&self) -> Option<StageId> {
        match self {
            JobState::Running { current_stage, .. } => Some(*current_stage),
            JobState::Failed { failed_stage, .. } => Some(*failed_stage),
            _ => None,
        }
    }
}

/// Job model
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub output: PathBuf,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new_queued(output: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            output,
            state: JobState::Queued { queued_at: now },
            created_at: now,
            updated_at: now,
        }
    }
}

/// Terminal result of a job. Produced once, at the end of the pipeline chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success(PathBuf),
    Failure { stage: StageId, status: ToolStatus },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            JobOutcome::Success(path) => Ok(path),
            JobOutcome::Failure { stage, status } => {
                Err(PipelineError::StageFailed { stage, status })
            }
        }
    }
}

/// Job state machine for transitions
pub struct JobStateMachine {
    job: Job,
}

impl JobStateMachine {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    /// Transition: QUEUED → RUNNING
    pub fn start(&mut self, first_stage: StageId) -> Result<()> {
        match &self.job.state {
            JobState::Queued { .. } => {
                let now = Utc::now();
                self.job.state = JobState::Running {
                    started_at: now,
                    current_stage: first_stage,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Move to the next stage. Starts the job when it is still queued.
    pub fn advance(&mut self, next: StageId) -> Result<()> {
        if matches!(self.job.state, JobState::Queued { .. }) {
            return self.start(next);
        }

        let current = match &self.job.state {
            JobState::Running { current_stage, .. } => *current_stage,
            _ => return Err(self.invalid(next.as_str())),
        };

        if !current.successors().contains(&next) {
            return Err(PipelineError::InvalidStateTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if let JobState::Running { current_stage, .. } = &mut self.job.state {
            *current_stage = next;
        }
        self.job.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: RUNNING(Index) → COMPLETED
    pub fn complete(&mut self, output: PathBuf) -> Result<()> {
        match &self.job.state {
            JobState::Running {
                started_at,
                current_stage: StageId::Index,
            } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds().max(0) as u64;

                self.job.state = JobState::Completed {
                    started_at: *started_at,
                    completed_at: now,
                    duration_ms,
                    output,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: RUNNING → FAILED
    pub fn fail(&mut self, failed_stage: StageId, error: String) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } => {
                let now = Utc::now();
                self.job.state = JobState::Failed {
                    started_at: *started_at,
                    failed_at: now,
                    failed_stage,
                    error,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    fn invalid(&self, to: &str) -> PipelineError {
        let from = match &self.job.state {
            JobState::Running { current_stage, .. } => {
                format!("{}({})", self.job.state.state_name(), current_stage)
            }
            other => other.state_name().to_string(),
        };
        PipelineError::InvalidStateTransition {
            from,
            to: to.to_string(),
        }
    }
}
