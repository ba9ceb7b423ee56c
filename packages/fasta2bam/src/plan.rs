use crate::error::{PipelineError, Result};
use crate::format::OutputFormat;
use crate::job::StageId;

/// Where a stage reads its alignment stream from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// Named file(s) opened by the stage
    File,
    /// stdin, fed by the previous stage's stdout
    Pipe,
}

/// Where a stage writes its alignment stream to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSink {
    File,
    /// stdout, consumed by the next stage while both run
    Pipe,
}

/// Stage node in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNode {
    pub id: StageId,
    pub name: &'static str,
    pub input: StageInput,
    pub output: StageSink,
}

impl StageNode {
    pub fn new(id: StageId, name: &'static str, input: StageInput, output: StageSink) -> Self {
        Self {
            id,
            name,
            input,
            output,
        }
    }
}

/// Linear align → sort → [convert] → index plan
#[derive(Debug, Clone)]
pub struct ChainPlan {
    stages: Vec<StageNode>,
}

impl ChainPlan {
    /// Validate stage order and boundary wiring
    pub fn new(stages: Vec<StageNode>) -> Result<Self> {
        let first = stages
            .first()
            .ok_or_else(|| PipelineError::InvalidPlan("empty plan".to_string()))?;
        if first.id != StageId::Align {
            return Err(PipelineError::InvalidPlan(format!(
                "chain must start with Align, not {}",
                first.id
            )));
        }
        if first.input == StageInput::Pipe {
            return Err(PipelineError::InvalidPlan(
                "first stage has no upstream pipe".to_string(),
            ));
        }

        for pair in stages.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if !prev.id.successors().contains(&next.id) {
                return Err(PipelineError::InvalidPlan(format!(
                    "{} cannot follow {}",
                    next.id, prev.id
                )));
            }
            let piped = prev.output == StageSink::Pipe;
            if piped != (next.input == StageInput::Pipe) {
                return Err(PipelineError::InvalidPlan(format!(
                    "{} -> {}: a pipe must connect both sides of the boundary",
                    prev.id, next.id
                )));
            }
        }

        let last = &stages[stages.len() - 1];
        if last.id != StageId::Index {
            return Err(PipelineError::InvalidPlan(format!(
                "chain must end with Index, not {}",
                last.id
            )));
        }

        Ok(Self { stages })
    }

    /// Default chain for an output format
    pub fn for_format(format: OutputFormat) -> Self {
        let align = StageNode::new(StageId::Align, "Alignment", StageInput::File, StageSink::File);
        let index = StageNode::new(StageId::Index, "Indexing", StageInput::File, StageSink::File);

        let stages = if format.needs_conversion() {
            vec![
                align,
                StageNode::new(StageId::Sort, "Sort/Dedup", StageInput::File, StageSink::Pipe),
                StageNode::new(
                    StageId::Convert,
                    "Format Conversion",
                    StageInput::Pipe,
                    StageSink::File,
                ),
                index,
            ]
        } else {
            vec![
                align,
                StageNode::new(StageId::Sort, "Sort/Dedup", StageInput::File, StageSink::File),
                index,
            ]
        };

        Self { stages }
    }

    pub fn stages(&self) -> &[StageNode] {
        &self.stages
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.stages.iter().any(|s| s.id == id)
    }

    /// Get execution plan as string (for logging)
    pub fn execution_plan(&self) -> String {
        self.stages
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                if stage.output == StageSink::Pipe {
                    format!("Step {}: {} (piped into next step)", i + 1, stage.name)
                } else {
                    format!("Step {}: {}", i + 1, stage.name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(plan: &ChainPlan) -> Vec<StageId> {
        plan.stages().iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_bam_plan_skips_conversion() {
        let plan = ChainPlan::for_format(OutputFormat::Bam);
        assert_eq!(ids(&plan), vec![StageId::Align, StageId::Sort, StageId::Index]);
        assert!(!plan.contains(StageId::Convert));
        assert_eq!(plan.stages()[1].output, StageSink::File);
    }

    #[test]
    fn test_cram_plan_pipes_sort_into_convert() {
        let plan = ChainPlan::for_format(OutputFormat::Cram);
        assert_eq!(
            ids(&plan),
            vec![StageId::Align, StageId::Sort, StageId::Convert, StageId::Index]
        );
        assert_eq!(plan.stages()[1].output, StageSink::Pipe);
        assert_eq!(plan.stages()[2].input, StageInput::Pipe);
    }

    #[test]
    fn test_default_plans_pass_validation() {
        for format in [OutputFormat::Bam, OutputFormat::Cram] {
            let stages = ChainPlan::for_format(format).stages().to_vec();
            assert!(ChainPlan::new(stages).is_ok());
        }
    }

    #[test]
    fn test_every_plan_ends_with_index() {
        for format in [OutputFormat::Bam, OutputFormat::Cram] {
            let plan = ChainPlan::for_format(format);
            assert_eq!(plan.stages().last().unwrap().id, StageId::Index);
        }
    }

    #[test]
    fn test_pipe_must_meet_pipe() {
        let stages = vec![
            StageNode::new(StageId::Align, "Alignment", StageInput::File, StageSink::File),
            StageNode::new(StageId::Sort, "Sort/Dedup", StageInput::File, StageSink::Pipe),
            StageNode::new(StageId::Index, "Indexing", StageInput::File, StageSink::File),
        ];
        assert!(matches!(
            ChainPlan::new(stages),
            Err(PipelineError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_plan_without_index_rejected() {
        let stages = vec![
            StageNode::new(StageId::Align, "Alignment", StageInput::File, StageSink::File),
            StageNode::new(StageId::Sort, "Sort/Dedup", StageInput::File, StageSink::File),
        ];
        assert!(ChainPlan::new(stages).is_err());
    }

    #[test]
    fn test_out_of_order_plan_rejected() {
        let stages = vec![
            StageNode::new(StageId::Align, "Alignment", StageInput::File, StageSink::File),
            StageNode::new(StageId::Index, "Indexing", StageInput::File, StageSink::File),
        ];
        assert!(ChainPlan::new(stages).is_err());
        assert!(ChainPlan::new(vec![]).is_err());
    }

    #[test]
    fn test_execution_plan_string() {
        let plan = ChainPlan::for_format(OutputFormat::Cram).execution_plan();
        assert!(plan.contains("Step 1: Alignment"));
        assert!(plan.contains("Step 2: Sort/Dedup (piped into next step)"));
        assert!(plan.contains("Step 4: Indexing"));
    }
}
