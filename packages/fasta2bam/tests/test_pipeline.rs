//! End-to-end runs against fake tools
//!
//! Covers:
//! - BAM and CRAM chains, including the sort → convert pipe
//! - Reverse-order merge of worker outputs
//! - Stage and worker failures, and scratch cleanup on each path

#![cfg(unix)]

mod common;

use common::{FakeTools, Failing};
use fasta2bam::{
    JobOrchestrator, JobOutcome, JobState, PipelineError, StageId, ToolStatus,
};
use std::sync::Arc;

fn orchestrator(tools: &FakeTools) -> JobOrchestrator {
    JobOrchestrator::new(Arc::new(tools.config.clone()))
}

const MERGED_READS: &str = "seed=102/1\nseed=101/1\nseed=100/1\n\
                            seed=102/2\nseed=101/2\nseed=100/2\n";

#[tokio::test]
async fn test_bam_run_skips_conversion_and_cleans_up() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Nothing);
    let request = tools.request("out.bam", 3, 3, 100);

    let (job, outcome) = orchestrator(&tools).execute_job(&request).await.unwrap();

    assert_eq!(outcome, JobOutcome::Success(request.output.clone()));
    assert!(matches!(job.state, JobState::Completed { .. }));
    assert_eq!(
        std::fs::read_to_string(&request.output).unwrap(),
        MERGED_READS
    );

    let log = tools.log();
    assert!(!log.contains("samtools view"));
    assert!(!log.contains("level=0"));
    assert!(log.contains("samtools index -@ 3"));

    // Only the output and its index survive
    assert_eq!(tools.leftovers(), vec!["out.bam", "out.bam.idx"]);
}

#[tokio::test]
async fn test_cram_run_pipes_sort_into_conversion() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Nothing);
    let request = tools.request("out.cram", 3, 3, 100);

    let path = orchestrator(&tools).run(&request).await.unwrap();

    assert_eq!(path, request.output);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), MERGED_READS);

    let log = tools.log();
    let sort_line = log.lines().find(|l| l.starts_with("bamsormadup")).unwrap();
    assert!(sort_line.ends_with("level=0"));
    assert!(log.contains("samtools view - -T"));

    // Conversion happens before indexing
    let view = log.find("samtools view").unwrap();
    let index = log.find("samtools index").unwrap();
    assert!(view < index);

    assert_eq!(tools.leftovers(), vec!["out.cram", "out.cram.idx"]);
}

#[tokio::test]
async fn test_workers_are_merged_in_reverse_order() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Nothing);
    // 5 over 2 workers: worker 0 gets 3, worker 1 gets 2
    let request = tools.request("out.bam", 5, 2, 7);

    orchestrator(&tools).run(&request).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&request.output).unwrap(),
        "seed=8/1\nseed=7/1\nseed=8/2\nseed=7/2\n"
    );

    let log = tools.log();
    assert!(log.contains("-f 3 -rs 7"));
    assert!(log.contains("-f 2 -rs 8"));
    assert!(log.contains("--id 0_x3_"));
    assert!(log.contains("--id 1_x2_"));
}

#[tokio::test]
async fn test_sort_failure_stops_chain_and_removes_scratch() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Sorter);
    let request = tools.request("out.bam", 2, 2, 1);

    let (job, outcome) = orchestrator(&tools).execute_job(&request).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failure {
            stage: StageId::Sort,
            status: ToolStatus::Code(3),
        }
    );
    assert!(matches!(
        job.state,
        JobState::Failed {
            failed_stage: StageId::Sort,
            ..
        }
    ));
    assert!(!tools.log().contains("samtools index"));

    let leftovers = tools.leftovers();
    assert!(leftovers.iter().all(|name| !name.contains("bamsormadup_tmp_")));
    assert!(leftovers.iter().all(|name| !name.ends_with(".bwa.sam")));
    assert!(leftovers.iter().all(|name| !name.ends_with(".fastq")));
}

#[tokio::test]
async fn test_piped_sort_failure_is_reported_as_sort() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Sorter);
    let request = tools.request("out.cram", 1, 1, 1);

    let err = orchestrator(&tools).run(&request).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: StageId::Sort,
            status: ToolStatus::Code(3),
        }
    ));
    assert!(!tools.log().contains("samtools index"));
}

#[tokio::test]
async fn test_align_failure_removes_reads_and_intermediate() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Aligner);
    let request = tools.request("out.bam", 2, 2, 1);

    let (job, outcome) = orchestrator(&tools).execute_job(&request).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failure {
            stage: StageId::Align,
            status: ToolStatus::Code(4),
        }
    );
    assert!(matches!(
        job.state,
        JobState::Failed {
            failed_stage: StageId::Align,
            ..
        }
    ));
    assert!(!tools.log().contains("bamsormadup"));
    // Reads, the partial alignment and worker outputs are all gone
    assert!(tools.leftovers().is_empty(), "{:?}", tools.leftovers());
}

#[tokio::test]
async fn test_convert_failure_stops_before_index() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Converter);
    let request = tools.request("out.cram", 2, 2, 1);

    let (job, outcome) = orchestrator(&tools).execute_job(&request).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failure {
            stage: StageId::Convert,
            status: ToolStatus::Code(5),
        }
    );
    assert!(matches!(
        job.state,
        JobState::Failed {
            failed_stage: StageId::Convert,
            ..
        }
    ));
    assert!(!tools.log().contains("samtools index"));

    let leftovers = tools.leftovers();
    assert!(leftovers.iter().all(|name| !name.contains("bamsormadup_tmp_")));
    assert!(leftovers.iter().all(|name| !name.ends_with(".bwa.sam")));
}

#[tokio::test]
async fn test_index_failure_keeps_output() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::Index);
    let request = tools.request("out.bam", 1, 1, 1);

    let (_, outcome) = orchestrator(&tools).execute_job(&request).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failure {
            stage: StageId::Index,
            status: ToolStatus::Code(3),
        }
    );
    assert!(request.output.exists());
}

#[tokio::test]
async fn test_worker_failure_skips_merge_and_chain() {
    let _serial = common::serial();
    let tools = FakeTools::new(Failing::SimulatorSeed(101));
    let request = tools.request("out.bam", 3, 3, 100);

    let err = orchestrator(&tools).run(&request).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::WorkerFailed {
            index: 1,
            status: ToolStatus::Code(3),
        }
    ));
    assert!(!tools.log().contains("bwa "));
    assert!(!tools.path().join("out.bam_1.fastq").exists());
    assert!(!request.output.exists());
}
