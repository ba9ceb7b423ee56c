use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// One slice of the simulation workload, handed to exactly one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub index: usize,
    /// Coverage this worker simulates
    pub quantity: u32,
    /// Job seed offset by the unit index
    pub seed: u64,
}

/// Split `total` coverage into at most `max_workers` near-equal chunks.
///
/// With fewer units of work than workers every chunk is a single unit;
/// otherwise the remainder goes to the first chunks, so chunk sizes never
/// differ by more than one.
pub fn partition(total: u32, max_workers: usize, base_seed: u64) -> Result<Vec<WorkUnit>> {
    if total < 1 {
        return Err(PipelineError::invalid_input("coverage must be at least 1"));
    }
    if max_workers < 1 {
        return Err(PipelineError::invalid_input(
            "worker count must be at least 1",
        ));
    }

    let quantities: Vec<u32> = if (total as usize) < max_workers {
        vec![1; total as usize]
    } else {
        let workers = max_workers as u32;
        let base = total / workers;
        let remainder = (total % workers) as usize;
        (0..max_workers)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect()
    };

    Ok(quantities
        .into_iter()
        .enumerate()
        .map(|(index, quantity)| WorkUnit {
            index,
            quantity,
            seed: base_seed.wrapping_add(index as u64),
        })
        .collect())
}
