use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Alignment file format, chosen by the output path suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Bam,
    Cram,
}

impl OutputFormat {
    /// Accepts exactly `.bam` and `.cram`
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        if name.ends_with(".bam") {
            Ok(OutputFormat::Bam)
        } else if name.ends_with(".cram") {
            Ok(OutputFormat::Cram)
        } else {
            Err(PipelineError::invalid_input(format!(
                "output file must be a BAM or CRAM file: {}",
                path.display()
            )))
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Bam => "bam",
            OutputFormat::Cram => "cram",
        }
    }

    /// The sort tool writes BAM; anything else needs a conversion stage
    pub fn needs_conversion(&self) -> bool {
        matches!(self, OutputFormat::Cram)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}
